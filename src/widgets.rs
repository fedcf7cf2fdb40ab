//! Widgets that draw and register their own click targets in one pass.
//!
//! Render code never computes target rows by hand; it pushes lines or tabs
//! here and the widget places the targets where the text actually lands.

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::style::{Color, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Paragraph};
use ratzilla::ratatui::Frame;

use crate::input::ClickState;

/// Single-row tab strip, e.g. the machine-type tabs in Zero Dawn.
///
/// ```ignore
/// TabBar::new(" │ ")
///     .tab("1 Acquisition", tab_style(0), TAB_TYPE_BASE)
///     .tab("2 Combat", tab_style(1), TAB_TYPE_BASE + 1)
///     .block(Block::default().borders(Borders::ALL))
///     .render(f, area, &mut cs);
/// ```
pub struct TabBar<'a> {
    tabs: Vec<(String, Style, u16)>,
    separator: &'a str,
    block: Option<Block<'a>>,
}

impl<'a> TabBar<'a> {
    pub fn new(separator: &'a str) -> Self {
        Self {
            tabs: Vec::new(),
            separator,
            block: None,
        }
    }

    pub fn tab(mut self, label: impl Into<String>, style: Style, action_id: u16) -> Self {
        self.tabs.push((label.into(), style, action_id));
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    /// `(padded width, action id)` per tab, as handed to
    /// [`ClickState::register_tab_targets`].
    fn widths(&self) -> Vec<(u16, u16)> {
        self.tabs
            .iter()
            .map(|(label, _, id)| (Line::from(format!(" {label} ")).width() as u16, *id))
            .collect()
    }

    pub fn render(self, f: &mut Frame, area: Rect, cs: &mut ClickState) {
        let widths = self.widths();
        let sep_width = Line::from(self.separator).width() as u16;
        let sep_style = Style::default().fg(Color::DarkGray);

        let mut spans: Vec<Span> = Vec::with_capacity(self.tabs.len() * 2);
        for (i, (label, style, _)) in self.tabs.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(self.separator, sep_style));
            }
            spans.push(Span::styled(format!(" {label} "), style));
        }

        let inner = self.block.as_ref().map_or(area, |b| b.inner(area));
        let mut paragraph = Paragraph::new(Line::from(spans));
        if let Some(block) = self.block {
            paragraph = paragraph.block(block);
        }
        f.render_widget(paragraph, area);

        // Horizontal positions follow the text; vertically the whole bar,
        // borders included, counts as a hit.
        cs.register_tab_targets(
            &widths,
            sep_width,
            inner.x,
            area.y,
            inner.width,
            area.height.max(1),
        );
    }
}

/// Lines for a bordered [`Paragraph`], some of them bound to an action.
///
/// A target follows its line: inserting a status row above a button moves
/// the button's target with it.
pub struct ClickableList<'a> {
    lines: Vec<Line<'a>>,
    /// `(line index, action id)`
    actions: Vec<(usize, u16)>,
}

impl<'a> ClickableList<'a> {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn push(&mut self, line: Line<'a>) {
        self.lines.push(line);
    }

    pub fn push_clickable(&mut self, line: Line<'a>, action_id: u16) {
        self.actions.push((self.lines.len(), action_id));
        self.lines.push(line);
    }

    pub fn into_lines(self) -> Vec<Line<'a>> {
        self.lines
    }

    /// Register a row target for every clickable line that is visible in `area`.
    ///
    /// `top` and `bottom` are the border rows. `wrap_width` is the inner width
    /// when the paragraph wraps; with `0` every line takes exactly one row.
    /// A wrapped line is clickable on each row it spans.
    pub fn register_targets(
        &self,
        area: Rect,
        cs: &mut ClickState,
        top: u16,
        bottom: u16,
        wrap_width: u16,
    ) {
        let first_row = area.y + top;
        let end_row = area.y + area.height.saturating_sub(bottom);

        let mut starts = Vec::with_capacity(self.lines.len());
        let mut heights = Vec::with_capacity(self.lines.len());
        let mut offset = 0u16;
        for line in &self.lines {
            let rows = visual_rows(line.width(), wrap_width);
            starts.push(offset);
            heights.push(rows);
            offset = offset.saturating_add(rows);
        }

        for &(idx, action_id) in &self.actions {
            let (Some(&start), Some(&rows)) = (starts.get(idx), heights.get(idx)) else {
                continue;
            };
            for row in (0..rows).map(|r| first_row + start + r) {
                if row >= end_row {
                    break;
                }
                cs.add_row_target(area, row, action_id);
            }
        }
    }
}

fn visual_rows(line_width: usize, wrap_width: u16) -> u16 {
    let w = wrap_width as usize;
    if w == 0 || line_width <= w {
        1
    } else {
        line_width.div_ceil(w) as u16
    }
}

//! Input plumbing shared by the menu and both games.
//!
//! Keyboard and pointer input are both reduced to [`InputEvent`]. Pointer
//! input goes through the [`ClickState`] the last frame registered: pixel →
//! cell → action id. Games never see coordinates.

use ratzilla::ratatui::layout::Rect;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(char),
    /// A tap on a registered target. Ids are per game (see each `actions.rs`).
    Click(u16),
}

#[derive(Debug, Clone)]
pub struct ClickTarget {
    /// Terminal cells, not pixels.
    pub rect: Rect,
    pub action_id: u16,
}

/// Targets registered by the last rendered frame, plus the grid size used to
/// map pixel coordinates back onto cells.
pub struct ClickState {
    pub targets: Vec<ClickTarget>,
    pub terminal_cols: u16,
    pub terminal_rows: u16,
}

impl ClickState {
    pub fn new() -> Self {
        Self {
            targets: Vec::new(),
            terminal_cols: 0,
            terminal_rows: 0,
        }
    }

    pub fn clear_targets(&mut self) {
        self.targets.clear();
    }

    pub fn add_click_target(&mut self, rect: Rect, action_id: u16) {
        self.targets.push(ClickTarget { rect, action_id });
    }

    /// One full-width row of `area`. Rows outside the area are dropped.
    pub fn add_row_target(&mut self, area: Rect, row: u16, action_id: u16) {
        if row >= area.y && row < area.y + area.height {
            self.add_click_target(Rect::new(area.x, row, area.width, 1), action_id);
        }
    }

    /// Targets for a row of tabs laid out left to right.
    ///
    /// `tab_widths` holds `(display_width, action_id)` for each padded label
    /// (`" 2 Combat "` is 10 wide). Neighbouring tabs split the separator
    /// between them; the first tab reaches the left edge and the last one the
    /// right edge, so the whole bar is tappable.
    pub fn register_tab_targets(
        &mut self,
        tab_widths: &[(u16, u16)],
        separator_width: u16,
        x: u16,
        y: u16,
        total_width: u16,
        height: u16,
    ) {
        if tab_widths.is_empty() || total_width == 0 {
            return;
        }

        let mut spans: Vec<(u16, u16)> = Vec::with_capacity(tab_widths.len());
        let mut cursor = 0u16;
        for (i, &(w, _)) in tab_widths.iter().enumerate() {
            if i > 0 {
                cursor += separator_width;
            }
            spans.push((cursor, cursor + w));
            cursor += w;
        }

        let last = spans.len() - 1;
        for (i, &(start, end)) in spans.iter().enumerate() {
            let left = match i {
                0 => 0,
                _ => {
                    let prev_end = spans[i - 1].1;
                    prev_end + (start - prev_end) / 2
                }
            };
            let right = if i == last {
                total_width
            } else {
                let next_start = spans[i + 1].0;
                end + (next_start - end) / 2
            };
            let w = right.saturating_sub(left);
            if w > 0 {
                self.add_click_target(Rect::new(x + left, y, w, height), tab_widths[i].1);
            }
        }
    }

    /// Action at a cell. Later targets sit on top of earlier ones.
    pub fn hit_test(&self, col: u16, row: u16) -> Option<u16> {
        self.targets.iter().rev().find_map(|t| {
            let r = &t.rect;
            let inside = col >= r.x && col < r.x + r.width && row >= r.y && row < r.y + r.height;
            inside.then_some(t.action_id)
        })
    }
}

/// Phones and split panes get top/bottom borders only.
pub fn is_narrow_layout(width: u16) -> bool {
    width < 60
}

/// Pixel offset from the grid's top edge → terminal row.
pub fn pixel_y_to_row(click_y: f64, grid_height: f64, terminal_rows: u16) -> Option<u16> {
    pixel_to_cell(click_y, grid_height, terminal_rows)
}

/// Pixel offset from the grid's left edge → terminal column.
pub fn pixel_x_to_col(click_x: f64, grid_width: f64, terminal_cols: u16) -> Option<u16> {
    pixel_to_cell(click_x, grid_width, terminal_cols)
}

fn pixel_to_cell(offset: f64, extent: f64, cells: u16) -> Option<u16> {
    if extent <= 0.0 || cells == 0 || offset < 0.0 {
        return None;
    }
    let cell = (offset / (extent / cells as f64)) as u16;
    (cell < cells).then_some(cell)
}

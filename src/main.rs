mod games;
mod input;
mod logging;
mod time;
mod widgets;

use std::{cell::RefCell, io, rc::Rc};

use games::{create_game, AppState, GameChoice};
use input::{is_narrow_layout, pixel_x_to_col, pixel_y_to_row, ClickState, InputEvent};
use ratzilla::event::{KeyCode, MouseButton, MouseEventKind};
use ratzilla::ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph};
use ratzilla::ratatui::{Frame, Terminal};
use ratzilla::{DomBackend, WebRenderer};
use time::{now_ms, TickClock, TICK_PERIOD_MS};
use widgets::ClickableList;

/// Click id of the footer bar while a game is running. Above every game's ids.
pub const BACK_TO_MENU: u16 = 1000;
/// Menu entries (+ index into `GameChoice::ALL`).
const MENU_BASE: u16 = 1001;

struct App {
    state: AppState,
    clock: TickClock,
}

impl App {
    fn new() -> Self {
        Self {
            state: AppState::Menu,
            clock: TickClock::new(TICK_PERIOD_MS),
        }
    }

    fn start(&mut self, choice: &GameChoice) {
        tracing::info!(game = choice.title(), "starting game");
        self.state = AppState::Playing {
            game: create_game(choice),
        };
        self.clock = TickClock::new(TICK_PERIOD_MS);
    }

    fn dispatch(&mut self, event: InputEvent) {
        match &mut self.state {
            AppState::Menu => {
                let idx = match event {
                    InputEvent::Key(c @ '1'..='9') => (c as u8 - b'1') as usize,
                    InputEvent::Click(id) if id >= MENU_BASE => (id - MENU_BASE) as usize,
                    _ => return,
                };
                if let Some(choice) = GameChoice::ALL.get(idx) {
                    self.start(choice);
                }
            }
            AppState::Playing { game } => match event {
                InputEvent::Click(BACK_TO_MENU) | InputEvent::Key('q') => {
                    self.state = AppState::Menu;
                }
                event => {
                    game.handle_input(&event);
                }
            },
        }
    }

    /// Advance the running game by however many whole ticks have elapsed.
    /// The clock follows the game: stopped while halted, restarted once an
    /// in-game reset brings it back.
    fn update(&mut self, now: f64) {
        let AppState::Playing { game } = &mut self.state else {
            return;
        };
        if game.is_halted() {
            self.clock.stop();
        } else {
            self.clock.start();
        }
        let ticks = self.clock.update(now);
        if ticks > 0 {
            game.tick(ticks);
        }
    }
}

/// Query the grid container's bounding rect and convert pixel coordinates to a cell.
fn dom_pixel_to_cell(mouse_x: u32, mouse_y: u32, cs: &ClickState) -> Option<(u16, u16)> {
    let window = web_sys::window()?;
    let document = window.document()?;

    // The DomBackend grid is the first <div> under <body>.
    let grid = document.query_selector("body > div").ok()??;
    let rect = grid.get_bounding_client_rect();

    let click_y = mouse_y as f64 - rect.top();
    let click_x = mouse_x as f64 - rect.left();

    let row = pixel_y_to_row(click_y, rect.height(), cs.terminal_rows);
    let col = pixel_x_to_col(click_x, rect.width(), cs.terminal_cols);
    tracing::debug!(mouse_y, ?row, ?col, targets = cs.targets.len(), "click");

    Some((col?, row?))
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();
    logging::init();

    let app = Rc::new(RefCell::new(App::new()));
    let click_state = Rc::new(RefCell::new(ClickState::new()));
    let backend = DomBackend::new()?;
    let terminal = Terminal::new(backend)?;

    terminal.on_mouse_event({
        let app = app.clone();
        let click_state = click_state.clone();
        move |mouse_event| {
            if mouse_event.event != MouseEventKind::Pressed
                || mouse_event.button != MouseButton::Left
            {
                return;
            }

            let cs = click_state.borrow();
            if cs.terminal_rows == 0 || cs.terminal_cols == 0 {
                return;
            }
            let Some((col, row)) = dom_pixel_to_cell(mouse_event.x, mouse_event.y, &cs) else {
                return;
            };
            let matched = cs.hit_test(col, row);
            drop(cs);

            if let Some(action_id) = matched {
                app.borrow_mut().dispatch(InputEvent::Click(action_id));
            }
        }
    });

    terminal.on_key_event({
        let app = app.clone();
        move |key_event| {
            let event = match key_event.code {
                KeyCode::Char(c) => InputEvent::Key(c),
                KeyCode::Enter => InputEvent::Key('\n'),
                KeyCode::Esc => InputEvent::Click(BACK_TO_MENU),
                _ => return,
            };
            app.borrow_mut().dispatch(event);
        }
    });

    terminal.draw_web({
        let click_state = click_state.clone();
        move |f| {
            let mut app = app.borrow_mut();
            app.update(now_ms() as f64);
            let size = f.area();

            // Targets are rebuilt every frame.
            {
                let mut cs = click_state.borrow_mut();
                cs.terminal_cols = size.width;
                cs.terminal_rows = size.height;
                cs.clear_targets();
            }

            match &app.state {
                AppState::Menu => render_menu(f, size, &click_state),
                AppState::Playing { game } => {
                    let chunks = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([Constraint::Min(10), Constraint::Length(3)])
                        .split(size);
                    game.render(f, chunks[0], &click_state);
                    render_footer(f, chunks[1], &click_state);
                }
            }
        }
    });

    Ok(())
}

fn render_menu(f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
    let borders = if is_narrow_layout(area.width) {
        Borders::TOP | Borders::BOTTOM
    } else {
        Borders::ALL
    };
    let mut cl = ClickableList::new();
    cl.push(Line::from(""));
    for (i, choice) in GameChoice::ALL.iter().enumerate() {
        cl.push_clickable(
            Line::from(vec![
                Span::styled(
                    format!(" [{}] ", i + 1),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    choice.title(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
            MENU_BASE + i as u16,
        );
        cl.push(Line::from(Span::styled(
            format!("      {}", choice.tagline()),
            Style::default().fg(Color::DarkGray),
        )));
        cl.push(Line::from(""));
    }

    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " Machine Idle ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));
    {
        let mut cs = click_state.borrow_mut();
        cl.register_targets(area, &mut cs, 1, 1, 0);
    }
    f.render_widget(Paragraph::new(cl.into_lines()).block(block), area);
}

fn render_footer(f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
    let help = Paragraph::new(Line::from(Span::styled(
        "[Esc] Back to menu (progress is saved)",
        Style::default().fg(Color::DarkGray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);
    f.render_widget(help, area);

    // The whole footer is one target
    let mut cs = click_state.borrow_mut();
    for row in area.y..area.y + area.height {
        cs.add_row_target(area, row, BACK_TO_MENU);
    }
}

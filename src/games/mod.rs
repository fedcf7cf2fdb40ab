/// Game trait and game selection logic.

pub mod persist;
pub mod random;
pub mod swarm;
pub mod upgrade;
pub mod zerodawn;

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;

use crate::input::{ClickState, InputEvent};

/// Player-facing log entries kept per game.
pub const LOG_CAP: usize = 50;

/// Trait that all games implement.
pub trait Game {
    /// Handle an input event. Returns true if the event was consumed.
    fn handle_input(&mut self, event: &InputEvent) -> bool;

    /// Advance game logic by `delta_ticks` one-second periods.
    fn tick(&mut self, delta_ticks: u32);

    /// Render the game into the given area.
    fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>);

    /// True once the game hit a terminal condition; the tick clock stops.
    fn is_halted(&self) -> bool {
        false
    }
}

/// One line in a game's event log.
#[derive(Clone, Debug, PartialEq)]
pub struct LogEntry {
    pub text: String,
    pub is_important: bool,
}

/// Append to a log, dropping the oldest entries past [`LOG_CAP`].
pub fn push_log(log: &mut Vec<LogEntry>, text: impl Into<String>, is_important: bool) {
    log.push(LogEntry {
        text: text.into(),
        is_important,
    });
    if log.len() > LOG_CAP {
        let excess = log.len() - LOG_CAP;
        log.drain(..excess);
    }
}

/// Which game the player has selected (or is choosing).
#[derive(Clone, Debug, PartialEq)]
pub enum GameChoice {
    Swarm,
    ZeroDawn,
}

impl GameChoice {
    pub const ALL: [GameChoice; 2] = [GameChoice::Swarm, GameChoice::ZeroDawn];

    pub fn title(&self) -> &'static str {
        match self {
            GameChoice::Swarm => swarm::save::TITLE,
            GameChoice::ZeroDawn => zerodawn::save::TITLE,
        }
    }

    pub fn tagline(&self) -> &'static str {
        match self {
            GameChoice::Swarm => "Build a machine swarm and survive humanity's counterattacks",
            GameChoice::ZeroDawn => "Restore the biosphere with cauldrons and machines",
        }
    }
}

/// Top-level application state.
pub enum AppState {
    /// Showing game selection menu.
    Menu,
    /// Playing a game.
    Playing {
        game: Box<dyn Game>,
    },
}

/// Create a game instance from a choice, loading its saved state.
pub fn create_game(choice: &GameChoice) -> Box<dyn Game> {
    match choice {
        GameChoice::Swarm => Box::new(swarm::SwarmGame::new(
            persist::default_store(),
            Box::new(random::SeededRandom::from_clock()),
        )),
        GameChoice::ZeroDawn => Box::new(zerodawn::ZeroDawnGame::new(
            persist::default_store(),
            Box::new(random::SeededRandom::from_clock()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_capped() {
        let mut log = Vec::new();
        for i in 0..(LOG_CAP + 7) {
            push_log(&mut log, format!("entry {i}"), false);
        }
        assert_eq!(log.len(), LOG_CAP);
        assert_eq!(log[0].text, "entry 7");
    }

    #[test]
    fn titles_match_storage_keys() {
        assert_eq!(GameChoice::Swarm.title(), "Swarm");
        assert_eq!(GameChoice::ZeroDawn.title(), "Zero Dawn");
    }

    #[test]
    fn create_game_starts_running() {
        for choice in GameChoice::ALL {
            let game = create_game(&choice);
            assert!(!game.is_halted());
        }
    }
}

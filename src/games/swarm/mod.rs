//! Swarm: grow a machine swarm, collect power, and fend off humanity.

pub mod actions;
pub mod battle;
pub mod data;
pub mod logic;
pub mod render;
pub mod save;
pub mod state;
pub mod upgrades;

use std::cell::RefCell;
use std::rc::Rc;

use ratzilla::ratatui::layout::Rect;
use ratzilla::ratatui::Frame;

use crate::games::persist::Store;
use crate::games::random::RandomSource;
use crate::games::{push_log, Game, LogEntry};
use crate::input::{ClickState, InputEvent};
use crate::time::now_ms;

use actions::*;
use logic::{SwarmEngine, SwarmEvent, TickOutcome};
use state::{Task, UnitKind};

/// Presentation-side state; never saved.
#[derive(Default)]
pub struct SwarmView {
    pub show_upgrades: bool,
    pub confirm_reset: bool,
}

pub struct SwarmGame {
    pub engine: SwarmEngine,
    pub log: Vec<LogEntry>,
    pub view: SwarmView,
}

impl SwarmGame {
    pub fn new(store: Box<dyn Store>, rng: Box<dyn RandomSource>) -> Self {
        let engine = SwarmEngine::load(store, rng);
        let mut game = Self {
            engine,
            log: Vec::new(),
            view: SwarmView::default(),
        };
        if game.engine.is_defeated() {
            push_log(&mut game.log, "All Horuses are gone. Reset to start again.", true);
        } else {
            push_log(&mut game.log, "The swarm awakens.", false);
        }
        game
    }

    fn drain_events(&mut self) {
        for event in self.engine.drain_events() {
            let (text, important) = match event {
                SwarmEvent::Constructed(kind) => (
                    format!("{} constructed.", self.engine.units().get(kind).name),
                    false,
                ),
                SwarmEvent::AttackIncoming(force) => (
                    format!("Enduring Victory task force approaching: strength {force}."),
                    true,
                ),
                SwarmEvent::BattleResolved {
                    total_losses,
                    enemy_left,
                } => (
                    format!("Battle over: {total_losses} lost, enemy left with {enemy_left}."),
                    true,
                ),
                SwarmEvent::UpgradePurchased(name) => (format!("Upgrade acquired: {name}"), false),
                SwarmEvent::Defeated => (
                    "You've lost all your Horuses! No more machines can be built.".to_string(),
                    true,
                ),
            };
            push_log(&mut self.log, text, important);
        }
    }

    fn buy_listed_upgrade(&mut self, display_idx: usize) -> bool {
        let name = match self.engine.listed_upgrades().get(display_idx) {
            Some(u) => u.name,
            None => return false,
        };
        self.engine.purchase_upgrade(name);
        true
    }

    fn request_reset(&mut self) -> bool {
        if self.view.confirm_reset {
            self.engine.reset();
            self.view = SwarmView::default();
            self.log.clear();
            push_log(&mut self.log, "A new swarm awakens.", true);
        } else {
            self.view.confirm_reset = true;
        }
        true
    }

    fn handle_click(&mut self, action_id: u16) -> bool {
        let now = now_ms();
        let defeated = self.engine.is_defeated();
        if action_id != RESET_GAME {
            self.view.confirm_reset = false;
        }
        let kind_at = |base: u16| UnitKind::from_index(action_id.wrapping_sub(base) as usize);
        match action_id {
            RESET_GAME => self.request_reset(),
            _ if defeated => false,
            id if (BUILD_BASE..BUILD_BASE + 3).contains(&id) => {
                kind_at(BUILD_BASE).map_or(false, |k| self.engine.try_purchase(k, 1, now));
                true
            }
            id if (COLLECT_ADD_BASE..COLLECT_ADD_BASE + 3).contains(&id) => {
                kind_at(COLLECT_ADD_BASE).map_or(false, |k| self.engine.set_busy(k, Task::Consuming));
                true
            }
            id if (COLLECT_REMOVE_BASE..COLLECT_REMOVE_BASE + 3).contains(&id) => {
                kind_at(COLLECT_REMOVE_BASE)
                    .map_or(false, |k| self.engine.remove_busy(k, Task::Consuming));
                true
            }
            id if (PREP_ADD_BASE..PREP_ADD_BASE + 3).contains(&id) => {
                kind_at(PREP_ADD_BASE).map_or(false, |k| self.engine.set_busy(k, Task::Prepped));
                true
            }
            id if (PREP_REMOVE_BASE..PREP_REMOVE_BASE + 3).contains(&id) => {
                kind_at(PREP_REMOVE_BASE).map_or(false, |k| self.engine.remove_busy(k, Task::Prepped));
                true
            }
            STRIKE_FIRST => {
                self.engine.run_battle(now);
                true
            }
            DISMISS_RESULT => {
                self.engine.dismiss_result();
                true
            }
            TOGGLE_UPGRADES => {
                self.view.show_upgrades = !self.view.show_upgrades;
                true
            }
            id if id >= BUY_UPGRADE_BASE && self.view.show_upgrades => {
                self.buy_listed_upgrade((id - BUY_UPGRADE_BASE) as usize)
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: char) -> bool {
        let action = match key {
            'a'..='g' if self.view.show_upgrades => BUY_UPGRADE_BASE + (key as u8 - b'a') as u16,
            '1' => BUILD_BASE,
            '2' => BUILD_BASE + 1,
            '3' => BUILD_BASE + 2,
            '4' => COLLECT_ADD_BASE + 1,
            '5' => COLLECT_REMOVE_BASE + 1,
            '6' => COLLECT_ADD_BASE + 2,
            '7' => COLLECT_REMOVE_BASE + 2,
            'h' => PREP_ADD_BASE,
            'j' => PREP_REMOVE_BASE,
            'k' => PREP_ADD_BASE + 1,
            'l' => PREP_REMOVE_BASE + 1,
            'n' => PREP_ADD_BASE + 2,
            'm' => PREP_REMOVE_BASE + 2,
            'b' => STRIKE_FIRST,
            'x' => DISMISS_RESULT,
            'u' => TOGGLE_UPGRADES,
            'R' => RESET_GAME,
            _ => return false,
        };
        self.handle_click(action)
    }
}

impl Game for SwarmGame {
    fn handle_input(&mut self, event: &InputEvent) -> bool {
        let consumed = match event {
            InputEvent::Key(c) => self.handle_key(*c),
            InputEvent::Click(id) => self.handle_click(*id),
        };
        self.drain_events();
        consumed
    }

    fn tick(&mut self, delta_ticks: u32) {
        for _ in 0..delta_ticks {
            if self.engine.tick(now_ms()) == TickOutcome::Defeated {
                break;
            }
        }
        self.drain_events();
    }

    fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(self, f, area, click_state);
    }

    fn is_halted(&self) -> bool {
        self.engine.is_defeated()
    }
}

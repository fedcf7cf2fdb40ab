//! Zero Dawn: terraform a dead Earth with machines built in cauldrons.

pub mod actions;
pub mod logic;
pub mod machines;
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
use logic::{Shortfall, TickOutcome, TransferOutcome, ZeroDawnEngine, ZeroDawnEvent};
use state::{CauldronName, MachineId, MachineType};

/// Materials moved per small / large transfer.
const SMALL_TRANSFER: f64 = 10.0;
const LARGE_TRANSFER: f64 = 100.0;
const POWER_DEPLETED: &str = "Power depleted! Production stopped.";

/// Presentation-side state; never saved.
pub struct ZeroDawnView {
    pub machine_type: MachineType,
    /// Index into the purchasable list of `machine_type`.
    pub selected: usize,
    /// Index into the owned cauldrons.
    pub cauldron: usize,
    pub show_upgrades: bool,
    pub confirm_reset: bool,
}

impl Default for ZeroDawnView {
    fn default() -> Self {
        Self {
            machine_type: MachineType::Acquisition,
            selected: 0,
            cauldron: 0,
            show_upgrades: false,
            confirm_reset: false,
        }
    }
}

pub struct ZeroDawnGame {
    pub engine: ZeroDawnEngine,
    pub log: Vec<LogEntry>,
    pub view: ZeroDawnView,
}

impl ZeroDawnGame {
    pub fn new(store: Box<dyn Store>, rng: Box<dyn RandomSource>) -> Self {
        let engine = ZeroDawnEngine::load(store, rng);
        let mut game = Self {
            engine,
            log: Vec::new(),
            view: ZeroDawnView::default(),
        };
        push_log(&mut game.log, "The Cauldron hums back to life.", false);
        game
    }

    /// The machine the detail panel is showing, if the list is not empty.
    pub fn selected_machine(&self) -> Option<MachineId> {
        let list = self.engine.purchasable_machines(self.view.machine_type);
        let idx = self.view.selected.min(list.len().checked_sub(1)?);
        list.get(idx).copied()
    }

    /// The cauldron the cauldron panel is showing.
    pub fn selected_cauldron(&self) -> Option<CauldronName> {
        let cauldrons = &self.engine.state().cauldrons;
        let idx = self.view.cauldron.min(cauldrons.len().checked_sub(1)?);
        cauldrons.get(idx).map(|c| c.name)
    }

    fn drain_events(&mut self) {
        for event in self.engine.drain_events() {
            let name = |id: MachineId| self.engine.machines().get(id).name;
            let (text, important) = match event {
                ZeroDawnEvent::Constructed(id) => (format!("{} constructed.", name(id)), false),
                ZeroDawnEvent::TransportArrived {
                    machine,
                    cauldron,
                    amount,
                } => (
                    format!(
                        "{} delivered {amount:.1} materials to Cauldron {cauldron:?}.",
                        name(machine)
                    ),
                    false,
                ),
                ZeroDawnEvent::BuffFound(id) => (
                    format!("{} located rich land. Collection boosted.", name(id)),
                    true,
                ),
                ZeroDawnEvent::CauldronBuilt(cauldron) => {
                    (format!("Cauldron {cauldron:?} is online."), true)
                }
                ZeroDawnEvent::UpgradePurchased(upgrade) => {
                    (format!("Upgrade acquired: {upgrade}"), false)
                }
                ZeroDawnEvent::PowerDepleted => {
                    if self.log.last().is_some_and(|e| e.text == POWER_DEPLETED) {
                        continue;
                    }
                    (POWER_DEPLETED.to_string(), true)
                }
            };
            push_log(&mut self.log, text, important);
        }
    }

    fn log_transfer(&mut self, outcome: TransferOutcome) {
        let text = match outcome {
            TransferOutcome::Dispatched { flights, sent } => {
                format!("Sent {sent:.1} materials on {flights} transport(s).")
            }
            TransferOutcome::Short {
                sent,
                unsent,
                cause: Shortfall::NoFreeTransport,
                ..
            } => format!("Sent {sent:.1}; {unsent:.1} left behind, no free transport."),
            TransferOutcome::Short {
                sent,
                cause: Shortfall::ReserveEmpty,
                ..
            } => format!("Sent {sent:.1}; the main reserve ran dry."),
            TransferOutcome::Rejected => return,
        };
        push_log(&mut self.log, text, false);
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
            self.view = ZeroDawnView::default();
            self.log.clear();
            push_log(&mut self.log, "The world goes quiet again.", true);
        } else {
            self.view.confirm_reset = true;
        }
        true
    }

    fn select_type(&mut self, idx: usize) -> bool {
        let Some(ty) = MachineType::ALL.get(idx) else {
            return false;
        };
        self.view.machine_type = *ty;
        self.view.selected = 0;
        true
    }

    fn move_selection(&mut self, down: bool) -> bool {
        let len = self.engine.purchasable_machines(self.view.machine_type).len();
        let current = self.view.selected.min(len.saturating_sub(1));
        self.view.selected = if down {
            (current + 1).min(len.saturating_sub(1))
        } else {
            current.saturating_sub(1)
        };
        true
    }

    fn cycle_cauldron(&mut self, forward: bool) -> bool {
        let len = self.engine.state().cauldrons.len();
        if len == 0 {
            return false;
        }
        let current = self.view.cauldron.min(len - 1);
        self.view.cauldron = if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };
        true
    }

    /// Assign (or release) the selected machine to the `slot`-th task of its type.
    fn change_task(&mut self, slot: usize, assign: bool) -> bool {
        let Some(id) = self.selected_machine() else {
            return false;
        };
        let Some(task) = self.view.machine_type.tasks().get(slot).copied() else {
            return false;
        };
        if assign {
            self.engine.set_busy(id, task);
        } else {
            self.engine.remove_busy(id, task);
        }
        true
    }

    fn send(&mut self, amount: f64, now: u64) -> bool {
        let Some(cauldron) = self.selected_cauldron() else {
            return false;
        };
        let outcome = self.engine.send_materials(cauldron, amount, now);
        self.log_transfer(outcome);
        true
    }

    fn withdraw(&mut self, amount: f64) -> bool {
        let Some(cauldron) = self.selected_cauldron() else {
            return false;
        };
        if !self.engine.withdraw_materials(cauldron, amount) {
            push_log(
                &mut self.log,
                format!("Cauldron {cauldron:?} does not hold {amount:.0} materials."),
                false,
            );
        }
        true
    }

    fn handle_click(&mut self, action_id: u16) -> bool {
        let now = now_ms();
        if action_id != RESET_GAME {
            self.view.confirm_reset = false;
        }
        if self.engine.state().tutorial_open {
            return match action_id {
                START => {
                    self.engine.close_tutorial();
                    true
                }
                RESET_GAME => self.request_reset(),
                _ => false,
            };
        }
        let slot = |base: u16| action_id.wrapping_sub(base) as usize;
        match action_id {
            RESET_GAME => self.request_reset(),
            OPEN_TUTORIAL => {
                self.engine.open_tutorial();
                true
            }
            id if (TAB_TYPE_BASE..TAB_TYPE_BASE + 4).contains(&id) => {
                self.select_type(slot(TAB_TYPE_BASE))
            }
            id if id >= SELECT_MACHINE_BASE => {
                self.view.selected = slot(SELECT_MACHINE_BASE);
                true
            }
            BUILD_ONE | BUILD_TEN => {
                let count = if action_id == BUILD_TEN { 10 } else { 1 };
                if let Some(id) = self.selected_machine() {
                    self.engine.try_purchase(id, count, now);
                }
                true
            }
            BREAK_DOWN => {
                if let Some(id) = self.selected_machine() {
                    self.engine.break_down(id);
                }
                true
            }
            id if (TASK_ADD_BASE..TASK_REMOVE_BASE).contains(&id) => {
                self.change_task(slot(TASK_ADD_BASE), true)
            }
            id if (TASK_REMOVE_BASE..PREV_CAULDRON).contains(&id) => {
                self.change_task(slot(TASK_REMOVE_BASE), false)
            }
            PREV_CAULDRON => self.cycle_cauldron(false),
            NEXT_CAULDRON => self.cycle_cauldron(true),
            SEND_SMALL => self.send(SMALL_TRANSFER, now),
            SEND_LARGE => self.send(LARGE_TRANSFER, now),
            WITHDRAW_SMALL => self.withdraw(SMALL_TRANSFER),
            WITHDRAW_LARGE => self.withdraw(LARGE_TRANSFER),
            BUY_CAULDRON => {
                self.engine.purchase_cauldron();
                true
            }
            TOGGLE_UPGRADES => {
                self.view.show_upgrades = !self.view.show_upgrades;
                true
            }
            id if (BUY_UPGRADE_BASE..SELECT_MACHINE_BASE).contains(&id)
                && self.view.show_upgrades =>
            {
                self.buy_listed_upgrade((id - BUY_UPGRADE_BASE) as usize)
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: char) -> bool {
        if self.engine.state().tutorial_open {
            return match key {
                's' | '\n' => self.handle_click(START),
                'R' => self.handle_click(RESET_GAME),
                _ => false,
            };
        }
        let action = match key {
            'a'..='k' if self.view.show_upgrades => BUY_UPGRADE_BASE + (key as u8 - b'a') as u16,
            '1'..='4' => TAB_TYPE_BASE + (key as u8 - b'1') as u16,
            'j' => {
                self.view.confirm_reset = false;
                return self.move_selection(true);
            }
            'k' => {
                self.view.confirm_reset = false;
                return self.move_selection(false);
            }
            'b' => BUILD_ONE,
            'B' => BUILD_TEN,
            'x' => BREAK_DOWN,
            'a' => TASK_ADD_BASE,
            'A' => TASK_REMOVE_BASE,
            's' => TASK_ADD_BASE + 1,
            'S' => TASK_REMOVE_BASE + 1,
            '[' => PREV_CAULDRON,
            ']' => NEXT_CAULDRON,
            'm' => SEND_SMALL,
            'M' => SEND_LARGE,
            'w' => WITHDRAW_SMALL,
            'W' => WITHDRAW_LARGE,
            'n' => BUY_CAULDRON,
            'u' => TOGGLE_UPGRADES,
            '?' => OPEN_TUTORIAL,
            'R' => RESET_GAME,
            _ => return false,
        };
        self.handle_click(action)
    }
}

impl Game for ZeroDawnGame {
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
            if self.engine.tick(now_ms()) == TickOutcome::Paused {
                break;
            }
        }
        self.drain_events();
    }

    fn render(&self, f: &mut Frame, area: Rect, click_state: &Rc<RefCell<ClickState>>) {
        render::render(self, f, area, click_state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::persist::{self, MemoryStore};
    use crate::games::random::ScriptedRandom;
    use state::{Cauldron, Task, ZeroDawnState};

    fn game_with(state: ZeroDawnState) -> ZeroDawnGame {
        let mut store = MemoryStore::new();
        persist::save(&mut store, "state-Zero Dawn", &state).unwrap();
        ZeroDawnGame::new(Box::new(store), Box::new(ScriptedRandom::new(&[0.0])))
    }

    fn started() -> ZeroDawnState {
        ZeroDawnState {
            tutorial_open: false,
            ..ZeroDawnState::default()
        }
    }

    #[test]
    fn intro_panel_blocks_play_until_started() {
        let mut game = game_with(ZeroDawnState::default());
        assert!(!game.handle_input(&InputEvent::Key('b')));
        assert!(game.engine.state().cauldrons[0].busy.is_empty());
        assert!(game.handle_input(&InputEvent::Key('\n')));
        assert!(!game.engine.state().tutorial_open);
        game.handle_input(&InputEvent::Key('?'));
        assert!(game.engine.state().tutorial_open);
    }

    #[test]
    fn build_selected_machine_via_key() {
        let mut game = game_with(started());
        assert_eq!(game.selected_machine(), Some(MachineId::Grazer));
        assert!(game.handle_input(&InputEvent::Key('b')));
        assert_eq!(
            game.engine.state().cauldrons[0].busy.first().map(|b| b.0),
            Some(MachineId::Grazer)
        );
    }

    #[test]
    fn tabs_and_task_keys() {
        let mut game = game_with(started());
        game.handle_input(&InputEvent::Key('3'));
        assert_eq!(game.view.machine_type, MachineType::Recon);
        assert_eq!(game.selected_machine(), Some(MachineId::Watcher));
        game.handle_input(&InputEvent::Key('a'));
        assert_eq!(game.engine.state().busy(MachineId::Watcher), &[Task::Recon]);
        game.handle_input(&InputEvent::Key('A'));
        assert!(game.engine.state().busy(MachineId::Watcher).is_empty());
    }

    #[test]
    fn selection_moves_and_clamps() {
        let mut s = started();
        s.machines.insert(MachineId::Scrapper, 1);
        let mut game = game_with(s);
        game.handle_input(&InputEvent::Key('j'));
        game.handle_input(&InputEvent::Key('j'));
        assert_eq!(game.view.selected, 1);
        game.handle_input(&InputEvent::Key('k'));
        assert_eq!(game.view.selected, 0);
        game.handle_input(&InputEvent::Click(SELECT_MACHINE_BASE + 1));
        assert_eq!(game.view.selected, 1);
    }

    #[test]
    fn send_logs_shortfall() {
        let mut game = game_with(started());
        game.handle_input(&InputEvent::Key('m'));
        assert!((game.engine.state().materials - 95.0).abs() < 1e-9);
        assert!(game
            .log
            .last()
            .is_some_and(|e| e.text.contains("no free transport")));
    }

    #[test]
    fn cauldron_cycle_wraps() {
        let mut s = started();
        s.cauldrons.push(Cauldron::new(CauldronName::Beta, 1, 0.0));
        let mut game = game_with(s);
        game.handle_input(&InputEvent::Key(']'));
        assert_eq!(game.selected_cauldron(), Some(CauldronName::Beta));
        game.handle_input(&InputEvent::Key(']'));
        assert_eq!(game.selected_cauldron(), Some(CauldronName::Alpha));
        game.handle_input(&InputEvent::Key('['));
        assert_eq!(game.selected_cauldron(), Some(CauldronName::Beta));
    }

    #[test]
    fn upgrade_keys_take_precedence_in_upgrade_view() {
        let mut s = started();
        s.materials = 60.0;
        s.power = 60.0;
        let mut game = game_with(s);
        game.handle_input(&InputEvent::Key('u'));
        // 'b' is an upgrade slot while the list is open
        assert!(!game.handle_input(&InputEvent::Key('b')));
        assert!(game.engine.state().cauldrons[0].busy.is_empty());
        let idx = game
            .engine
            .listed_upgrades()
            .iter()
            .position(|u| u.name == upgrades::SOLAR_ARRAYS)
            .unwrap();
        game.handle_input(&InputEvent::Key((b'a' + idx as u8) as char));
        assert_eq!(game.engine.state().upgrades, vec![upgrades::SOLAR_ARRAYS.to_string()]);
    }

    #[test]
    fn reset_needs_confirmation() {
        let mut s = started();
        s.materials = 5_000.0;
        let mut game = game_with(s);
        game.handle_input(&InputEvent::Key('R'));
        assert!((game.engine.state().materials - 5_000.0).abs() < 1e-9);
        game.handle_input(&InputEvent::Key('R'));
        assert_eq!(game.engine.state(), &ZeroDawnState::default());
        assert!(!game.view.confirm_reset);
    }

    #[test]
    fn power_depletion_logged_once() {
        let mut s = started();
        s.power = 0.0;
        s.busy.insert(MachineId::Grazer, vec![Task::Terraforming]);
        let mut game = game_with(s);
        game.tick(3);
        let hits = game.log.iter().filter(|e| e.text == POWER_DEPLETED).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn paused_game_does_not_advance() {
        let mut s = ZeroDawnState::default();
        s.busy.insert(MachineId::Grazer, vec![Task::Terraforming]);
        let mut game = game_with(s);
        game.tick(5);
        assert_eq!(game.engine.state().land_restored, 0.0);
    }
}

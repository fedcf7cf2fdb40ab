//! Semantic action IDs for Zero Dawn click targets.

// ── Machine type tabs (base + MachineType index) ─────────────
pub const TAB_TYPE_BASE: u16 = 10;

// ── Selected machine ─────────────────────────────────────────
pub const BUILD_ONE: u16 = 20;
pub const BUILD_TEN: u16 = 21;
pub const BREAK_DOWN: u16 = 22;
pub const TASK_ADD_BASE: u16 = 30; // +task slot
pub const TASK_REMOVE_BASE: u16 = 35; // +task slot

// ── Cauldrons ────────────────────────────────────────────────
pub const PREV_CAULDRON: u16 = 40;
pub const NEXT_CAULDRON: u16 = 41;
pub const SEND_SMALL: u16 = 42;
pub const SEND_LARGE: u16 = 43;
pub const WITHDRAW_SMALL: u16 = 44;
pub const WITHDRAW_LARGE: u16 = 45;
pub const BUY_CAULDRON: u16 = 46;

// ── Upgrades ─────────────────────────────────────────────────
pub const TOGGLE_UPGRADES: u16 = 50;
pub const BUY_UPGRADE_BASE: u16 = 100; // +display index

// ── Intro panel ──────────────────────────────────────────────
pub const START: u16 = 60;
pub const OPEN_TUTORIAL: u16 = 61;

// ── Game ─────────────────────────────────────────────────────
pub const RESET_GAME: u16 = 90;

// ── Machine list rows (base + display index) ─────────────────
pub const SELECT_MACHINE_BASE: u16 = 200;

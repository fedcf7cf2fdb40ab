//! Semantic action IDs for Swarm click targets.

// ── Machines (base + UnitKind index) ─────────────────────────
pub const BUILD_BASE: u16 = 10;
pub const COLLECT_ADD_BASE: u16 = 20;
pub const COLLECT_REMOVE_BASE: u16 = 30;

// ── War panel (base + UnitKind index) ────────────────────────
pub const PREP_ADD_BASE: u16 = 40;
pub const PREP_REMOVE_BASE: u16 = 50;
pub const STRIKE_FIRST: u16 = 60;
pub const DISMISS_RESULT: u16 = 61;

// ── Upgrades ─────────────────────────────────────────────────
pub const TOGGLE_UPGRADES: u16 = 70;
pub const BUY_UPGRADE_BASE: u16 = 100; // +display index

// ── Game ─────────────────────────────────────────────────────
pub const RESET_GAME: u16 = 90;

//! Swarm upgrade list.

use crate::games::upgrade::{Reserves, UpgradeDef};

use super::data::UnitTable;
use super::logic::SwarmEngine;
use super::state::{SwarmState, UnitKind};

pub type SwarmUpgrade = UpgradeDef<SwarmState, UnitTable, SwarmEngine>;

pub const SCARAB_ARMOR: &str = "Scarab armor upgrade";
pub const AUTONOMOUS_CREATION: &str = "Autonomous Creation";
pub const HORUS_CREATION: &str = "Horus Creation";
pub const FASTER_AUTONOMOUS_CREATION: &str = "Faster Autonomous Creation";
pub const SCARAB_HUNGER: &str = "Scarab Hunger+";
pub const SCARAB_HUNGER_2: &str = "Scarab Hunger++";
pub const AUTONOMOUS_CREATION_PLUS: &str = "Autonomous Creation+";

/// Scratch counter for autonomous creation.
const TICKS_KEY: &str = "ticks";

pub fn registry() -> Vec<SwarmUpgrade> {
    vec![
        SwarmUpgrade::new(
            SCARAB_ARMOR,
            "Scarab armor doubled. Costs 100 materials and 200 power.",
        )
        .price(100.0, 200.0)
        .on_startup(|_, units| units.scarab.defense *= 2.0),
        SwarmUpgrade::new(
            AUTONOMOUS_CREATION,
            "50% chance for a Horus to make a Khopesh or Scarab every 10 seconds, \
             if materials are available. Costs 500 energy and 500 materials.",
        )
        .price(500.0, 500.0)
        .can_purchase(|s| s.materials >= 500.0 && s.power > 500.0)
        .on_loop(autonomous_creation),
        SwarmUpgrade::new(
            HORUS_CREATION,
            "Gives Autonomous Creation a 5% chance to create a Horus. \
             Costs: 1000 power and 1000 materials.",
        )
        .requires(&[AUTONOMOUS_CREATION])
        .price_shown_within(1000.0, 1000.0, 250.0),
        SwarmUpgrade::new(
            FASTER_AUTONOMOUS_CREATION,
            "Autonomous Creation runs every 5 seconds instead of every 10. \
             Costs: 1500 power and 1500 materials.",
        )
        .requires(&[AUTONOMOUS_CREATION])
        .price(1500.0, 1500.0),
        SwarmUpgrade::new(
            SCARAB_HUNGER,
            "Scarabs collect twice as much material and 1.5 as much power. \
             Costs 500 material and 500 energy.",
        )
        .price(500.0, 500.0)
        .on_startup(scarab_hunger),
        SwarmUpgrade::new(
            SCARAB_HUNGER_2,
            "Scarabs collect twice as much material and 1.5 as much power. \
             Costs 1000 material and 1000 energy.",
        )
        .price(1000.0, 1000.0)
        .on_startup(scarab_hunger),
        SwarmUpgrade::new(
            AUTONOMOUS_CREATION_PLUS,
            "Autonomous Creation creates two machines every time it runs. \
             Costs 2000 materials and 2000 energy.",
        )
        .requires(&[AUTONOMOUS_CREATION])
        .price_shown_within(2000.0, 2000.0, 500.0),
    ]
}

fn scarab_hunger(_: &mut SwarmState, units: &mut UnitTable) {
    units.scarab.collection_rate = 0.2;
    units.scarab.consume_output *= 1.5;
}

fn autonomous_creation(engine: &mut SwarmEngine, now: u64) {
    let ticks = {
        let counter = engine
            .state_mut()
            .upgrade_state
            .entry(TICKS_KEY.to_string())
            .or_insert(0);
        *counter += 1;
        *counter
    };
    let period = if engine.state().has_upgrade(FASTER_AUTONOMOUS_CREATION) {
        5
    } else {
        10
    };
    if ticks % period != 0 || engine.roll() <= 0.5 {
        return;
    }
    let times = if engine.state().has_upgrade(AUTONOMOUS_CREATION_PLUS) {
        2
    } else {
        1
    };
    for _ in 0..times {
        let mut kind = if engine.roll() > 0.5 {
            UnitKind::Scarab
        } else {
            UnitKind::Khopesh
        };
        if engine.state().has_upgrade(HORUS_CREATION) && engine.roll() > 0.95 {
            kind = UnitKind::Horus;
        }
        if engine.try_purchase(kind, 1, now) {
            tracing::debug!(?kind, "autonomous creation started a build");
        }
    }
}

//! Zero Dawn upgrade list.

use crate::games::upgrade::UpgradeDef;

use super::logic::ZeroDawnEngine;
use super::machines::MachineTable;
use super::state::ZeroDawnState;

pub type ZeroDawnUpgrade = UpgradeDef<ZeroDawnState, MachineTable, ZeroDawnEngine>;

/// Fully terraformed Earth, in km².
pub const MAX_LAND: f64 = 148_940_000.0;
/// Land at which "Humans!" starts showing up in the list.
const HUMANS_VISIBLE_LAND: f64 = 100_000_000.0;

pub const SOLAR_ARRAYS: &str = "Solar Arrays";
pub const CAULDRON_CAPACITY_1: &str = "Cauldron Capacity+";
pub const CAULDRON_CAPACITY_2: &str = "Cauldron Capacity++";
pub const CAULDRON_CAPACITY_3: &str = "Cauldron Capacity+++";
pub const CAULDRON_CAPACITY_4: &str = "Cauldron Capacity++++";
pub const EFFICIENT_HARVESTING: &str = "More Efficient Harvesting";
pub const EFFICIENT_HARVESTING_PLUS: &str = "More Efficient Harvesting+";
pub const FASTER_CAULDRONS: &str = "Faster Cauldrons";
pub const FASTER_CAULDRONS_PLUS: &str = "Faster Cauldrons+";
pub const HUMANS: &str = "Humans!";

/// Villages founded by "Humans!" and their starting population.
const FIRST_VILLAGES: usize = 9;
const FIRST_VILLAGE_POP: i64 = 500;

pub fn registry() -> Vec<ZeroDawnUpgrade> {
    vec![
        ZeroDawnUpgrade::new(
            SOLAR_ARRAYS,
            "Add solar power arrays near Cauldrons. +1 power per second per Cauldron.",
        )
        .price_shown_within(50.0, 50.0, 10.0),
        ZeroDawnUpgrade::new(
            CAULDRON_CAPACITY_1,
            "Allow each Cauldron to make two machines at a time.",
        )
        .price_shown_within(200.0, 200.0, 50.0)
        .on_purchase(|s| set_capacity(s, 2)),
        ZeroDawnUpgrade::new(
            CAULDRON_CAPACITY_2,
            "Allow each Cauldron to make three machines at a time.",
        )
        .requires(&[CAULDRON_CAPACITY_1])
        .price_shown_within(600.0, 600.0, 100.0)
        .on_purchase(|s| set_capacity(s, 3)),
        ZeroDawnUpgrade::new(
            CAULDRON_CAPACITY_3,
            "Allow each Cauldron to make four machines at a time.",
        )
        .requires(&[CAULDRON_CAPACITY_2])
        .price_shown_within(1000.0, 1000.0, 100.0)
        .on_purchase(|s| set_capacity(s, 4)),
        ZeroDawnUpgrade::new(
            CAULDRON_CAPACITY_4,
            "Allow each Cauldron to make five machines at a time.",
        )
        .requires(&[CAULDRON_CAPACITY_3])
        .price_shown_within(1000.0, 1000.0, 100.0)
        .on_purchase(|s| set_capacity(s, 5)),
        ZeroDawnUpgrade::new(
            EFFICIENT_HARVESTING,
            "Use 10% less terraformed land when harvesting power/materials.",
        )
        .price_shown_within(800.0, 800.0, 200.0)
        .on_purchase(|s| s.land_use_rate = 2.2),
        ZeroDawnUpgrade::new(
            EFFICIENT_HARVESTING_PLUS,
            "Use 20% less terraformed land when harvesting power/materials.",
        )
        .requires(&[EFFICIENT_HARVESTING])
        .price_shown_within(1400.0, 1400.0, 200.0)
        .on_purchase(|s| s.land_use_rate = 2.45),
        ZeroDawnUpgrade::new(FASTER_CAULDRONS, "Reduce machine creation time by 10%.")
            .price_shown_within(500.0, 500.0, 150.0)
            .on_startup(faster_cauldrons),
        ZeroDawnUpgrade::new(FASTER_CAULDRONS_PLUS, "Reduce machine creation time by 10%.")
            .requires(&[FASTER_CAULDRONS])
            .price_shown_within(1500.0, 1500.0, 150.0)
            .on_startup(faster_cauldrons),
        ZeroDawnUpgrade::new(
            HUMANS,
            "You've fully terraformed the Earth! Open the Cradles, and release humanity \
             back into the world. Note that terraformed land will start to decay if not \
             maintained.",
        )
        .can_purchase(|s| s.land_restored >= MAX_LAND)
        .should_display(|s| s.land_restored >= HUMANS_VISIBLE_LAND)
        .on_purchase(|s| {
            s.villages = vec![FIRST_VILLAGE_POP; FIRST_VILLAGES];
            s.humans = FIRST_VILLAGE_POP * FIRST_VILLAGES as i64;
        }),
    ]
}

fn set_capacity(state: &mut ZeroDawnState, capacity: u32) {
    for c in &mut state.cauldrons {
        c.capacity = capacity;
    }
    state.new_cauldron_capacity = capacity;
}

fn faster_cauldrons(_: &mut ZeroDawnState, table: &mut MachineTable) {
    for m in table.iter_mut() {
        m.creation_time -= 0.10 * m.creation_time;
    }
}

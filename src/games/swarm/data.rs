//! Swarm machine table.
//!
//! Built fresh for every engine; upgrade startup hooks patch it in place.

use super::state::{PerUnit, Task, UnitKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cost {
    pub materials: f64,
    pub energy: f64,
    pub construction_secs: u64,
}

/// Power drawn per machine per tick, by task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerUse {
    pub constructing: f64,
    pub consuming: f64,
    pub fighting: f64,
    pub prepped: f64,
}

impl PowerUse {
    pub fn for_task(&self, task: Task) -> f64 {
        match task {
            Task::Constructing => self.constructing,
            Task::Consuming => self.consuming,
            Task::Fighting => self.fighting,
            Task::Prepped => self.prepped,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitStats {
    pub name: &'static str,
    pub cost: Cost,
    pub force_projection: f64,
    pub defense: f64,
    /// Power gained per consuming machine per tick.
    pub consume_output: f64,
    pub power_use: PowerUse,
    /// Materials gathered per consuming machine per tick.
    pub collection_rate: f64,
}

pub type UnitTable = PerUnit<UnitStats>;

pub fn unit_stats(kind: UnitKind) -> UnitStats {
    match kind {
        UnitKind::Horus => UnitStats {
            name: "BOR-7 Horus",
            cost: Cost {
                materials: 200.0,
                energy: 150.0,
                construction_secs: 10,
            },
            force_projection: 35.0,
            defense: 20.0,
            consume_output: 0.0,
            power_use: PowerUse {
                constructing: 1.5,
                consuming: 0.0,
                fighting: 2.0,
                prepped: 0.0,
            },
            collection_rate: 0.0,
        },
        UnitKind::Khopesh => UnitStats {
            name: "FSP5 Khopesh",
            cost: Cost {
                materials: 20.0,
                energy: 10.0,
                construction_secs: 3,
            },
            force_projection: 7.0,
            defense: 3.0,
            consume_output: 0.1,
            power_use: PowerUse {
                constructing: 0.0,
                consuming: 0.3,
                fighting: 1.0,
                prepped: 0.0,
            },
            collection_rate: 0.0,
        },
        UnitKind::Scarab => UnitStats {
            name: "ACA3 Scarab",
            cost: Cost {
                materials: 10.0,
                energy: 5.0,
                construction_secs: 2,
            },
            force_projection: 1.0,
            defense: 2.0,
            consume_output: 0.25,
            power_use: PowerUse {
                constructing: 0.0,
                consuming: 0.05,
                fighting: 0.5,
                prepped: 0.0,
            },
            collection_rate: 0.1,
        },
    }
}

pub fn unit_table() -> UnitTable {
    PerUnit {
        horus: unit_stats(UnitKind::Horus),
        khopesh: unit_stats(UnitKind::Khopesh),
        scarab: unit_stats(UnitKind::Scarab),
    }
}

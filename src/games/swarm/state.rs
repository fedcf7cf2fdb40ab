//! Swarm state types (serialized as-is into the save record).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::games::upgrade::Reserves;

/// Machine kinds, highest tier first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Horus,
    Khopesh,
    Scarab,
}

impl UnitKind {
    pub const ALL: [UnitKind; 3] = [UnitKind::Horus, UnitKind::Khopesh, UnitKind::Scarab];

    /// Kinds that can be assigned to collect power.
    pub const COLLECTORS: [UnitKind; 2] = [UnitKind::Khopesh, UnitKind::Scarab];

    pub fn index(self) -> usize {
        match self {
            UnitKind::Horus => 0,
            UnitKind::Khopesh => 1,
            UnitKind::Scarab => 2,
        }
    }

    pub fn from_index(idx: usize) -> Option<UnitKind> {
        Self::ALL.get(idx).copied()
    }
}

/// What a committed machine is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Constructing,
    Consuming,
    Fighting,
    Prepped,
}

/// One value per machine kind. Kinds missing from a record take the default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct PerUnit<T> {
    pub horus: T,
    pub khopesh: T,
    pub scarab: T,
}

impl<T> PerUnit<T> {
    pub fn get(&self, kind: UnitKind) -> &T {
        match kind {
            UnitKind::Horus => &self.horus,
            UnitKind::Khopesh => &self.khopesh,
            UnitKind::Scarab => &self.scarab,
        }
    }

    pub fn get_mut(&mut self, kind: UnitKind) -> &mut T {
        match kind {
            UnitKind::Horus => &mut self.horus,
            UnitKind::Khopesh => &mut self.khopesh,
            UnitKind::Scarab => &mut self.scarab,
        }
    }
}

impl PerUnit<u32> {
    pub fn total(&self) -> u32 {
        self.horus + self.khopesh + self.scarab
    }
}

/// Outcome of one resolved battle, kept until dismissed or the next attack.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BattleResult {
    pub losses: PerUnit<u32>,
    pub original_enemy: i64,
    pub original_force: PerUnit<u32>,
    pub enemy_force: i64,
    pub total_losses: u32,
    pub at: u64,
}

impl BattleResult {
    /// Share of the enemy force that survived, in percent.
    pub fn enemy_left_percent(&self) -> f64 {
        if self.original_enemy <= 0 {
            return 0.0;
        }
        self.enemy_force as f64 / self.original_enemy as f64 * 100.0
    }
}

/// Encounter timers. `waiting == 0` means no attack is pending; `last == 0`
/// means no battle has been fought yet.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleState {
    pub last: u64,
    pub waiting: u64,
    pub force: i64,
    pub result: Option<BattleResult>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwarmState {
    pub materials: f64,
    pub power: f64,
    pub total_harvest: f64,
    /// Humanity has noticed the swarm (set when a second Horus completes).
    pub noticed: bool,
    pub machines: PerUnit<u32>,
    pub busy: PerUnit<Vec<Task>>,
    /// Construction start timestamps (ms), oldest first.
    pub constructing: PerUnit<Vec<u64>>,
    pub battle: BattleState,
    pub upgrades: Vec<String>,
    /// Counters owned by upgrade hooks.
    pub upgrade_state: BTreeMap<String, u64>,
}

impl Default for SwarmState {
    fn default() -> Self {
        Self {
            materials: 100.0,
            power: 100.0,
            total_harvest: 0.0,
            noticed: false,
            machines: PerUnit {
                horus: 1,
                khopesh: 0,
                scarab: 0,
            },
            busy: PerUnit::default(),
            constructing: PerUnit::default(),
            battle: BattleState::default(),
            upgrades: Vec::new(),
            upgrade_state: BTreeMap::new(),
        }
    }
}

impl SwarmState {
    pub fn count_busy(&self, kind: UnitKind, task: Task) -> usize {
        self.busy.get(kind).iter().filter(|t| **t == task).count()
    }

    /// Machines of `kind` with no task.
    pub fn idle(&self, kind: UnitKind) -> u32 {
        self.machines
            .get(kind)
            .saturating_sub(self.busy.get(kind).len() as u32)
    }

    pub fn pending_constructions(&self) -> usize {
        UnitKind::ALL
            .iter()
            .map(|k| self.constructing.get(*k).len())
            .sum()
    }
}

impl Reserves for SwarmState {
    fn materials(&self) -> f64 {
        self.materials
    }

    fn power(&self) -> f64 {
        self.power
    }

    fn applied_upgrades(&self) -> &[String] {
        &self.upgrades
    }

    fn record_upgrade(&mut self, name: &str) {
        self.upgrades.push(name.to_string());
    }

    fn spend(&mut self, materials: f64, energy: f64) {
        self.materials -= materials;
        self.power -= energy;
    }
}

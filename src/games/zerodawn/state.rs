//! Zero Dawn state types (serialized as-is into the save record).

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::games::upgrade::Reserves;

/// Every machine design, grouped by type in table order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineId {
    // acquisition
    Grazer,
    Lancehorn,
    Spikesnout,
    Plowhorn,
    Bristleback,
    Fanghorn,
    Widemaw,
    Clamberjaw,
    Sunwing,
    Tideripper,
    Fireclaw,
    Frostclaw,
    Charger,
    Scrapper,
    Glinthawk,
    Snapmaw,
    Rockbreaker,
    // recon
    Watcher,
    Burrower,
    Skydrifter,
    Longleg,
    Tallneck,
    // transport
    Leaplasher,
    Rollerback,
    Bellowback,
    Shellwalker,
    Behemoth,
    // combat
    Clawstrider,
}

impl MachineId {
    pub const ALL: [MachineId; 28] = [
        MachineId::Grazer,
        MachineId::Lancehorn,
        MachineId::Spikesnout,
        MachineId::Plowhorn,
        MachineId::Bristleback,
        MachineId::Fanghorn,
        MachineId::Widemaw,
        MachineId::Clamberjaw,
        MachineId::Sunwing,
        MachineId::Tideripper,
        MachineId::Fireclaw,
        MachineId::Frostclaw,
        MachineId::Charger,
        MachineId::Scrapper,
        MachineId::Glinthawk,
        MachineId::Snapmaw,
        MachineId::Rockbreaker,
        MachineId::Watcher,
        MachineId::Burrower,
        MachineId::Skydrifter,
        MachineId::Longleg,
        MachineId::Tallneck,
        MachineId::Leaplasher,
        MachineId::Rollerback,
        MachineId::Bellowback,
        MachineId::Shellwalker,
        MachineId::Behemoth,
        MachineId::Clawstrider,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MachineType {
    Acquisition,
    Combat,
    Recon,
    Transport,
}

impl MachineType {
    pub const ALL: [MachineType; 4] = [
        MachineType::Acquisition,
        MachineType::Combat,
        MachineType::Recon,
        MachineType::Transport,
    ];

    /// Tasks a player may assign to machines of this type.
    pub fn tasks(self) -> &'static [Task] {
        match self {
            MachineType::Acquisition => &[Task::Collecting, Task::Terraforming],
            MachineType::Combat => &[Task::Defense],
            MachineType::Recon => &[Task::Recon],
            MachineType::Transport => &[Task::Transport],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MachineType::Acquisition => "Acquisition",
            MachineType::Combat => "Combat",
            MachineType::Recon => "Recon",
            MachineType::Transport => "Transport",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Collecting,
    Terraforming,
    Defense,
    Recon,
    Transport,
    /// Set by the engine while a transport is in flight.
    Transporting,
}

impl Task {
    pub fn label(self) -> &'static str {
        match self {
            Task::Collecting => "Collecting",
            Task::Terraforming => "Terraforming",
            Task::Defense => "Defense",
            Task::Recon => "Recon",
            Task::Transport => "Transport",
            Task::Transporting => "Transporting",
        }
    }
}

/// Cauldrons in purchase order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CauldronName {
    Alpha,
    Beta,
    Gamma,
    Delta,
    Epsilon,
    Zeta,
    Eta,
    Theta,
    Iota,
    Kappa,
    Lambda,
    Mu,
    Nu,
    Xi,
    Omicron,
    Pi,
    Rho,
    Sigma,
    Tau,
    Upsilon,
    Phi,
    Chi,
    Psi,
    Omega,
}

impl CauldronName {
    pub const ALL: [CauldronName; 24] = [
        CauldronName::Alpha,
        CauldronName::Beta,
        CauldronName::Gamma,
        CauldronName::Delta,
        CauldronName::Epsilon,
        CauldronName::Zeta,
        CauldronName::Eta,
        CauldronName::Theta,
        CauldronName::Iota,
        CauldronName::Kappa,
        CauldronName::Lambda,
        CauldronName::Mu,
        CauldronName::Nu,
        CauldronName::Xi,
        CauldronName::Omicron,
        CauldronName::Pi,
        CauldronName::Rho,
        CauldronName::Sigma,
        CauldronName::Tau,
        CauldronName::Upsilon,
        CauldronName::Phi,
        CauldronName::Chi,
        CauldronName::Psi,
        CauldronName::Omega,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// `null` in a saved record reads as the empty/default value.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A construction site with its own material stock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cauldron {
    pub name: CauldronName,
    /// Machines being built and their start timestamps (ms).
    #[serde(default, deserialize_with = "null_as_default")]
    pub busy: Vec<(MachineId, u64)>,
    pub capacity: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub materials: f64,
}

impl Cauldron {
    pub fn new(name: CauldronName, capacity: u32, materials: f64) -> Self {
        Self {
            name,
            busy: Vec::new(),
            capacity,
            materials,
        }
    }

    pub fn free_slots(&self) -> u32 {
        self.capacity.saturating_sub(self.busy.len() as u32)
    }
}

/// Materials in flight from the main reserve to a cauldron.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "TransportRecord", into = "TransportRecord")]
pub struct Transport {
    pub machine: MachineId,
    pub destination: CauldronName,
    /// ms
    pub started: u64,
    pub amount: f64,
    pub source: String,
}

/// Wire shape: `[machine, {name, ..}, started, amount, source]`.
#[derive(Clone, Serialize, Deserialize)]
struct TransportRecord(MachineId, CauldronRef, u64, f64, String);

#[derive(Clone, Serialize, Deserialize)]
struct CauldronRef {
    name: CauldronName,
}

impl From<TransportRecord> for Transport {
    fn from(r: TransportRecord) -> Self {
        Self {
            machine: r.0,
            destination: r.1.name,
            started: r.2,
            amount: r.3,
            source: r.4,
        }
    }
}

impl From<Transport> for TransportRecord {
    fn from(t: Transport) -> Self {
        TransportRecord(
            t.machine,
            CauldronRef {
                name: t.destination,
            },
            t.started,
            t.amount,
            t.source,
        )
    }
}

/// Acquisition boost found by a recon machine.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Buff {
    pub machine: MachineId,
    /// When the buff was found (ms).
    #[serde(rename = "time")]
    pub started: u64,
    /// Collector runs left before it wears off.
    #[serde(rename = "count")]
    pub remaining: u32,
}

/// What the last completed tick did, for the stats panel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickReport {
    pub energy: f64,
    pub materials: f64,
    pub power_spent: f64,
    pub land_used: f64,
    pub restored: f64,
    pub buff: Option<MachineId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroDawnState {
    /// Unallocated (main reserve) materials.
    pub materials: f64,
    pub land_restored: f64,
    pub tutorial_open: bool,
    pub cauldrons: Vec<Cauldron>,
    pub new_cauldron_capacity: u32,
    /// Main reserve plus every cauldron's stock.
    pub total_available_materials: f64,
    pub land_use_rate: f64,
    pub power: f64,
    #[serde(rename = "lastTickConsumption")]
    pub last_tick: TickReport,
    pub busy: BTreeMap<MachineId, Vec<Task>>,
    pub machines: BTreeMap<MachineId, u32>,
    pub upgrades: Vec<String>,
    pub transports: Vec<Transport>,
    pub current_buff: Option<Buff>,
    pub humans: i64,
    pub villages: Vec<i64>,
}

impl Default for ZeroDawnState {
    fn default() -> Self {
        Self {
            materials: 100.0,
            land_restored: 0.0,
            tutorial_open: true,
            cauldrons: vec![Cauldron::new(CauldronName::Alpha, 1, 100.0)],
            new_cauldron_capacity: 1,
            total_available_materials: 200.0,
            land_use_rate: 2.0,
            power: 100.0,
            last_tick: TickReport::default(),
            busy: BTreeMap::new(),
            machines: BTreeMap::from([
                (MachineId::Grazer, 1),
                (MachineId::Leaplasher, 1),
                (MachineId::Watcher, 1),
            ]),
            upgrades: Vec::new(),
            transports: Vec::new(),
            current_buff: None,
            humans: 0,
            villages: Vec::new(),
        }
    }
}

impl ZeroDawnState {
    pub fn count(&self, id: MachineId) -> u32 {
        self.machines.get(&id).copied().unwrap_or(0)
    }

    pub fn busy(&self, id: MachineId) -> &[Task] {
        self.busy.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn count_busy(&self, id: MachineId, task: Task) -> usize {
        self.busy(id).iter().filter(|t| **t == task).count()
    }

    pub fn idle(&self, id: MachineId) -> u32 {
        self.count(id).saturating_sub(self.busy(id).len() as u32)
    }

    pub fn cauldron(&self, name: CauldronName) -> Option<&Cauldron> {
        self.cauldrons.iter().find(|c| c.name == name)
    }

    pub fn cauldron_mut(&mut self, name: CauldronName) -> Option<&mut Cauldron> {
        self.cauldrons.iter_mut().find(|c| c.name == name)
    }

    pub fn has_cauldron(&self, name: CauldronName) -> bool {
        self.cauldron(name).is_some()
    }
}

impl Reserves for ZeroDawnState {
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
        self.power -= energy;
        self.materials -= materials;
        self.total_available_materials -= materials;
    }
}

//! Zero Dawn simulation engine.
//!
//! Same shape as the Swarm engine: `ZeroDawnEngine` owns the state, the
//! machine table and the upgrade registry, takes the wall-clock timestamp
//! (ms) on every operation and saves after every mutation.

use crate::games::persist::Store;
use crate::games::random::RandomSource;
use crate::games::upgrade::{self, DisplayRule, Reserves};

use super::machines::{cauldron_cost, machine_table, unlocked_by, MachineTable, Role};
use super::save;
use super::state::{
    Buff, Cauldron, CauldronName, MachineId, MachineType, Task, TickReport, Transport,
    ZeroDawnState,
};
use super::upgrades::{registry, ZeroDawnUpgrade, MAX_LAND, SOLAR_ARRAYS};

/// Upper bound of the random land decay per tick once the Earth is restored.
const LAND_DECAY_MAX: f64 = 50_000.0;
const SOLAR_POWER_PER_CAULDRON: f64 = 1.0;
const DEATH_RATE: f64 = 20.0 / 1000.0;
const BIRTH_RATE: f64 = 27.0 / 1000.0;
/// A village splits when a draw exceeds this.
const SPLIT_THRESHOLD: f64 = 0.995;
const SPLIT_MIN_POP: i64 = 50;
const MAX_VILLAGES: usize = 500;
const MAIN_RESERVE: &str = "main reserve";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// The intro panel is open; nothing moved.
    Paused,
    Advanced,
}

/// Result of sending materials to a cauldron.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransferOutcome {
    /// Everything is on its way.
    Dispatched { flights: usize, sent: f64 },
    /// Part of the request stayed in the main reserve.
    Short {
        flights: usize,
        sent: f64,
        unsent: f64,
        cause: Shortfall,
    },
    /// Unknown cauldron or a non-positive amount.
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shortfall {
    NoFreeTransport,
    ReserveEmpty,
}

/// Things worth telling the player about, drained by the game wrapper.
#[derive(Clone, Debug, PartialEq)]
pub enum ZeroDawnEvent {
    Constructed(MachineId),
    TransportArrived {
        machine: MachineId,
        cauldron: CauldronName,
        amount: f64,
    },
    BuffFound(MachineId),
    CauldronBuilt(CauldronName),
    UpgradePurchased(&'static str),
    /// Power hit zero and production stopped early this tick.
    PowerDepleted,
}

pub struct ZeroDawnEngine {
    state: ZeroDawnState,
    machines: MachineTable,
    registry: Vec<ZeroDawnUpgrade>,
    rng: Box<dyn RandomSource>,
    store: Box<dyn Store>,
    events: Vec<ZeroDawnEvent>,
}

impl ZeroDawnEngine {
    /// Load the saved game (or defaults) and replay upgrade startup hooks.
    pub fn load(store: Box<dyn Store>, rng: Box<dyn RandomSource>) -> Self {
        let state = save::load_state(store.as_ref());
        Self::with_state(state, store, rng)
    }

    fn with_state(
        state: ZeroDawnState,
        store: Box<dyn Store>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let mut engine = Self {
            state,
            machines: machine_table(),
            registry: registry(),
            rng,
            store,
            events: Vec::new(),
        };
        upgrade::replay_startup(&engine.registry, &mut engine.state, &mut engine.machines);
        engine
    }

    pub fn state(&self) -> &ZeroDawnState {
        &self.state
    }

    pub fn machines(&self) -> &MachineTable {
        &self.machines
    }

    pub fn registry(&self) -> &[ZeroDawnUpgrade] {
        &self.registry
    }

    pub fn drain_events(&mut self) -> Vec<ZeroDawnEvent> {
        std::mem::take(&mut self.events)
    }

    fn save(&mut self) {
        save::save_state(self.store.as_mut(), &self.state);
    }

    // ── Tutorial ──────────────────────────────────────────────

    pub fn close_tutorial(&mut self) -> bool {
        if !self.state.tutorial_open {
            return false;
        }
        self.state.tutorial_open = false;
        self.save();
        true
    }

    pub fn open_tutorial(&mut self) -> bool {
        if self.state.tutorial_open {
            return false;
        }
        self.state.tutorial_open = true;
        self.save();
        true
    }

    // ── Machine purchase ──────────────────────────────────────

    /// The cauldron that unlocks the design is owned.
    pub fn purchase_unlocked(&self, id: MachineId) -> bool {
        self.state.has_cauldron(unlocked_by(id))
    }

    /// Unlocked designs of one type, most-owned first, unowned last.
    pub fn purchasable_machines(&self, ty: MachineType) -> Vec<MachineId> {
        let mut list: Vec<MachineId> = MachineId::ALL
            .into_iter()
            .filter(|id| self.machines.get(*id).machine_type() == ty)
            .filter(|id| self.purchase_unlocked(*id))
            .collect();
        list.sort_by_key(|id| match self.state.count(*id) {
            0 => u32::MAX,
            n => u32::MAX - n,
        });
        list
    }

    /// Pick a cauldron per unit, first fit, without touching state.
    fn plan_builds(&self, id: MachineId, count: u32) -> Option<Vec<usize>> {
        let cost = self.machines.get(id).cost;
        let mut slots: Vec<(u32, f64)> = self
            .state
            .cauldrons
            .iter()
            .map(|c| (c.free_slots(), c.materials))
            .collect();
        let mut plan = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let idx = slots
                .iter()
                .position(|(free, mats)| *free > 0 && *mats >= cost.materials)?;
            slots[idx].0 -= 1;
            slots[idx].1 -= cost.materials;
            plan.push(idx);
        }
        Some(plan)
    }

    /// Enough power, enough free cauldron slots and cauldron materials.
    pub fn can_purchase(&self, id: MachineId, count: u32) -> bool {
        let cost = self.machines.get(id).cost;
        let n = count as f64;
        if count == 0 || !self.purchase_unlocked(id) || self.state.power < cost.energy * n {
            return false;
        }
        let (open_slots, open_materials) = self
            .state
            .cauldrons
            .iter()
            .fold((0u32, 0.0), |(slots, mats), c| {
                (slots + c.free_slots(), mats + c.materials)
            });
        open_slots >= count
            && open_materials >= cost.materials * n
            && self.plan_builds(id, count).is_some()
    }

    pub fn try_purchase(&mut self, id: MachineId, count: u32, now: u64) -> bool {
        if !self.can_purchase(id, count) {
            return false;
        }
        let Some(plan) = self.plan_builds(id, count) else {
            return false;
        };
        let cost = self.machines.get(id).cost;
        for idx in plan {
            let cauldron = &mut self.state.cauldrons[idx];
            cauldron.materials -= cost.materials;
            cauldron.busy.push((id, now));
            self.state.power -= cost.energy;
            self.state.total_available_materials -= cost.materials;
        }
        self.save();
        true
    }

    pub fn can_break_down(&self, id: MachineId) -> bool {
        self.state.idle(id) > 0
    }

    /// Scrap an idle machine: full materials back, half the energy.
    pub fn break_down(&mut self, id: MachineId) -> bool {
        if !self.can_break_down(id) {
            return false;
        }
        let cost = self.machines.get(id).cost;
        self.state.materials += cost.materials;
        self.state.total_available_materials += cost.materials;
        self.state.power += cost.energy / 2.0;
        if let Some(n) = self.state.machines.get_mut(&id) {
            *n -= 1;
        }
        self.save();
        true
    }

    // ── Task assignment ───────────────────────────────────────

    /// Put an idle machine on one of its type's tasks.
    pub fn set_busy(&mut self, id: MachineId, task: Task) -> bool {
        let ty = self.machines.get(id).machine_type();
        if !ty.tasks().contains(&task) || self.state.idle(id) == 0 {
            return false;
        }
        self.state.busy.entry(id).or_default().push(task);
        self.save();
        true
    }

    /// Take one machine off `task`. Refuses `Transporting` while that
    /// machine has a transport in flight.
    pub fn remove_busy(&mut self, id: MachineId, task: Task) -> bool {
        if task == Task::Transporting && self.state.transports.iter().any(|t| t.machine == id) {
            return false;
        }
        if !Self::force_remove_busy(&mut self.state, id, task) {
            return false;
        }
        self.save();
        true
    }

    fn force_remove_busy(state: &mut ZeroDawnState, id: MachineId, task: Task) -> bool {
        let Some(busy) = state.busy.get_mut(&id) else {
            return false;
        };
        match busy.iter().position(|t| *t == task) {
            Some(idx) => {
                busy.remove(idx);
                true
            }
            None => false,
        }
    }

    // ── Cauldrons ─────────────────────────────────────────────

    pub fn next_cauldron(&self) -> Option<CauldronName> {
        CauldronName::ALL
            .into_iter()
            .find(|name| !self.state.has_cauldron(*name))
    }

    pub fn can_purchase_cauldron(&self) -> bool {
        self.next_cauldron().is_some_and(|name| {
            let cost = cauldron_cost(name);
            self.state.materials >= cost && self.state.power >= cost
        })
    }

    /// Buy the next cauldron in order. It starts empty.
    pub fn purchase_cauldron(&mut self) -> Option<CauldronName> {
        if !self.can_purchase_cauldron() {
            return None;
        }
        let name = self.next_cauldron()?;
        let cost = cauldron_cost(name);
        self.state.materials -= cost;
        self.state.total_available_materials -= cost;
        self.state.power -= cost;
        let capacity = self.state.new_cauldron_capacity;
        self.state.cauldrons.push(Cauldron::new(name, capacity, 0.0));
        tracing::info!(cauldron = ?name, "cauldron built");
        self.events.push(ZeroDawnEvent::CauldronBuilt(name));
        self.save();
        Some(name)
    }

    // ── Material transfers ────────────────────────────────────

    /// The free transport machine with the largest capacity.
    /// Largest idle carrier; equal capacities go to the earlier design.
    fn free_transport(&self) -> Option<(MachineId, f64)> {
        MachineId::ALL
            .into_iter()
            .filter_map(|id| self.machines.get(id).carrying_capacity().map(|cap| (id, cap)))
            .filter(|(id, _)| self.state.idle(*id) > 0)
            .min_by(|a, b| b.1.total_cmp(&a.1))
    }

    /// Ship `amount` from the main reserve to `destination`, one flight per
    /// free transport machine, biggest carriers first.
    pub fn send_materials(
        &mut self,
        destination: CauldronName,
        amount: f64,
        now: u64,
    ) -> TransferOutcome {
        if !(amount > 0.0) || !self.state.has_cauldron(destination) {
            return TransferOutcome::Rejected;
        }
        let mut remaining = amount.min(self.state.materials.max(0.0));
        let mut sent = 0.0;
        let mut flights = 0;
        let mut cause = (amount > remaining).then_some(Shortfall::ReserveEmpty);

        while remaining > 0.0 {
            let Some((machine, capacity)) = self.free_transport() else {
                cause = Some(Shortfall::NoFreeTransport);
                break;
            };
            let load = remaining.min(capacity);
            remaining -= load;
            sent += load;
            flights += 1;
            self.state.materials -= load;
            self.state.transports.push(Transport {
                machine,
                destination,
                started: now,
                amount: load,
                source: MAIN_RESERVE.to_string(),
            });
            self.state.busy.entry(machine).or_default().push(Task::Transporting);
        }

        if flights > 0 {
            tracing::debug!(?destination, sent, flights, "transports dispatched");
            self.save();
        }
        match cause {
            None => TransferOutcome::Dispatched { flights, sent },
            Some(cause) => TransferOutcome::Short {
                flights,
                sent,
                unsent: amount - sent,
                cause,
            },
        }
    }

    /// Move materials from a cauldron back into the main reserve.
    pub fn withdraw_materials(&mut self, from: CauldronName, amount: f64) -> bool {
        if !(amount > 0.0) {
            return false;
        }
        let Some(cauldron) = self.state.cauldron_mut(from) else {
            return false;
        };
        if cauldron.materials < amount {
            return false;
        }
        cauldron.materials -= amount;
        self.state.materials += amount;
        self.save();
        true
    }

    // ── Tick ──────────────────────────────────────────────────

    pub fn tick(&mut self, now: u64) -> TickOutcome {
        if self.state.tutorial_open {
            return TickOutcome::Paused;
        }
        let mut report = TickReport::default();

        if self.state.land_restored >= MAX_LAND {
            self.state.land_restored -= self.rng.next_f64() * LAND_DECAY_MAX;
        }
        if self.state.has_upgrade(SOLAR_ARRAYS) {
            let gain = self.state.cauldrons.len() as f64 * SOLAR_POWER_PER_CAULDRON;
            self.state.power += gain;
            report.energy += gain;
        }

        self.scout(now, &mut report);
        if !self.acquire(now, &mut report) {
            self.events.push(ZeroDawnEvent::PowerDepleted);
        }
        self.resolve_transports(now, &mut report);
        self.resolve_constructions(now);

        for hook in upgrade::loop_hooks(&self.registry, &self.state) {
            hook(self, now);
        }

        self.grow_villages(&report);

        report.buff = self.state.current_buff.map(|b| b.machine);
        self.state.last_tick = report;
        self.save();
        TickOutcome::Advanced
    }

    /// Recon machines look for rich land. A weaker find never replaces a
    /// stronger active buff.
    fn scout(&mut self, now: u64, report: &mut TickReport) {
        for id in MachineId::ALL {
            let stats = self.machines.get(id);
            let Role::Recon {
                location_chance,
                buff_multiplier,
                buff_range,
                ..
            } = stats.role
            else {
                continue;
            };
            let consumption = stats.power_consumption;
            for _ in 0..self.state.count_busy(id, Task::Recon) {
                if location_chance > self.rng.next_f64() {
                    if let Some(active) = self.state.current_buff {
                        if self.buff_multiplier(active.machine) > buff_multiplier {
                            continue;
                        }
                    }
                    if self.state.current_buff.map(|b| b.machine) != Some(id) {
                        self.events.push(ZeroDawnEvent::BuffFound(id));
                    }
                    self.state.current_buff = Some(Buff {
                        machine: id,
                        started: now,
                        remaining: buff_range,
                    });
                }
                self.state.power -= consumption;
                report.power_spent += consumption;
            }
        }
    }

    fn buff_multiplier(&self, id: MachineId) -> f64 {
        match self.machines.get(id).role {
            Role::Recon {
                buff_multiplier, ..
            } => buff_multiplier,
            _ => 1.0,
        }
    }

    /// Multiplier for one collector run; uses up one charge of the buff.
    fn take_buff(&mut self, now: u64) -> f64 {
        let Some(buff) = self.state.current_buff else {
            return 1.0;
        };
        let Role::Recon {
            buff_duration,
            buff_multiplier,
            ..
        } = self.machines.get(buff.machine).role
        else {
            return 1.0;
        };
        let expired = now.saturating_sub(buff.started) as f64 > buff_duration * 1000.0;
        if expired || buff.remaining == 0 {
            self.state.current_buff = None;
            return 1.0;
        }
        if let Some(b) = self.state.current_buff.as_mut() {
            b.remaining -= 1;
        }
        buff_multiplier
    }

    /// Terraforming and collecting. Returns false when power ran dry and the
    /// rest of the production loop was skipped.
    fn acquire(&mut self, now: u64, report: &mut TickReport) -> bool {
        for id in MachineId::ALL {
            let stats = self.machines.get(id);
            let Role::Acquisition {
                output_power,
                output_materials,
                restore_rate,
            } = stats.role
            else {
                continue;
            };
            let consumption = stats.power_consumption;

            for _ in 0..self.state.count_busy(id, Task::Terraforming) {
                report.restored += restore_rate;
                self.state.land_restored += restore_rate;
                self.state.power -= consumption;
                report.power_spent += consumption;
                if self.state.power < 0.0 {
                    self.state.power = 0.0;
                    return false;
                }
            }

            let collecting = self.state.count_busy(id, Task::Collecting);
            if collecting == 0 || self.state.land_restored <= 0.0 {
                continue;
            }
            for _ in 0..collecting {
                if self.state.land_restored < 0.0 {
                    self.state.land_restored = 0.0;
                    break;
                }
                let land = output_power / self.state.land_use_rate;
                let materials = output_materials * self.take_buff(now);
                report.land_used += land;
                report.materials += materials;
                report.energy += output_power;
                report.power_spent += consumption;

                self.state.land_restored -= land;
                self.state.power += output_power;
                self.state.materials += materials;
                self.state.total_available_materials += materials;
                self.state.power -= consumption;
                if self.state.power < 0.0 {
                    self.state.power = 0.0;
                    return false;
                }
            }
        }
        true
    }

    /// Land arrived transports; those still on the road draw power.
    fn resolve_transports(&mut self, now: u64, report: &mut TickReport) {
        let mut pending = Vec::new();
        for t in std::mem::take(&mut self.state.transports) {
            let stats = self.machines.get(t.machine);
            let Role::Transport {
                transport_speed, ..
            } = stats.role
            else {
                pending.push(t);
                continue;
            };
            let arrives = t.started as f64 + transport_speed * 1000.0;
            if now as f64 > arrives {
                let Some(cauldron) = self.state.cauldron_mut(t.destination) else {
                    pending.push(t);
                    continue;
                };
                cauldron.materials += t.amount;
                Self::force_remove_busy(&mut self.state, t.machine, Task::Transporting);
                tracing::debug!(machine = ?t.machine, cauldron = ?t.destination, amount = t.amount, "transport arrived");
                self.events.push(ZeroDawnEvent::TransportArrived {
                    machine: t.machine,
                    cauldron: t.destination,
                    amount: t.amount,
                });
            } else {
                self.state.power -= stats.power_consumption;
                report.power_spent += stats.power_consumption;
                pending.push(t);
            }
        }
        self.state.transports = pending;
    }

    fn resolve_constructions(&mut self, now: u64) {
        let machines = &self.machines;
        let mut finished = Vec::new();
        for cauldron in &mut self.state.cauldrons {
            cauldron.busy.retain(|(id, start)| {
                let done = *start as f64 + machines.get(*id).creation_time * 1000.0;
                if done <= now as f64 {
                    finished.push(*id);
                    false
                } else {
                    true
                }
            });
        }
        for id in finished {
            *self.state.machines.entry(id).or_insert(0) += 1;
            tracing::debug!(machine = ?id, "construction finished");
            self.events.push(ZeroDawnEvent::Constructed(id));
        }
    }

    /// Village births, deaths and splits, driven by this tick's land use.
    fn grow_villages(&mut self, report: &TickReport) {
        if self.state.humans == 0 {
            return;
        }
        let villages = std::mem::take(&mut self.state.villages);
        let mut live = villages.len();
        let mut kept = Vec::with_capacity(villages.len());
        let mut founded = Vec::new();
        for mut pop in villages {
            let deaths = self.rng.next_f64() * (pop as f64 * DEATH_RATE + report.land_used);
            pop -= deaths.round() as i64;
            let births = self.rng.next_f64() * (pop as f64 * BIRTH_RATE + report.restored);
            pop += births.round() as i64;

            if self.rng.next_f64() > SPLIT_THRESHOLD && pop > SPLIT_MIN_POP && live < MAX_VILLAGES
            {
                founded.push((pop as f64 / 2.0).round() as i64);
                pop /= 2;
                live += 1;
            }
            if pop > 0 {
                kept.push(pop);
            } else {
                live -= 1;
            }
        }
        kept.extend(founded);
        self.state.humans = kept.iter().sum();
        self.state.villages = kept;
    }

    // ── Upgrades ──────────────────────────────────────────────

    pub fn purchase_upgrade(&mut self, name: &str) -> bool {
        let bought =
            upgrade::purchase(&self.registry, name, &mut self.state, &mut self.machines);
        if bought {
            if let Some(def) = upgrade::find(&self.registry, name) {
                self.events.push(ZeroDawnEvent::UpgradePurchased(def.name));
            }
            self.save();
        }
        bought
    }

    pub fn upgrade_purchasable(&self, def: &ZeroDawnUpgrade) -> bool {
        upgrade::can_purchase(def, &self.state)
    }

    /// Upgrades close enough to afford, most expensive first, unpriced last.
    pub fn listed_upgrades(&self) -> Vec<&ZeroDawnUpgrade> {
        let mut listed: Vec<&ZeroDawnUpgrade> = self
            .registry
            .iter()
            .filter(|&u| upgrade::should_display(u, &self.state, DisplayRule::AtThreshold))
            .collect();
        listed.sort_by(|a, b| {
            let key = |u: &ZeroDawnUpgrade| {
                u.price
                    .map_or(f64::INFINITY, |p| -(p.energy + p.materials))
            };
            key(a).total_cmp(&key(b))
        });
        listed
    }

    // ── Reset ─────────────────────────────────────────────────

    /// Start over from defaults with a fresh machine table.
    pub fn reset(&mut self) {
        self.state = ZeroDawnState::default();
        self.machines = machine_table();
        self.events.clear();
        tracing::info!("zero dawn reset");
        self.save();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::persist::MemoryStore;
    use crate::games::random::{ScriptedRandom, SeededRandom};
    use crate::games::zerodawn::upgrades::{EFFICIENT_HARVESTING, HUMANS};
    use proptest::prelude::*;

    fn engine_with(state: ZeroDawnState, draws: &[f64]) -> ZeroDawnEngine {
        ZeroDawnEngine::with_state(
            state,
            Box::new(MemoryStore::new()),
            Box::new(ScriptedRandom::new(draws)),
        )
    }

    /// Tutorial closed, nothing assigned.
    fn started() -> ZeroDawnState {
        ZeroDawnState {
            tutorial_open: false,
            ..ZeroDawnState::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn tutorial_pauses_the_simulation() {
        let mut state = ZeroDawnState::default();
        state.busy.insert(MachineId::Grazer, vec![Task::Terraforming]);
        let mut e = engine_with(state, &[0.0]);
        assert_eq!(e.tick(1_000), TickOutcome::Paused);
        assert_eq!(e.state().land_restored, 0.0);
        assert!(e.close_tutorial());
        assert_eq!(e.tick(2_000), TickOutcome::Advanced);
        assert!(approx(e.state().land_restored, 0.25));
        assert!(!e.close_tutorial());
    }

    #[test]
    fn grazer_purchase_draws_on_cauldron() {
        let mut e = engine_with(started(), &[0.0]);
        assert!(e.try_purchase(MachineId::Grazer, 1, 1_000));
        let s = e.state();
        assert!(approx(s.power, 90.0));
        assert!(approx(s.cauldrons[0].materials, 90.0));
        assert!(approx(s.total_available_materials, 190.0));
        // main reserve is untouched
        assert!(approx(s.materials, 100.0));
        assert_eq!(s.cauldrons[0].busy, vec![(MachineId::Grazer, 1_000)]);

        // capacity 1: a second build has nowhere to go
        let before = e.state().clone();
        assert!(!e.try_purchase(MachineId::Grazer, 1, 1_000));
        assert_eq!(e.state(), &before);

        e.tick(1_999);
        assert_eq!(e.state().count(MachineId::Grazer), 1);
        e.tick(2_000);
        assert_eq!(e.state().count(MachineId::Grazer), 2);
        assert!(e.state().cauldrons[0].busy.is_empty());
        assert!(e.drain_events().contains(&ZeroDawnEvent::Constructed(MachineId::Grazer)));
    }

    #[test]
    fn locked_designs_cannot_be_built() {
        let mut e = engine_with(started(), &[0.0]);
        assert!(!e.purchase_unlocked(MachineId::Lancehorn));
        assert!(!e.try_purchase(MachineId::Lancehorn, 1, 0));
        assert!(e.purchase_unlocked(MachineId::Scrapper));
    }

    #[test]
    fn unlock_follows_owned_cauldrons_only() {
        let mut state = started();
        state.cauldrons.push(Cauldron::new(CauldronName::Beta, 2, 0.0));
        let e = engine_with(state, &[0.0]);
        for id in MachineId::ALL {
            let owned = matches!(unlocked_by(id), CauldronName::Alpha | CauldronName::Beta);
            assert_eq!(e.purchase_unlocked(id), owned, "{id:?}");
        }
    }

    #[test]
    fn multi_purchase_is_all_or_nothing() {
        let mut state = started();
        state.cauldrons[0].capacity = 2;
        state.cauldrons.push(Cauldron::new(CauldronName::Beta, 2, 15.0));
        let mut e = engine_with(state, &[0.0]);
        // 3 slots fit, but Beta only has materials for one grazer
        assert!(e.can_purchase(MachineId::Grazer, 3));
        let before = e.state().clone();
        assert!(!e.can_purchase(MachineId::Grazer, 4));
        assert!(!e.try_purchase(MachineId::Grazer, 4, 0));
        assert_eq!(e.state(), &before);

        assert!(e.try_purchase(MachineId::Grazer, 3, 0));
        assert_eq!(e.state().cauldrons[0].busy.len(), 2);
        assert_eq!(e.state().cauldrons[1].busy.len(), 1);
        assert!(approx(e.state().cauldrons[1].materials, 5.0));
    }

    #[test]
    fn first_fit_skips_cauldrons_short_on_materials() {
        let mut state = started();
        state.cauldrons[0].materials = 5.0;
        state.cauldrons.push(Cauldron::new(CauldronName::Beta, 1, 50.0));
        let mut e = engine_with(state, &[0.0]);
        assert!(e.try_purchase(MachineId::Grazer, 1, 0));
        assert!(e.state().cauldrons[0].busy.is_empty());
        assert_eq!(e.state().cauldrons[1].busy.len(), 1);
    }

    #[test]
    fn break_down_refunds_materials_and_half_energy() {
        let mut e = engine_with(started(), &[0.0]);
        assert!(e.break_down(MachineId::Grazer));
        let s = e.state();
        assert_eq!(s.count(MachineId::Grazer), 0);
        assert!(approx(s.materials, 110.0));
        assert!(approx(s.total_available_materials, 210.0));
        assert!(approx(s.power, 105.0));
        assert!(!e.break_down(MachineId::Grazer));
    }

    #[test]
    fn busy_machines_cannot_be_broken_down() {
        let mut e = engine_with(started(), &[0.0]);
        assert!(e.set_busy(MachineId::Grazer, Task::Collecting));
        assert!(!e.break_down(MachineId::Grazer));
    }

    #[test]
    fn tasks_must_fit_machine_type() {
        let mut e = engine_with(started(), &[0.0]);
        assert!(!e.set_busy(MachineId::Watcher, Task::Collecting));
        assert!(!e.set_busy(MachineId::Leaplasher, Task::Transporting));
        assert!(e.set_busy(MachineId::Watcher, Task::Recon));
        assert!(!e.set_busy(MachineId::Watcher, Task::Recon));
        assert!(e.remove_busy(MachineId::Watcher, Task::Recon));
        assert!(!e.remove_busy(MachineId::Watcher, Task::Recon));
    }

    #[test]
    fn terraforming_restores_land() {
        let mut state = started();
        state.machines.insert(MachineId::Grazer, 2);
        state
            .busy
            .insert(MachineId::Grazer, vec![Task::Terraforming, Task::Terraforming]);
        let mut e = engine_with(state, &[0.0]);
        e.tick(0);
        let s = e.state();
        assert!(approx(s.land_restored, 0.5));
        assert!(approx(s.power, 99.8));
        assert!(approx(s.last_tick.restored, 0.5));
        assert!(approx(s.last_tick.power_spent, 0.2));
    }

    #[test]
    fn collecting_uses_land_and_yields() {
        let mut state = started();
        state.land_restored = 10.0;
        state.busy.insert(MachineId::Grazer, vec![Task::Collecting]);
        let mut e = engine_with(state, &[0.0]);
        e.tick(0);
        let s = e.state();
        // 0.15 power over a land-use rate of 2
        assert!(approx(s.land_restored, 10.0 - 0.075));
        assert!(approx(s.power, 100.0 + 0.15 - 0.1));
        assert!(approx(s.materials, 100.1));
        assert!(approx(s.total_available_materials, 200.1));
        assert!(approx(s.last_tick.land_used, 0.075));
    }

    #[test]
    fn collecting_needs_restored_land() {
        let mut state = started();
        state.busy.insert(MachineId::Grazer, vec![Task::Collecting]);
        let mut e = engine_with(state, &[0.0]);
        e.tick(0);
        assert!(approx(e.state().materials, 100.0));
        assert!(approx(e.state().power, 100.0));
    }

    #[test]
    fn harvesting_upgrade_uses_less_land() {
        let mut state = started();
        state.land_restored = 10.0;
        state.materials = 1_000.0;
        state.power = 1_000.0;
        state.busy.insert(MachineId::Grazer, vec![Task::Collecting]);
        let mut e = engine_with(state, &[0.0]);
        assert!(e.purchase_upgrade(EFFICIENT_HARVESTING));
        e.tick(0);
        assert!(approx(e.state().land_restored, 10.0 - 0.15 / 2.2));
    }

    #[test]
    fn power_exhaustion_clamps_and_stops_production() {
        let mut state = started();
        state.power = 0.15;
        state.machines.insert(MachineId::Grazer, 3);
        state.busy.insert(
            MachineId::Grazer,
            vec![Task::Terraforming, Task::Terraforming, Task::Terraforming],
        );
        let mut e = engine_with(state, &[0.0]);
        e.tick(0);
        let s = e.state();
        assert_eq!(s.power, 0.0);
        // the second run drove power negative; the third never ran
        assert!(approx(s.land_restored, 0.5));
        assert!(e.drain_events().contains(&ZeroDawnEvent::PowerDepleted));
    }

    #[test]
    fn constructions_still_finish_after_power_runs_out() {
        let mut state = started();
        state.power = 10.05;
        state.busy.insert(MachineId::Grazer, vec![Task::Terraforming]);
        let mut e = engine_with(state, &[0.0]);
        assert!(e.try_purchase(MachineId::Watcher, 1, 0));
        e.tick(1_000);
        assert_eq!(e.state().power, 0.0);
        assert_eq!(e.state().count(MachineId::Watcher), 2);
    }

    #[test]
    fn recon_buff_multiplies_collection() {
        let mut state = started();
        state.land_restored = 10.0;
        state.busy.insert(MachineId::Watcher, vec![Task::Recon]);
        state.busy.insert(MachineId::Grazer, vec![Task::Collecting]);
        // 0.5 < 0.75: the watcher finds something
        let mut e = engine_with(state, &[0.5]);
        e.tick(1_000);
        let s = e.state();
        assert!(approx(s.materials, 100.0 + 0.1 * 1.05));
        assert_eq!(s.last_tick.buff, Some(MachineId::Watcher));
        assert_eq!(s.current_buff.map(|b| b.remaining), Some(2));
        assert!(approx(s.power, 100.0 - 0.15 + 0.15 - 0.1));
        assert!(e.drain_events().contains(&ZeroDawnEvent::BuffFound(MachineId::Watcher)));
    }

    #[test]
    fn failed_scouting_still_costs_power() {
        let mut state = started();
        state.busy.insert(MachineId::Watcher, vec![Task::Recon]);
        let mut e = engine_with(state, &[0.9]);
        e.tick(0);
        assert!(e.state().current_buff.is_none());
        assert!(approx(e.state().power, 99.85));
    }

    #[test]
    fn weaker_find_does_not_replace_stronger_buff() {
        let mut state = started();
        state.busy.insert(MachineId::Watcher, vec![Task::Recon]);
        state.current_buff = Some(Buff {
            machine: MachineId::Tallneck,
            started: 0,
            remaining: 10,
        });
        let mut e = engine_with(state, &[0.1]);
        e.tick(500);
        let buff = e.state().current_buff.unwrap();
        assert_eq!(buff.machine, MachineId::Tallneck);
        assert_eq!(buff.remaining, 10);
        // the skipped watcher is not charged
        assert!(approx(e.state().power, 100.0));
    }

    #[test]
    fn buff_expires_by_time() {
        let mut state = started();
        state.land_restored = 10.0;
        state.busy.insert(MachineId::Grazer, vec![Task::Collecting]);
        state.current_buff = Some(Buff {
            machine: MachineId::Watcher,
            started: 0,
            remaining: 3,
        });
        let mut e = engine_with(state, &[0.0]);
        e.tick(2_001);
        assert!(e.state().current_buff.is_none());
        assert!(approx(e.state().materials, 100.1));
    }

    #[test]
    fn buff_runs_out_of_charges() {
        let mut state = started();
        state.land_restored = 10.0;
        state.machines.insert(MachineId::Grazer, 3);
        state.busy.insert(MachineId::Grazer, vec![Task::Collecting; 3]);
        state.current_buff = Some(Buff {
            machine: MachineId::Burrower,
            started: 0,
            remaining: 2,
        });
        let mut e = engine_with(state, &[0.0]);
        e.tick(100);
        assert!(approx(e.state().materials, 100.0 + 0.1 * 1.1 * 2.0 + 0.1));
        assert!(e.state().current_buff.is_none());
    }

    #[test]
    fn send_materials_splits_across_carriers() {
        let mut state = started();
        state.machines.insert(MachineId::Rollerback, 1);
        state.machines.insert(MachineId::Leaplasher, 2);
        state.materials = 100.0;
        let mut e = engine_with(state, &[0.0]);
        let outcome = e.send_materials(CauldronName::Alpha, 28.0, 1_000);
        assert_eq!(
            outcome,
            TransferOutcome::Dispatched {
                flights: 3,
                sent: 28.0
            }
        );
        let s = e.state();
        assert!(approx(s.materials, 72.0));
        // total reserve counts materials in flight
        assert!(approx(s.total_available_materials, 200.0));
        let loads: Vec<(MachineId, f64)> =
            s.transports.iter().map(|t| (t.machine, t.amount)).collect();
        assert_eq!(
            loads,
            vec![
                (MachineId::Rollerback, 20.0),
                (MachineId::Leaplasher, 5.0),
                (MachineId::Leaplasher, 3.0),
            ]
        );
        assert_eq!(s.count_busy(MachineId::Leaplasher, Task::Transporting), 2);
    }

    #[test]
    fn equal_carriers_load_in_table_order() {
        let mut state = started();
        state.machines.insert(MachineId::Rollerback, 1);
        state.machines.insert(MachineId::Leaplasher, 1);
        state.materials = 100.0;
        let mut e = engine_with(state, &[0.0]);
        for stats in e.machines.iter_mut() {
            if let Role::Transport {
                carrying_capacity, ..
            } = &mut stats.role
            {
                *carrying_capacity = 20.0;
            }
        }
        e.send_materials(CauldronName::Alpha, 20.0, 1_000);
        let loads: Vec<MachineId> = e.state().transports.iter().map(|t| t.machine).collect();
        assert_eq!(loads, vec![MachineId::Leaplasher]);
    }

    #[test]
    fn send_materials_stops_without_transports() {
        let mut e = engine_with(started(), &[0.0]);
        let outcome = e.send_materials(CauldronName::Alpha, 12.0, 0);
        assert_eq!(
            outcome,
            TransferOutcome::Short {
                flights: 1,
                sent: 5.0,
                unsent: 7.0,
                cause: Shortfall::NoFreeTransport
            }
        );
        assert!(approx(e.state().materials, 95.0));
    }

    #[test]
    fn send_materials_clamps_to_reserve() {
        let mut state = started();
        state.materials = 3.0;
        let mut e = engine_with(state, &[0.0]);
        let outcome = e.send_materials(CauldronName::Alpha, 10.0, 0);
        assert_eq!(
            outcome,
            TransferOutcome::Short {
                flights: 1,
                sent: 3.0,
                unsent: 7.0,
                cause: Shortfall::ReserveEmpty
            }
        );
        assert_eq!(e.state().materials, 0.0);
    }

    #[test]
    fn send_materials_rejects_bad_requests() {
        let mut e = engine_with(started(), &[0.0]);
        assert_eq!(e.send_materials(CauldronName::Beta, 5.0, 0), TransferOutcome::Rejected);
        assert_eq!(e.send_materials(CauldronName::Alpha, 0.0, 0), TransferOutcome::Rejected);
        assert_eq!(
            e.send_materials(CauldronName::Alpha, f64::NAN, 0),
            TransferOutcome::Rejected
        );
        assert!(e.state().transports.is_empty());
    }

    #[test]
    fn transport_lands_after_trip_time() {
        let mut e = engine_with(started(), &[0.0]);
        e.send_materials(CauldronName::Alpha, 5.0, 1_000);
        // in-flight transporters cannot be recalled
        assert!(!e.remove_busy(MachineId::Leaplasher, Task::Transporting));

        e.tick(6_000);
        assert_eq!(e.state().transports.len(), 1);
        assert!(approx(e.state().power, 100.0 - 0.15));

        e.tick(6_001);
        let s = e.state();
        assert!(s.transports.is_empty());
        assert!(approx(s.cauldrons[0].materials, 105.0));
        assert!(s.busy(MachineId::Leaplasher).is_empty());
        assert!(e
            .drain_events()
            .iter()
            .any(|ev| matches!(ev, ZeroDawnEvent::TransportArrived { amount, .. } if *amount == 5.0)));
    }

    #[test]
    fn withdraw_keeps_total_reserve() {
        let mut e = engine_with(started(), &[0.0]);
        assert!(e.withdraw_materials(CauldronName::Alpha, 40.0));
        let s = e.state();
        assert!(approx(s.cauldrons[0].materials, 60.0));
        assert!(approx(s.materials, 140.0));
        assert!(approx(s.total_available_materials, 200.0));
        assert!(!e.withdraw_materials(CauldronName::Alpha, 61.0));
        assert!(!e.withdraw_materials(CauldronName::Beta, 1.0));
        assert!(!e.withdraw_materials(CauldronName::Alpha, -1.0));
    }

    #[test]
    fn cauldrons_bought_in_order() {
        let mut state = started();
        state.materials = 2_000.0;
        state.power = 2_000.0;
        state.new_cauldron_capacity = 3;
        let mut e = engine_with(state, &[0.0]);
        assert_eq!(e.next_cauldron(), Some(CauldronName::Beta));
        assert_eq!(e.purchase_cauldron(), Some(CauldronName::Beta));
        let s = e.state();
        assert!(approx(s.materials, 1_400.0));
        assert!(approx(s.power, 1_400.0));
        assert_eq!(s.cauldrons[1], Cauldron::new(CauldronName::Beta, 3, 0.0));
        assert!(e.purchase_unlocked(MachineId::Lancehorn));

        assert_eq!(e.purchase_cauldron(), Some(CauldronName::Gamma));
        assert_eq!(e.purchase_cauldron(), None);
    }

    #[test]
    fn solar_arrays_pay_per_cauldron() {
        let mut state = started();
        state.upgrades.push(SOLAR_ARRAYS.to_string());
        state.cauldrons.push(Cauldron::new(CauldronName::Beta, 1, 0.0));
        let mut e = engine_with(state, &[0.0]);
        e.tick(0);
        assert!(approx(e.state().power, 102.0));
        assert!(approx(e.state().last_tick.energy, 2.0));
    }

    #[test]
    fn land_decays_at_cap() {
        let mut state = started();
        state.land_restored = MAX_LAND;
        let mut e = engine_with(state, &[0.5]);
        e.tick(0);
        assert!(approx(e.state().land_restored, MAX_LAND - 25_000.0));
    }

    #[test]
    fn villages_grow_and_split() {
        let mut state = started();
        state.humans = 100;
        state.villages = vec![100];
        // deaths, births, split
        let mut e = engine_with(state, &[0.5, 0.5, 0.999]);
        e.tick(0);
        // 100 - 1 death, + 1 birth, then split in half
        assert_eq!(e.state().villages, vec![50, 50]);
        assert_eq!(e.state().humans, 100);
    }

    #[test]
    fn empty_villages_are_abandoned() {
        let mut state = started();
        state.humans = 200;
        state.villages = vec![0, 200];
        let mut e = engine_with(state, &[0.0]);
        e.tick(0);
        assert_eq!(e.state().villages, vec![200]);
        assert_eq!(e.state().humans, 200);
    }

    #[test]
    fn humans_upgrade_starts_population() {
        let mut state = started();
        state.land_restored = MAX_LAND;
        let mut e = engine_with(state, &[0.0]);
        assert!(e.purchase_upgrade(HUMANS));
        assert_eq!(e.state().humans, 4_500);
        e.tick(0);
        assert_eq!(e.state().villages.len(), 9);
    }

    #[test]
    fn upgrade_list_sorted_by_price() {
        let mut state = started();
        state.materials = 10_000.0;
        state.power = 10_000.0;
        let e = engine_with(state, &[0.0]);
        let names: Vec<&str> = e.listed_upgrades().iter().map(|u| u.name).collect();
        assert_eq!(names.first(), Some(&EFFICIENT_HARVESTING));
        assert_eq!(names.get(1), Some(&"Faster Cauldrons"));
        assert_eq!(names.last(), Some(&SOLAR_ARRAYS));
        assert!(!names.contains(&"Cauldron Capacity++"));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut state = started();
        state.materials = 9_999.0;
        let mut e = engine_with(state, &[0.0]);
        e.reset();
        assert_eq!(e.state(), &ZeroDawnState::default());
    }

    #[test]
    fn purchasable_list_puts_owned_first() {
        let mut state = started();
        state.machines.insert(MachineId::Scrapper, 4);
        let e = engine_with(state, &[0.0]);
        let list = e.purchasable_machines(MachineType::Acquisition);
        assert_eq!(list, vec![MachineId::Scrapper, MachineId::Grazer]);
    }

    proptest! {
        #[test]
        fn busy_never_exceeds_count(ops in prop::collection::vec((0u8..7, 0usize..28), 1..60)) {
            let mut state = started();
            state.materials = 500.0;
            state.power = 500.0;
            state.land_restored = 50.0;
            let mut e = ZeroDawnEngine::with_state(
                state,
                Box::new(MemoryStore::new()),
                Box::new(SeededRandom::new(9)),
            );
            let mut now = 0;
            for (op, idx) in ops {
                let id = MachineId::ALL[idx];
                let task = e.machines().get(id).machine_type().tasks()[0];
                match op {
                    0 => { e.try_purchase(id, 1, now); }
                    1 => { e.set_busy(id, task); }
                    2 => { e.remove_busy(id, task); }
                    3 => { e.break_down(id); }
                    4 => { e.send_materials(CauldronName::Alpha, 12.0, now); }
                    5 => { e.withdraw_materials(CauldronName::Alpha, 5.0); }
                    _ => { now += 1_000; e.tick(now); }
                }
                for id in MachineId::ALL {
                    prop_assert!(e.state().busy(id).len() as u32 <= e.state().count(id));
                }
                for c in &e.state().cauldrons {
                    prop_assert!(c.busy.len() as u32 <= c.capacity);
                }
            }
        }

        #[test]
        fn failed_purchase_changes_nothing(idx in 0usize..28, count in 1u32..20, power in 0.0f64..60.0) {
            let mut state = started();
            state.power = power;
            let mut e = engine_with(state, &[0.0]);
            let id = MachineId::ALL[idx];
            let before = e.state().clone();
            if !e.try_purchase(id, count, 0) {
                prop_assert_eq!(e.state(), &before);
            }
        }
    }
}

//! Swarm simulation engine.
//!
//! `SwarmEngine` owns the state, the machine table and the upgrade registry.
//! Every operation takes the wall-clock timestamp (ms) it runs at and saves
//! the state when it mutated anything.

use crate::games::persist::Store;
use crate::games::random::RandomSource;
use crate::games::upgrade::{self, DisplayRule};

use super::battle::{self, COOLDOWN_MS, PREPARATION_MS};
use super::data::{unit_table, UnitTable};
use super::save;
use super::state::{BattleResult, BattleState, PerUnit, SwarmState, Task, UnitKind};
use super::upgrades::{registry, SwarmUpgrade};

/// Khopesh count that draws humanity's attention on its own.
const KHOPESH_NOTICE_THRESHOLD: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    Advanced,
    /// No Horus left. Nothing advances until a reset.
    Defeated,
}

/// Things worth telling the player about, drained by the game wrapper.
#[derive(Clone, Debug, PartialEq)]
pub enum SwarmEvent {
    Constructed(UnitKind),
    AttackIncoming(i64),
    BattleResolved { total_losses: u32, enemy_left: i64 },
    UpgradePurchased(&'static str),
    Defeated,
}

/// Where the encounter cycle stands, for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BattlePhase {
    /// Humanity has not noticed the swarm yet.
    Dormant,
    /// Cooling down after a battle.
    Quiet,
    /// An attack is on its way; seconds until it lands.
    Incoming { force: i64, secs_left: u64 },
}

pub struct SwarmEngine {
    state: SwarmState,
    units: UnitTable,
    registry: Vec<SwarmUpgrade>,
    rng: Box<dyn RandomSource>,
    store: Box<dyn Store>,
    events: Vec<SwarmEvent>,
}

impl SwarmEngine {
    /// Load the saved game (or defaults) and replay upgrade startup hooks.
    pub fn load(store: Box<dyn Store>, rng: Box<dyn RandomSource>) -> Self {
        let state = save::load_state(store.as_ref());
        Self::with_state(state, store, rng)
    }

    fn with_state(state: SwarmState, store: Box<dyn Store>, rng: Box<dyn RandomSource>) -> Self {
        let mut engine = Self {
            state,
            units: unit_table(),
            registry: registry(),
            rng,
            store,
            events: Vec::new(),
        };
        upgrade::replay_startup(&engine.registry, &mut engine.state, &mut engine.units);
        engine
    }

    pub fn state(&self) -> &SwarmState {
        &self.state
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    pub fn registry(&self) -> &[SwarmUpgrade] {
        &self.registry
    }

    pub(super) fn state_mut(&mut self) -> &mut SwarmState {
        &mut self.state
    }

    pub(super) fn roll(&mut self) -> f64 {
        self.rng.next_f64()
    }

    pub fn drain_events(&mut self) -> Vec<SwarmEvent> {
        std::mem::take(&mut self.events)
    }

    fn save(&mut self) {
        save::save_state(self.store.as_mut(), &self.state);
    }

    pub fn is_defeated(&self) -> bool {
        self.state.machines.horus == 0
    }

    // ── Purchase ──────────────────────────────────────────────

    /// Affordable, and a Horus is free to supervise each build.
    pub fn can_purchase(&self, kind: UnitKind, count: u32) -> bool {
        let cost = &self.units.get(kind).cost;
        let n = count as f64;
        count > 0
            && self.state.materials >= cost.materials * n
            && self.state.power >= cost.energy * n
            && self.state.busy.horus.len() as u32 + count <= self.state.machines.horus
    }

    pub fn try_purchase(&mut self, kind: UnitKind, count: u32, now: u64) -> bool {
        if !self.can_purchase(kind, count) {
            return false;
        }
        let cost = self.units.get(kind).cost;
        let n = count as f64;
        self.state.power -= cost.energy * n;
        self.state.materials -= cost.materials * n;
        for _ in 0..count {
            self.state.constructing.get_mut(kind).push(now);
            self.state.busy.horus.push(Task::Constructing);
        }
        self.save();
        true
    }

    // ── Task assignment ───────────────────────────────────────

    pub fn set_busy(&mut self, kind: UnitKind, task: Task) -> bool {
        if self.state.idle(kind) == 0 {
            return false;
        }
        self.state.busy.get_mut(kind).push(task);
        self.save();
        true
    }

    pub fn remove_busy(&mut self, kind: UnitKind, task: Task) -> bool {
        if !Self::free_slot(&mut self.state, kind, task) {
            return false;
        }
        self.save();
        true
    }

    /// Drop the first `task` entry for `kind`, if any.
    fn free_slot(state: &mut SwarmState, kind: UnitKind, task: Task) -> bool {
        let busy = state.busy.get_mut(kind);
        match busy.iter().position(|t| *t == task) {
            Some(idx) => {
                busy.remove(idx);
                true
            }
            None => false,
        }
    }

    // ── Tick ──────────────────────────────────────────────────

    pub fn tick(&mut self, now: u64) -> TickOutcome {
        if self.is_defeated() {
            self.events.push(SwarmEvent::Defeated);
            return TickOutcome::Defeated;
        }

        self.produce();
        self.resolve_constructions(now);
        self.step_battle(now);

        for hook in upgrade::loop_hooks(&self.registry, &self.state) {
            hook(self, now);
        }

        self.save();
        TickOutcome::Advanced
    }

    fn produce(&mut self) {
        for kind in UnitKind::COLLECTORS {
            let n = self.state.count_busy(kind, Task::Consuming) as f64;
            if n == 0.0 {
                continue;
            }
            let stats = self.units.get(kind);
            let start = self.state.power;
            self.state.power += n * stats.consume_output;
            self.state.power -= n * stats.power_use.consuming;
            self.state.total_harvest += self.state.power - start;
            self.state.materials += n * stats.collection_rate;
        }
    }

    fn resolve_constructions(&mut self, now: u64) {
        for kind in UnitKind::ALL {
            let duration = self.units.get(kind).cost.construction_secs * 1000;
            let queue = self.state.constructing.get_mut(kind);
            let ready = queue
                .iter()
                .take_while(|start| now >= **start + duration)
                .count();
            if ready == 0 {
                continue;
            }
            queue.drain(..ready);
            for _ in 0..ready {
                *self.state.machines.get_mut(kind) += 1;
                // auto-commit before a battle may already have replaced the slot
                Self::free_slot(&mut self.state, UnitKind::Horus, Task::Constructing);
                if kind == UnitKind::Horus && self.state.machines.horus > 1 {
                    self.state.noticed = true;
                }
                tracing::debug!(?kind, "construction finished");
                self.events.push(SwarmEvent::Constructed(kind));
            }
        }
    }

    // ── Battle ────────────────────────────────────────────────

    /// Battles start once humanity notices the swarm.
    pub fn war_started(&self) -> bool {
        let m = &self.state.machines;
        self.state.noticed || m.horus > 1 || m.khopesh > KHOPESH_NOTICE_THRESHOLD
    }

    pub fn battle_phase(&self, now: u64) -> BattlePhase {
        if !self.war_started() {
            return BattlePhase::Dormant;
        }
        let b = &self.state.battle;
        if b.waiting == 0 {
            return BattlePhase::Quiet;
        }
        let lands_at = b.waiting + PREPARATION_MS;
        BattlePhase::Incoming {
            force: b.force,
            secs_left: lands_at.saturating_sub(now) / 1000,
        }
    }

    fn step_battle(&mut self, now: u64) {
        if !self.war_started() {
            return;
        }
        let b = &self.state.battle;
        let available = b.waiting != 0 || b.last == 0 || now.saturating_sub(b.last) >= COOLDOWN_MS;
        if !available {
            return;
        }
        if b.waiting == 0 {
            self.generate_attack(now);
        } else if now.saturating_sub(b.waiting) >= PREPARATION_MS {
            // ignored for too long, the attack lands on everything
            self.run_battle(now);
        }
    }

    /// Start a new encounter: clear the last result and roll the enemy force.
    pub fn generate_attack(&mut self, now: u64) -> i64 {
        let force = battle::enemy_force(&self.state.machines, self.rng.as_mut());
        self.state.battle.result = None;
        self.state.battle.waiting = now;
        self.state.battle.force = force;
        tracing::info!(force, "attack incoming");
        self.events.push(SwarmEvent::AttackIncoming(force));
        self.save();
        force
    }

    /// Resolve the pending attack. Without prepped machines the whole swarm
    /// defends. `None` when no attack is pending.
    pub fn run_battle(&mut self, now: u64) -> Option<BattleResult> {
        if self.state.battle.waiting == 0 {
            return None;
        }

        let mut committed = PerUnit::<u32>::default();
        for kind in UnitKind::ALL {
            *committed.get_mut(kind) = self.state.count_busy(kind, Task::Prepped) as u32;
        }
        if committed.total() == 0 {
            committed = self.state.machines.clone();
            for kind in UnitKind::ALL {
                let n = *self.state.machines.get(kind) as usize;
                *self.state.busy.get_mut(kind) = vec![Task::Prepped; n];
            }
        }

        let original_enemy = self.state.battle.force;
        let clash = battle::resolve(&committed, original_enemy, &self.units, self.rng.as_mut());

        for kind in UnitKind::ALL {
            self.state.power -=
                *committed.get(kind) as f64 * self.units.get(kind).power_use.fighting;
        }
        for kind in UnitKind::ALL {
            let lost = *clash.losses.get(kind);
            let count = self.state.machines.get_mut(kind);
            *count = count.saturating_sub(lost);
            for _ in 0..lost {
                Self::free_slot(&mut self.state, kind, Task::Prepped);
            }
        }
        self.state.materials += ((original_enemy - clash.enemy_force) * 2) as f64;
        for kind in UnitKind::ALL {
            self.state
                .busy
                .get_mut(kind)
                .retain(|t| *t != Task::Prepped);
        }

        let result = BattleResult {
            losses: clash.losses,
            original_enemy,
            original_force: committed,
            enemy_force: clash.enemy_force,
            total_losses: clash.total_losses,
            at: now,
        };
        self.state.battle = BattleState {
            last: now,
            waiting: 0,
            force: 0,
            result: Some(result.clone()),
        };
        tracing::info!(
            original_enemy,
            enemy_left = result.enemy_force,
            losses = result.total_losses,
            "battle resolved"
        );
        self.events.push(SwarmEvent::BattleResolved {
            total_losses: result.total_losses,
            enemy_left: result.enemy_force,
        });
        self.save();
        Some(result)
    }

    pub fn dismiss_result(&mut self) -> bool {
        if self.state.battle.result.take().is_none() {
            return false;
        }
        self.save();
        true
    }

    // ── Upgrades ──────────────────────────────────────────────

    pub fn purchase_upgrade(&mut self, name: &str) -> bool {
        let bought = upgrade::purchase(&self.registry, name, &mut self.state, &mut self.units);
        if bought {
            if let Some(def) = upgrade::find(&self.registry, name) {
                self.events.push(SwarmEvent::UpgradePurchased(def.name));
            }
            self.save();
        }
        bought
    }

    pub fn upgrade_purchasable(&self, def: &SwarmUpgrade) -> bool {
        upgrade::can_purchase(def, &self.state)
    }

    /// Upgrades shown in the panel: visible by the threshold rule, or
    /// purchasable right now. Unaffordable ones first.
    pub fn listed_upgrades(&self) -> Vec<&SwarmUpgrade> {
        let mut listed: Vec<&SwarmUpgrade> = self
            .registry
            .iter()
            .filter(|&u| {
                upgrade::should_display(u, &self.state, DisplayRule::BelowThreshold)
                    || upgrade::can_purchase(u, &self.state)
            })
            .collect();
        listed.sort_by_key(|&u| upgrade::can_purchase(u, &self.state));
        listed
    }

    // ── Reset ─────────────────────────────────────────────────

    /// Start over from defaults with a fresh machine table.
    pub fn reset(&mut self) {
        self.state = SwarmState::default();
        self.units = unit_table();
        self.events.clear();
        tracing::info!("swarm reset");
        self.save();
    }
}

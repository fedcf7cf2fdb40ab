//! Upgrade registry shared by both games.
//!
//! An upgrade is a fixed set of named hook slots. The engine dispatches them
//! at three lifecycle points:
//!
//! - purchase: `on_purchase` then `on_startup`
//! - load: `on_startup` for every applied upgrade, in stored purchase order
//! - tick: `on_loop` for every applied upgrade, in stored purchase order
//!
//! `on_startup` runs once per load (not once ever), so it must be written
//! against freshly built data tables. Hooks that depend on a prerequisite's
//! startup effect rely on purchase order placing the prerequisite first.

/// Cost of an upgrade plus the display threshold offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Price {
    pub materials: f64,
    pub energy: f64,
    pub show_diff: Option<f64>,
}

/// Threshold offset used when an upgrade does not set one.
pub const DEFAULT_SHOW_DIFF: f64 = 150.0;

/// How a priced upgrade's display threshold compares against reserves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DisplayRule {
    /// Listed while both reserves are still below `price - show_diff`.
    BelowThreshold,
    /// Listed once both reserves reach `price - show_diff`.
    AtThreshold,
}

/// Access to the parts of a game state the registry needs.
pub trait Reserves {
    fn materials(&self) -> f64;
    fn power(&self) -> f64;
    fn applied_upgrades(&self) -> &[String];
    fn record_upgrade(&mut self, name: &str);
    /// Debit an upgrade price. Callers have already checked affordability.
    fn spend(&mut self, materials: f64, energy: f64);

    fn has_upgrade(&self, name: &str) -> bool {
        self.applied_upgrades().iter().any(|u| u == name)
    }
}

/// Definition of one upgrade over game state `S`, data tables `T` and
/// engine `E`.
pub struct UpgradeDef<S, T, E> {
    /// Unique, stable across saves.
    pub name: &'static str,
    pub description: &'static str,
    pub requires: &'static [&'static str],
    pub price: Option<Price>,
    pub can_purchase: Option<fn(&S) -> bool>,
    pub should_display: Option<fn(&S) -> bool>,
    pub on_purchase: Option<fn(&mut S)>,
    pub on_startup: Option<fn(&mut S, &mut T)>,
    /// Receives the engine and the tick timestamp (ms).
    pub on_loop: Option<fn(&mut E, u64)>,
}

impl<S, T, E> UpgradeDef<S, T, E> {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            requires: &[],
            price: None,
            can_purchase: None,
            should_display: None,
            on_purchase: None,
            on_startup: None,
            on_loop: None,
        }
    }

    pub fn requires(mut self, names: &'static [&'static str]) -> Self {
        self.requires = names;
        self
    }

    pub fn price(mut self, materials: f64, energy: f64) -> Self {
        self.price = Some(Price {
            materials,
            energy,
            show_diff: None,
        });
        self
    }

    /// Price with an explicit display threshold offset.
    pub fn price_shown_within(mut self, materials: f64, energy: f64, show_diff: f64) -> Self {
        self.price = Some(Price {
            materials,
            energy,
            show_diff: Some(show_diff),
        });
        self
    }

    pub fn can_purchase(mut self, f: fn(&S) -> bool) -> Self {
        self.can_purchase = Some(f);
        self
    }

    pub fn should_display(mut self, f: fn(&S) -> bool) -> Self {
        self.should_display = Some(f);
        self
    }

    pub fn on_purchase(mut self, f: fn(&mut S)) -> Self {
        self.on_purchase = Some(f);
        self
    }

    pub fn on_startup(mut self, f: fn(&mut S, &mut T)) -> Self {
        self.on_startup = Some(f);
        self
    }

    pub fn on_loop(mut self, f: fn(&mut E, u64)) -> Self {
        self.on_loop = Some(f);
        self
    }
}

pub fn find<'a, S, T, E>(
    registry: &'a [UpgradeDef<S, T, E>],
    name: &str,
) -> Option<&'a UpgradeDef<S, T, E>> {
    registry.iter().find(|u| u.name == name)
}

pub fn prerequisites_met<S: Reserves, T, E>(def: &UpgradeDef<S, T, E>, state: &S) -> bool {
    def.requires.iter().all(|r| state.has_upgrade(r))
}

fn affordable(price: &Price, state: &impl Reserves) -> bool {
    price.materials <= state.materials() && price.energy <= state.power()
}

/// Whether `def` can be bought right now.
pub fn can_purchase<S: Reserves, T, E>(def: &UpgradeDef<S, T, E>, state: &S) -> bool {
    if state.has_upgrade(def.name) || !prerequisites_met(def, state) {
        return false;
    }
    if let Some(gate) = def.can_purchase {
        if !gate(state) {
            return false;
        }
    }
    def.price.as_ref().map_or(true, |p| affordable(p, state))
}

/// Whether `def` belongs in the upgrade list. Applied upgrades are never listed.
pub fn should_display<S: Reserves, T, E>(
    def: &UpgradeDef<S, T, E>,
    state: &S,
    rule: DisplayRule,
) -> bool {
    if state.has_upgrade(def.name) || !prerequisites_met(def, state) {
        return false;
    }
    if let Some(gate) = def.should_display {
        if !gate(state) {
            return false;
        }
    }
    match &def.price {
        Some(price) => {
            let diff = price.show_diff.unwrap_or(DEFAULT_SHOW_DIFF);
            let materials_line = price.materials - diff;
            let energy_line = price.energy - diff;
            match rule {
                DisplayRule::BelowThreshold => {
                    materials_line > state.materials() && energy_line > state.power()
                }
                DisplayRule::AtThreshold => {
                    materials_line <= state.materials() && energy_line <= state.power()
                }
            }
        }
        None => true,
    }
}

/// Buy the upgrade called `name`: debit, record, then `on_purchase` and
/// `on_startup`. Returns false (and changes nothing) when it cannot be bought.
pub fn purchase<S: Reserves, T, E>(
    registry: &[UpgradeDef<S, T, E>],
    name: &str,
    state: &mut S,
    tables: &mut T,
) -> bool {
    let Some(def) = find(registry, name) else {
        return false;
    };
    if !can_purchase(def, state) {
        return false;
    }
    if let Some(price) = &def.price {
        state.spend(price.materials, price.energy);
    }
    state.record_upgrade(def.name);
    if let Some(hook) = def.on_purchase {
        hook(state);
    }
    if let Some(hook) = def.on_startup {
        hook(state, tables);
    }
    tracing::info!(upgrade = def.name, "upgrade purchased");
    true
}

/// Replay `on_startup` for every applied upgrade in stored order.
/// Names missing from the registry are skipped. Returns how many applied
/// names were found in the registry.
pub fn replay_startup<S: Reserves, T, E>(
    registry: &[UpgradeDef<S, T, E>],
    state: &mut S,
    tables: &mut T,
) -> usize {
    let applied = state.applied_upgrades().to_vec();
    let mut known = 0;
    for name in &applied {
        match find(registry, name) {
            Some(def) => {
                known += 1;
                if let Some(hook) = def.on_startup {
                    tracing::debug!(upgrade = def.name, "replaying startup hook");
                    hook(state, tables);
                }
            }
            None => tracing::warn!(upgrade = %name, "unknown upgrade in save, skipped"),
        }
    }
    known
}

/// The `on_loop` hooks of applied upgrades, in purchase order.
pub fn loop_hooks<S: Reserves, T, E>(
    registry: &[UpgradeDef<S, T, E>],
    state: &S,
) -> Vec<fn(&mut E, u64)> {
    state
        .applied_upgrades()
        .iter()
        .filter_map(|name| find(registry, name))
        .filter_map(|def| def.on_loop)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Toy {
        materials: f64,
        power: f64,
        upgrades: Vec<String>,
        events: Vec<&'static str>,
    }

    impl Reserves for Toy {
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

    type ToyUpgrade = UpgradeDef<Toy, Vec<&'static str>, ()>;

    fn registry() -> Vec<ToyUpgrade> {
        vec![
            ToyUpgrade::new("Base", "first")
                .price(50.0, 20.0)
                .on_purchase(|s| s.events.push("base purchase"))
                .on_startup(|s, t| {
                    s.events.push("base startup");
                    t.push("base");
                }),
            ToyUpgrade::new("Follow-up", "needs base")
                .requires(&["Base"])
                .on_startup(|_, t| t.push("follow-up")),
            ToyUpgrade::new("Gated", "never").can_purchase(|_| false),
            ToyUpgrade::new("Hidden", "display gate").should_display(|s| s.materials > 1000.0),
        ]
    }

    fn rich() -> Toy {
        Toy {
            materials: 100.0,
            power: 100.0,
            ..Toy::default()
        }
    }

    #[test]
    fn purchase_debits_and_runs_hooks_in_order() {
        let reg = registry();
        let mut state = rich();
        let mut tables = Vec::new();
        assert!(purchase(&reg, "Base", &mut state, &mut tables));
        assert!((state.materials - 50.0).abs() < 1e-9);
        assert!((state.power - 80.0).abs() < 1e-9);
        assert_eq!(state.upgrades, vec!["Base".to_string()]);
        assert_eq!(state.events, vec!["base purchase", "base startup"]);
        assert_eq!(tables, vec!["base"]);
    }

    #[test]
    fn purchase_twice_is_rejected() {
        let reg = registry();
        let mut state = rich();
        let mut tables = Vec::new();
        assert!(purchase(&reg, "Base", &mut state, &mut tables));
        state.materials = 1000.0;
        state.power = 1000.0;
        assert!(!purchase(&reg, "Base", &mut state, &mut tables));
        assert_eq!(state.upgrades.len(), 1);
    }

    #[test]
    fn missing_prerequisite_rejects_without_mutation() {
        let reg = registry();
        let mut state = rich();
        let mut tables = Vec::new();
        assert!(!purchase(&reg, "Follow-up", &mut state, &mut tables));
        assert!(state.upgrades.is_empty());
        assert!(tables.is_empty());
    }

    #[test]
    fn unaffordable_price_rejects_without_mutation() {
        let reg = registry();
        let mut state = Toy {
            materials: 49.0,
            power: 100.0,
            ..Toy::default()
        };
        let mut tables = Vec::new();
        assert!(!purchase(&reg, "Base", &mut state, &mut tables));
        assert!((state.materials - 49.0).abs() < 1e-9);
        assert!((state.power - 100.0).abs() < 1e-9);
    }

    #[test]
    fn can_purchase_gate_blocks() {
        let reg = registry();
        let mut state = rich();
        let mut tables = Vec::new();
        assert!(!purchase(&reg, "Gated", &mut state, &mut tables));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let reg = registry();
        let mut state = rich();
        let mut tables = Vec::new();
        assert!(!purchase(&reg, "Nope", &mut state, &mut tables));
    }

    #[test]
    fn replay_follows_stored_order_and_skips_unknown() {
        let reg = registry();
        let mut state = rich();
        state.upgrades = vec![
            "Follow-up".to_string(),
            "Removed Upgrade".to_string(),
            "Base".to_string(),
        ];
        let mut tables = Vec::new();
        let known = replay_startup(&reg, &mut state, &mut tables);
        assert_eq!(known, 2);
        assert_eq!(tables, vec!["follow-up", "base"]);
        // on_purchase is not part of replay
        assert_eq!(state.events, vec!["base startup"]);
    }

    #[test]
    fn display_rules_compare_against_threshold() {
        let reg = registry();
        let base = &reg[0]; // price 50/20, default diff 150 → lines -100/-130
        let state = rich();
        assert!(should_display(base, &state, DisplayRule::AtThreshold));
        assert!(!should_display(base, &state, DisplayRule::BelowThreshold));

        let priced = ToyUpgrade::new("Big", "").price_shown_within(500.0, 500.0, 100.0);
        // lines 400/400, reserves 100/100
        assert!(should_display(&priced, &state, DisplayRule::BelowThreshold));
        assert!(!should_display(&priced, &state, DisplayRule::AtThreshold));
    }

    #[test]
    fn display_respects_gate_prerequisites_and_applied() {
        let reg = registry();
        let mut state = rich();
        assert!(!should_display(&reg[3], &state, DisplayRule::AtThreshold));
        assert!(!should_display(&reg[1], &state, DisplayRule::AtThreshold));
        state.upgrades.push("Base".into());
        assert!(should_display(&reg[1], &state, DisplayRule::AtThreshold));
        assert!(!should_display(&reg[0], &state, DisplayRule::AtThreshold));
    }

    #[test]
    fn loop_hooks_in_purchase_order() {
        type Counter = UpgradeDef<Toy, (), Vec<u64>>;
        let reg: Vec<Counter> = vec![
            Counter::new("A", "").on_loop(|e, now| e.push(now)),
            Counter::new("B", "").on_loop(|e, now| e.push(now * 10)),
            Counter::new("C", ""),
        ];
        let mut state = rich();
        state.upgrades = vec!["B".into(), "C".into(), "A".into()];
        let hooks = loop_hooks(&reg, &state);
        assert_eq!(hooks.len(), 2);
        let mut out = Vec::new();
        for hook in hooks {
            hook(&mut out, 3);
        }
        assert_eq!(out, vec![30, 3]);
    }
}

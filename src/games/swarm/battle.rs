//! Battle math: incoming force generation and per-unit resolution.

use crate::games::random::RandomSource;

use super::data::UnitTable;
use super::state::{PerUnit, UnitKind};

/// Minimum time between a resolved battle and the next attack.
pub const COOLDOWN_MS: u64 = 2 * 60 * 1000;
/// Time the player has to commit forces before the attack lands.
pub const PREPARATION_MS: u64 = 2 * 60 * 1000;

/// Resolution order. Scarabs are usually out in the field, so they take the
/// first hit and Horuses the last. Independent of committed counts.
pub const BATTLE_ORDER: [UnitKind; 3] = [UnitKind::Scarab, UnitKind::Khopesh, UnitKind::Horus];

/// Loss chance when the enemy still outweighs a unit's defense.
pub const LOSS_CHANCE_OUTMATCHED: f64 = 0.5;
/// Loss chance against a depleted enemy.
pub const LOSS_CHANCE_DEPLETED: f64 = 0.2;

/// Size of the next attack, scaled to the whole swarm plus a random surge.
pub fn enemy_force(machines: &PerUnit<u32>, rng: &mut dyn RandomSource) -> i64 {
    let mut total = machines.horus as i64 * 20;
    total += machines.khopesh as i64;
    let scarab_share = (machines.scarab as f64 / 2.0).round() as i64;
    total += if scarab_share == 0 { 1 } else { scarab_share };
    total += (rng.next_f64() * total as f64).round() as i64;
    total
}

/// One draw decides whether a unit is lost.
pub fn is_lost(enemy_force: i64, defense: f64, roll: f64) -> bool {
    if enemy_force as f64 >= defense {
        roll > 1.0 - LOSS_CHANCE_OUTMATCHED
    } else {
        roll > 1.0 - LOSS_CHANCE_DEPLETED
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Clash {
    pub losses: PerUnit<u32>,
    pub enemy_force: i64,
    pub total_losses: u32,
}

/// Fight `committed` against `enemy_force`.
///
/// Each unit draws its loss roll, then wears the enemy down by
/// `round(r * defense) + round(r * force_projection)` (two fresh draws).
/// Everything stops the moment the enemy drops below 1.
pub fn resolve(
    committed: &PerUnit<u32>,
    enemy_force: i64,
    units: &UnitTable,
    rng: &mut dyn RandomSource,
) -> Clash {
    let mut enemy = enemy_force;
    let mut losses = PerUnit::<u32>::default();
    let mut total_losses = 0;

    'battle: for kind in BATTLE_ORDER {
        let stats = units.get(kind);
        for _ in 0..*committed.get(kind) {
            if is_lost(enemy, stats.defense, rng.next_f64()) {
                *losses.get_mut(kind) += 1;
                total_losses += 1;
            }
            let damage = (rng.next_f64() * stats.defense).round() as i64
                + (rng.next_f64() * stats.force_projection).round() as i64;
            enemy -= damage;
            if enemy < 1 {
                enemy = 0;
                break 'battle;
            }
        }
    }

    Clash {
        losses,
        enemy_force: enemy,
        total_losses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::random::{ScriptedRandom, SeededRandom};
    use crate::games::swarm::data::unit_table;
    use proptest::prelude::*;

    fn only(kind: UnitKind, n: u32) -> PerUnit<u32> {
        let mut c = PerUnit::default();
        *c.get_mut(kind) = n;
        c
    }

    #[test]
    fn lone_horus_against_weak_enemy_loss_roll() {
        // enemy 10 < defense 20: lost only when the roll exceeds 0.8
        let units = unit_table();
        let committed = only(UnitKind::Horus, 1);

        let mut rng = ScriptedRandom::new(&[0.9, 0.1, 0.1]);
        let clash = resolve(&committed, 10, &units, &mut rng);
        assert_eq!(clash.losses.horus, 1);
        assert_eq!(clash.enemy_force, 4); // 10 - (2 + 4)

        let mut rng = ScriptedRandom::new(&[0.8, 0.2, 0.1]);
        let clash = resolve(&committed, 10, &units, &mut rng);
        assert_eq!(clash.losses.horus, 0);
        assert_eq!(clash.enemy_force, 2); // 10 - (4 + 4)

        let mut rng = ScriptedRandom::new(&[0.5, 0.5, 0.5]);
        let clash = resolve(&committed, 10, &units, &mut rng);
        assert_eq!(clash.losses.horus, 0);
        assert_eq!(clash.enemy_force, 0);

        let mut rng = ScriptedRandom::new(&[0.81, 0.0, 0.0]);
        let clash = resolve(&committed, 10, &units, &mut rng);
        assert_eq!(clash.total_losses, 1);
        assert_eq!(clash.enemy_force, 10);
    }

    #[test]
    fn strong_enemy_uses_even_odds() {
        let units = unit_table();
        let committed = only(UnitKind::Horus, 1);
        let mut rng = ScriptedRandom::new(&[0.51, 0.0, 0.0]);
        assert_eq!(resolve(&committed, 100, &units, &mut rng).total_losses, 1);
        let mut rng = ScriptedRandom::new(&[0.5, 0.0, 0.0]);
        assert_eq!(resolve(&committed, 100, &units, &mut rng).total_losses, 0);
    }

    #[test]
    fn scarabs_take_the_first_hit() {
        let units = unit_table();
        let committed = PerUnit {
            horus: 1,
            khopesh: 0,
            scarab: 1,
        };
        // first unit lost, second survives; no damage dealt
        let mut rng = ScriptedRandom::new(&[0.9, 0.0, 0.0, 0.1, 0.0, 0.0]);
        let clash = resolve(&committed, 1_000, &units, &mut rng);
        assert_eq!(clash.losses.scarab, 1);
        assert_eq!(clash.losses.horus, 0);
    }

    #[test]
    fn horuses_fight_last() {
        let units = unit_table();
        let committed = PerUnit {
            horus: 1,
            khopesh: 1,
            scarab: 1,
        };
        // scarab and khopesh survive, the third roll (horus) is lost
        let mut rng = ScriptedRandom::new(&[0.1, 0.0, 0.0, 0.1, 0.0, 0.0, 0.9, 0.0, 0.0]);
        let clash = resolve(&committed, 1_000, &units, &mut rng);
        assert_eq!(clash.losses.horus, 1);
        assert_eq!(clash.losses.khopesh, 0);
        assert_eq!(clash.losses.scarab, 0);
    }

    #[test]
    fn order_does_not_depend_on_counts() {
        let units = unit_table();
        let committed = PerUnit {
            horus: 1,
            khopesh: 5,
            scarab: 40,
        };
        let mut draws = vec![0.9, 0.0, 0.0];
        draws.extend(std::iter::repeat(0.0).take(3 * 45));
        let mut rng = ScriptedRandom::new(&draws);
        let clash = resolve(&committed, 1_000, &units, &mut rng);
        assert_eq!(clash.losses.scarab, 1);
        assert_eq!(clash.total_losses, 1);
    }

    #[test]
    fn stops_when_enemy_destroyed() {
        let units = unit_table();
        let committed = only(UnitKind::Horus, 2);
        let mut rng = ScriptedRandom::new(&[0.9, 0.9, 0.9]);
        let clash = resolve(&committed, 10, &units, &mut rng);
        assert_eq!(clash.enemy_force, 0);
        // the loss before the stop still counts
        assert_eq!(clash.losses.horus, 1);
        assert_eq!(rng.consumed(), 3);
    }

    #[test]
    fn enemy_force_formula() {
        let machines = PerUnit {
            horus: 2,
            khopesh: 3,
            scarab: 5,
        };
        // 40 + 3 + round(2.5)=3 → 46, surge 0
        let mut rng = ScriptedRandom::new(&[0.0]);
        assert_eq!(enemy_force(&machines, &mut rng), 46);
        // surge round(0.5 * 46) = 23
        let mut rng = ScriptedRandom::new(&[0.5]);
        assert_eq!(enemy_force(&machines, &mut rng), 69);
    }

    #[test]
    fn enemy_force_scarab_share_falls_back_to_one() {
        let machines = PerUnit {
            horus: 1,
            khopesh: 0,
            scarab: 0,
        };
        let mut rng = ScriptedRandom::new(&[0.0]);
        assert_eq!(enemy_force(&machines, &mut rng), 21);
    }

    fn loss_rate(enemy: i64, samples: u32) -> f64 {
        let units = unit_table();
        let committed = only(UnitKind::Scarab, 1);
        let mut rng = SeededRandom::new(2024);
        let mut lost = 0;
        for _ in 0..samples {
            lost += resolve(&committed, enemy, &units, &mut rng).total_losses;
        }
        lost as f64 / samples as f64
    }

    #[test]
    fn loss_probability_when_outmatched() {
        let rate = loss_rate(1_000_000, 20_000);
        assert!((rate - 0.5).abs() < 0.02, "rate {}", rate);
    }

    #[test]
    fn loss_probability_against_depleted_enemy() {
        // scarab defense 2, enemy 1
        let rate = loss_rate(1, 20_000);
        assert!((rate - 0.2).abs() < 0.02, "rate {}", rate);
    }

    proptest! {
        #[test]
        fn enemy_never_negative_nor_grows(
            seed in any::<u64>(),
            enemy in 0i64..2_000,
            horus in 0u32..5,
            khopesh in 0u32..30,
            scarab in 0u32..60,
        ) {
            let units = unit_table();
            let committed = PerUnit { horus, khopesh, scarab };
            let mut rng = SeededRandom::new(seed);
            let clash = resolve(&committed, enemy, &units, &mut rng);
            prop_assert!(clash.enemy_force >= 0);
            prop_assert!(clash.enemy_force <= enemy);
            prop_assert!(clash.losses.horus <= horus);
            prop_assert!(clash.losses.khopesh <= khopesh);
            prop_assert!(clash.losses.scarab <= scarab);
            prop_assert_eq!(clash.total_losses, clash.losses.total());
        }

        #[test]
        fn generated_force_stays_within_surge(
            seed in any::<u64>(),
            horus in 0u32..50,
            khopesh in 0u32..500,
            scarab in 0u32..500,
        ) {
            let machines = PerUnit { horus, khopesh, scarab };
            let share = ((scarab as f64 / 2.0).round() as i64).max(1);
            let base = horus as i64 * 20 + khopesh as i64 + share;
            let mut rng = SeededRandom::new(seed);
            let force = enemy_force(&machines, &mut rng);
            prop_assert!(force >= base);
            prop_assert!(force <= 2 * base);
        }
    }
}

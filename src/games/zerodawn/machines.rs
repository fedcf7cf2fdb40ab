//! Zero Dawn machine table and cauldron unlocks.
//!
//! Built fresh for every engine; upgrade startup hooks patch it in place.

use super::state::{CauldronName, MachineId, MachineType};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cost {
    pub energy: f64,
    pub materials: f64,
}

/// Type-specific stats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Role {
    Acquisition {
        output_power: f64,
        output_materials: f64,
        /// km² terraformed per tick.
        restore_rate: f64,
    },
    Recon {
        /// Per-tick chance of finding rich land.
        location_chance: f64,
        /// Seconds.
        buff_duration: f64,
        buff_multiplier: f64,
        /// Collector runs the buff lasts for.
        buff_range: u32,
    },
    Transport {
        carrying_capacity: f64,
        /// Seconds per trip.
        transport_speed: f64,
    },
    Combat {
        attack_power: f64,
        combat_power_consumption: f64,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct MachineStats {
    pub name: &'static str,
    pub cost: Cost,
    /// Seconds.
    pub creation_time: f64,
    pub power_consumption: f64,
    pub defense: f64,
    pub role: Role,
}

impl MachineStats {
    pub fn machine_type(&self) -> MachineType {
        match self.role {
            Role::Acquisition { .. } => MachineType::Acquisition,
            Role::Recon { .. } => MachineType::Recon,
            Role::Transport { .. } => MachineType::Transport,
            Role::Combat { .. } => MachineType::Combat,
        }
    }

    pub fn carrying_capacity(&self) -> Option<f64> {
        match self.role {
            Role::Transport {
                carrying_capacity, ..
            } => Some(carrying_capacity),
            _ => None,
        }
    }
}

const fn acquisition(
    name: &'static str,
    energy: f64,
    materials: f64,
    creation_time: f64,
    power_consumption: f64,
    defense: f64,
    output: (f64, f64),
    restore_rate: f64,
) -> MachineStats {
    MachineStats {
        name,
        cost: Cost { energy, materials },
        creation_time,
        power_consumption,
        defense,
        role: Role::Acquisition {
            output_power: output.0,
            output_materials: output.1,
            restore_rate,
        },
    }
}

const fn recon(
    name: &'static str,
    energy: f64,
    materials: f64,
    creation_time: f64,
    power_consumption: f64,
    defense: f64,
    location_chance: f64,
    buff_duration: f64,
    buff_multiplier: f64,
    buff_range: u32,
) -> MachineStats {
    MachineStats {
        name,
        cost: Cost { energy, materials },
        creation_time,
        power_consumption,
        defense,
        role: Role::Recon {
            location_chance,
            buff_duration,
            buff_multiplier,
            buff_range,
        },
    }
}

const fn transport(
    name: &'static str,
    energy: f64,
    materials: f64,
    creation_time: f64,
    power_consumption: f64,
    defense: f64,
    carrying_capacity: f64,
    transport_speed: f64,
) -> MachineStats {
    MachineStats {
        name,
        cost: Cost { energy, materials },
        creation_time,
        power_consumption,
        defense,
        role: Role::Transport {
            carrying_capacity,
            transport_speed,
        },
    }
}

pub fn machine_stats(id: MachineId) -> MachineStats {
    use MachineId::*;
    match id {
        //                                  energy  mat   secs  power  def   (power, mat)  restore
        Grazer => acquisition("Grazer", 10.0, 10.0, 1.0, 0.1, 2.0, (0.15, 0.1), 0.25),
        Lancehorn => acquisition("Lancehorn", 10.0, 10.0, 1.0, 0.15, 3.0, (0.1, 0.1), 0.27),
        Spikesnout => acquisition("Spikesnout", 15.0, 15.0, 1.5, 0.24, 1.0, (0.25, 0.15), 0.3),
        Plowhorn => acquisition("Plowhorn", 45.0, 45.0, 3.0, 0.5, 2.0, (0.35, 0.35), 0.65),
        Bristleback => acquisition("Bristleback", 20.0, 20.0, 3.0, 0.3, 1.0, (0.1, 0.3), 0.3),
        Fanghorn => acquisition("Fanghorn", 10.0, 10.0, 2.0, 0.1, 1.0, (0.15, 0.15), 0.15),
        Widemaw => acquisition("Widemaw", 35.0, 35.0, 3.0, 0.3, 3.0, (0.2, 0.1), 0.4),
        Clamberjaw => acquisition("Clamberjaw", 25.0, 18.0, 3.0, 0.3, 3.0, (0.3, 0.05), 0.2),
        Sunwing => acquisition("Sunwing", 40.0, 40.0, 5.0, 0.07, 6.0, (0.6, 0.0), 0.15),
        Tideripper => acquisition("Tideripper", 75.0, 75.0, 7.0, 0.75, 10.0, (0.0, 0.75), 0.75),
        Fireclaw => acquisition("Fireclaw", 75.0, 85.0, 7.0, 0.85, 15.0, (0.1, 0.8), 0.0),
        Frostclaw => acquisition("Frostclaw", 75.0, 85.0, 7.0, 0.85, 15.0, (0.1, 0.8), 0.0),
        Charger => acquisition("Charger", 10.0, 10.0, 2.0, 0.2, 2.0, (0.35, 0.05), 0.05),
        Scrapper => acquisition("Scrapper", 5.0, 5.0, 1.0, 0.15, 1.0, (0.01, 0.2), 0.05),
        Glinthawk => acquisition("Glinthawk", 5.0, 15.0, 1.0, 0.2, 5.0, (0.01, 0.28), 0.05),
        Snapmaw => acquisition("Snapmaw", 50.0, 65.0, 6.0, 0.56, 7.0, (0.1, 0.65), 0.25),
        Rockbreaker => {
            acquisition("Rockbreaker", 95.0, 120.0, 1.0, 0.9, 10.0, (0.1, 0.95), 0.25)
        }

        //                         energy  mat  secs  power  def  chance  dur  mult  range
        Watcher => recon("Watcher", 10.0, 10.0, 1.0, 0.15, 1.0, 0.75, 2.0, 1.05, 3),
        Burrower => recon("Burrower", 10.0, 10.0, 1.0, 0.15, 2.0, 0.75, 2.0, 1.1, 3),
        Skydrifter => recon("Skydrifter", 20.0, 20.0, 3.5, 0.5, 2.0, 0.75, 4.0, 1.2, 6),
        Longleg => recon("Longleg", 25.0, 30.0, 4.0, 0.75, 4.0, 0.9, 4.0, 1.5, 5),
        Tallneck => recon("Tallneck", 1000.0, 1000.0, 20.0, 1.25, 20.0, 0.9, 2.0, 2.0, 15),

        //                                  energy  mat  secs  power  def  carry  speed
        Leaplasher => transport("Leaplasher", 10.0, 10.0, 1.0, 0.15, 1.5, 5.0, 5.0),
        Rollerback => transport("Rollerback", 30.0, 30.0, 2.0, 0.5, 2.5, 20.0, 5.0),
        Bellowback => transport("Bellowback", 40.0, 40.0, 3.5, 1.0, 2.0, 40.0, 7.0),
        Shellwalker => transport("Shell-Walker", 50.0, 30.0, 3.5, 1.0, 6.0, 30.0, 6.0),
        Behemoth => transport("Behemoth", 60.0, 70.0, 5.0, 1.5, 6.0, 100.0, 7.0),

        Clawstrider => MachineStats {
            name: "Clawstrider",
            cost: Cost {
                energy: 15.0,
                materials: 15.0,
            },
            creation_time: 5.0,
            power_consumption: 1.0,
            defense: 2.0,
            role: Role::Combat {
                attack_power: 3.0,
                combat_power_consumption: 1.0,
            },
        },
    }
}

/// The cauldron whose purchase unlocks a machine design.
pub fn unlocked_by(id: MachineId) -> CauldronName {
    use MachineId::*;
    match id {
        Grazer | Watcher | Leaplasher => CauldronName::Alpha,
        Lancehorn | Fanghorn | Charger | Rollerback => CauldronName::Beta,
        Spikesnout | Glinthawk | Shellwalker | Burrower => CauldronName::Gamma,
        Bristleback | Bellowback | Skydrifter => CauldronName::Delta,
        Clamberjaw | Widemaw => CauldronName::Epsilon,
        Sunwing | Plowhorn | Behemoth => CauldronName::Zeta,
        Snapmaw | Longleg => CauldronName::Eta,
        Tallneck => CauldronName::Theta,
        Fireclaw | Frostclaw => CauldronName::Iota,
        Tideripper | Rockbreaker => CauldronName::Kappa,
        // not listed under any cauldron
        Scrapper | Clawstrider => CauldronName::Alpha,
    }
}

/// Designs a cauldron unlocks, in table order.
pub fn unlocks(cauldron: CauldronName) -> Vec<MachineId> {
    MachineId::ALL
        .into_iter()
        .filter(|id| unlocked_by(*id) == cauldron)
        .filter(|id| !matches!(id, MachineId::Scrapper | MachineId::Clawstrider))
        .collect()
}

/// Cauldron price (energy and materials alike): `200 + 200 × 2 × index`.
pub fn cauldron_cost(name: CauldronName) -> f64 {
    const BASE: f64 = 200.0;
    BASE + BASE * (name.index() as f64 * 2.0)
}

/// Stats for every machine, indexed by [`MachineId::index`].
#[derive(Clone, Debug, PartialEq)]
pub struct MachineTable(Vec<MachineStats>);

impl MachineTable {
    pub fn get(&self, id: MachineId) -> &MachineStats {
        &self.0[id.index()]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MachineStats> {
        self.0.iter_mut()
    }
}

pub fn machine_table() -> MachineTable {
    MachineTable(MachineId::ALL.into_iter().map(machine_stats).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_machine() {
        let table = machine_table();
        for id in MachineId::ALL {
            assert!(!table.get(id).name.is_empty());
        }
        assert_eq!(table.get(MachineId::Shellwalker).name, "Shell-Walker");
    }

    #[test]
    fn type_counts() {
        let table = machine_table();
        let count = |ty| {
            MachineId::ALL
                .iter()
                .filter(|id| table.get(**id).machine_type() == ty)
                .count()
        };
        assert_eq!(count(MachineType::Acquisition), 17);
        assert_eq!(count(MachineType::Recon), 5);
        assert_eq!(count(MachineType::Transport), 5);
        assert_eq!(count(MachineType::Combat), 1);
    }

    #[test]
    fn starter_designs_unlocked_by_alpha() {
        assert_eq!(
            unlocks(CauldronName::Alpha),
            vec![MachineId::Grazer, MachineId::Watcher, MachineId::Leaplasher]
        );
        assert_eq!(unlocked_by(MachineId::Tallneck), CauldronName::Theta);
        assert!(unlocks(CauldronName::Omega).is_empty());
    }

    #[test]
    fn cauldron_costs_grow_linearly() {
        assert_eq!(cauldron_cost(CauldronName::Alpha), 200.0);
        assert_eq!(cauldron_cost(CauldronName::Beta), 600.0);
        assert_eq!(cauldron_cost(CauldronName::Gamma), 1000.0);
        assert_eq!(cauldron_cost(CauldronName::Omega), 200.0 + 200.0 * 46.0);
    }

    #[test]
    fn only_transports_carry() {
        let table = machine_table();
        assert_eq!(table.get(MachineId::Behemoth).carrying_capacity(), Some(100.0));
        assert_eq!(table.get(MachineId::Grazer).carrying_capacity(), None);
    }
}

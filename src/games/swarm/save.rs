//! Swarm セーブ/ロード。
//!
//! 状態全体を 1 つの JSON レコードとして `state-Swarm` に保存する。
//! バージョン番号は持たず、ロード時にデフォルト状態へマージするだけ。

use crate::games::persist::{self, Store};

use super::state::SwarmState;

pub const TITLE: &str = "Swarm";

pub fn storage_key() -> String {
    persist::storage_key(TITLE)
}

/// 保存済みの状態を読み込む。無い・壊れている場合はデフォルト。
pub fn load_state(store: &dyn Store) -> SwarmState {
    persist::load_or_default(store, &storage_key(), SwarmState::default())
}

pub fn save_state(store: &mut dyn Store, state: &SwarmState) {
    persist::save_logged(store, &storage_key(), state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::persist::MemoryStore;
    use crate::games::swarm::state::{Task, UnitKind};

    #[test]
    fn roundtrip_preserves_state() {
        let mut store = MemoryStore::new();
        let mut state = SwarmState::default();
        state.materials = 321.5;
        state.machines.scarab = 7;
        state.busy.scarab = vec![Task::Consuming, Task::Prepped];
        state.constructing.khopesh = vec![1_000, 2_000];
        state.upgrades = vec!["Scarab armor upgrade".into()];
        state.upgrade_state.insert("ticks".into(), 12);
        save_state(&mut store, &state);
        assert_eq!(load_state(&store), state);
    }

    #[test]
    fn record_from_browser_build_loads() {
        let mut store = MemoryStore::new();
        store
            .write(
                "state-Swarm",
                r#"{
                    "battle": {"last": 0, "waiting": 0, "force": 0, "result": null},
                    "materials": 42.5,
                    "totalHarvest": 3.2,
                    "power": 77,
                    "noticed": true,
                    "busy": {"horus": ["constructing"], "khopesh": [], "scarab": ["consuming"]},
                    "machines": {"horus": 2, "khopesh": 0, "scarab": 1},
                    "constructing": {"horus": [], "khopesh": [], "scarab": [1700000000000]},
                    "upgrades": ["Scarab armor upgrade"],
                    "upgradeState": {"ticks": 3}
                }"#,
            )
            .unwrap();
        let state = load_state(&store);
        assert!((state.materials - 42.5).abs() < 1e-9);
        assert!(state.noticed);
        assert_eq!(*state.machines.get(UnitKind::Horus), 2);
        assert_eq!(state.busy.scarab, vec![Task::Consuming]);
        assert_eq!(state.upgrade_state.get("ticks"), Some(&3));
    }

    #[test]
    fn partial_record_keeps_defaults() {
        let mut store = MemoryStore::new();
        store.write("state-Swarm", r#"{"materials": 5}"#).unwrap();
        let state = load_state(&store);
        assert!((state.materials - 5.0).abs() < 1e-9);
        assert_eq!(state.machines.horus, 1);
        assert!((state.power - 100.0).abs() < 1e-9);
    }

    #[test]
    fn sparse_per_unit_maps_fill_in() {
        let mut store = MemoryStore::new();
        store
            .write("state-Swarm", r#"{"constructing": {"scarab": [5]}, "busy": {}}"#)
            .unwrap();
        let state = load_state(&store);
        assert_eq!(state.constructing.scarab, vec![5]);
        assert!(state.constructing.horus.is_empty());
        assert!(state.busy.horus.is_empty());
    }

    #[test]
    fn missing_record_gives_defaults() {
        let store = MemoryStore::new();
        assert_eq!(load_state(&store), SwarmState::default());
    }
}

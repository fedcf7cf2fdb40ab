//! Zero Dawn セーブ/ロード。
//!
//! 状態全体を `state-Zero Dawn` に 1 レコードで保存する。
//! 輸送中の荷物はブラウザ版と同じ配列形式で書き出す。

use crate::games::persist::{self, Store};

use super::state::ZeroDawnState;

pub const TITLE: &str = "Zero Dawn";

pub fn storage_key() -> String {
    persist::storage_key(TITLE)
}

/// 保存済みの状態を読み込む。無い・壊れている場合はデフォルト。
pub fn load_state(store: &dyn Store) -> ZeroDawnState {
    persist::load_or_default(store, &storage_key(), ZeroDawnState::default())
}

pub fn save_state(store: &mut dyn Store, state: &ZeroDawnState) {
    persist::save_logged(store, &storage_key(), state);
}

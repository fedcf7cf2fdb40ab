//! 永続化アダプタ。
//!
//! 各ゲームは 1 つの JSON レコードを `state-<タイトル>` キーに保存する。
//! ロード時は保存済みのトップレベルフィールドを現在のデフォルト状態に
//! 上書きマージする（新しいフィールドはデフォルト値のまま残る）。
//! マイグレーションはこのベストエフォートのマージのみ。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("storage is not available")]
    Unavailable,
    #[error("storage error: {0}")]
    Storage(String),
    #[error("saved record is not a JSON object")]
    NotAnObject,
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// フラットな key-value ストア。
pub trait Store {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistError>;
}

/// メモリ上のストア。clone は同じ中身を共有する（テストで保存内容を覗くため）。
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// ブラウザの localStorage。
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
fn get_storage() -> Result<web_sys::Storage, PersistError> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or(PersistError::Unavailable)
}

#[cfg(target_arch = "wasm32")]
impl Store for LocalStorage {
    fn read(&self, key: &str) -> Result<Option<String>, PersistError> {
        get_storage()?
            .get_item(key)
            .map_err(|e| PersistError::Storage(format!("{e:?}")))
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), PersistError> {
        get_storage()?
            .set_item(key, value)
            .map_err(|e| PersistError::Storage(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistError> {
        get_storage()?
            .remove_item(key)
            .map_err(|e| PersistError::Storage(format!("{e:?}")))
    }
}

/// 実行環境に応じたストア。WASM では localStorage、それ以外はメモリ。
pub fn default_store() -> Box<dyn Store> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(LocalStorage)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(MemoryStore::new())
    }
}

/// タイトルからストレージキーを作る。
pub fn storage_key(title: &str) -> String {
    format!("state-{title}")
}

/// 保存済みレコードをデフォルト状態にマージして読み込む。
/// レコードが無ければ `Ok(None)`。
pub fn load_merged<T>(store: &dyn Store, key: &str, defaults: &T) -> Result<Option<T>, PersistError>
where
    T: Serialize + DeserializeOwned,
{
    let Some(blob) = store.read(key)? else {
        return Ok(None);
    };
    let stored: Value = serde_json::from_str(&blob)?;
    let Value::Object(stored) = stored else {
        return Err(PersistError::NotAnObject);
    };
    let mut merged = serde_json::to_value(defaults)?;
    if let Value::Object(base) = &mut merged {
        for (field, value) in stored {
            // null は「未設定」扱い（デフォルト値を残す）
            if !value.is_null() {
                base.insert(field, value);
            }
        }
    }
    Ok(Some(serde_json::from_value(merged)?))
}

/// 読み込みに失敗したら警告を出してデフォルトを返す。
pub fn load_or_default<T>(store: &dyn Store, key: &str, defaults: T) -> T
where
    T: Serialize + DeserializeOwned,
{
    match load_merged(store, key, &defaults) {
        Ok(Some(state)) => {
            tracing::debug!(key, "loaded saved state");
            state
        }
        Ok(None) => defaults,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to load saved state, using defaults");
            defaults
        }
    }
}

pub fn save<T: Serialize>(store: &mut dyn Store, key: &str, state: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string(state)?;
    store.write(key, &json)
}

/// 保存し、失敗はログに残すだけにする。
pub fn save_logged<T: Serialize>(store: &mut dyn Store, key: &str, state: &T) {
    if let Err(e) = save(store, key, state) {
        tracing::warn!(key, error = %e, "failed to save state");
    }
}

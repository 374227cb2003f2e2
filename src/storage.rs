//! Key/value persistence used by the stores.
//!
//! Values are whole snapshots: every `save` replaces the previous value for the
//! key in full.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{StoreError, map_anyhow};

pub const FAVOURITES_KEY: &str = "favourites";
pub const SHOPPING_LIST_KEY: &str = "shoppingList";

pub trait Storage: Send + Sync {
    fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Returns `None` when nothing has been stored under `key`.
    fn load(&self, key: &str) -> Result<Option<String>>;
}

/// Process-local storage; contents are lost when it is dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("memory storage lock poisoned"))?;
        Ok(values.get(key).cloned())
    }
}

/// Read a store's snapshot. Absent, unreadable or undecodable data yields an
/// empty collection.
pub(crate) fn restore_snapshot<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Vec<T> {
    let raw = match storage.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(key, error = %err, "failed to read snapshot, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(err) => {
            warn!(key, error = %err, "discarding corrupt snapshot");
            Vec::new()
        }
    }
}

pub(crate) fn persist_snapshot<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    items: &[T],
) -> Result<(), StoreError> {
    let encoded = serde_json::to_string(items)
        .map_err(|err| StoreError::Storage(format!("failed to encode snapshot '{key}': {err}")))?;
    storage.save(key, &encoded).map_err(map_anyhow)?;
    debug!(key, items = items.len(), "snapshot persisted");
    Ok(())
}

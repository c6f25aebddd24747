//! In-memory store. Nothing survives the process.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use super::KvStore;
use crate::error::{RefundError, Result};

/// A `HashMap` behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| RefundError::storage(key, e))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RefundError::storage(key, e))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("devMode").unwrap().is_none());
    }

    #[test]
    fn test_set_replaces_value() {
        let store = MemoryStore::new();
        store.set("scanPeriodDays", json!(7)).unwrap();
        store.set("scanPeriodDays", json!(30)).unwrap();
        assert_eq!(store.get("scanPeriodDays").unwrap(), Some(json!(30)));
        assert_eq!(store.keys(), vec!["scanPeriodDays".to_string()]);
    }
}

//! Typed facade over a [`KvStore`].
//!
//! Reads never fail: a storage error or a value of the wrong shape degrades
//! to the default. Writes are best-effort and only logged on failure.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::KvStore;
use crate::model::candidate::{CachedResultSet, Candidate};

pub const DEV_MODE_KEY: &str = "devMode";
pub const PERIOD_KEY: &str = "scanPeriodDays";
pub const SUPPRESSED_KEY: &str = "suppressedMessages";
pub const COLLAPSED_KEY: &str = "collapsedSenders";

/// Cache key of a scan window: `refunds_<days>`.
pub fn cache_key(period_days: u32) -> String {
    format!("refunds_{period_days}")
}

/// Values used when a key is missing or unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDefaults {
    pub dev_mode: bool,
    pub period_days: u32,
}

impl Default for StoreDefaults {
    fn default() -> Self {
        Self {
            dev_mode: true,
            period_days: 14,
        }
    }
}

/// Shared handle to the persisted state. Cheap to clone.
#[derive(Clone)]
pub struct ResultStore {
    kv: Arc<dyn KvStore>,
    defaults: StoreDefaults,
}

impl ResultStore {
    /// A zero default window falls back to 14 days.
    pub fn new(kv: Arc<dyn KvStore>, mut defaults: StoreDefaults) -> Self {
        if defaults.period_days == 0 {
            defaults.period_days = StoreDefaults::default().period_days;
        }
        Self { kv, defaults }
    }

    fn read(&self, key: &str) -> Option<Value> {
        match self.kv.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Storage read failed, using default");
                None
            }
        }
    }

    fn write(&self, key: &str, value: Value) {
        if let Err(e) = self.kv.set(key, value) {
            warn!(key, error = %e, "Storage write failed");
        }
    }

    fn read_set(&self, key: &str) -> BTreeSet<String> {
        match self.read(key) {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Whether scans replay the built-in samples instead of calling Gmail.
    pub fn dev_mode(&self) -> bool {
        self.read(DEV_MODE_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(self.defaults.dev_mode)
    }

    pub fn set_dev_mode(&self, on: bool) {
        self.write(DEV_MODE_KEY, json!(on));
    }

    /// Scan window in days.
    pub fn period_days(&self) -> u32 {
        self.read(PERIOD_KEY)
            .and_then(|v| v.as_u64())
            .and_then(|d| u32::try_from(d).ok())
            .filter(|&d| d > 0)
            .unwrap_or(self.defaults.period_days)
    }

    pub fn set_period_days(&self, days: u32) {
        self.write(PERIOD_KEY, json!(days));
    }

    /// IDs hidden from the active view.
    pub fn suppressed(&self) -> BTreeSet<String> {
        self.read_set(SUPPRESSED_KEY)
    }

    pub fn set_suppressed(&self, ids: &BTreeSet<String>) {
        self.write(SUPPRESSED_KEY, json!(ids));
    }

    /// Sender keys whose items are folded away.
    pub fn collapsed(&self) -> BTreeSet<String> {
        self.read_set(COLLAPSED_KEY)
    }

    pub fn set_collapsed(&self, keys: &BTreeSet<String>) {
        self.write(COLLAPSED_KEY, json!(keys));
    }

    /// Cached results of a scan window, if any were stored and are readable.
    pub fn cached_results(&self, period_days: u32) -> Option<CachedResultSet> {
        let key = cache_key(period_days);
        let value = self.read(&key)?;
        match serde_json::from_value::<CachedResultSet>(value) {
            Ok(cached) => Some(cached),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unreadable cache entry");
                None
            }
        }
    }

    /// Replace the cache entry of a scan window, stamped with the current time.
    pub fn store_results(&self, period_days: u32, results: &[Candidate]) -> CachedResultSet {
        let cached = CachedResultSet::now(results.to_vec());
        let key = cache_key(period_days);
        match serde_json::to_value(&cached) {
            Ok(value) => {
                self.write(&key, value);
                debug!(key = %key, count = results.len(), "Cached results");
            }
            Err(e) => warn!(key = %key, error = %e, "Could not serialize results"),
        }
        cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RefundError, Result};
    use crate::model::candidate::RefundStatus;
    use crate::store::memory::MemoryStore;

    /// Store whose every operation fails.
    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, key: &str) -> Result<Option<Value>> {
            Err(RefundError::storage(key, "unavailable"))
        }

        fn set(&self, key: &str, _value: Value) -> Result<()> {
            Err(RefundError::storage(key, "unavailable"))
        }
    }

    fn memory() -> (Arc<MemoryStore>, ResultStore) {
        let kv = Arc::new(MemoryStore::new());
        let store = ResultStore::new(kv.clone(), StoreDefaults::default());
        (kv, store)
    }

    fn candidate(id: &str) -> Candidate {
        Candidate {
            subject: format!("Return {id}"),
            snippet: String::new(),
            status: RefundStatus::Pending,
            from: String::new(),
            from_name: None,
            from_email: None,
            date: None,
            id: id.to_string(),
            thread_id: String::new(),
        }
    }

    #[test]
    fn test_defaults_when_empty() {
        let (_, store) = memory();
        assert!(store.dev_mode());
        assert_eq!(store.period_days(), 14);
        assert!(store.suppressed().is_empty());
        assert!(store.collapsed().is_empty());
        assert!(store.cached_results(14).is_none());
    }

    #[test]
    fn test_broken_store_degrades_to_defaults() {
        let store = ResultStore::new(
            Arc::new(BrokenStore),
            StoreDefaults {
                dev_mode: false,
                period_days: 30,
            },
        );
        store.set_dev_mode(true);
        store.set_suppressed(&BTreeSet::from(["x".to_string()]));
        assert!(!store.dev_mode());
        assert_eq!(store.period_days(), 30);
        assert!(store.suppressed().is_empty());
        assert!(store.cached_results(30).is_none());
    }

    #[test]
    fn test_zero_default_period_uses_fourteen_days() {
        let store = ResultStore::new(
            Arc::new(MemoryStore::new()),
            StoreDefaults {
                dev_mode: true,
                period_days: 0,
            },
        );
        assert_eq!(store.period_days(), 14);
    }

    #[test]
    fn test_wrong_shapes_degrade() {
        let (kv, store) = memory();
        kv.set(DEV_MODE_KEY, json!("yes")).unwrap();
        kv.set(PERIOD_KEY, json!("7")).unwrap();
        kv.set(SUPPRESSED_KEY, json!({"a": 1})).unwrap();
        kv.set(COLLAPSED_KEY, json!(["a", 3, "b"])).unwrap();
        kv.set(&cache_key(14), json!({"results": 5})).unwrap();
        assert!(store.dev_mode());
        assert_eq!(store.period_days(), 14);
        assert!(store.suppressed().is_empty());
        assert_eq!(
            store.collapsed(),
            BTreeSet::from(["a".to_string(), "b".to_string()])
        );
        assert!(store.cached_results(14).is_none());
    }

    #[test]
    fn test_sets_persist_as_arrays() {
        let (kv, store) = memory();
        store.set_suppressed(&BTreeSet::from(["m2".to_string(), "m1".to_string()]));
        assert_eq!(kv.get(SUPPRESSED_KEY).unwrap(), Some(json!(["m1", "m2"])));
        assert_eq!(store.suppressed().len(), 2);
    }

    #[test]
    fn test_cache_entries_are_per_window() {
        let (kv, store) = memory();
        store.store_results(7, &[candidate("a")]);
        store.store_results(30, &[candidate("b"), candidate("c")]);
        assert_eq!(kv.keys(), vec!["refunds_30".to_string(), "refunds_7".to_string()]);
        assert_eq!(store.cached_results(7).unwrap().results[0].id, "a");
        assert_eq!(store.cached_results(30).unwrap().results.len(), 2);
        assert!(store.cached_results(14).is_none());
        let raw = kv.get("refunds_7").unwrap().unwrap();
        assert!(raw["fetchedAt"].as_i64().unwrap() > 0);
    }
}

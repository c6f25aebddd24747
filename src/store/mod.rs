//! Key-value persistence: the store abstraction, its backends and the typed
//! facade used by the orchestrator and the UI.

pub mod json_file;
pub mod memory;
pub mod results;

use serde_json::Value;

use crate::error::Result;

/// Eventually-consistent, single-process key-value storage of JSON values.
pub trait KvStore: Send + Sync {
    /// Read a key. `Ok(None)` means the key has never been written.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Write a key, fully replacing any previous value.
    fn set(&self, key: &str, value: Value) -> Result<()>;
}

//! On-disk store: one JSON object per file, rewritten on every `set`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::KvStore;
use crate::error::{RefundError, Result};

/// JSON object file used as a key-value store.
///
/// Writes go to a sibling temp file that is then renamed over the original,
/// so a crash mid-write leaves the previous state intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (lazily) the store at `path`. The file is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_contents(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(c) => Ok(c),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(RefundError::io(&self.path, e)),
        }
    }

    fn parse(&self, contents: &str) -> Result<Map<String, Value>> {
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(contents)? {
            Value::Object(map) => Ok(map),
            _ => Err(RefundError::storage(
                "*",
                format!("{} does not contain a JSON object", self.path.display()),
            )),
        }
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        let contents = self.read_contents()?;
        self.parse(&contents)
    }

    /// Current map for a write. An unparseable file is copied to
    /// `<name>.json.bak` and replaced by an empty map.
    fn read_for_write(&self) -> Result<Map<String, Value>> {
        let contents = self.read_contents()?;
        match self.parse(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                let backup = self.path.with_extension("json.bak");
                warn!(
                    path = %self.path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "State file is unreadable, starting a new one"
                );
                if let Err(e) = std::fs::write(&backup, contents) {
                    warn!(path = %backup.display(), error = %e, "Could not back up state file");
                }
                Ok(Map::new())
            }
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RefundError::io(parent, e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(map)?;
        std::fs::write(&tmp, data).map_err(|e| RefundError::io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| RefundError::io(&self.path, e))?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().map_err(|e| RefundError::storage(key, e))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().map_err(|e| RefundError::storage(key, e))?;
        let mut map = self.read_for_write()?;
        map.insert(key.to_string(), value);
        self.write_all(&map)?;
        debug!(path = %self.path.display(), key, "Stored key");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("state.json"));
        assert!(store.get("devMode").unwrap().is_none());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        {
            let store = JsonFileStore::open(&path);
            store.set("devMode", json!(false)).unwrap();
            store.set("suppressedMessages", json!(["a", "b"])).unwrap();
        }
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("devMode").unwrap(), Some(json!(false)));
        assert_eq!(
            store.get("suppressedMessages").unwrap(),
            Some(json!(["a", "b"]))
        );
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let store = JsonFileStore::open(&path);
        assert!(store.get("devMode").is_err());
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(store.get("devMode").is_err());
    }

    #[test]
    fn test_write_replaces_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"devMode": fal"#).unwrap();
        let store = JsonFileStore::open(&path);

        store.set("suppressedMessages", json!(["m1"])).unwrap();
        store.set("devMode", json!(false)).unwrap();

        assert_eq!(store.get("suppressedMessages").unwrap(), Some(json!(["m1"])));
        assert_eq!(store.get("devMode").unwrap(), Some(json!(false)));
        let backup = std::fs::read_to_string(dir.path().join("state.json.bak")).unwrap();
        assert_eq!(backup, r#"{"devMode": fal"#);
    }

    #[test]
    fn test_write_replaces_non_object_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        let store = JsonFileStore::open(&path);

        store.set("scanPeriodDays", json!(30)).unwrap();
        assert_eq!(store.get("scanPeriodDays").unwrap(), Some(json!(30)));
    }
}

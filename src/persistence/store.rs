use super::files::{atomic_write, read_file, remove_file};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::warn;

/// Durable JSON key-value storage
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Result<Option<Value>>;
    fn save(&self, key: &str, value: &Value) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Load and decode a record. Missing, unreadable or malformed records yield None;
/// the latter two are logged and left for the next save to overwrite.
pub fn load_record<S, T>(store: &S, key: &str) -> Option<T>
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned,
{
    let value = match store.load(key) {
        Ok(value) => value?,
        Err(e) => {
            warn!(key, error = %e, "discarding unreadable record");
            return None;
        }
    };

    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key, error = %e, "discarding malformed record");
            None
        }
    }
}

/// Encode and save a record
pub fn save_record<S, T>(store: &S, key: &str, record: &T) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let value = serde_json::to_value(record)
        .with_context(|| format!("Failed to encode record: {}", key))?;
    store.save(key, &value)
}

/// One pretty-printed `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonDirStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.path(key);
        let Some(content) = read_file(&path)? else {
            return Ok(None);
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        Ok(Some(value))
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        atomic_write(self.path(key), &json)
    }

    fn remove(&self, key: &str) -> Result<()> {
        remove_file(self.path(key))
    }
}

/// In-memory store for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: std::cell::RefCell<std::collections::HashMap<String, Value>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<Value> {
        self.records.borrow().get(key).cloned()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.records.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, value: &Value) -> Result<()> {
        self.records.borrow_mut().insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_json_dir_store_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = JsonDirStore::new(temp_dir.path());

        assert_eq!(store.load("tethers").unwrap(), None);
        store.save("tethers", &json!([{"name": "Morning"}])).unwrap();
        assert_eq!(
            store.load("tethers").unwrap(),
            Some(json!([{"name": "Morning"}]))
        );
        assert!(temp_dir.path().join("tethers.json").exists());

        store.remove("tethers").unwrap();
        assert_eq!(store.load("tethers").unwrap(), None);
    }

    #[test]
    fn test_json_dir_store_rejects_garbage() {
        let temp_dir = tempdir().unwrap();
        std::fs::write(temp_dir.path().join("history.json"), "{not json").unwrap();
        let store = JsonDirStore::new(temp_dir.path());

        assert!(store.load("history").is_err());
        let history: Option<Vec<String>> = load_record(&store, "history");
        assert!(history.is_none());
    }

    #[test]
    fn test_load_record_discards_wrong_shape() {
        let store = MemoryStore::new();
        store.save("numbers", &json!({"not": "a list"})).unwrap();

        let numbers: Option<Vec<u32>> = load_record(&store, "numbers");
        assert!(numbers.is_none());

        save_record(&store, "numbers", &vec![1u32, 2, 3]).unwrap();
        let numbers: Option<Vec<u32>> = load_record(&store, "numbers");
        assert_eq!(numbers, Some(vec![1, 2, 3]));
    }
}

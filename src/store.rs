use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
};

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::StoreError;

pub const TASKS_KEY: &str = "tasks";
pub const SETTINGS_KEY: &str = "settings";
pub const NOTES_KEY: &str = "notes";

pub fn group_key(group_id: &str) -> String {
    format!("groups/{group_id}")
}

/// String documents addressed by key. Keys are `/`-separated segments of
/// `[A-Za-z0-9_-]`.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Read and decode a JSON document, `None` if absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(value)?;
    store.put(key, &text)
}

pub fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.split('/').all(valid_segment) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// One `<root>/<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for JsonDirStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // Write to a temp file, then rename over the target.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp_path = path.with_extension("json.tmp");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&tmp_path, value)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        check_key(key)?;
        Ok(self.docs.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        check_key(key)?;
        self.docs.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Settings;

    #[test]
    fn dir_store_roundtrips_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());

        assert_eq!(store.get("groups/g1").unwrap(), None);
        store.put("groups/g1", "[]").unwrap();
        assert_eq!(store.get("groups/g1").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("groups").join("g1.json").exists());
        assert!(!dir.path().join("groups").join("g1.json.tmp").exists());
    }

    #[test]
    fn rejects_path_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path());
        assert!(matches!(store.put("../escape", "x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(MemoryStore::new().get("a//b"), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn json_helpers() {
        let store = MemoryStore::new();
        let none: Option<Settings> = load_json(&store, SETTINGS_KEY).unwrap();
        assert!(none.is_none());

        let s = Settings { step: 30, ..Settings::default() };
        save_json(&store, SETTINGS_KEY, &s).unwrap();
        assert_eq!(load_json::<Settings>(&store, SETTINGS_KEY).unwrap(), Some(s));

        store.put(TASKS_KEY, "not json").unwrap();
        assert!(matches!(load_json::<Vec<u32>>(&store, TASKS_KEY), Err(StoreError::Json(_))));
    }
}

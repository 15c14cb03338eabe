//! File-backed implementation of the [`MemoryStore`] trait.
//!
//! [`FileMemoryStore`] keeps the whole map in memory behind a `Mutex` and
//! mirrors it to a single JSON file on every mutation. A malformed or
//! missing file is treated as an empty store rather than an error, and a
//! `.bak` copy of the previous file content is written before each
//! overwrite.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::error::{AgentCoreError, Result};

use super::traits::MemoryStore;

/// Default location: `<dirs::data_dir()>/agentcore/memory.json`.
pub fn default_memory_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| AgentCoreError::Config("could not determine data directory".to_string()))?;
    Ok(base.join("agentcore").join("memory.json"))
}

/// JSON-file-backed, thread-safe `string -> string` memory store.
pub struct FileMemoryStore {
    path: PathBuf,
    map: Mutex<HashMap<String, String>>,
}

impl FileMemoryStore {
    /// Open (or create) the store at `path`, loading any existing content.
    ///
    /// A missing file yields an empty store. A present-but-malformed file
    /// also yields an empty store rather than an error — the on-disk copy
    /// is only ever produced by this type, so corruption means external
    /// tampering or a partial write, not a programming error worth failing
    /// startup over.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let map = load_map(&path);
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    /// Open the store at the platform default path (`default_memory_path()`).
    pub fn open_default() -> Result<Self> {
        Self::open(default_memory_path()?)
    }

    fn flush(&self, map: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if self.path.exists() {
            let backup = self.path.with_extension("json.bak");
            let _ = std::fs::copy(&self.path, backup);
        }

        let serialized = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn load_map(path: &Path) -> HashMap<String, String> {
    let Ok(bytes) = std::fs::read(path) else {
        return HashMap::new();
    };
    serde_json::from_slice(&bytes).unwrap_or_default()
}

#[async_trait]
impl MemoryStore for FileMemoryStore {
    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.map.lock().map_err(|_| AgentCoreError::Storage("memory lock poisoned".to_string()))?;
        map.insert(key.to_owned(), value.to_owned());
        self.flush(&map)
    }

    async fn read(&self, key: &str) -> Result<Option<String>> {
        let map = self.map.lock().map_err(|_| AgentCoreError::Storage("memory lock poisoned".to_string()))?;
        Ok(map.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut map = self.map.lock().map_err(|_| AgentCoreError::Storage("memory lock poisoned".to_string()))?;
        let existed = map.remove(key).is_some();
        if existed {
            self.flush(&map)?;
        }
        Ok(existed)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let map = self.map.lock().map_err(|_| AgentCoreError::Storage("memory lock poisoned".to_string()))?;
        Ok(map.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_store() -> (tempfile::TempDir, FileMemoryStore) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let store = FileMemoryStore::open(path).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn save_then_read_round_trips() {
        let (_dir, store) = make_store();
        store.save("user:name", "Alice").await.unwrap();
        let value = store.read("user:name").await.unwrap();
        assert_eq!(value.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn read_missing_key_returns_none() {
        let (_dir, store) = make_store();
        assert_eq!(store.read("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_then_read_returns_none() {
        let (_dir, store) = make_store();
        store.save("k", "v").await.unwrap();
        let deleted = store.delete("k").await.unwrap();
        assert!(deleted, "delete of existing key should return true");
        assert_eq!(store.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_missing_key_returns_false() {
        let (_dir, store) = make_store();
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn save_overwrites_existing_key() {
        let (_dir, store) = make_store();
        store.save("k", "first").await.unwrap();
        store.save("k", "second").await.unwrap();
        assert_eq!(store.read("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn list_reflects_all_saved_keys() {
        let (_dir, store) = make_store();
        store.save("a", "1").await.unwrap();
        store.save("b", "2").await.unwrap();
        let mut keys = store.list().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn state_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");

        {
            let store = FileMemoryStore::open(&path).unwrap();
            store.save("persisted", "yes").await.unwrap();
        }

        let reopened = FileMemoryStore::open(&path).unwrap();
        assert_eq!(reopened.read("persisted").await.unwrap().as_deref(), Some("yes"));
    }

    #[tokio::test]
    async fn malformed_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        std::fs::write(&path, b"not json at all").unwrap();

        let store = FileMemoryStore::open(&path).unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        let store = FileMemoryStore::open(&path).unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn backup_file_created_before_second_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let store = FileMemoryStore::open(&path).unwrap();

        store.save("a", "1").await.unwrap();
        store.save("b", "2").await.unwrap();

        let backup = path.with_extension("json.bak");
        assert!(backup.exists(), "backup should exist after the second flush");
    }
}

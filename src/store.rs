use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Versioned namespace so a future schema bump can coexist with old blobs.
pub const STORAGE_PREFIX: &str = "sumgrid:v1:";

pub fn config_key() -> String {
    format!("{STORAGE_PREFIX}config")
}

pub fn scores_key() -> String {
    format!("{STORAGE_PREFIX}scores")
}

pub fn saved_presets_key() -> String {
    format!("{STORAGE_PREFIX}saved-presets")
}

/// Minimal key-value persistence used for the config blob, the high-score
/// table and the saved-preset list. Reads never fail; a missing or corrupt
/// backing file behaves like an empty store.
pub trait KvStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// File-backed store keeping all keys in one JSON object file.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    path: PathBuf,
}

impl FileKvStore {
    pub fn new() -> Self {
        let path = crate::app_dirs::AppDirs::store_path()
            .unwrap_or_else(|| PathBuf::from("sumgrid_store.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    fn read_table(&self) -> HashMap<String, String> {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(table) = serde_json::from_slice::<HashMap<String, String>>(&bytes) {
                return table;
            }
        }
        HashMap::new()
    }

    fn write_table(&self, table: &HashMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(table).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

impl Default for FileKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read_table().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut table = self.read_table();
        table.insert(key.to_string(), value.to_string());
        self.write_table(&table)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut table = self.read_table();
        if table.remove(key).is_some() {
            self.write_table(&table)?;
        }
        Ok(())
    }
}

/// In-memory store for tests. Clones share the same underlying map so a
/// session and a test can observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    table: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.table.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        self.table
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.table.borrow_mut().remove(key);
        Ok(())
    }
}

/// Wipe config, high scores and saved presets in one go.
pub fn reset_all_data(store: &dyn KvStore) -> io::Result<()> {
    store.remove(&config_key())?;
    store.remove(&scores_key())?;
    store.remove(&saved_presets_key())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_store_roundtrip() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::with_path(dir.path().join("store.json"));
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a"), Some("1".to_string()));
        assert_eq!(store.get("b"), Some("2".to_string()));
    }

    #[test]
    fn file_store_missing_key() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::with_path(dir.path().join("store.json"));
        assert_eq!(store.get("nope"), None);
    }

    #[test]
    fn file_store_overwrites() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::with_path(dir.path().join("store.json"));
        store.set("k", "old").unwrap();
        store.set("k", "new").unwrap();
        assert_eq!(store.get("k"), Some("new".to_string()));
    }

    #[test]
    fn file_store_tolerates_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{ not json").unwrap();
        let store = FileKvStore::with_path(&path);
        assert_eq!(store.get("k"), None);
        // Writing through a corrupt file replaces it with a fresh table
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn file_store_remove() {
        let dir = tempdir().unwrap();
        let store = FileKvStore::with_path(dir.path().join("store.json"));
        store.set("k", "v").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k"), None);
        // Removing an absent key is a no-op
        store.remove("k").unwrap();
    }

    #[test]
    fn memory_store_clones_share_state() {
        let store = MemoryKvStore::new();
        let other = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(other.get("k"), Some("v".to_string()));
    }

    #[test]
    fn reset_all_data_clears_known_keys() {
        let store = MemoryKvStore::new();
        store.set(&config_key(), "{}").unwrap();
        store.set(&scores_key(), "{}").unwrap();
        store.set(&saved_presets_key(), "[]").unwrap();
        store.set("unrelated", "kept").unwrap();

        reset_all_data(&store).unwrap();

        assert_eq!(store.get(&config_key()), None);
        assert_eq!(store.get(&scores_key()), None);
        assert_eq!(store.get(&saved_presets_key()), None);
        assert_eq!(store.get("unrelated"), Some("kept".to_string()));
    }

    #[test]
    fn keys_are_namespaced() {
        assert!(config_key().starts_with(STORAGE_PREFIX));
        assert!(scores_key().starts_with(STORAGE_PREFIX));
        assert!(saved_presets_key().starts_with(STORAGE_PREFIX));
    }
}

use crate::config::GameConfig;
use crate::store::{saved_presets_key, KvStore};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const MAX_SAVED: usize = 4;

/// A named configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedConfig {
    pub id: String,
    pub name: String,
    pub config: GameConfig,
    pub created_at: DateTime<Local>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddError {
    /// the store already holds `MAX_SAVED` entries
    LimitReached,
    /// an entry with a field-equal config exists
    Duplicate,
}

/// Bounded collection of saved presets, newest first.
pub struct PresetStore {
    store: Box<dyn KvStore>,
}

impl PresetStore {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    /// All presets, most recently added first. Malformed data reads as
    /// an empty list.
    pub fn list(&self) -> Vec<SavedConfig> {
        if let Some(raw) = self.store.get(&saved_presets_key()) {
            if let Ok(list) = serde_json::from_str::<Vec<SavedConfig>>(&raw) {
                return list;
            }
        }
        Vec::new()
    }

    fn save_list(&self, list: &[SavedConfig]) {
        let raw = serde_json::to_string(list).unwrap_or_default();
        let _ = self.store.set(&saved_presets_key(), &raw);
    }

    /// Would `add` succeed for this config right now?
    pub fn can_add(&self, cfg: &GameConfig) -> Result<(), AddError> {
        let list = self.list();
        if list.iter().any(|s| s.config == *cfg) {
            return Err(AddError::Duplicate);
        }
        if list.len() >= MAX_SAVED {
            return Err(AddError::LimitReached);
        }
        Ok(())
    }

    /// Prepend a new preset. Duplicate configs (all gameplay fields equal)
    /// and a full store are rejected; the list is truncated to `MAX_SAVED`
    /// after insertion.
    pub fn add(&self, name: &str, cfg: &GameConfig) -> Result<SavedConfig, AddError> {
        self.can_add(cfg)?;
        let mut list = self.list();
        let entry = SavedConfig {
            id: format!("{:016x}", rand::random::<u64>()),
            name: name.to_string(),
            config: *cfg,
            created_at: Local::now(),
        };
        list.insert(0, entry.clone());
        list.truncate(MAX_SAVED);
        self.save_list(&list);
        Ok(entry)
    }

    /// Remove by id; absent ids are a no-op.
    pub fn delete(&self, id: &str) {
        let list: Vec<SavedConfig> = self.list().into_iter().filter(|s| s.id != id).collect();
        self.save_list(&list);
    }
}

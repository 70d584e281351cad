use crate::config::GameConfig;
use crate::store::{scores_key, KvStore};
use itertools::Itertools;
use std::collections::HashMap;

/// Per-configuration best scores, keyed by the config fingerprint and kept
/// in one JSON blob. Only ever written through `update_if_best`, so stored
/// values are monotonically non-decreasing.
pub struct HighScores {
    store: Box<dyn KvStore>,
}

impl HighScores {
    pub fn new(store: Box<dyn KvStore>) -> Self {
        Self { store }
    }

    fn load_table(&self) -> HashMap<String, u32> {
        if let Some(raw) = self.store.get(&scores_key()) {
            if let Ok(table) = serde_json::from_str::<HashMap<String, u32>>(&raw) {
                return table;
            }
        }
        HashMap::new()
    }

    fn save_table(&self, table: &HashMap<String, u32>) {
        let raw = serde_json::to_string(table).unwrap_or_default();
        let _ = self.store.set(&scores_key(), &raw);
    }

    /// Best ever recorded for this configuration, 0 when none.
    pub fn best_for(&self, cfg: &GameConfig) -> u32 {
        self.load_table()
            .get(&cfg.fingerprint())
            .copied()
            .unwrap_or(0)
    }

    /// Persist `max(score, stored)` under the config's fingerprint and
    /// return it.
    pub fn update_if_best(&self, cfg: &GameConfig, score: u32) -> u32 {
        let key = cfg.fingerprint();
        let mut table = self.load_table();
        let best = score.max(table.get(&key).copied().unwrap_or(0));
        table.insert(key, best);
        self.save_table(&table);
        best
    }

    /// All (fingerprint, best) pairs, best first.
    pub fn entries(&self) -> Vec<(String, u32)> {
        self.load_table()
            .into_iter()
            .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
            .collect()
    }
}

use crate::store::{config_key, KvStore};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::io;

pub const GRID_SIZE_OPTIONS: [u8; 3] = [3, 4, 5];
pub const SECONDS_OPTIONS: [u32; 5] = [30, 60, 90, 120, 180];
pub const WRONG_MODE_OPTIONS: [WrongMode; 2] = [WrongMode::Keep, WrongMode::Reroll];
pub const CONTROL_MODE_OPTIONS: [ControlMode; 2] = [ControlMode::Pointer, ControlMode::Keyboard];

/// Board policy after a wrong guess.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WrongMode {
    /// the board stays as-is
    Keep,
    /// the board regenerates immediately
    Reroll,
}

/// Input plumbing only; never consulted by game rules.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ControlMode {
    Pointer,
    Keyboard,
}

/// Pick counts available on a given board size. Larger boards unlock more.
pub fn allowed_picks(grid_size: u8) -> &'static [u8] {
    match grid_size {
        3 => &[3],
        4 => &[3, 4],
        _ => &[3, 4, 5],
    }
}

/// Target ceilings available on a given board size.
pub fn allowed_target_max(grid_size: u8) -> &'static [u32] {
    match grid_size {
        3 => &[20, 25, 30],
        4 => &[20, 25, 30, 35],
        _ => &[20, 25, 30, 35, 40],
    }
}

/// One play mode. `picks_count` and `target_max` must belong to the sets
/// allowed for `grid_size`; `clamped` is the only normalization path and
/// both load and save run it, so a non-conforming combination never leaves
/// this module.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
    pub grid_size: u8,
    pub picks_count: u8,
    pub target_max: u32,
    pub seconds: u32,
    pub wrong_mode: WrongMode,
    pub control_mode: ControlMode,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 3,
            picks_count: 3,
            target_max: 20,
            seconds: 60,
            wrong_mode: WrongMode::Keep,
            control_mode: ControlMode::Pointer,
        }
    }
}

impl GameConfig {
    pub fn cells(&self) -> usize {
        self.grid_size as usize * self.grid_size as usize
    }

    /// Snap to the nearest valid combination. Idempotent.
    pub fn clamped(mut self) -> Self {
        if !GRID_SIZE_OPTIONS.contains(&self.grid_size) {
            self.grid_size = GameConfig::default().grid_size;
        }
        let picks = allowed_picks(self.grid_size);
        if !picks.contains(&self.picks_count) {
            self.picks_count = picks[0];
        }
        let targets = allowed_target_max(self.grid_size);
        if !targets.contains(&self.target_max) {
            self.target_max = targets[0];
        }
        if self.seconds == 0 {
            self.seconds = GameConfig::default().seconds;
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        GRID_SIZE_OPTIONS.contains(&self.grid_size)
            && allowed_picks(self.grid_size).contains(&self.picks_count)
            && allowed_target_max(self.grid_size).contains(&self.target_max)
            && self.seconds > 0
    }

    /// High-score bucketing key. Excludes `control_mode`, which is
    /// presentation-only and must not split score tables.
    pub fn fingerprint(&self) -> String {
        format!(
            "g{}|k{}|t{}|s{}|w{}",
            self.grid_size, self.picks_count, self.target_max, self.seconds, self.wrong_mode
        )
    }
}

pub fn load_config(store: &dyn KvStore) -> GameConfig {
    if let Some(raw) = store.get(&config_key()) {
        if let Ok(cfg) = serde_json::from_str::<GameConfig>(&raw) {
            return cfg.clamped();
        }
    }
    GameConfig::default()
}

pub fn save_config(store: &dyn KvStore, cfg: &GameConfig) -> io::Result<()> {
    let cfg = cfg.clamped();
    let raw = serde_json::to_string(&cfg).unwrap_or_default();
    store.set(&config_key(), &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryKvStore;

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().is_valid());
    }

    #[test]
    fn allowed_sets_grow_with_grid_size() {
        assert!(allowed_picks(3).len() < allowed_picks(4).len());
        assert!(allowed_picks(4).len() < allowed_picks(5).len());
        assert!(allowed_target_max(3).len() < allowed_target_max(4).len());
        assert!(allowed_target_max(4).len() < allowed_target_max(5).len());
    }

    #[test]
    fn clamp_fixes_picks_for_small_grid() {
        let cfg = GameConfig {
            grid_size: 3,
            picks_count: 5,
            ..Default::default()
        };
        let clamped = cfg.clamped();
        assert_eq!(clamped.picks_count, 3);
        assert!(clamped.is_valid());
    }

    #[test]
    fn clamp_fixes_target_max() {
        let cfg = GameConfig {
            grid_size: 4,
            picks_count: 4,
            target_max: 40,
            ..Default::default()
        };
        let clamped = cfg.clamped();
        assert_eq!(clamped.target_max, 20);
        assert!(clamped.is_valid());
    }

    #[test]
    fn clamp_fixes_unknown_grid_size() {
        let cfg = GameConfig {
            grid_size: 7,
            ..Default::default()
        };
        assert_eq!(cfg.clamped().grid_size, 3);
    }

    #[test]
    fn clamp_is_idempotent() {
        for grid_size in [2u8, 3, 4, 5, 9] {
            for picks_count in [2u8, 3, 4, 5, 6] {
                for target_max in [10u32, 20, 25, 35, 40, 99] {
                    let cfg = GameConfig {
                        grid_size,
                        picks_count,
                        target_max,
                        ..Default::default()
                    };
                    let once = cfg.clamped();
                    assert!(once.is_valid(), "clamp must emit a valid config");
                    assert_eq!(once, once.clamped());
                }
            }
        }
    }

    #[test]
    fn fingerprint_ignores_control_mode() {
        let a = GameConfig {
            control_mode: ControlMode::Pointer,
            ..Default::default()
        };
        let b = GameConfig {
            control_mode: ControlMode::Keyboard,
            ..Default::default()
        };
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_differs_on_every_scored_field() {
        let base = GameConfig::default();
        let variants = [
            GameConfig {
                grid_size: 4,
                ..base
            },
            GameConfig {
                grid_size: 4,
                picks_count: 4,
                ..base
            },
            GameConfig {
                target_max: 25,
                ..base
            },
            GameConfig {
                seconds: 90,
                ..base
            },
            GameConfig {
                wrong_mode: WrongMode::Reroll,
                ..base
            },
        ];
        for v in variants {
            assert_ne!(base.fingerprint(), v.fingerprint(), "{v:?}");
        }
    }

    #[test]
    fn load_missing_returns_default() {
        let store = MemoryKvStore::new();
        assert_eq!(load_config(&store), GameConfig::default());
    }

    #[test]
    fn load_malformed_returns_default() {
        let store = MemoryKvStore::new();
        store.set(&config_key(), "not json at all").unwrap();
        assert_eq!(load_config(&store), GameConfig::default());
    }

    #[test]
    fn load_partial_blob_fills_defaults() {
        let store = MemoryKvStore::new();
        store
            .set(&config_key(), r#"{"grid_size":5,"picks_count":5}"#)
            .unwrap();
        let cfg = load_config(&store);
        assert_eq!(cfg.grid_size, 5);
        assert_eq!(cfg.picks_count, 5);
        assert_eq!(cfg.seconds, GameConfig::default().seconds);
        assert!(cfg.is_valid());
    }

    #[test]
    fn load_ignores_unknown_fields() {
        let store = MemoryKvStore::new();
        store
            .set(&config_key(), r#"{"grid_size":4,"future_field":true}"#)
            .unwrap();
        assert_eq!(load_config(&store).grid_size, 4);
    }

    #[test]
    fn load_clamps_nonconforming_blob() {
        let store = MemoryKvStore::new();
        store
            .set(
                &config_key(),
                r#"{"grid_size":3,"picks_count":5,"target_max":40}"#,
            )
            .unwrap();
        let cfg = load_config(&store);
        assert_eq!(cfg.picks_count, 3);
        assert_eq!(cfg.target_max, 20);
    }

    #[test]
    fn save_clamps_before_persisting() {
        let store = MemoryKvStore::new();
        let cfg = GameConfig {
            grid_size: 3,
            picks_count: 5,
            target_max: 40,
            ..Default::default()
        };
        save_config(&store, &cfg).unwrap();
        let loaded = load_config(&store);
        assert!(loaded.is_valid());
        assert_eq!(loaded, cfg.clamped());
    }

    #[test]
    fn save_load_roundtrip() {
        let store = MemoryKvStore::new();
        let cfg = GameConfig {
            grid_size: 5,
            picks_count: 4,
            target_max: 35,
            seconds: 120,
            wrong_mode: WrongMode::Reroll,
            control_mode: ControlMode::Keyboard,
        };
        save_config(&store, &cfg).unwrap();
        assert_eq!(load_config(&store), cfg);
    }

    #[test]
    fn wrong_mode_display_is_lowercase() {
        assert_eq!(WrongMode::Keep.to_string(), "keep");
        assert_eq!(WrongMode::Reroll.to_string(), "reroll");
        assert_eq!(ControlMode::Pointer.to_string(), "pointer");
    }
}

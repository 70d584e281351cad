use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// JSON key-value store (config, scores, presets).
    pub fn store_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sumgrid")
            .map(|proj_dirs| proj_dirs.config_dir().join("store.json"))
    }

    /// Session history database under $HOME/.local/state/sumgrid.
    pub fn db_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("sumgrid");
            Some(state_dir.join("history.db"))
        } else {
            ProjectDirs::from("", "", "sumgrid")
                .map(|proj_dirs| proj_dirs.data_local_dir().join("history.db"))
        }
    }
}

//! Runtime configuration for the projection engine.

use crate::{DB_PATH_ENV_VAR, MODEL_DIR_ENV_VAR};
use std::path::PathBuf;

/// Engine configuration: where the stat store lives and where model
/// artifacts are persisted.
#[derive(Debug, Clone)]
pub struct GamedayConfig {
    pub db_path: PathBuf,
    pub model_dir: PathBuf,
}

impl Default for GamedayConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/nfl_fantasy.db"),
            model_dir: PathBuf::from("data/models"),
        }
    }
}

impl GamedayConfig {
    /// Build configuration from the environment, falling back to defaults.
    ///
    /// `NFL_GAMEDAY_DB` overrides the database path and
    /// `NFL_GAMEDAY_MODEL_DIR` the artifact base directory.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var(DB_PATH_ENV_VAR) {
            if !path.is_empty() {
                config.db_path = PathBuf::from(path);
            }
        }
        if let Ok(dir) = std::env::var(MODEL_DIR_ENV_VAR) {
            if !dir.is_empty() {
                config.model_dir = PathBuf::from(dir);
            }
        }
        config
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }
}

//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Crate-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AircastConfig {
    /// Directory holding one artifact file per variant plus the latest alias
    pub model_dir: PathBuf,
}

impl Default for AircastConfig {
    fn default() -> Self {
        Self {
            model_dir: std::env::var("AIRCAST_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./models")),
        }
    }
}

impl AircastConfig {
    pub fn with_model_dir(model_dir: impl Into<PathBuf>) -> Self {
        Self { model_dir: model_dir.into() }
    }
}

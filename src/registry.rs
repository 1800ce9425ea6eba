//! Model registry: selector resolution and artifact caching
//!
//! Resolves variant selectors to artifact paths under a model directory and
//! owns the process-wide cache of loaded artifacts. The cache is explicit —
//! no file watching; a retrain becomes visible through `invalidate`/`reload`
//! or a process restart, so "latest" is eventually consistent.

use crate::error::{AircastError, Result};
use crate::model::ModelArtifact;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

pub const RF_ARTIFACT: &str = "rf_model.bin";
pub const GBM_ARTIFACT: &str = "gbm_model.bin";
pub const LATEST_ARTIFACT: &str = "latest_model.bin";

/// Which trained variant a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantSelector {
    Rf,
    Gbm,
    /// Alias pointer updated after each training run
    Latest,
}

impl Default for VariantSelector {
    fn default() -> Self {
        VariantSelector::Latest
    }
}

impl FromStr for VariantSelector {
    type Err = AircastError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rf" => Ok(VariantSelector::Rf),
            "gbm" => Ok(VariantSelector::Gbm),
            "latest" => Ok(VariantSelector::Latest),
            other => Err(AircastError::InvalidInput(format!(
                "unknown model variant '{other}' (expected rf, gbm, or latest)"
            ))),
        }
    }
}

impl std::fmt::Display for VariantSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VariantSelector::Rf => "rf",
            VariantSelector::Gbm => "gbm",
            VariantSelector::Latest => "latest",
        };
        f.write_str(name)
    }
}

/// Process-wide artifact cache keyed by resolved path.
#[derive(Debug)]
pub struct ModelRegistry {
    model_dir: PathBuf,
    cache: RwLock<HashMap<PathBuf, Arc<ModelArtifact>>>,
}

impl ModelRegistry {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Artifact path a selector resolves to.
    pub fn path_for(&self, selector: VariantSelector) -> PathBuf {
        let file = match selector {
            VariantSelector::Rf => RF_ARTIFACT,
            VariantSelector::Gbm => GBM_ARTIFACT,
            VariantSelector::Latest => LATEST_ARTIFACT,
        };
        self.model_dir.join(file)
    }

    /// Resident artifact for a selector, loading and caching on miss.
    ///
    /// A selector whose artifact cannot be loaded is a serving failure, so
    /// the missing-file case surfaces as `ModelNotLoaded` here.
    pub fn artifact(&self, selector: VariantSelector) -> Result<Arc<ModelArtifact>> {
        let path = self.path_for(selector);

        if let Some(artifact) = self.cache.read().get(&path) {
            return Ok(Arc::clone(artifact));
        }

        let artifact = Arc::new(ModelArtifact::load(&path).map_err(|e| {
            AircastError::ModelNotLoaded(format!(
                "no loadable artifact for '{selector}' at {}: {e}",
                path.display()
            ))
        })?);

        self.cache.write().insert(path, Arc::clone(&artifact));
        tracing::debug!(variant = %selector, "cached model artifact");
        Ok(artifact)
    }

    /// Drop a selector's cached artifact; the next use reloads from disk.
    pub fn invalidate(&self, selector: VariantSelector) {
        self.cache.write().remove(&self.path_for(selector));
    }

    /// Force a fresh load from disk, replacing any cached artifact.
    pub fn reload(&self, selector: VariantSelector) -> Result<Arc<ModelArtifact>> {
        self.invalidate(selector);
        self.artifact(selector)
    }

    /// Drop every cached artifact.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_parsing() {
        assert_eq!("rf".parse::<VariantSelector>().unwrap(), VariantSelector::Rf);
        assert_eq!("gbm".parse::<VariantSelector>().unwrap(), VariantSelector::Gbm);
        assert_eq!("latest".parse::<VariantSelector>().unwrap(), VariantSelector::Latest);
        assert!(matches!(
            "xgboost".parse::<VariantSelector>(),
            Err(AircastError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_path_resolution() {
        let registry = ModelRegistry::new("/models");
        assert_eq!(registry.path_for(VariantSelector::Rf), PathBuf::from("/models/rf_model.bin"));
        assert_eq!(
            registry.path_for(VariantSelector::Latest),
            PathBuf::from("/models/latest_model.bin")
        );
    }

    #[test]
    fn test_missing_artifact_is_model_not_loaded() {
        let registry = ModelRegistry::new("/nonexistent-dir");
        let err = registry.artifact(VariantSelector::Latest).unwrap_err();
        assert!(matches!(err, AircastError::ModelNotLoaded(_)));
    }
}

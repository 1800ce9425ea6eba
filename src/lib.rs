//! Aircast - air-quality prediction core
//!
//! Turns partially-missing sensor/grid observations into PM2.5 predictions
//! with uncertainty and a derived index, plus per-feature explanations.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`features`] - Observation encoding, the canonical feature order
//! - [`preprocessing`] - Mean imputation and standardization
//! - [`training`] - Random forest and gradient-boosted regressors
//! - [`model`] - Model variants, pipelines, artifact persistence
//! - [`explain`] - Decision-path attribution of single predictions
//!
//! ## Orchestration & serving
//! - [`trainer`] - Training runs and the "latest" alias
//! - [`registry`] - Selector resolution, process-wide artifact cache
//! - [`service`] - Prediction / explanation / batch entry points
//!
//! ## Edges
//! - [`store`] - Grid cell storage seam toward the CRUD layer
//! - [`dataset`] - CSV grid ingestion
//! - [`config`] - Runtime configuration

pub mod error;

pub mod config;
pub mod dataset;
pub mod explain;
pub mod features;
pub mod model;
pub mod preprocessing;
pub mod registry;
pub mod service;
pub mod store;
pub mod trainer;
pub mod training;

pub use error::{AircastError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::AircastConfig;
    pub use crate::error::{AircastError, Result};
    pub use crate::explain::{Explanation, FeatureAttribution};
    pub use crate::features::{vectorize, vectorize_rows, Observation, FEATURE_NAMES, N_FEATURES};
    pub use crate::model::{
        AirQualityModel, ModelArtifact, PredictionResult, RegressorKind, VariantConfig, AQI_SCALE,
    };
    pub use crate::registry::{ModelRegistry, VariantSelector};
    pub use crate::service::{
        AirQualityService, CellExplanation, PredictionRequest, PredictionResponse,
    };
    pub use crate::store::{GridCell, GridStore, MemoryStore, PredictionRecord};
    pub use crate::trainer::{train_all, TrainingReport};
}

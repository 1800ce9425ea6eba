//! Model variant: pipeline, artifact persistence, prediction postprocessing
//!
//! One variant type parametrized by [`VariantConfig`] replaces the
//! subclass-per-algorithm arrangement: the two variants differ only in
//! regressor kind and uncertainty calibration.

use crate::error::{AircastError, Result};
use crate::explain::Explanation;
use crate::features::{self, Observation, FEATURE_NAMES};
use crate::preprocessing::{MeanImputer, StandardScaler};
use crate::training::{BoostedRegressor, BoostingConfig, ForestRegressor};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Simplified PM2.5 → AQI conversion factor.
pub const AQI_SCALE: f64 = 4.0;

/// Regressor algorithm backing a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegressorKind {
    RandomForest,
    GradientBoosted,
}

/// Static configuration of one model variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantConfig {
    pub kind: RegressorKind,
    /// Fraction of the predicted value reported as uncertainty
    pub uncertainty_fraction: f64,
    /// Whether the regressor kind supports structural attribution
    pub supports_attribution: bool,
}

impl VariantConfig {
    pub fn random_forest() -> Self {
        Self {
            kind: RegressorKind::RandomForest,
            uncertainty_fraction: 0.10,
            supports_attribution: true,
        }
    }

    /// Nominally tighter-calibrated than the forest variant.
    pub fn gradient_boosted() -> Self {
        Self {
            kind: RegressorKind::GradientBoosted,
            uncertainty_fraction: 0.08,
            supports_attribution: true,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            RegressorKind::RandomForest => "rf",
            RegressorKind::GradientBoosted => "gbm",
        }
    }
}

/// Fitted regressor of either kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Regressor {
    Forest(ForestRegressor),
    Boosted(BoostedRegressor),
}

impl Regressor {
    fn fit(kind: RegressorKind, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        match kind {
            RegressorKind::RandomForest => {
                let mut rf = ForestRegressor::new(100)
                    .with_max_depth(10)
                    .with_random_state(42);
                rf.fit(x, y)?;
                Ok(Regressor::Forest(rf))
            }
            RegressorKind::GradientBoosted => {
                let mut gbm = BoostedRegressor::new(BoostingConfig::default());
                gbm.fit(x, y)?;
                Ok(Regressor::Boosted(gbm))
            }
        }
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        match self {
            Regressor::Forest(rf) => rf.predict_row(row),
            Regressor::Boosted(gbm) => gbm.predict_row(row),
        }
    }

    fn path_contributions(&self, row: ArrayView1<f64>) -> Result<(f64, Vec<f64>)> {
        match self {
            Regressor::Forest(rf) => rf.path_contributions(row),
            Regressor::Boosted(gbm) => gbm.path_contributions(row),
        }
    }
}

/// Fitted imputer → scaler → regressor chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPipeline {
    imputer: MeanImputer,
    scaler: StandardScaler,
    regressor: Regressor,
}

impl ModelPipeline {
    /// Fit all stages in order on training data.
    pub fn fit(kind: RegressorKind, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(AircastError::Training("empty feature matrix".to_string()));
        }
        if x.nrows() != y.len() {
            return Err(AircastError::Training(format!(
                "feature matrix has {} rows but target has {} values",
                x.nrows(),
                y.len()
            )));
        }

        let mut imputer = MeanImputer::new();
        let x_imputed = imputer.fit_transform(x)?;
        let mut scaler = StandardScaler::new();
        let x_scaled = scaler.fit_transform(&x_imputed)?;
        let regressor = Regressor::fit(kind, &x_scaled, y)?;

        Ok(Self { imputer, scaler, regressor })
    }

    /// Transform one raw feature vector through the fitted stages.
    fn preprocess_row(&self, row: &Array1<f64>) -> Result<Array1<f64>> {
        let matrix = row.clone().insert_axis(ndarray::Axis(0));
        let imputed = self.imputer.transform(&matrix)?;
        let scaled = self.scaler.transform(&imputed)?;
        Ok(scaled.row(0).to_owned())
    }

    /// Raw regressor output for one observation (no clamping).
    pub fn predict_raw(&self, obs: &Observation) -> Result<f64> {
        let row = features::vectorize(obs)?;
        let processed = self.preprocess_row(&row)?;
        self.regressor.predict_row(processed.view())
    }

    /// Decision-path attribution for one observation.
    pub fn contributions(&self, obs: &Observation) -> Result<(f64, Vec<f64>)> {
        let row = features::vectorize(obs)?;
        let processed = self.preprocess_row(&row)?;
        self.regressor.path_contributions(processed.view())
    }
}

/// Predicted concentration with derived index and uncertainty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// PM2.5 concentration, clamped to >= 0
    pub pm25: f64,
    /// Simplified air-quality index: round(pm25 * 4.0)
    pub aqi: i64,
    /// pm25 * variant uncertainty fraction
    pub uncertainty: f64,
}

/// The persisted, trained state of one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub variant: String,
    pub uncertainty_fraction: f64,
    pub supports_attribution: bool,
    pub feature_names: Vec<String>,
    pub n_samples: usize,
    pub trained_at: DateTime<Utc>,
    pipeline: ModelPipeline,
}

impl ModelArtifact {
    /// Train a fresh artifact for the given variant.
    pub fn train(config: &VariantConfig, x: &Array2<f64>, y: &Array1<f64>) -> Result<Self> {
        let pipeline = ModelPipeline::fit(config.kind, x, y)?;
        tracing::info!(variant = config.name(), samples = x.nrows(), "trained model variant");
        Ok(Self {
            variant: config.name().to_string(),
            uncertainty_fraction: config.uncertainty_fraction,
            supports_attribution: config.supports_attribution,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            n_samples: x.nrows(),
            trained_at: Utc::now(),
            pipeline,
        })
    }

    /// Predict one observation: clamp, derive AQI, attach uncertainty.
    pub fn predict(&self, obs: &Observation) -> Result<PredictionResult> {
        let raw = self.pipeline.predict_raw(obs)?;
        let pm25 = raw.max(0.0);
        Ok(PredictionResult {
            pm25,
            aqi: (pm25 * AQI_SCALE).round() as i64,
            uncertainty: pm25 * self.uncertainty_fraction,
        })
    }

    /// Attribute one prediction to its features.
    pub fn explain(&self, obs: &Observation) -> Result<Explanation> {
        if !self.supports_attribution {
            return Err(AircastError::ExplanationUnavailable(format!(
                "variant '{}' does not support structural attribution",
                self.variant
            )));
        }

        let (base_value, attributions) = self.pipeline.contributions(obs)?;
        let prediction = base_value + attributions.iter().sum::<f64>();
        Ok(Explanation {
            feature_names: self.feature_names.clone(),
            attributions,
            base_value,
            prediction,
        })
    }

    /// Persist to `path` atomically: artifacts are replaced wholesale, never
    /// observed half-written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = bincode::serialize(self)
            .map_err(|e| AircastError::Serialization(format!("failed to encode artifact: {e}")))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;

        tracing::debug!(variant = %self.variant, path = %path.display(), "saved model artifact");
        Ok(())
    }

    /// Restore from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AircastError::ArtifactNotFound(path.to_path_buf()));
        }
        let bytes = fs::read(path)?;
        let artifact: Self = bincode::deserialize(&bytes)
            .map_err(|e| AircastError::Serialization(format!("failed to decode artifact: {e}")))?;
        tracing::debug!(variant = %artifact.variant, path = %path.display(), "loaded model artifact");
        Ok(artifact)
    }
}

/// One model variant bound to an artifact path.
///
/// Owns the full lifecycle: train → save, or lazy load → predict/explain.
#[derive(Debug)]
pub struct AirQualityModel {
    config: VariantConfig,
    path: PathBuf,
    artifact: Option<ModelArtifact>,
}

impl AirQualityModel {
    pub fn new(config: VariantConfig, path: impl Into<PathBuf>) -> Self {
        Self { config, path: path.into(), artifact: None }
    }

    pub fn config(&self) -> &VariantConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    /// Train on a feature matrix and target vector.
    pub fn train(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.artifact = Some(ModelArtifact::train(&self.config, x, y)?);
        Ok(())
    }

    /// Persist the trained artifact to the configured path.
    pub fn save(&self) -> Result<()> {
        let artifact = self.artifact.as_ref().ok_or_else(|| {
            AircastError::ModelNotLoaded(format!("variant '{}' has not been trained", self.config.name()))
        })?;
        artifact.save(&self.path)
    }

    /// Load the artifact from the configured path.
    pub fn load(&mut self) -> Result<()> {
        self.artifact = Some(ModelArtifact::load(&self.path)?);
        Ok(())
    }

    fn ensure_loaded(&mut self) -> Result<&ModelArtifact> {
        if self.artifact.is_none() {
            self.load().map_err(|e| {
                AircastError::ModelNotLoaded(format!(
                    "variant '{}' has no loadable artifact at {}: {e}",
                    self.config.name(),
                    self.path.display()
                ))
            })?;
        }
        Ok(self.artifact.as_ref().unwrap())
    }

    /// Predict one observation, lazily loading the artifact on first use.
    pub fn predict(&mut self, obs: &Observation) -> Result<PredictionResult> {
        self.ensure_loaded()?.predict(obs)
    }

    /// Explain one observation, lazily loading the artifact on first use.
    pub fn explain(&mut self, obs: &Observation) -> Result<Explanation> {
        self.ensure_loaded()?.explain(obs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::N_FEATURES;

    fn training_data(n: usize) -> (Array2<f64>, Array1<f64>) {
        // pm25 driven by temperature (column 3)
        let x = Array2::from_shape_fn((n, N_FEATURES), |(i, j)| match j {
            0 => 40.0 + i as f64 * 0.01,
            1 => -74.0 + i as f64 * 0.01,
            3 => 10.0 + (i % 25) as f64,
            _ => (i % 7) as f64,
        });
        let y = Array1::from_shape_fn(n, |i| 2.0 * (10.0 + (i % 25) as f64));
        (x, y)
    }

    fn observation() -> Observation {
        Observation::at(40.5, -73.5)
            .with("temperature", 20.0)
            .with("humidity", 3.0)
    }

    #[test]
    fn test_predict_clamps_and_derives() {
        let (x, y) = training_data(50);
        let artifact = ModelArtifact::train(&VariantConfig::random_forest(), &x, &y).unwrap();
        let result = artifact.predict(&observation()).unwrap();

        assert!(result.pm25 >= 0.0);
        assert!(result.pm25.is_finite());
        assert_eq!(result.aqi, (result.pm25 * AQI_SCALE).round() as i64);
        assert!((result.uncertainty - result.pm25 * 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_gbm_uncertainty_fraction() {
        let (x, y) = training_data(50);
        let artifact = ModelArtifact::train(&VariantConfig::gradient_boosted(), &x, &y).unwrap();
        let result = artifact.predict(&observation()).unwrap();
        assert!((result.uncertainty - result.pm25 * 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_explain_additivity() {
        let (x, y) = training_data(60);
        let artifact = ModelArtifact::train(&VariantConfig::gradient_boosted(), &x, &y).unwrap();

        let explanation = artifact.explain(&observation()).unwrap();
        assert_eq!(explanation.feature_names.len(), N_FEATURES);
        let residual =
            explanation.base_value + explanation.sum_attributions() - explanation.prediction;
        assert!(residual.abs() < 1e-6, "additivity violated: {residual}");

        // The explained prediction is the raw pipeline output; with a
        // positive target it matches the clamped prediction exactly
        let predicted = artifact.predict(&observation()).unwrap();
        assert!((explanation.prediction - predicted.pm25).abs() < 1e-9);
    }

    #[test]
    fn test_explain_unsupported_kind() {
        let (x, y) = training_data(40);
        let config = VariantConfig {
            supports_attribution: false,
            ..VariantConfig::random_forest()
        };
        let artifact = ModelArtifact::train(&config, &x, &y).unwrap();
        let err = artifact.explain(&observation()).unwrap_err();
        assert!(matches!(err, AircastError::ExplanationUnavailable(_)));
    }

    #[test]
    fn test_negative_raw_output_clamped_to_zero() {
        let (x, _) = training_data(50);
        // All-negative targets force a negative raw regressor output
        let y = Array1::from_elem(50, -25.0);
        let artifact = ModelArtifact::train(&VariantConfig::gradient_boosted(), &x, &y).unwrap();

        let result = artifact.predict(&observation()).unwrap();
        assert_eq!(result.pm25, 0.0);
        assert_eq!(result.aqi, 0);
        assert_eq!(result.uncertainty, 0.0);
    }

    #[test]
    fn test_train_shape_mismatch() {
        let x = Array2::<f64>::zeros((3, N_FEATURES));
        let y = Array1::<f64>::zeros(4);
        let mut model = AirQualityModel::new(VariantConfig::random_forest(), "/tmp/unused.bin");
        assert!(matches!(model.train(&x, &y), Err(AircastError::Training(_))));
    }

    #[test]
    fn test_train_empty_matrix() {
        let x = Array2::<f64>::zeros((0, N_FEATURES));
        let y = Array1::<f64>::zeros(0);
        let mut model = AirQualityModel::new(VariantConfig::random_forest(), "/tmp/unused.bin");
        assert!(matches!(model.train(&x, &y), Err(AircastError::Training(_))));
    }

    #[test]
    fn test_missing_attributes_still_predict() {
        let (x, y) = training_data(50);
        let artifact = ModelArtifact::train(&VariantConfig::random_forest(), &x, &y).unwrap();
        let result = artifact.predict(&Observation::at(40.71, -74.0)).unwrap();
        assert!(result.pm25.is_finite());
        assert!(result.pm25 >= 0.0);
    }
}

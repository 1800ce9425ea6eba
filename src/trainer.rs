//! Training orchestrator
//!
//! Pulls labeled grid cells, trains every variant, persists each artifact,
//! and republishes the chosen best variant under the "latest" alias. The
//! alias is only updated after every variant trained and saved successfully,
//! so a failed run leaves the previously published "latest" untouched.

use crate::config::AircastConfig;
use crate::error::{AircastError, Result};
use crate::features::{vectorize_rows, Observation};
use crate::model::{AirQualityModel, VariantConfig};
use crate::registry::{ModelRegistry, VariantSelector};
use crate::store::GridStore;
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub rf_path: PathBuf,
    pub gbm_path: PathBuf,
    pub latest_path: PathBuf,
    pub samples: usize,
    pub completed_at: DateTime<Utc>,
}

/// Labeled training matrix extracted from a store.
fn labeled_matrix(
    store: &dyn GridStore,
    dataset: Option<&str>,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let cells = store.cells(dataset)?;

    let mut observations: Vec<Observation> = Vec::new();
    let mut targets: Vec<f64> = Vec::new();
    for cell in &cells {
        // Unlabeled cells are excluded, not errors
        if let Some(pm25) = cell.pm25 {
            observations.push(cell.observation());
            targets.push(pm25);
        }
    }

    if observations.is_empty() {
        return Err(AircastError::InsufficientData(format!(
            "no labeled grid cells in dataset {}",
            dataset.unwrap_or("<most recent>")
        )));
    }

    let x = vectorize_rows(&observations)?;
    let y = Array1::from_vec(targets);
    Ok((x, y))
}

/// Train all variants on a dataset and publish the best as "latest".
///
/// Selection policy: the gradient-boosted variant is always published as
/// best; no held-out evaluation happens here.
pub fn train_all(
    store: &dyn GridStore,
    dataset: Option<&str>,
    config: &AircastConfig,
) -> Result<TrainingReport> {
    let (x, y) = labeled_matrix(store, dataset)?;
    let samples = x.nrows();
    tracing::info!(samples, dataset = dataset.unwrap_or("<most recent>"), "starting training run");

    let registry = ModelRegistry::new(&config.model_dir);

    let mut rf = AirQualityModel::new(
        VariantConfig::random_forest(),
        registry.path_for(VariantSelector::Rf),
    );
    rf.train(&x, &y)?;
    rf.save()?;

    let mut gbm = AirQualityModel::new(
        VariantConfig::gradient_boosted(),
        registry.path_for(VariantSelector::Gbm),
    );
    gbm.train(&x, &y)?;
    gbm.save()?;

    // Publish the best variant under the latest alias
    let best = &gbm;
    let latest_path = registry.path_for(VariantSelector::Latest);
    best.artifact()
        .ok_or_else(|| AircastError::ModelNotLoaded("best variant lost its artifact".to_string()))?
        .save(&latest_path)?;
    tracing::info!(best = best.config().name(), "published latest model alias");

    Ok(TrainingReport {
        rf_path: rf.path().to_path_buf(),
        gbm_path: gbm.path().to_path_buf(),
        latest_path,
        samples,
        completed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{GridCell, MemoryStore};
    use chrono::TimeZone;

    fn labeled_cell(id: u64, temp: f64, pm25: Option<f64>) -> GridCell {
        GridCell {
            id,
            dataset: "test".to_string(),
            lat: 40.0 + id as f64 * 0.01,
            lon: -74.0,
            elevation: Some(10.0),
            temperature: Some(temp),
            humidity: Some(50.0),
            wind_speed: Some(2.0),
            wind_direction: Some(90.0),
            pm25,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_no_labeled_cells_is_insufficient_data() {
        let store = MemoryStore::with_cells(vec![
            labeled_cell(1, 15.0, None),
            labeled_cell(2, 18.0, None),
        ]);
        let config = AircastConfig { model_dir: PathBuf::from("/tmp/never-used") };
        let err = train_all(&store, Some("test"), &config).unwrap_err();
        assert!(matches!(err, AircastError::InsufficientData(_)));
    }

    #[test]
    fn test_unlabeled_cells_excluded() {
        let mut cells: Vec<GridCell> = (0..20)
            .map(|i| labeled_cell(i, 10.0 + i as f64, Some(2.0 * (10.0 + i as f64))))
            .collect();
        cells.push(labeled_cell(99, 30.0, None));
        let store = MemoryStore::with_cells(cells);

        let dir = tempfile::tempdir().unwrap();
        let config = AircastConfig { model_dir: dir.path().to_path_buf() };
        let report = train_all(&store, Some("test"), &config).unwrap();
        assert_eq!(report.samples, 20);
        assert!(report.rf_path.exists());
        assert!(report.gbm_path.exists());
        assert!(report.latest_path.exists());
    }
}

//! Prediction, explanation, and batch entry points

use crate::error::Result;
use crate::explain::Explanation;
use crate::features::Observation;
use crate::registry::{ModelRegistry, VariantSelector};
use crate::store::{GridStore, PredictionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One prediction request for a location and current conditions.
///
/// Only the location is required; absent conditions are missing attributes
/// for the pipeline, not validation errors. Calendar features are derived
/// from `timestamp` when given, and left missing (imputed) when it is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub variant: VariantSelector,
}

impl PredictionRequest {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
            temperature: None,
            humidity: None,
            wind_speed: None,
            wind_direction: None,
            timestamp: None,
            variant: VariantSelector::default(),
        }
    }

    fn observation(&self) -> Observation {
        let observation = Observation::at(self.lat, self.lon)
            .with_opt("elevation", self.elevation)
            .with_opt("temperature", self.temperature)
            .with_opt("humidity", self.humidity)
            .with_opt("wind_speed", self.wind_speed)
            .with_opt("wind_direction", self.wind_direction);
        match self.timestamp {
            Some(ts) => observation.with_timestamp(ts),
            None => observation,
        }
    }
}

/// Prediction response with the request's location echoed back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub pm25: f64,
    pub aqi: i64,
    pub uncertainty: f64,
    pub lat: f64,
    pub lon: f64,
    pub variant: String,
    pub timestamp: DateTime<Utc>,
}

/// Explanation of one grid cell's prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellExplanation {
    pub cell_id: u64,
    pub variant: String,
    pub explanation: Explanation,
}

/// Serving facade over the model registry.
#[derive(Debug)]
pub struct AirQualityService {
    registry: ModelRegistry,
}

impl AirQualityService {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Predict for one location under current conditions.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let artifact = self.registry.artifact(request.variant)?;
        let result = artifact.predict(&request.observation())?;

        Ok(PredictionResponse {
            pm25: result.pm25,
            aqi: result.aqi,
            uncertainty: result.uncertainty,
            lat: request.lat,
            lon: request.lon,
            variant: request.variant.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Explain the prediction for one grid cell.
    pub fn explain_cell(
        &self,
        store: &dyn GridStore,
        cell_id: u64,
        variant: VariantSelector,
    ) -> Result<CellExplanation> {
        let cell = store.cell(cell_id)?;
        let artifact = self.registry.artifact(variant)?;
        let explanation = artifact.explain(&cell.observation())?;

        Ok(CellExplanation {
            cell_id,
            variant: variant.to_string(),
            explanation,
        })
    }

    /// Predict every grid cell of a dataset, persisting one record per cell.
    ///
    /// Results follow the order cells are supplied by the store.
    pub fn predict_dataset(
        &self,
        store: &dyn GridStore,
        dataset: Option<&str>,
        variant: VariantSelector,
    ) -> Result<Vec<PredictionRecord>> {
        let cells = store.cells(dataset)?;
        let artifact = self.registry.artifact(variant)?;

        let mut records = Vec::with_capacity(cells.len());
        for cell in &cells {
            let result = artifact.predict(&cell.observation())?;
            let record = PredictionRecord {
                cell_id: cell.id,
                pm25: result.pm25,
                aqi: result.aqi,
                uncertainty: result.uncertainty,
                variant: variant.to_string(),
                timestamp: Utc::now(),
            };
            store.record_prediction(&record)?;
            records.push(record);
        }

        tracing::info!(
            cells = records.len(),
            variant = %variant,
            "batch prediction complete"
        );
        Ok(records)
    }
}

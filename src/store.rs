//! Storage seam toward the surrounding CRUD layer
//!
//! The core only needs grid cells as observation sources and prediction
//! sinks; everything else about datasets, sensors, and ingestion jobs stays
//! on the other side of [`GridStore`].

use crate::error::{AircastError, Result};
use crate::features::Observation;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One grid cell at one timestamp.
///
/// `pm25` is the ground-truth label where known; unlabeled cells are
/// prediction targets only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridCell {
    pub id: u64,
    pub dataset: String,
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub pm25: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl GridCell {
    /// Build the observation for this cell, calendar features included.
    pub fn observation(&self) -> Observation {
        Observation::at(self.lat, self.lon)
            .with_opt("elevation", self.elevation)
            .with_opt("temperature", self.temperature)
            .with_opt("humidity", self.humidity)
            .with_opt("wind_speed", self.wind_speed)
            .with_opt("wind_direction", self.wind_direction)
            .with_timestamp(self.timestamp)
    }
}

/// Persisted prediction row for one grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub cell_id: u64,
    pub pm25: f64,
    pub aqi: i64,
    pub uncertainty: f64,
    pub variant: String,
    pub timestamp: DateTime<Utc>,
}

/// The slice of the persistence layer the prediction core consumes.
pub trait GridStore: Send + Sync {
    /// All cells of a dataset, or of the most recent dataset when `None`.
    fn cells(&self, dataset: Option<&str>) -> Result<Vec<GridCell>>;

    /// Resolve a single cell by id.
    fn cell(&self, id: u64) -> Result<GridCell>;

    /// Persist one prediction result.
    fn record_prediction(&self, record: &PredictionRecord) -> Result<()>;
}

/// In-memory store: tests and file-backed use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cells: RwLock<Vec<GridCell>>,
    predictions: RwLock<HashMap<u64, Vec<PredictionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cells(cells: Vec<GridCell>) -> Self {
        Self {
            cells: RwLock::new(cells),
            predictions: RwLock::new(HashMap::new()),
        }
    }

    pub fn insert_cell(&self, cell: GridCell) {
        self.cells.write().push(cell);
    }

    pub fn predictions_for(&self, cell_id: u64) -> Vec<PredictionRecord> {
        self.predictions
            .read()
            .get(&cell_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl GridStore for MemoryStore {
    fn cells(&self, dataset: Option<&str>) -> Result<Vec<GridCell>> {
        let cells = self.cells.read();
        let out: Vec<GridCell> = match dataset {
            Some(name) => cells.iter().filter(|c| c.dataset == name).cloned().collect(),
            None => cells.clone(),
        };
        Ok(out)
    }

    fn cell(&self, id: u64) -> Result<GridCell> {
        self.cells
            .read()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| AircastError::NotFound(format!("grid cell {id}")))
    }

    fn record_prediction(&self, record: &PredictionRecord) -> Result<()> {
        self.predictions
            .write()
            .entry(record.cell_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cell(id: u64, dataset: &str) -> GridCell {
        GridCell {
            id,
            dataset: dataset.to_string(),
            lat: 40.0,
            lon: -74.0,
            elevation: Some(5.0),
            temperature: Some(20.0),
            humidity: None,
            wind_speed: None,
            wind_direction: None,
            pm25: Some(12.0),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_dataset_filter() {
        let store = MemoryStore::with_cells(vec![cell(1, "a"), cell(2, "b"), cell(3, "a")]);
        assert_eq!(store.cells(Some("a")).unwrap().len(), 2);
        assert_eq!(store.cells(None).unwrap().len(), 3);
    }

    #[test]
    fn test_cell_lookup() {
        let store = MemoryStore::with_cells(vec![cell(7, "a")]);
        assert_eq!(store.cell(7).unwrap().id, 7);
        assert!(matches!(store.cell(9), Err(AircastError::NotFound(_))));
    }

    #[test]
    fn test_observation_includes_calendar() {
        let c = cell(1, "a");
        let obs = c.observation();
        // 2024-06-03 was a Monday
        assert_eq!(obs.get("is_weekend").unwrap().as_f64(), Some(0.0));
        assert_eq!(obs.get("hour").unwrap().as_f64(), Some(9.0));
        assert!(obs.get("humidity").is_none());
    }
}

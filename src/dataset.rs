//! CSV grid ingestion
//!
//! Loads grid cells from a CSV file into memory, one row per cell. Required
//! columns: `lat`, `lon`, `timestamp` (RFC 3339 or epoch seconds). Optional
//! numeric columns
//! (`elevation`, `temperature`, `humidity`, `wind_speed`, `wind_direction`,
//! `pm25`) map to `None` when the column is absent or a value is null.

use crate::error::{AircastError, Result};
use crate::store::GridCell;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::path::Path;

fn data_err(e: impl std::fmt::Display) -> AircastError {
    AircastError::Data(e.to_string())
}

/// Optional f64 column; `None` when the column itself is absent.
fn f64_column(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    let col = match df.column(name) {
        Ok(c) => c,
        Err(_) => return Ok(None),
    };
    let series = col
        .as_materialized_series()
        .cast(&DataType::Float64)
        .map_err(data_err)?;
    let ca = series.f64().map_err(data_err)?;
    Ok(Some(ca.into_iter().collect()))
}

/// Required f64 column with no nulls allowed.
fn required_f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = f64_column(df, name)?
        .ok_or_else(|| AircastError::Data(format!("missing required column '{name}'")))?;
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| AircastError::Data(format!("null '{name}' in row {i}"))))
        .collect()
}

/// Timestamp column, either RFC 3339 strings or numeric epoch seconds.
fn timestamp_column(df: &DataFrame, name: &str) -> Result<Vec<DateTime<Utc>>> {
    let col = df
        .column(name)
        .map_err(|_| AircastError::Data(format!("missing required column '{name}'")))?;
    let series = col.as_materialized_series();

    if let Ok(ca) = series.str() {
        return ca
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let raw =
                    v.ok_or_else(|| AircastError::Data(format!("null '{name}' in row {i}")))?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| AircastError::Data(format!("bad timestamp in row {i}: {e}")))
            })
            .collect();
    }

    // Numeric column: epoch seconds
    let series = series.cast(&DataType::Int64).map_err(data_err)?;
    let ca = series.i64().map_err(data_err)?;
    ca.into_iter()
        .enumerate()
        .map(|(i, v)| {
            let secs = v.ok_or_else(|| AircastError::Data(format!("null '{name}' in row {i}")))?;
            DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| AircastError::Data(format!("epoch out of range in row {i}: {secs}")))
        })
        .collect()
}

/// Load a CSV file of grid cells. Row order is preserved; cell ids are the
/// zero-based row indices.
pub fn load_grid_csv(path: &Path, dataset: &str) -> Result<Vec<GridCell>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(data_err)?
        .finish()
        .map_err(data_err)?;

    let lat = required_f64_column(&df, "lat")?;
    let lon = required_f64_column(&df, "lon")?;
    let timestamps = timestamp_column(&df, "timestamp")?;

    let n = df.height();
    let opt = |name: &str| -> Result<Vec<Option<f64>>> {
        Ok(f64_column(&df, name)?.unwrap_or_else(|| vec![None; n]))
    };
    let elevation = opt("elevation")?;
    let temperature = opt("temperature")?;
    let humidity = opt("humidity")?;
    let wind_speed = opt("wind_speed")?;
    let wind_direction = opt("wind_direction")?;
    let pm25 = opt("pm25")?;

    let cells: Vec<GridCell> = (0..n)
        .map(|i| GridCell {
            id: i as u64,
            dataset: dataset.to_string(),
            lat: lat[i],
            lon: lon[i],
            elevation: elevation[i],
            temperature: temperature[i],
            humidity: humidity[i],
            wind_speed: wind_speed[i],
            wind_direction: wind_direction[i],
            pm25: pm25[i],
            timestamp: timestamps[i],
        })
        .collect();

    tracing::info!(rows = cells.len(), path = %path.display(), "loaded grid CSV");
    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_with_optional_columns() {
        let csv = "\
lat,lon,temperature,pm25,timestamp
40.0,-74.0,21.5,12.0,2024-05-01T12:00:00Z
40.1,-74.1,18.0,,2024-05-01T13:00:00Z
";
        let file = write_csv(csv);
        let cells = load_grid_csv(file.path(), "nyc").unwrap();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].id, 0);
        assert_eq!(cells[0].dataset, "nyc");
        assert_eq!(cells[0].temperature, Some(21.5));
        assert_eq!(cells[0].pm25, Some(12.0));
        assert_eq!(cells[1].pm25, None);
        assert!(cells[0].elevation.is_none());
    }

    #[test]
    fn test_load_with_epoch_seconds_timestamps() {
        let csv = "\
lat,lon,pm25,timestamp
40.0,-74.0,12.0,1714564800
40.1,-74.1,9.5,1714568400
";
        let file = write_csv(csv);
        let cells = load_grid_csv(file.path(), "nyc").unwrap();

        assert_eq!(cells.len(), 2);
        assert_eq!(
            cells[0].timestamp,
            DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap()
        );
        assert_eq!(
            cells[1].timestamp,
            DateTime::parse_from_rfc3339("2024-05-01T13:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "lat,timestamp\n40.0,2024-05-01T12:00:00Z\n";
        let file = write_csv(csv);
        let err = load_grid_csv(file.path(), "x").unwrap_err();
        assert!(matches!(err, AircastError::Data(_)));
    }

    #[test]
    fn test_bad_timestamp() {
        let csv = "lat,lon,timestamp\n40.0,-74.0,yesterday\n";
        let file = write_csv(csv);
        assert!(load_grid_csv(file.path(), "x").is_err());
    }
}

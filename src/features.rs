//! Feature vectorization
//!
//! Maps a raw [`Observation`] (partial key/value attributes) onto the fixed
//! feature order the models are trained with. Missing attributes become NaN,
//! which the pipeline's imputer later replaces with the training-set mean.

use crate::error::{AircastError, Result};
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use ndarray::{Array1, Array2};
use serde_json::Value;
use std::collections::BTreeMap;

/// Canonical feature order. Any change here requires retraining every model.
pub const FEATURE_NAMES: [&str; 11] = [
    "lat",
    "lon",
    "elevation",
    "temperature",
    "humidity",
    "wind_speed",
    "wind_direction",
    "hour",
    "day",
    "month",
    "is_weekend",
];

/// Number of features in the canonical order.
pub const N_FEATURES: usize = FEATURE_NAMES.len();

/// Named scalar attributes describing one location/time.
///
/// Attributes may be absent; values arrive JSON-shaped (numbers, booleans,
/// numeric strings) and are coerced at vectorization time.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Observation(BTreeMap<String, Value>);

impl Observation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimal observation: just a location.
    pub fn at(lat: f64, lon: f64) -> Self {
        Self::new().with("lat", lat).with("lon", lon)
    }

    /// Set a numeric attribute, builder-style.
    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    /// Set an attribute from a raw JSON value.
    pub fn with_value(mut self, name: &str, value: Value) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }

    /// Set an optional attribute; `None` leaves it absent.
    pub fn with_opt(self, name: &str, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.with(name, v),
            None => self,
        }
    }

    /// Derive the calendar attributes (hour, day, month, is_weekend) from a
    /// timestamp. Weekend means Saturday or Sunday.
    pub fn with_timestamp(self, ts: DateTime<Utc>) -> Self {
        let weekend = matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
        self.with("hour", ts.hour() as f64)
            .with("day", ts.day() as f64)
            .with("month", ts.month() as f64)
            .with("is_weekend", if weekend { 1.0 } else { 0.0 })
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Coerce one raw attribute value to f64.
fn coerce(name: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| {
            AircastError::InvalidInput(format!("attribute '{name}' is not a finite number: {n}"))
        }),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            AircastError::InvalidInput(format!("attribute '{name}' is not numeric: {s:?}"))
        }),
        other => Err(AircastError::InvalidInput(format!(
            "attribute '{name}' has non-scalar value: {other}"
        ))),
    }
}

/// Encode an observation in the canonical feature order.
///
/// Missing attributes become NaN (no error); a present attribute that cannot
/// be coerced to a number is an [`AircastError::InvalidInput`]. Pure function.
pub fn vectorize(obs: &Observation) -> Result<Array1<f64>> {
    let mut out = Array1::from_elem(N_FEATURES, f64::NAN);
    for (i, name) in FEATURE_NAMES.iter().enumerate() {
        if let Some(value) = obs.get(name) {
            out[i] = coerce(name, value)?;
        }
    }
    Ok(out)
}

/// Encode a batch of observations as one row per observation.
pub fn vectorize_rows(observations: &[Observation]) -> Result<Array2<f64>> {
    let mut out = Array2::from_elem((observations.len(), N_FEATURES), f64::NAN);
    for (r, obs) in observations.iter().enumerate() {
        let row = vectorize(obs)?;
        out.row_mut(r).assign(&row);
    }
    Ok(out)
}

//! Mean imputation over feature columns

use super::is_missing;
use crate::error::{AircastError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Replaces the NaN sentinel with the per-column mean of the training data.
///
/// A column that was entirely missing at fit time imputes 0.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanImputer {
    means: Vec<f64>,
}

impl MeanImputer {
    pub fn new() -> Self {
        Self { means: Vec::new() }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let mut means = Vec::with_capacity(x.ncols());
        for col in x.columns() {
            let mut sum = 0.0;
            let mut count = 0usize;
            for &v in col.iter() {
                if !is_missing(v) {
                    sum += v;
                    count += 1;
                }
            }
            means.push(if count > 0 { sum / count as f64 } else { 0.0 });
        }
        self.means = means;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.means.is_empty() {
            return Err(AircastError::Data("imputer is not fitted".to_string()));
        }
        if x.ncols() != self.means.len() {
            return Err(AircastError::Data(format!(
                "imputer fitted on {} columns, got {}",
                self.means.len(),
                x.ncols()
            )));
        }

        let mut out = x.clone();
        for (j, &mean) in self.means.iter().enumerate() {
            for v in out.column_mut(j).iter_mut() {
                if is_missing(*v) {
                    *v = mean;
                }
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }
}

impl Default for MeanImputer {
    fn default() -> Self {
        Self::new()
    }
}

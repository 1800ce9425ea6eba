//! Feature standardization

use crate::error::{AircastError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-column parameters of a fitted scaler.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnParams {
    center: f64,
    scale: f64,
}

/// Z-score standardization: (x - mean) / std, fitted on training data only.
///
/// Zero-variance columns keep scale 1.0 so they map to 0 instead of NaN.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ColumnParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n = x.nrows() as f64;
        if n == 0.0 {
            return Err(AircastError::Data("cannot fit scaler on empty matrix".to_string()));
        }

        let mut params = Vec::with_capacity(x.ncols());
        for col in x.columns() {
            let mean = col.sum() / n;
            let var = col.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            params.push(ColumnParams {
                center: mean,
                scale: if std == 0.0 { 1.0 } else { std },
            });
        }
        self.params = params;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.params.is_empty() {
            return Err(AircastError::Data("scaler is not fitted".to_string()));
        }
        if x.ncols() != self.params.len() {
            return Err(AircastError::Data(format!(
                "scaler fitted on {} columns, got {}",
                self.params.len(),
                x.ncols()
            )));
        }

        let mut out = x.clone();
        for (j, p) in self.params.iter().enumerate() {
            for v in out.column_mut(j).iter_mut() {
                *v = (*v - p.center) / p.scale;
            }
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_mean_unit_variance() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).unwrap();

        for j in 0..2 {
            let col = out.column(j);
            let mean = col.sum() / 3.0;
            let var = col.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let x = array![[5.0], [5.0], [5.0]];
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&x).unwrap();
        for &v in out.iter() {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_column_count_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}

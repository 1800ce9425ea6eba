//! Random forest regressor

use super::decision_tree::RegressionTree;
use crate::error::{AircastError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagged ensemble of regression trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestRegressor {
    trees: Vec<RegressionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl ForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 {
            return Err(AircastError::Training("empty feature matrix".to_string()));
        }
        if n_samples != y.len() {
            return Err(AircastError::Training(format!(
                "feature matrix has {} rows but target has {} values",
                n_samples,
                y.len()
            )));
        }

        self.n_features = n_features;
        // sqrt(n_features) per split, the usual forest default
        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let base_seed = self.random_state.unwrap_or(42);

        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = RegressionTree::new()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree.max_features = Some(max_features);
                tree.random_state = Some(seed);
                tree.fit(&x_boot, &y_boot).ok();

                tree
            })
            .collect();

        self.trees = trees;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(imp) = tree.feature_importances() {
                for (i, &val) in imp.iter().enumerate() {
                    if i < self.n_features {
                        total[i] += val;
                    }
                }
            }
        }

        let n_trees = self.trees.len() as f64;
        for imp in &mut total {
            *imp /= n_trees;
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Mean prediction over all trees.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(AircastError::Training("forest is not fitted".to_string()));
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_samples = x.nrows();
        let predictions: Vec<f64> = (0..n_samples)
            .map(|i| {
                let sum: f64 = all_predictions.iter().map(|p| p[i]).sum();
                sum / all_predictions.len() as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(AircastError::Training("forest is not fitted".to_string()));
        }
        let sum: f64 = self
            .trees
            .iter()
            .map(|tree| tree.predict_row(row))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .sum();
        Ok(sum / self.trees.len() as f64)
    }

    /// Per-feature decision-path contributions averaged over trees.
    ///
    /// `baseline + Σ contributions == predict_row(row)` exactly.
    pub fn path_contributions(&self, row: ArrayView1<f64>) -> Result<(f64, Vec<f64>)> {
        if self.trees.is_empty() {
            return Err(AircastError::Training("forest is not fitted".to_string()));
        }

        let n_trees = self.trees.len() as f64;
        let mut baseline = 0.0;
        let mut contributions = vec![0.0; self.n_features];

        for tree in &self.trees {
            let (root, contribs) = tree.path_contributions(row)?;
            baseline += root / n_trees;
            for (j, c) in contribs.into_iter().enumerate() {
                contributions[j] += c / n_trees;
            }
        }

        Ok((baseline, contributions))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![2.0, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0];
        (x, y)
    }

    #[test]
    fn test_regression_fit_predict() {
        let (x, y) = linear_data();
        let mut rf = ForestRegressor::new(20).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let mse: f64 = predictions
            .iter()
            .zip(y.iter())
            .map(|(p, a)| (p - a).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 4.0, "MSE too high: {}", mse);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let rf = ForestRegressor::new(5);
        assert!(rf.predict(&array![[1.0]]).is_err());
    }

    #[test]
    fn test_contributions_additive() {
        let (x, y) = linear_data();
        let mut rf = ForestRegressor::new(15).with_random_state(7);
        rf.fit(&x, &y).unwrap();

        let row = x.row(3);
        let pred = rf.predict_row(row).unwrap();
        let (base, contribs) = rf.path_contributions(row).unwrap();
        let total = base + contribs.iter().sum::<f64>();
        assert!((total - pred).abs() < 1e-9);
    }

    #[test]
    fn test_signal_in_trailing_column_is_learnable() {
        // 11 columns, only column 5 carries signal. sqrt-feature subsampling
        // must still let trees split on it.
        let n = 80;
        let x = Array2::from_shape_fn((n, 11), |(i, j)| if j == 5 { i as f64 } else { 0.0 });
        let y = Array1::from_shape_fn(n, |i| 3.0 * i as f64);

        let mut rf = ForestRegressor::new(30).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert!(
            importances[5] > 0.9,
            "signal column importance too low: {}",
            importances[5]
        );

        let low = rf.predict_row(x.row(0)).unwrap();
        let high = rf.predict_row(x.row(n - 1)).unwrap();
        assert!(
            high - low > 30.0,
            "forest ignored the signal column: low={} high={}",
            low,
            high
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut rf = ForestRegressor::new(3);
        assert!(matches!(rf.fit(&x, &y), Err(AircastError::Training(_))));
    }
}

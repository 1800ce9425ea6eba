//! Gradient-boosted regression trees
//!
//! Mean-initialized residual boosting with shrinkage and row subsampling.
//! Trees see every feature column, which keeps decision-path attribution a
//! straight sum over trees.

use super::decision_tree::RegressionTree;
use crate::error::{AircastError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio per tree
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            random_state: Some(42),
        }
    }
}

/// Gradient boosting regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostedRegressor {
    config: BoostingConfig,
    trees: Vec<RegressionTree>,
    initial_prediction: f64,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl BoostedRegressor {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_prediction: 0.0,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Fit the boosted ensemble.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
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
        self.initial_prediction = y.mean().unwrap_or(0.0);
        self.trees.clear();
        self.feature_importances = vec![0.0; n_features];

        let mut predictions = Array1::from_elem(n_samples, self.initial_prediction);
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(predictions.iter())
                .map(|(yi, pi)| yi - pi)
                .collect();

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let y_sub: Array1<f64> =
                Array1::from_vec(sample_indices.iter().map(|&i| residuals[i]).collect());

            let mut tree = RegressionTree::new()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;

            // Update the running prediction on every row so the next round's
            // residuals stay consistent
            let tree_pred = tree.predict(x)?;
            for i in 0..n_samples {
                predictions[i] += self.config.learning_rate * tree_pred[i];
            }

            if let Some(imp) = tree.feature_importances() {
                for (j, &val) in imp.iter().enumerate() {
                    self.feature_importances[j] += val;
                }
            }

            self.trees.push(tree);
        }

        let total: f64 = self.feature_importances.iter().sum();
        if total > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= total;
            }
        }

        Ok(())
    }

    /// Make predictions.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(AircastError::Training("boosted model is not fitted".to_string()));
        }

        let n = x.nrows();
        let mut predictions = Array1::from_elem(n, self.initial_prediction);
        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            for i in 0..n {
                predictions[i] += self.config.learning_rate * tree_pred[i];
            }
        }
        Ok(predictions)
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(AircastError::Training("boosted model is not fitted".to_string()));
        }
        let mut pred = self.initial_prediction;
        for tree in &self.trees {
            pred += self.config.learning_rate * tree.predict_row(row)?;
        }
        Ok(pred)
    }

    /// Per-feature decision-path contributions summed over boosting rounds.
    ///
    /// Tree roots fold into the baseline; `baseline + Σ contributions ==
    /// predict_row(row)` exactly.
    pub fn path_contributions(&self, row: ArrayView1<f64>) -> Result<(f64, Vec<f64>)> {
        if self.trees.is_empty() {
            return Err(AircastError::Training("boosted model is not fitted".to_string()));
        }

        let lr = self.config.learning_rate;
        let mut baseline = self.initial_prediction;
        let mut contributions = vec![0.0; self.n_features];

        for tree in &self.trees {
            let (root, contribs) = tree.path_contributions(row)?;
            baseline += lr * root;
            for (j, c) in contribs.into_iter().enumerate() {
                contributions[j] += lr * c;
            }
        }

        Ok((baseline, contributions))
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = ((n as f64) * self.config.subsample).ceil() as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size.max(1));
        indices.sort_unstable();
        indices
    }
}

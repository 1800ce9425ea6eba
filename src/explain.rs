//! Per-feature attribution of a single prediction
//!
//! Attributions come from the trees' decision paths: every split on the path
//! credits the change in subset mean to the split feature, so the baseline
//! plus all attributions reproduces the raw regressor output exactly. The
//! result type here is what callers see; the walk itself lives with the tree
//! implementations.

use serde::{Deserialize, Serialize};

/// One feature's contribution to a prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureAttribution {
    pub feature_index: usize,
    pub feature_name: String,
    pub attribution: f64,
}

/// Attribution of one prediction relative to the model's expected output.
///
/// `prediction` is the raw (pre-clamp) pipeline output:
/// `base_value + Σ attributions == prediction` to floating-point round-off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Feature names in canonical order
    pub feature_names: Vec<String>,
    /// Attribution values aligned with `feature_names`
    pub attributions: Vec<f64>,
    /// Expected output over the training distribution
    pub base_value: f64,
    /// Raw regressor output being explained
    pub prediction: f64,
}

impl Explanation {
    pub fn sum_attributions(&self) -> f64 {
        self.attributions.iter().sum()
    }

    /// Attributions sorted by absolute magnitude, descending.
    pub fn ranked(&self) -> Vec<FeatureAttribution> {
        let mut out: Vec<FeatureAttribution> = self
            .attributions
            .iter()
            .enumerate()
            .map(|(i, &a)| FeatureAttribution {
                feature_index: i,
                feature_name: self.feature_names[i].clone(),
                attribution: a,
            })
            .collect();
        out.sort_by(|a, b| {
            b.attribution
                .abs()
                .partial_cmp(&a.attribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        out
    }

    /// Top k features by absolute attribution.
    pub fn top_k(&self, k: usize) -> Vec<FeatureAttribution> {
        self.ranked().into_iter().take(k).collect()
    }
}

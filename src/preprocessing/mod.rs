//! Fitted preprocessing stages shared by every model pipeline
//!
//! Both stages operate on `Array2<f64>` feature matrices and are fitted on
//! training data only, then serialized as part of the model artifact.

mod imputer;
mod scaler;

pub use imputer::MeanImputer;
pub use scaler::StandardScaler;

/// Missing-value sentinel check.
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

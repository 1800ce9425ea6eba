//! Tree-ensemble regressors
//!
//! Native implementations of the two model variants' regressors:
//! - Random forest (bagged regression trees)
//! - Gradient boosting (residual-fitted shallow trees)

pub mod decision_tree;
pub mod gradient_boosting;
pub mod random_forest;

pub use decision_tree::{RegressionTree, TreeNode};
pub use gradient_boosting::{BoostedRegressor, BoostingConfig};
pub use random_forest::ForestRegressor;

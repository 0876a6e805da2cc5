mod constants;

// Modules
pub mod data;
pub mod errors;
pub mod estimate;
pub mod estimator;
pub mod folds;
pub mod inference;
pub mod ipc;
pub mod learner;
pub mod measures;
pub mod utils;

// Individual classes, and functions
pub use data::Matrix;
pub use estimate::{ComparisonTable, ImportanceEstimate};
pub use estimator::{estimate_cross_fitted, estimate_one_fold, EstimatorConfig, RegressionInput};
pub use learner::Learner;
pub use measures::Measure;

//! Estimator
//!
//! Variable-importance estimation routines.
//!
//! # Submodules
//!
//! * `config`: Shared estimation configuration.
//! * `onefold`: Estimation from one pair of full/reduced prediction vectors.
//! * `crossfit`: Sample-split, V-fold cross-fitted estimation.
pub mod config;
pub mod crossfit;
pub mod onefold;

pub use config::EstimatorConfig;
pub use crossfit::{estimate_cross_fitted, RegressionInput};
pub use onefold::estimate_one_fold;

use crate::errors::VarimpError;
use crate::estimate::ImportanceEstimate;
use crate::folds::NestedFolds;
use crate::inference::{p_value, Scale};
use crate::measures::Measure;

pub(crate) fn check_len(name: &str, expected: usize, actual: usize) -> Result<(), VarimpError> {
    if expected != actual {
        return Err(VarimpError::LengthMismatch(name.to_string(), expected, actual));
    }
    Ok(())
}

/// Sort and deduplicate a feature set, rejecting an empty one.
pub(crate) fn canonical_feature_set(feature_set: &[usize]) -> Result<Vec<usize>, VarimpError> {
    if feature_set.is_empty() {
        return Err(VarimpError::InvalidInput(
            "the feature set must name at least one covariate".to_string(),
        ));
    }
    let mut fs = feature_set.to_vec();
    fs.sort_unstable();
    fs.dedup();
    Ok(fs)
}

/// One-sided test of importance <= delta, skipped when the configured scale
/// cannot express the null threshold (the logit scale needs delta in (0, 1)).
pub(crate) fn hypothesis_test(
    estimate: f64,
    se: f64,
    cfg: &EstimatorConfig,
) -> Result<Option<f64>, VarimpError> {
    if cfg.scale == Scale::Logit && !(cfg.delta > 0.0 && cfg.delta < 1.0) {
        return Ok(None);
    }
    Ok(Some(p_value(estimate, se, cfg.delta, cfg.scale)?))
}

// Per-measure entry points, each a thin parameterization of the shared core.

/// Cross-fitted R-squared importance of a covariate set.
pub fn rsquared_importance(
    y: &[f64],
    input: RegressionInput,
    feature_set: &[usize],
    sample_weight: Option<&[f64]>,
    folds: Option<NestedFolds>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    estimate_cross_fitted(y, input, feature_set, Measure::RSquared, sample_weight, folds, cfg)
}

/// Cross-fitted deviance importance of a covariate set.
pub fn deviance_importance(
    y: &[f64],
    input: RegressionInput,
    feature_set: &[usize],
    sample_weight: Option<&[f64]>,
    folds: Option<NestedFolds>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    estimate_cross_fitted(y, input, feature_set, Measure::Deviance, sample_weight, folds, cfg)
}

/// Cross-fitted classification-accuracy importance of a covariate set.
pub fn accuracy_importance(
    y: &[f64],
    input: RegressionInput,
    feature_set: &[usize],
    sample_weight: Option<&[f64]>,
    folds: Option<NestedFolds>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    estimate_cross_fitted(y, input, feature_set, Measure::Accuracy, sample_weight, folds, cfg)
}

/// Cross-fitted AUC importance of a covariate set.
pub fn auc_importance(
    y: &[f64],
    input: RegressionInput,
    feature_set: &[usize],
    sample_weight: Option<&[f64]>,
    folds: Option<NestedFolds>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    estimate_cross_fitted(y, input, feature_set, Measure::Auc, sample_weight, folds, cfg)
}

/// Cross-fitted average-value importance of a covariate set.
pub fn average_value_importance(
    y: &[f64],
    input: RegressionInput,
    feature_set: &[usize],
    sample_weight: Option<&[f64]>,
    folds: Option<NestedFolds>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    estimate_cross_fitted(y, input, feature_set, Measure::AverageValue, sample_weight, folds, cfg)
}

//! Estimator Configuration
//!
//! Shared configuration for the one-fold and cross-fitted estimation routines.
use crate::errors::VarimpError;
use crate::inference::Scale;
use serde::{Deserialize, Serialize};

fn default_v() -> usize {
    5
}
fn default_alpha() -> f64 {
    0.05
}
fn default_delta() -> f64 {
    0.0
}
fn default_seed() -> u64 {
    42
}

/// Configuration for an importance estimation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Number of inner cross-fitting folds.
    #[serde(default = "default_v")]
    pub v: usize,
    /// Confidence level is 1 - alpha.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Null threshold for the one-sided hypothesis test.
    #[serde(default = "default_delta")]
    pub delta: f64,
    /// Scale confidence intervals are constructed on.
    #[serde(default)]
    pub scale: Scale,
    /// Drop observations with missing values instead of failing.
    #[serde(default)]
    pub na_rm: bool,
    /// Stratify fold generation by outcome class.
    #[serde(default)]
    pub stratified: bool,
    /// Seed for fold generation and for the learner collaborator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        EstimatorConfig {
            v: default_v(),
            alpha: default_alpha(),
            delta: default_delta(),
            scale: Scale::default(),
            na_rm: false,
            stratified: false,
            seed: default_seed(),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<(), VarimpError> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(VarimpError::InvalidParameter(
                "alpha".to_string(),
                "real value strictly between 0 and 1".to_string(),
                self.alpha.to_string(),
            ));
        }
        if self.delta.is_nan() {
            return Err(VarimpError::InvalidParameter(
                "delta".to_string(),
                "a finite null threshold".to_string(),
                self.delta.to_string(),
            ));
        }
        Ok(())
    }

    // Set methods for parameters

    /// Set the number of cross-fitting folds.
    /// * `v` - Number of inner folds per outer half.
    pub fn set_v(mut self, v: usize) -> Self {
        self.v = v;
        self
    }

    /// Set alpha; the confidence level is 1 - alpha.
    /// * `alpha` - Type-I error rate.
    pub fn set_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the null threshold of the hypothesis test.
    /// * `delta` - Importance value under the null.
    pub fn set_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Set the scale used for interval construction.
    /// * `scale` - Identity or logit.
    pub fn set_scale(mut self, scale: Scale) -> Self {
        self.scale = scale;
        self
    }

    /// Set whether missing observations are dropped rather than fatal.
    /// * `na_rm` - Drop positions with missing values.
    pub fn set_na_rm(mut self, na_rm: bool) -> Self {
        self.na_rm = na_rm;
        self
    }

    /// Set whether fold generation is stratified by outcome.
    /// * `stratified` - Preserve outcome-class proportions across folds.
    pub fn set_stratified(mut self, stratified: bool) -> Self {
        self.stratified = stratified;
        self
    }

    /// Set the seed used for fold generation and the learner.
    /// * `seed` - Deterministic random seed.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

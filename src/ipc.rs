//! IPC Correction
//!
//! Inverse-probability-of-coarsening corrections for influence curves when some
//! observations are only partially observed. The propensity of being observed
//! and, for the augmented correction, the regression of the influence function
//! on the coarsening covariates are fitted externally; this module performs
//! only the algebraic combination.
use crate::errors::VarimpError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMethod {
    /// Inverse-probability weighting.
    Ipw,
    /// Augmented inverse-probability weighting.
    Aipw,
}

impl FromStr for CorrectionMethod {
    type Err = VarimpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ipw" => Ok(CorrectionMethod::Ipw),
            "aipw" => Ok(CorrectionMethod::Aipw),

            _ => Err(VarimpError::ParseString(
                s.to_string(),
                "CorrectionMethod".to_string(),
                items_to_strings(vec!["ipw", "aipw"]),
            )),
        }
    }
}

/// Coarsening-correction inputs supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoarseningConfig {
    /// Per-observation indicator, 1 = fully observed.
    pub indicator: Vec<f64>,
    /// P(observed | coarsening covariates), externally fitted. Required whenever
    /// the indicator contains zeros.
    pub weights: Option<Vec<f64>>,
    /// E[influence function | coarsening covariates], externally fitted.
    /// Required for the augmented correction.
    pub augmentation: Option<Vec<f64>>,
    pub method: CorrectionMethod,
}

impl CoarseningConfig {
    pub fn new(indicator: Vec<f64>, method: CorrectionMethod) -> Self {
        CoarseningConfig {
            indicator,
            weights: None,
            augmentation: None,
            method,
        }
    }

    /// Set the observation propensities on the config.
    /// * `weights` - P(observed | coarsening covariates) per observation.
    pub fn set_weights(mut self, weights: Option<Vec<f64>>) -> Self {
        self.weights = weights;
        self
    }

    /// Set the augmentation values on the config.
    /// * `augmentation` - Fitted E[influence function | coarsening covariates].
    pub fn set_augmentation(mut self, augmentation: Option<Vec<f64>>) -> Self {
        self.augmentation = augmentation;
        self
    }

    /// Whether every observation is fully observed.
    pub fn all_observed(&self) -> bool {
        self.indicator.iter().all(|c_| *c_ == 1.0)
    }

    pub fn validate(&self) -> Result<(), VarimpError> {
        let n = self.indicator.len();
        if self.indicator.iter().any(|c_| *c_ != 0.0 && *c_ != 1.0) {
            return Err(VarimpError::InvalidInput(
                "the coarsening indicator must be coded 0/1".to_string(),
            ));
        }
        if !self.all_observed() {
            match &self.weights {
                None => return Err(VarimpError::MissingWeights("observation propensities".to_string())),
                Some(g) => {
                    if g.len() != n {
                        return Err(VarimpError::LengthMismatch("ipc_weights".to_string(), n, g.len()));
                    }
                    if g.iter().any(|g_| g_.is_nan() || *g_ <= 0.0 || *g_ > 1.0) {
                        return Err(VarimpError::InvalidInput(
                            "observation propensities must lie in (0, 1]".to_string(),
                        ));
                    }
                }
            }
            if self.method == CorrectionMethod::Aipw {
                match &self.augmentation {
                    None => return Err(VarimpError::MissingWeights("augmentation values".to_string())),
                    Some(a) => {
                        if a.len() != n {
                            return Err(VarimpError::LengthMismatch("augmentation".to_string(), n, a.len()));
                        }
                        if a.iter().any(|a_| a_.is_nan()) {
                            return Err(VarimpError::InvalidInput(
                                "augmentation values must be free of NaN".to_string(),
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Restrict the config to a subset of observations, preserving order.
    pub(crate) fn filtered(&self, keep: &[usize]) -> Self {
        let take = |v: &Vec<f64>| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();
        CoarseningConfig {
            indicator: take(&self.indicator),
            weights: self.weights.as_ref().map(take),
            augmentation: self.augmentation.as_ref().map(take),
            method: self.method,
        }
    }
}

/// Apply the coarsening correction to a naive influence curve.
///
/// The input curve must align with the indicator; entries at unobserved
/// positions are ignored (they enter multiplied by a zero indicator). With an
/// all-observed indicator this is the identity transform. The corrected curve
/// is generally no longer mean zero; the estimators fold its mean back into
/// the one-step point estimate.
pub fn correct_influence(eif: &[f64], cfg: &CoarseningConfig) -> Result<Vec<f64>, VarimpError> {
    cfg.validate()?;
    let n = cfg.indicator.len();
    if eif.len() != n {
        return Err(VarimpError::LengthMismatch("influence_curve".to_string(), n, eif.len()));
    }
    if cfg.all_observed() {
        return Ok(eif.to_vec());
    }
    let g = cfg.weights.as_ref().unwrap();
    match cfg.method {
        CorrectionMethod::Ipw => Ok(eif
            .iter()
            .zip(&cfg.indicator)
            .zip(g)
            .map(|((e_, c_), g_)| c_ / g_ * e_)
            .collect()),
        CorrectionMethod::Aipw => {
            let aug = cfg.augmentation.as_ref().unwrap();
            Ok(eif
                .iter()
                .zip(&cfg.indicator)
                .zip(g)
                .zip(aug)
                .map(|(((e_, c_), g_), a_)| c_ / g_ * e_ + (1.0 - c_ / g_) * a_)
                .collect())
        }
    }
}

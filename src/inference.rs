//! Inference
//!
//! Normal-approximation confidence intervals and one-sided hypothesis tests on
//! the identity or logit scale. Identity-scale intervals are surfaced as-is,
//! even when they exceed a measure's natural bounds; the logit scale keeps
//! intervals for [0, 1]-bounded measures inside the unit interval but is only
//! defined for estimates strictly between 0 and 1.
use crate::errors::VarimpError;
use crate::utils::{expit, items_to_strings, logit, validate_float_parameter};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::str::FromStr;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scale {
    #[default]
    Identity,
    Logit,
}

impl FromStr for Scale {
    type Err = VarimpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" => Ok(Scale::Identity),
            "logit" => Ok(Scale::Logit),

            _ => Err(VarimpError::ParseString(
                s.to_string(),
                "Scale".to_string(),
                items_to_strings(vec!["identity", "logit"]),
            )),
        }
    }
}

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).unwrap()
}

fn check_se(se: f64) -> Result<(), VarimpError> {
    if se.is_nan() || se < 0.0 {
        return Err(VarimpError::InvalidInput(format!(
            "the standard error must be non-negative, got {}",
            se
        )));
    }
    Ok(())
}

fn check_unit_interval(value: f64, what: &str) -> Result<(), VarimpError> {
    if !(value > 0.0 && value < 1.0) {
        return Err(VarimpError::InvalidScale(what.to_string(), value));
    }
    Ok(())
}

/// Two-sided (1 - alpha) confidence interval for an estimate.
pub fn confidence_interval(
    estimate: f64,
    se: f64,
    alpha: f64,
    scale: Scale,
) -> Result<(f64, f64), VarimpError> {
    validate_float_parameter(alpha, 0.0, 1.0, "alpha")?;
    check_se(se)?;
    let z = standard_normal().inverse_cdf(1.0 - alpha / 2.0);
    match scale {
        Scale::Identity => Ok((estimate - z * se, estimate + z * se)),
        Scale::Logit => {
            check_unit_interval(estimate, "estimate")?;
            // Delta method: d logit(x)/dx = 1 / (x (1 - x)).
            let se_logit = se / (estimate * (1.0 - estimate));
            let center = logit(estimate);
            Ok((expit(center - z * se_logit), expit(center + z * se_logit)))
        }
    }
}

/// One-sided p-value for testing importance <= delta against importance > delta.
pub fn p_value(estimate: f64, se: f64, delta: f64, scale: Scale) -> Result<f64, VarimpError> {
    check_se(se)?;
    let z = match scale {
        Scale::Identity => {
            if se == 0.0 {
                return Ok(if estimate > delta { 0.0 } else { 1.0 });
            }
            (estimate - delta) / se
        }
        Scale::Logit => {
            check_unit_interval(estimate, "estimate")?;
            check_unit_interval(delta, "delta")?;
            if se == 0.0 {
                return Ok(if estimate > delta { 0.0 } else { 1.0 });
            }
            let se_logit = se / (estimate * (1.0 - estimate));
            (logit(estimate) - logit(delta)) / se_logit
        }
    };
    Ok(1.0 - standard_normal().cdf(z))
}

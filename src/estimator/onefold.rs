//! One-Fold Estimator
//!
//! Importance estimation from a single pair of full/reduced prediction
//! vectors, with optional inverse-probability-of-coarsening correction. The
//! fitted values are supplied by the caller; nothing is refit here.
use crate::errors::VarimpError;
use crate::estimate::ImportanceEstimate;
use crate::estimator::{canonical_feature_set, check_len, hypothesis_test, EstimatorConfig};
use crate::inference::confidence_interval;
use crate::ipc::{correct_influence, CoarseningConfig};
use crate::measures::{importance_contrast, Measure};
use crate::utils::{mean, normalize_weights, sample_variance};

/// Estimate the importance of `feature_set` from supplied fitted values.
///
/// `full_pred` and `reduced_pred` must align with `y` by position; `reduced_pred`
/// comes from a regression withholding the covariates in `feature_set`. With a
/// coarsening config, unobserved positions (indicator 0) may carry missing
/// outcomes or predictions; among observed positions, missing values are fatal
/// unless `na_rm` is set, in which case those positions are dropped everywhere.
pub fn estimate_one_fold(
    y: &[f64],
    full_pred: &[f64],
    reduced_pred: &[f64],
    sample_weight: Option<&[f64]>,
    feature_set: &[usize],
    measure: Measure,
    ipc: Option<&CoarseningConfig>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    cfg.validate()?;
    let feature_set = canonical_feature_set(feature_set)?;
    let n_input = y.len();
    check_len("full_pred", n_input, full_pred.len())?;
    check_len("reduced_pred", n_input, reduced_pred.len())?;
    if let Some(w) = sample_weight {
        check_len("sample_weight", n_input, w.len())?;
    }
    if let Some(c) = ipc {
        check_len("coarsening indicator", n_input, c.indicator.len())?;
        c.validate()?;
    }

    // Missing-value policy over observed positions; coarsened positions are
    // kept for the correction step regardless of their (unusable) values.
    let is_observed = |i: usize| ipc.map_or(true, |c| c.indicator[i] == 1.0);
    let mut keep = Vec::with_capacity(n_input);
    for i in 0..n_input {
        if is_observed(i) && (y[i].is_nan() || full_pred[i].is_nan() || reduced_pred[i].is_nan()) {
            if cfg.na_rm {
                continue;
            }
            return Err(VarimpError::InvalidInput(format!(
                "missing value at position {} with na_rm disabled",
                i
            )));
        }
        keep.push(i);
    }
    let take = |v: &[f64]| keep.iter().map(|&i| v[i]).collect::<Vec<f64>>();
    let y_kept = take(y);
    let full_kept = take(full_pred);
    let reduced_kept = take(reduced_pred);
    let weight_kept = sample_weight.map(|w| take(w));
    let ipc_kept = ipc.map(|c| c.filtered(&keep));

    let observed_idx: Vec<usize> = match &ipc_kept {
        None => (0..keep.len()).collect(),
        Some(c) => c
            .indicator
            .iter()
            .enumerate()
            .filter(|(_, c_)| **c_ == 1.0)
            .map(|(i, _)| i)
            .collect(),
    };
    if observed_idx.is_empty() {
        return Err(VarimpError::InvalidInput(
            "no fully observed observations remain after cleaning".to_string(),
        ));
    }
    let sub = |v: &[f64]| observed_idx.iter().map(|&i| v[i]).collect::<Vec<f64>>();
    let y_obs = sub(&y_kept);
    let full_obs = sub(&full_kept);
    let reduced_obs = sub(&reduced_kept);
    let weight_obs = weight_kept.as_deref().map(|w| sub(w));
    let weights = normalize_weights(weight_obs.as_deref(), observed_idx.len())?;

    let contrast = importance_contrast(&y_obs, &full_obs, &reduced_obs, &weights, &measure)?;

    // One-step update: the raw contrast curve is mean zero, so the correction
    // only moves the point estimate when coarsening reweights it.
    let (influence_curve, point_estimate) = match &ipc_kept {
        None => {
            let point = contrast.plugin + mean(&contrast.eif);
            (contrast.eif, point)
        }
        Some(c) => {
            let mut eif = vec![0.0; keep.len()];
            for (j, &i) in observed_idx.iter().enumerate() {
                eif[i] = contrast.eif[j];
            }
            let corrected = correct_influence(&eif, c)?;
            let point = contrast.plugin + mean(&corrected);
            (corrected, point)
        }
    };

    let n = influence_curve.len();
    let standard_error = (sample_variance(&influence_curve) / n as f64).sqrt();
    let (ci_lower, ci_upper) = confidence_interval(point_estimate, standard_error, cfg.alpha, cfg.scale)?;
    let p = hypothesis_test(point_estimate, standard_error, cfg)?;

    Ok(ImportanceEstimate {
        feature_set,
        measure,
        point_estimate,
        naive_estimate: contrast.plugin,
        influence_curve,
        standard_error,
        ci_lower,
        ci_upper,
        alpha: cfg.alpha,
        scale: cfg.scale,
        delta: cfg.delta,
        p_value: p,
        full_predictions: full_kept,
        reduced_predictions: reduced_kept,
        fold_assignment: None,
        n,
    })
}

//! Cross-Fitted Estimator
//!
//! Sample-split, V-fold cross-fitted importance estimation. Observations are
//! split into two outer halves; the full regression is cross-fitted on one
//! half and the reduced regression on the other, so the hypothesis test of
//! null importance retains its nominal level. Within each half, every inner
//! fold's held-out predictions contribute an influence curve, and fold-level
//! statistics are aggregated weighted by fold size.
use crate::constants::SMALL_FOLD_WARNING;
use crate::data::Matrix;
use crate::errors::VarimpError;
use crate::estimate::ImportanceEstimate;
use crate::estimator::{canonical_feature_set, check_len, hypothesis_test, EstimatorConfig};
use crate::folds::NestedFolds;
use crate::inference::confidence_interval;
use crate::learner::Learner;
use crate::measures::{measure_callables, Measure};
use crate::utils::{mean, normalize_weights, sample_variance};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

/// Source of the full and reduced fitted values.
///
/// Exactly one source produces the predictions: either the caller supplies
/// held-out fitted values for every inner fold, or the caller supplies raw
/// covariates and a learner and the regressions are run from scratch.
pub enum RegressionInput<'a> {
    /// Pre-computed held-out fitted values, indexed by inner fold: `full[k]`
    /// aligns with inner fold `k` of outer half 0, `reduced[k]` with inner
    /// fold `k` of outer half 1. Requires a supplied fold assignment.
    Fitted {
        full: Vec<Vec<f64>>,
        reduced: Vec<Vec<f64>>,
    },
    /// Raw covariates plus a learner collaborator to fit both regressions.
    Raw {
        x: &'a Matrix<'a, f64>,
        learner: &'a dyn Learner,
    },
}

/// Cross-fitted estimate of the importance of `feature_set`.
///
/// When `folds` is `None`, a nested fold assignment is drawn from the config
/// seed (stratified by outcome on request); supplied folds take precedence,
/// including their inner fold count.
pub fn estimate_cross_fitted(
    y: &[f64],
    input: RegressionInput,
    feature_set: &[usize],
    measure: Measure,
    sample_weight: Option<&[f64]>,
    folds: Option<NestedFolds>,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    cfg.validate()?;
    let feature_set = canonical_feature_set(feature_set)?;
    let n_input = y.len();
    if n_input == 0 {
        return Err(VarimpError::InvalidInput("the outcome vector is empty".to_string()));
    }
    if let Some(w) = sample_weight {
        check_len("sample_weight", n_input, w.len())?;
    }

    match input {
        RegressionInput::Fitted { full, reduced } => {
            if y.iter().any(|y_| y_.is_nan()) {
                return Err(VarimpError::InvalidInput(
                    "supplied fitted values require complete outcomes; clean the data before estimation"
                        .to_string(),
                ));
            }
            let folds = folds.ok_or_else(|| {
                VarimpError::InvalidInput(
                    "supplied fitted values require a supplied fold assignment".to_string(),
                )
            })?;
            check_len("fold assignment", n_input, folds.len())?;
            validate_v(folds.v())?;
            check_len("full fitted-value folds", folds.v(), full.len())?;
            check_len("reduced fitted-value folds", folds.v(), reduced.len())?;
            for (half, fits) in [(0, &full), (1, &reduced)] {
                for (k, fold_fits) in fits.iter().enumerate() {
                    let expected = folds.inner_fold_indices(half, k).len();
                    check_len(
                        &format!("fitted values for inner fold {} of outer half {}", k, half),
                        expected,
                        fold_fits.len(),
                    )?;
                    if fold_fits.iter().any(|p_| p_.is_nan()) {
                        return Err(VarimpError::InvalidInput(
                            "supplied fitted values contain NaN".to_string(),
                        ));
                    }
                }
            }
            crossfit_core(y, sample_weight, &folds, &full, &reduced, feature_set, measure, cfg)
        }
        RegressionInput::Raw { x, learner } => {
            check_len("covariate rows", n_input, x.rows)?;
            let mut keep = Vec::with_capacity(n_input);
            for (i, y_) in y.iter().enumerate() {
                if y_.is_nan() {
                    if cfg.na_rm {
                        continue;
                    }
                    return Err(VarimpError::InvalidInput(format!(
                        "missing outcome at position {} with na_rm disabled",
                        i
                    )));
                }
                keep.push(i);
            }
            if keep.is_empty() {
                return Err(VarimpError::InvalidInput(
                    "no observations remain after cleaning".to_string(),
                ));
            }
            let y_kept: Vec<f64> = keep.iter().map(|&i| y[i]).collect();
            let weight_kept: Option<Vec<f64>> =
                sample_weight.map(|w| keep.iter().map(|&i| w[i]).collect());
            let x_kept_buf = x.take_rows(&keep);
            let x_kept = Matrix::new(&x_kept_buf, keep.len(), x.cols);
            let (reduced_buf, reduced_cols) = x_kept.drop_columns(&feature_set)?;
            let x_reduced = Matrix::new(&reduced_buf, keep.len(), reduced_cols);

            let folds = match folds {
                Some(f) => {
                    check_len("fold assignment", keep.len(), f.len())?;
                    validate_v(f.v())?;
                    f
                }
                None => {
                    validate_v(cfg.v)?;
                    let mut rng = StdRng::seed_from_u64(cfg.seed);
                    if cfg.stratified {
                        NestedFolds::draw_stratified(&y_kept, cfg.v, &mut rng)?
                    } else {
                        NestedFolds::draw(keep.len(), cfg.v, &mut rng)?
                    }
                }
            };

            let full_fits = fit_arm(&y_kept, &x_kept, &folds, 0, learner, cfg.seed)?;
            let reduced_fits = fit_arm(
                &y_kept,
                &x_reduced,
                &folds,
                1,
                learner,
                cfg.seed.wrapping_add(folds.v() as u64),
            )?;
            info!(
                "Fitted {} held-out regressions per arm across the cross-fitting folds.",
                folds.v()
            );
            crossfit_core(
                &y_kept,
                weight_kept.as_deref(),
                &folds,
                &full_fits,
                &reduced_fits,
                feature_set,
                measure,
                cfg,
            )
        }
    }
}

fn validate_v(v: usize) -> Result<(), VarimpError> {
    if v < 2 {
        return Err(VarimpError::InvalidParameter(
            "v".to_string(),
            "at least 2 cross-fitting folds".to_string(),
            v.to_string(),
        ));
    }
    Ok(())
}

/// Fit one arm's regressions, one per inner fold, returning held-out
/// predictions per fold. Folds are independent, so they run in parallel; a
/// failure in any fold fails the whole arm.
fn fit_arm(
    y: &[f64],
    x: &Matrix<f64>,
    folds: &NestedFolds,
    half: usize,
    learner: &dyn Learner,
    seed_base: u64,
) -> Result<Vec<Vec<f64>>, VarimpError> {
    let inner = folds.inner(half);
    let half_idx = folds.half_indices(half);
    (0..inner.v())
        .into_par_iter()
        .map(|k| {
            let test = folds.inner_fold_indices(half, k);
            let train: Vec<usize> = half_idx
                .iter()
                .zip(inner.assignments())
                .filter(|(_, &a)| a != k)
                .map(|(&i, _)| i)
                .collect();
            let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();
            let train_buf = x.take_rows(&train);
            let x_train = Matrix::new(&train_buf, train.len(), x.cols);
            let test_buf = x.take_rows(&test);
            let x_test = Matrix::new(&test_buf, test.len(), x.cols);
            let preds = learner
                .fit_predict(&y_train, &x_train, &x_test, seed_base.wrapping_add(k as u64))
                .map_err(|e| match e {
                    VarimpError::RegressionFailure(_) => e,
                    other => VarimpError::RegressionFailure(other.to_string()),
                })?;
            if preds.len() != test.len() {
                return Err(VarimpError::RegressionFailure(format!(
                    "the learner returned {} predictions for a fold of {} observations",
                    preds.len(),
                    test.len()
                )));
            }
            Ok(preds)
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn crossfit_core(
    y: &[f64],
    sample_weight: Option<&[f64]>,
    folds: &NestedFolds,
    full_fits: &[Vec<f64>],
    reduced_fits: &[Vec<f64>],
    feature_set: Vec<usize>,
    measure: Measure,
    cfg: &EstimatorConfig,
) -> Result<ImportanceEstimate, VarimpError> {
    let (measure_fn, _) = measure_callables(&measure);
    let mut pos_of = vec![usize::MAX; y.len()];

    let mut arm = |half: usize, fits: &[Vec<f64>]| -> Result<(f64, Vec<f64>, Vec<f64>), VarimpError> {
        let half_idx = folds.half_indices(half);
        let n_h = half_idx.len();
        for (pos, &i) in half_idx.iter().enumerate() {
            pos_of[i] = pos;
        }
        let mut estimate = 0.0;
        let mut eif = vec![0.0; n_h];
        let mut preds = vec![0.0; n_h];
        let mut min_fold = usize::MAX;
        for (k, fold_fits) in fits.iter().enumerate() {
            let idx = folds.inner_fold_indices(half, k);
            min_fold = min_fold.min(idx.len());
            let y_fold: Vec<f64> = idx.iter().map(|&i| y[i]).collect();
            let weight_fold: Option<Vec<f64>> =
                sample_weight.map(|w| idx.iter().map(|&i| w[i]).collect());
            let weights = normalize_weights(weight_fold.as_deref(), idx.len())?;
            let comp = measure_fn(&y_fold, fold_fits, &weights)?;
            // Unequal folds carry proportionally unequal weight in the arm value.
            estimate += idx.len() as f64 / n_h as f64 * comp.estimate;
            for (j, &i) in idx.iter().enumerate() {
                eif[pos_of[i]] = comp.eif[j];
                preds[pos_of[i]] = fold_fits[j];
            }
        }
        if min_fold < SMALL_FOLD_WARNING {
            warn!(
                "Inner folds as small as {} observations may make the normal approximation unreliable.",
                min_fold
            );
        }
        Ok((estimate, eif, preds))
    };

    let (v_full, eif_full, full_predictions) = arm(0, full_fits)?;
    let (v_reduced, eif_reduced, reduced_predictions) = arm(1, reduced_fits)?;

    let naive_estimate = v_full - v_reduced;
    // One-step update per arm; each fold's influence curve is mean zero.
    let point_estimate = (v_full + mean(&eif_full)) - (v_reduced + mean(&eif_reduced));
    let n0 = eif_full.len();
    let n1 = eif_reduced.len();
    // The arms are estimated on disjoint halves, so their variances add.
    let standard_error =
        (sample_variance(&eif_full) / n0 as f64 + sample_variance(&eif_reduced) / n1 as f64).sqrt();
    let (ci_lower, ci_upper) = confidence_interval(point_estimate, standard_error, cfg.alpha, cfg.scale)?;
    let p = hypothesis_test(point_estimate, standard_error, cfg)?;

    let mut influence_curve = eif_full;
    influence_curve.extend(eif_reduced.iter().map(|e_| -e_));

    Ok(ImportanceEstimate {
        feature_set,
        measure,
        point_estimate,
        naive_estimate,
        influence_curve,
        standard_error,
        ci_lower,
        ci_upper,
        alpha: cfg.alpha,
        scale: cfg.scale,
        delta: cfg.delta,
        p_value: p,
        full_predictions,
        reduced_predictions,
        fold_assignment: Some(folds.clone()),
        n: n0 + n1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folds::Folds;
    use crate::measures::{PredictivenessMeasure, RSquaredMeasure};

    /// Predicts the training mean everywhere; deterministic and seed-free.
    struct MeanLearner {}
    impl Learner for MeanLearner {
        fn fit_predict(
            &self,
            y: &[f64],
            _x_train: &Matrix<f64>,
            x_predict: &Matrix<f64>,
            _seed: u64,
        ) -> Result<Vec<f64>, VarimpError> {
            let m = crate::utils::mean(y);
            Ok(vec![m; x_predict.rows])
        }
    }

    struct FailingLearner {}
    impl Learner for FailingLearner {
        fn fit_predict(
            &self,
            _y: &[f64],
            _x_train: &Matrix<f64>,
            _x_predict: &Matrix<f64>,
            _seed: u64,
        ) -> Result<Vec<f64>, VarimpError> {
            Err(VarimpError::RegressionFailure("model did not converge".to_string()))
        }
    }

    fn uneven_folds() -> NestedFolds {
        // 12 observations: outer half 0 holds 7, half 1 holds 5.
        let outer = Folds::from_assignments(vec![0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1], 2).unwrap();
        let inner0 = Folds::from_assignments(vec![0, 0, 0, 0, 1, 1, 1], 2).unwrap();
        let inner1 = Folds::from_assignments(vec![0, 0, 0, 1, 1], 2).unwrap();
        NestedFolds::new(outer, [inner0, inner1]).unwrap()
    }

    fn toy_y() -> Vec<f64> {
        vec![1.2, 0.4, 2.5, 1.9, 0.2, 1.4, 2.1, 0.8, 1.7, 0.3, 2.2, 1.1]
    }

    fn toy_fits(folds: &NestedFolds, y: &[f64]) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        // Full arm tracks the outcome with a small offset; reduced arm is flat.
        let full: Vec<Vec<f64>> = (0..folds.v())
            .map(|k| folds.inner_fold_indices(0, k).iter().map(|&i| y[i] + 0.1).collect())
            .collect();
        let reduced: Vec<Vec<f64>> = (0..folds.v())
            .map(|k| folds.inner_fold_indices(1, k).iter().map(|_| 1.3).collect())
            .collect();
        (full, reduced)
    }

    #[test]
    fn test_fitted_path_with_supplied_folds() {
        let y = toy_y();
        let folds = uneven_folds();
        let (full, reduced) = toy_fits(&folds, &y);
        let cfg = EstimatorConfig::default();
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Fitted { full, reduced },
            &[1],
            Measure::RSquared,
            None,
            Some(folds.clone()),
            &cfg,
        )
        .unwrap();
        assert_eq!(res.n, 12);
        assert_eq!(res.influence_curve.len(), 12);
        assert_eq!(res.full_predictions.len(), 7);
        assert_eq!(res.reduced_predictions.len(), 5);
        assert!(res.standard_error >= 0.0);
        assert!(res.ci_lower <= res.point_estimate && res.point_estimate <= res.ci_upper);
        assert_eq!(res.fold_assignment.as_ref().unwrap(), &folds);
    }

    #[test]
    fn test_aggregation_weights_folds_by_size() {
        let y = toy_y();
        let folds = uneven_folds();
        let (full, reduced) = toy_fits(&folds, &y);
        let cfg = EstimatorConfig::default();
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Fitted {
                full: full.clone(),
                reduced: reduced.clone(),
            },
            &[1],
            Measure::RSquared,
            None,
            Some(folds.clone()),
            &cfg,
        )
        .unwrap();

        // Reference: explicit per-fold weighting, never uniform across folds.
        let arm_reference = |half: usize, fits: &[Vec<f64>]| -> f64 {
            let n_h = folds.half_indices(half).len() as f64;
            (0..folds.v())
                .map(|k| {
                    let idx = folds.inner_fold_indices(half, k);
                    let y_fold: Vec<f64> = idx.iter().map(|&i| y[i]).collect();
                    let w = vec![1.0; idx.len()];
                    let comp = RSquaredMeasure::predictiveness(&y_fold, &fits[k], &w).unwrap();
                    idx.len() as f64 / n_h * comp.estimate
                })
                .sum()
        };
        let expected = arm_reference(0, &full) - arm_reference(1, &reduced);
        assert!((res.naive_estimate - expected).abs() < 1e-12);
    }

    #[test]
    fn test_fitted_path_requires_folds() {
        let y = toy_y();
        let folds = uneven_folds();
        let (full, reduced) = toy_fits(&folds, &y);
        let cfg = EstimatorConfig::default();
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Fitted { full, reduced },
            &[1],
            Measure::RSquared,
            None,
            None,
            &cfg,
        );
        assert!(matches!(res, Err(VarimpError::InvalidInput(_))));
    }

    #[test]
    fn test_fitted_fold_length_mismatch() {
        let y = toy_y();
        let folds = uneven_folds();
        let (full, mut reduced) = toy_fits(&folds, &y);
        reduced[0].pop();
        let cfg = EstimatorConfig::default();
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Fitted { full, reduced },
            &[1],
            Measure::RSquared,
            None,
            Some(folds),
            &cfg,
        );
        assert!(matches!(res, Err(VarimpError::LengthMismatch(_, _, _))));
    }

    #[test]
    fn test_learner_failure_aborts_whole_estimate() {
        let y = toy_y();
        let x_buf: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let x = Matrix::new(&x_buf, 12, 2);
        let cfg = EstimatorConfig::default().set_v(2);
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Raw {
                x: &x,
                learner: &FailingLearner {},
            },
            &[1],
            Measure::RSquared,
            None,
            None,
            &cfg,
        );
        assert!(matches!(res, Err(VarimpError::RegressionFailure(_))));
    }

    #[test]
    fn test_raw_path_runs_and_is_deterministic() {
        let y = toy_y();
        let x_buf: Vec<f64> = (0..24).map(|i| (i % 7) as f64).collect();
        let x = Matrix::new(&x_buf, 12, 2);
        let cfg = EstimatorConfig::default().set_v(2).set_seed(3);
        let run = || {
            estimate_cross_fitted(
                &y,
                RegressionInput::Raw {
                    x: &x,
                    learner: &MeanLearner {},
                },
                &[1],
                Measure::RSquared,
                None,
                None,
                &cfg,
            )
            .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.point_estimate, b.point_estimate);
        assert_eq!(a.influence_curve, b.influence_curve);
        assert_eq!(a.n, 12);
        assert!(a.fold_assignment.is_some());
    }

    #[test]
    fn test_na_rm_drops_missing_outcomes_in_raw_path() {
        let mut y = toy_y();
        y[2] = f64::NAN;
        let x_buf: Vec<f64> = (0..24).map(|i| (i % 5) as f64).collect();
        let x = Matrix::new(&x_buf, 12, 2);
        let cfg = EstimatorConfig::default().set_v(2);
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Raw {
                x: &x,
                learner: &MeanLearner {},
            },
            &[1],
            Measure::RSquared,
            None,
            None,
            &cfg,
        );
        assert!(matches!(res, Err(VarimpError::InvalidInput(_))));

        let cfg = cfg.set_na_rm(true);
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Raw {
                x: &x,
                learner: &MeanLearner {},
            },
            &[1],
            Measure::RSquared,
            None,
            None,
            &cfg,
        )
        .unwrap();
        assert_eq!(res.n, 11);
    }

    #[test]
    fn test_v_below_two_rejected() {
        let y = toy_y();
        let x_buf: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let x = Matrix::new(&x_buf, 12, 2);
        let cfg = EstimatorConfig::default().set_v(1);
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Raw {
                x: &x,
                learner: &MeanLearner {},
            },
            &[1],
            Measure::RSquared,
            None,
            None,
            &cfg,
        );
        assert!(matches!(res, Err(VarimpError::InvalidParameter(_, _, _))));
    }

    #[test]
    fn test_v_exceeding_half_size_rejected() {
        let y = toy_y();
        let x_buf: Vec<f64> = (0..24).map(|i| i as f64).collect();
        let x = Matrix::new(&x_buf, 12, 2);
        let cfg = EstimatorConfig::default().set_v(8);
        let res = estimate_cross_fitted(
            &y,
            RegressionInput::Raw {
                x: &x,
                learner: &MeanLearner {},
            },
            &[1],
            Measure::RSquared,
            None,
            None,
            &cfg,
        );
        assert!(matches!(res, Err(VarimpError::InvalidParameter(_, _, _))));
    }
}

//! Measures
//!
//! Performance-measure implementations used to quantify variable importance.
//! Each measure reports the plug-in predictiveness of one set of fitted values
//! together with the per-observation efficient-influence-function contributions
//! that drive the one-step correction and the asymptotic variance.
use crate::constants::{DEGENERACY_EPS, PROB_EPS};
use crate::data::FloatData;
use crate::errors::VarimpError;
use crate::utils::{items_to_strings, logit, weighted_mean, weighted_variance};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type MeasureFn = fn(&[f64], &[f64], &[f64]) -> Result<MeasureComponent, VarimpError>;

/// Plug-in predictiveness of one model and its influence-function contributions.
#[derive(Debug, Clone)]
pub struct MeasureComponent {
    pub estimate: f64,
    pub eif: Vec<f64>,
}

/// Importance contrast between a full and a reduced model on shared observations.
#[derive(Debug, Clone)]
pub struct MeasureContrast {
    /// Plug-in importance: predictiveness of the full model minus the reduced model.
    pub plugin: f64,
    /// Per-observation influence-function contributions of the contrast.
    pub eif: Vec<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    RSquared,
    Deviance,
    Accuracy,
    Auc,
    AverageValue,
}

impl FromStr for Measure {
    type Err = VarimpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RSquared" => Ok(Measure::RSquared),
            "Deviance" => Ok(Measure::Deviance),
            "Accuracy" => Ok(Measure::Accuracy),
            "AUC" => Ok(Measure::Auc),
            "AverageValue" => Ok(Measure::AverageValue),

            _ => Err(VarimpError::ParseString(
                s.to_string(),
                "Measure".to_string(),
                items_to_strings(vec!["RSquared", "Deviance", "Accuracy", "AUC", "AverageValue"]),
            )),
        }
    }
}

impl Measure {
    /// Whether the predictiveness lives in [0, 1], which gates the logit scale.
    pub fn is_bounded(&self) -> bool {
        measure_callables(self).1
    }

    /// The natural value of the importance contrast under no importance.
    pub fn null_value(&self) -> f64 {
        match self {
            Measure::RSquared => RSquaredMeasure::null_value(),
            Measure::Deviance => DevianceMeasure::null_value(),
            Measure::Accuracy => AccuracyMeasure::null_value(),
            Measure::Auc => AucMeasure::null_value(),
            Measure::AverageValue => AverageValueMeasure::null_value(),
        }
    }
}

pub fn measure_callables(measure: &Measure) -> (MeasureFn, bool) {
    match measure {
        Measure::RSquared => (RSquaredMeasure::predictiveness, RSquaredMeasure::bounded()),
        Measure::Deviance => (DevianceMeasure::predictiveness, DevianceMeasure::bounded()),
        Measure::Accuracy => (AccuracyMeasure::predictiveness, AccuracyMeasure::bounded()),
        Measure::Auc => (AucMeasure::predictiveness, AucMeasure::bounded()),
        Measure::AverageValue => (AverageValueMeasure::predictiveness, AverageValueMeasure::bounded()),
    }
}

/// Contract for a predictiveness measure.
///
/// Inputs are assumed aligned and NaN-free (the estimators enforce this), with
/// weights normalized to mean one. The returned influence contributions are
/// weight-scaled and sum to zero by construction.
pub trait PredictivenessMeasure {
    fn predictiveness(y: &[f64], pred: &[f64], weights: &[f64]) -> Result<MeasureComponent, VarimpError>;
    fn bounded() -> bool;
    fn null_value() -> f64 {
        0.0
    }
}

/// Predictiveness contrast between full and reduced fitted values.
pub fn importance_contrast(
    y: &[f64],
    full_pred: &[f64],
    reduced_pred: &[f64],
    weights: &[f64],
    measure: &Measure,
) -> Result<MeasureContrast, VarimpError> {
    let (measure_fn, _) = measure_callables(measure);
    let full = measure_fn(y, full_pred, weights)?;
    let reduced = measure_fn(y, reduced_pred, weights)?;
    let eif = full
        .eif
        .iter()
        .zip(&reduced.eif)
        .map(|(f_, r_)| f_ - r_)
        .collect();
    Ok(MeasureContrast {
        plugin: full.estimate - reduced.estimate,
        eif,
    })
}

fn check_binary(y: &[f64], measure: &str) -> Result<(), VarimpError> {
    if y.iter().any(|y_| *y_ != f64::ZERO && *y_ != f64::ONE) {
        return Err(VarimpError::InvalidInput(format!(
            "the {} measure requires a binary outcome coded 0/1",
            measure
        )));
    }
    Ok(())
}

pub struct RSquaredMeasure {}
impl PredictivenessMeasure for RSquaredMeasure {
    fn predictiveness(y: &[f64], pred: &[f64], weights: &[f64]) -> Result<MeasureComponent, VarimpError> {
        let n = f64::from_usize(y.len());
        let denom = weighted_variance(y, weights);
        if denom <= DEGENERACY_EPS {
            return Err(VarimpError::DegenerateModel(
                "the outcome has no variance, so the R-squared denominator is zero".to_string(),
            ));
        }
        let ybar = weighted_mean(y, weights);
        let mse = y
            .iter()
            .zip(pred)
            .zip(weights)
            .map(|((y_, p_), w_)| w_ * (y_ - p_).powi(2))
            .sum::<f64>()
            / n;
        // Delta-method combination of the MSE numerator and variance denominator.
        let eif = y
            .iter()
            .zip(pred)
            .zip(weights)
            .map(|((y_, p_), w_)| {
                let ic_num = (y_ - p_).powi(2) - mse;
                let ic_den = (y_ - ybar).powi(2) - denom;
                w_ * (-ic_num / denom + mse * ic_den / denom.powi(2))
            })
            .collect();
        Ok(MeasureComponent {
            estimate: f64::ONE - mse / denom,
            eif,
        })
    }
    fn bounded() -> bool {
        true
    }
}

pub struct DevianceMeasure {}
impl PredictivenessMeasure for DevianceMeasure {
    fn predictiveness(y: &[f64], pred: &[f64], weights: &[f64]) -> Result<MeasureComponent, VarimpError> {
        check_binary(y, "deviance")?;
        let n = f64::from_usize(y.len());
        let pbar = weighted_mean(y, weights);
        if pbar <= DEGENERACY_EPS || pbar >= f64::ONE - DEGENERACY_EPS {
            return Err(VarimpError::DegenerateModel(
                "the marginal outcome proportion is 0 or 1, so the null deviance is zero".to_string(),
            ));
        }
        let denom = -2.0 * (pbar * pbar.ln() + (f64::ONE - pbar) * (f64::ONE - pbar).ln());
        let unit_deviance = |y_: f64, p_: f64| {
            let p_ = p_.clamp(PROB_EPS, f64::ONE - PROB_EPS);
            -2.0 * (y_ * p_.ln() + (f64::ONE - y_) * (f64::ONE - p_).ln())
        };
        let dev = y
            .iter()
            .zip(pred)
            .zip(weights)
            .map(|((y_, p_), w_)| w_ * unit_deviance(*y_, *p_))
            .sum::<f64>()
            / n;
        // The denominator depends on the data through the marginal proportion,
        // whose influence enters through the chain rule at d(denom)/d(pbar).
        let d_denom = -2.0 * logit(pbar);
        let eif = y
            .iter()
            .zip(pred)
            .zip(weights)
            .map(|((y_, p_), w_)| {
                let ic_num = unit_deviance(*y_, *p_) - dev;
                let ic_den = d_denom * (y_ - pbar);
                w_ * (-ic_num / denom + dev * ic_den / denom.powi(2))
            })
            .collect();
        Ok(MeasureComponent {
            estimate: f64::ONE - dev / denom,
            eif,
        })
    }
    fn bounded() -> bool {
        true
    }
}

pub struct AccuracyMeasure {}
impl PredictivenessMeasure for AccuracyMeasure {
    fn predictiveness(y: &[f64], pred: &[f64], weights: &[f64]) -> Result<MeasureComponent, VarimpError> {
        check_binary(y, "accuracy")?;
        let correct: Vec<f64> = y
            .iter()
            .zip(pred)
            .map(|(y_, p_)| if (*p_ > 0.5) == (*y_ > 0.5) { f64::ONE } else { f64::ZERO })
            .collect();
        let estimate = weighted_mean(&correct, weights);
        let eif = correct.iter().zip(weights).map(|(c_, w_)| w_ * (c_ - estimate)).collect();
        Ok(MeasureComponent { estimate, eif })
    }
    fn bounded() -> bool {
        true
    }
}

/// Weighted empirical distribution of one outcome class's predictions,
/// supporting tail-mass queries with ties counted at half weight.
struct WeightedRanks {
    preds: Vec<f64>,
    cumw: Vec<f64>,
    total: f64,
}

impl WeightedRanks {
    fn new(mut pairs: Vec<(f64, f64)>) -> Self {
        pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        let mut cumw = Vec::with_capacity(pairs.len() + 1);
        cumw.push(0.0);
        let mut acc = 0.0;
        for (_, w_) in &pairs {
            acc += w_;
            cumw.push(acc);
        }
        let preds = pairs.into_iter().map(|(p_, _)| p_).collect();
        WeightedRanks { preds, cumw, total: acc }
    }

    fn frac_below(&self, t: f64) -> f64 {
        let lo = self.preds.partition_point(|p_| *p_ < t);
        let hi = self.preds.partition_point(|p_| *p_ <= t);
        (self.cumw[lo] + 0.5 * (self.cumw[hi] - self.cumw[lo])) / self.total
    }

    fn frac_above(&self, t: f64) -> f64 {
        let lo = self.preds.partition_point(|p_| *p_ < t);
        let hi = self.preds.partition_point(|p_| *p_ <= t);
        ((self.total - self.cumw[hi]) + 0.5 * (self.cumw[hi] - self.cumw[lo])) / self.total
    }
}

pub struct AucMeasure {}
impl PredictivenessMeasure for AucMeasure {
    fn predictiveness(y: &[f64], pred: &[f64], weights: &[f64]) -> Result<MeasureComponent, VarimpError> {
        check_binary(y, "AUC")?;
        let n = f64::from_usize(y.len());
        let mut cases = Vec::new();
        let mut controls = Vec::new();
        for ((y_, p_), w_) in y.iter().zip(pred).zip(weights) {
            if *y_ == f64::ONE {
                cases.push((*p_, *w_));
            } else {
                controls.push((*p_, *w_));
            }
        }
        let case_ranks = WeightedRanks::new(cases);
        let control_ranks = WeightedRanks::new(controls);
        if case_ranks.total <= 0.0 || control_ranks.total <= 0.0 {
            return Err(VarimpError::DegenerateModel(
                "AUC requires both outcome classes to be present with positive weight".to_string(),
            ));
        }
        // Weighted Mann-Whitney form of the AUC, ties at half weight.
        let estimate = y
            .iter()
            .zip(pred)
            .zip(weights)
            .filter(|((y_, _), _)| **y_ == f64::ONE)
            .map(|((_, p_), w_)| w_ * control_ranks.frac_below(*p_))
            .sum::<f64>()
            / case_ranks.total;
        let prev1 = case_ranks.total / n;
        let prev0 = control_ranks.total / n;
        let eif = y
            .iter()
            .zip(pred)
            .zip(weights)
            .map(|((y_, p_), w_)| {
                if *y_ == f64::ONE {
                    w_ * (control_ranks.frac_below(*p_) - estimate) / prev1
                } else {
                    w_ * (case_ranks.frac_above(*p_) - estimate) / prev0
                }
            })
            .collect();
        Ok(MeasureComponent { estimate, eif })
    }
    fn bounded() -> bool {
        true
    }
}

pub struct AverageValueMeasure {}
impl PredictivenessMeasure for AverageValueMeasure {
    fn predictiveness(y: &[f64], pred: &[f64], weights: &[f64]) -> Result<MeasureComponent, VarimpError> {
        check_binary(y, "average value")?;
        // Mean outcome under the plug-in optimal rule d(x) = 1{pred > 1/2}.
        let value: Vec<f64> = y
            .iter()
            .zip(pred)
            .map(|(y_, p_)| if *p_ > 0.5 { *y_ } else { f64::ZERO })
            .collect();
        let estimate = weighted_mean(&value, weights);
        let eif = value.iter().zip(weights).map(|(v_, w_)| w_ * (v_ - estimate)).collect();
        Ok(MeasureComponent { estimate, eif })
    }
    fn bounded() -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::{mean, precision_round};

    #[test]
    fn test_rsquared_perfect_fit() {
        let y = vec![1., 2., 3., 4.];
        let w = vec![1.0; 4];
        let res = RSquaredMeasure::predictiveness(&y, &y, &w).unwrap();
        assert_eq!(res.estimate, 1.0);
        assert!(mean(&res.eif).abs() < 1e-12);
    }

    #[test]
    fn test_rsquared_known_value() {
        let y = vec![1., 2., 3., 4.];
        let pred = vec![1.5, 1.5, 3.5, 3.5];
        let w = vec![1.0; 4];
        let res = RSquaredMeasure::predictiveness(&y, &pred, &w).unwrap();
        // mse = 0.25, var = 1.25.
        assert_eq!(res.estimate, 1.0 - 0.25 / 1.25);
        assert!(mean(&res.eif).abs() < 1e-12);
    }

    #[test]
    fn test_rsquared_degenerate_outcome() {
        let y = vec![2., 2., 2., 2.];
        let pred = vec![1., 2., 3., 4.];
        let w = vec![1.0; 4];
        let res = RSquaredMeasure::predictiveness(&y, &pred, &w);
        assert!(matches!(res, Err(VarimpError::DegenerateModel(_))));
    }

    #[test]
    fn test_deviance_known_value() {
        let y = vec![1., 0., 1., 0.];
        let pred = vec![0.8, 0.2, 0.6, 0.4];
        let w = vec![1.0; 4];
        let res = DevianceMeasure::predictiveness(&y, &pred, &w).unwrap();
        assert_eq!(precision_round(res.estimate, 4), 0.4706);
        assert!(mean(&res.eif).abs() < 1e-12);
    }

    #[test]
    fn test_deviance_degenerate_marginal() {
        let y = vec![1., 1., 1., 1.];
        let pred = vec![0.8, 0.9, 0.6, 0.7];
        let w = vec![1.0; 4];
        let res = DevianceMeasure::predictiveness(&y, &pred, &w);
        assert!(matches!(res, Err(VarimpError::DegenerateModel(_))));
    }

    #[test]
    fn test_deviance_requires_binary_outcome() {
        let y = vec![1., 0., 2., 0.];
        let pred = vec![0.8, 0.2, 0.6, 0.4];
        let w = vec![1.0; 4];
        assert!(DevianceMeasure::predictiveness(&y, &pred, &w).is_err());
    }

    #[test]
    fn test_accuracy_known_value() {
        let y = vec![1., 0., 1., 0.];
        let pred = vec![0.9, 0.4, 0.3, 0.6];
        let w = vec![1.0; 4];
        let res = AccuracyMeasure::predictiveness(&y, &pred, &w).unwrap();
        assert_eq!(res.estimate, 0.5);
        assert_eq!(res.eif, vec![0.5, 0.5, -0.5, -0.5]);
    }

    #[test]
    fn test_auc_known_value() {
        let y = vec![1., 0., 1., 0., 0., 0., 0.];
        let pred = vec![0.5, 0.01, -0., 1.05, 0., -4., 0.];
        let w = crate::utils::normalize_weights(Some(&[1., 1., 1., 1., 1., 2., 2.]), 7).unwrap();
        let res = AucMeasure::predictiveness(&y, &pred, &w).unwrap();
        assert_eq!(precision_round(res.estimate, 5), 0.67857);
        assert!(mean(&res.eif).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_degenerate() {
        let y = vec![1., 1., 1.];
        let pred = vec![0.2, 0.5, 0.9];
        let w = vec![1.0; 3];
        let res = AucMeasure::predictiveness(&y, &pred, &w);
        assert!(matches!(res, Err(VarimpError::DegenerateModel(_))));
    }

    #[test]
    fn test_average_value_known() {
        let y = vec![1., 0., 1., 0.];
        let pred = vec![0.9, 0.8, 0.2, 0.1];
        let w = vec![1.0; 4];
        let res = AverageValueMeasure::predictiveness(&y, &pred, &w).unwrap();
        assert_eq!(res.estimate, 0.25);
        assert!(mean(&res.eif).abs() < 1e-12);
    }

    #[test]
    fn test_contrast_is_zero_for_identical_predictions() {
        let y = vec![1., 0., 1., 0., 1., 1.];
        let pred = vec![0.8, 0.2, 0.6, 0.4, 0.7, 0.55];
        let w = vec![1.0; 6];
        for measure in [Measure::RSquared, Measure::Deviance, Measure::Accuracy, Measure::Auc] {
            let res = importance_contrast(&y, &pred, &pred, &w, &measure).unwrap();
            assert!(res.plugin.abs() < 1e-12);
            assert!(res.eif.iter().all(|e_| e_.abs() < 1e-12));
        }
    }

    #[test]
    fn test_measure_from_str() {
        assert_eq!(Measure::from_str("AUC").unwrap(), Measure::Auc);
        assert_eq!(Measure::from_str("RSquared").unwrap(), Measure::RSquared);
        assert!(Measure::from_str("Gini").is_err());
    }

    #[test]
    fn test_null_values_and_bounds() {
        for measure in [
            Measure::RSquared,
            Measure::Deviance,
            Measure::Accuracy,
            Measure::Auc,
            Measure::AverageValue,
        ] {
            assert_eq!(measure.null_value(), 0.0);
            assert!(measure.is_bounded());
        }
    }
}

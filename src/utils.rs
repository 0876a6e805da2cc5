use crate::data::FloatData;
use crate::errors::VarimpError;

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

// Validation
pub fn validate_float_parameter<T: FloatData<T>>(
    value: T,
    min: T,
    max: T,
    parameter: &str,
) -> Result<(), VarimpError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(VarimpError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate and normalize sample weights to mean one.
///
/// A `None` input stands for uniform weights. Weights must be non-negative,
/// free of NaN, and carry positive total mass.
pub fn normalize_weights(sample_weight: Option<&[f64]>, n: usize) -> Result<Vec<f64>, VarimpError> {
    match sample_weight {
        None => Ok(vec![1.0; n]),
        Some(w) => {
            if w.len() != n {
                return Err(VarimpError::LengthMismatch("sample_weight".to_string(), n, w.len()));
            }
            if w.iter().any(|w_| w_.is_nan() || *w_ < 0.0) {
                return Err(VarimpError::InvalidInput(
                    "sample weights must be non-negative and free of NaN".to_string(),
                ));
            }
            let w_sum: f64 = w.iter().sum();
            if w_sum <= 0.0 {
                return Err(VarimpError::InvalidInput(
                    "sample weights must have positive total mass".to_string(),
                ));
            }
            let scale = n as f64 / w_sum;
            Ok(w.iter().map(|w_| w_ * scale).collect())
        }
    }
}

/// Weighted mean, with weights normalized to mean one.
pub fn weighted_mean(x: &[f64], weights: &[f64]) -> f64 {
    let n = x.len() as f64;
    x.iter().zip(weights).map(|(x_, w_)| x_ * w_).sum::<f64>() / n
}

/// Weighted population variance around the weighted mean.
pub fn weighted_variance(x: &[f64], weights: &[f64]) -> f64 {
    let mean = weighted_mean(x, weights);
    let n = x.len() as f64;
    x.iter().zip(weights).map(|(x_, w_)| w_ * (x_ - mean).powi(2)).sum::<f64>() / n
}

/// Unweighted mean.
pub fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Unweighted sample variance (n - 1 denominator); zero for fewer than two values.
pub fn sample_variance(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let m = mean(x);
    x.iter().map(|x_| (x_ - m).powi(2)).sum::<f64>() / (x.len() as f64 - 1.0)
}

pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

pub fn expit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub fn precision_round(n: f64, precision: i32) -> f64 {
    let p = (10.0_f64).powi(precision);
    (n * p).round() / p
}

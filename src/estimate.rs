//! Estimate
//!
//! The importance-estimate result entity and the read-only comparison table
//! that merges several of them. Estimates are constructed once by the
//! estimation routines and never mutated; merging copies rows as-is, with no
//! recomputation and no multiple-comparison adjustment.
use crate::errors::VarimpError;
use crate::folds::NestedFolds;
use crate::inference::Scale;
use crate::measures::Measure;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs;
use std::path::Path;

/// A variable-importance estimate with its inference summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportanceEstimate {
    /// Covariate indices whose importance was assessed, sorted and unique.
    pub feature_set: Vec<usize>,
    /// Performance measure the importance is expressed in.
    pub measure: Measure,
    /// One-step corrected importance estimate.
    pub point_estimate: f64,
    /// Plug-in estimate before the influence-curve correction.
    pub naive_estimate: f64,
    /// Per-observation influence-curve contributions.
    pub influence_curve: Vec<f64>,
    pub standard_error: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    /// Confidence level is 1 - alpha.
    pub alpha: f64,
    /// Scale the interval was constructed on.
    pub scale: Scale,
    /// Null threshold of the one-sided hypothesis test.
    pub delta: f64,
    pub p_value: Option<f64>,
    /// Held-out predictions of the full regression.
    pub full_predictions: Vec<f64>,
    /// Held-out predictions of the reduced regression.
    pub reduced_predictions: Vec<f64>,
    /// Fold assignment used, when the estimate was cross-fitted.
    pub fold_assignment: Option<NestedFolds>,
    /// Number of observations contributing to the estimate.
    pub n: usize,
}

impl ImportanceEstimate {
    /// The (lower, upper) confidence interval.
    pub fn confidence_interval(&self) -> (f64, f64) {
        (self.ci_lower, self.ci_upper)
    }

    /// Dump the estimate as a json object.
    pub fn json_dump(&self) -> Result<String, VarimpError> {
        serde_json::to_string(self).map_err(|e| VarimpError::UnableToWrite(e.to_string()))
    }

    /// Load an estimate from a json string.
    /// * `json_str` - String object, which can be serialized to json.
    pub fn from_json(json_str: &str) -> Result<Self, VarimpError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| VarimpError::UnableToRead(e.to_string()))
    }

    /// Save the estimate as a json object to a file.
    /// * `path` - Path to save the estimate.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VarimpError> {
        fs::write(path, self.json_dump()?).map_err(|e| VarimpError::UnableToWrite(e.to_string()))
    }

    /// Load an estimate from a path to a json estimate object.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VarimpError> {
        let json_str = fs::read_to_string(path).map_err(|e| VarimpError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

/// An ordered, read-only comparison of several importance estimates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonTable {
    rows: Vec<ImportanceEstimate>,
}

impl ComparisonTable {
    /// Merge independently computed estimates into one ordered table.
    ///
    /// Rows are ordered by point estimate, largest first, ties broken by
    /// feature set. Each row is carried over unchanged.
    pub fn merge(estimates: Vec<ImportanceEstimate>) -> Self {
        let mut rows = estimates;
        rows.sort_by(|a, b| {
            b.point_estimate
                .total_cmp(&a.point_estimate)
                .then_with(|| a.feature_set.cmp(&b.feature_set))
        });
        ComparisonTable { rows }
    }

    pub fn rows(&self) -> &[ImportanceEstimate] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Dump the table as a json object.
    pub fn json_dump(&self) -> Result<String, VarimpError> {
        serde_json::to_string(self).map_err(|e| VarimpError::UnableToWrite(e.to_string()))
    }

    /// Load a table from a json string.
    pub fn from_json(json_str: &str) -> Result<Self, VarimpError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| VarimpError::UnableToRead(e.to_string()))
    }

    /// Save the table as a json object to a file.
    /// * `path` - Path to save the table.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VarimpError> {
        fs::write(path, self.json_dump()?).map_err(|e| VarimpError::UnableToWrite(e.to_string()))
    }

    /// Load a table from a path to a json table object.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VarimpError> {
        let json_str = fs::read_to_string(path).map_err(|e| VarimpError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl Display for ComparisonTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:>12} {:>12} {:>12} {:>12} {:>10}",
            "feature_set", "estimate", "se", "ci_lower", "ci_upper", "p_value"
        )?;
        for row in &self.rows {
            let features = row
                .feature_set
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<String>>()
                .join(",");
            let p = match row.p_value {
                Some(p) => format!("{:.4}", p),
                None => String::from("-"),
            };
            writeln!(
                f,
                "{:<16} {:>12.6} {:>12.6} {:>12.6} {:>12.6} {:>10}",
                features, row.point_estimate, row.standard_error, row.ci_lower, row.ci_upper, p
            )?;
        }
        Ok(())
    }
}

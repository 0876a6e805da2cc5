//! Errors
//!
//! Custom error types used throughout the `varimp` crate.
use thiserror::Error;

/// Errors that can occur while estimating variable importance.
#[derive(Debug, Error)]
pub enum VarimpError {
    /// Input vectors are malformed (NaN where none is allowed, empty after cleaning, etc.).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Two vectors that must align by position have different lengths.
    #[error("Length mismatch for {0}: expected {1} but got {2}.")]
    LengthMismatch(String, usize, usize),
    /// The denominator of a ratio measure is zero (e.g. no outcome variance).
    #[error("Degenerate model: {0}")]
    DegenerateModel(String),
    /// Coarsened observations are present but no correction inputs were supplied.
    #[error("Coarsening indicator contains zeros, but no {0} were supplied.")]
    MissingWeights(String),
    /// The logit scale is undefined at the requested value.
    #[error("The logit scale is undefined for {0} value {1}; use the identity scale instead.")]
    InvalidScale(String, f64),
    /// The learner collaborator failed while fitting a regression.
    #[error("Regression failure: {0}")]
    RegressionFailure(String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to write a result to a file.
    #[error("Unable to write result to file: {0}")]
    UnableToWrite(String),
    /// Unable to read a result from a file.
    #[error("Unable to read result from a file {0}")]
    UnableToRead(String),
}

//! Learner
//!
//! The boundary to the external regression procedure used to produce fitted
//! values. The estimation core never fits models itself; it hands each
//! cross-fitting fold's training data to a [`Learner`] and consumes the
//! held-out predictions, surfacing any failure as
//! [`VarimpError::RegressionFailure`].
use crate::data::Matrix;
use crate::errors::VarimpError;

/// An opaque regression procedure mapping covariates to fitted values.
///
/// Implementations must be deterministic given `seed` and return one real (or
/// probability) value per row of `x_predict`. Fold fitting may run on multiple
/// threads, hence the `Send + Sync` bound; implementations are free to be
/// internally parallel as well.
pub trait Learner: Send + Sync {
    /// Fit on `(y, x_train)` and predict on the rows of `x_predict`.
    fn fit_predict(
        &self,
        y: &[f64],
        x_train: &Matrix<f64>,
        x_predict: &Matrix<f64>,
        seed: u64,
    ) -> Result<Vec<f64>, VarimpError>;
}

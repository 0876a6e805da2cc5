use std::fmt::{Debug, Display};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use crate::errors::VarimpError;

/// Data trait used throughout the package
/// to control for floating point numbers.
pub trait FloatData<T>:
    Mul<Output = T>
    + Display
    + Add<Output = T>
    + Div<Output = T>
    + Neg<Output = T>
    + Copy
    + Debug
    + PartialEq
    + PartialOrd
    + AddAssign
    + Sub<Output = T>
    + SubAssign
    + Sum
    + std::marker::Send
    + std::marker::Sync
{
    /// Zero value.
    const ZERO: T;
    /// One value.
    const ONE: T;
    /// Not a Number value.
    const NAN: T;
    /// Infinity value.
    const INFINITY: T;
    /// Convert from usize.
    fn from_usize(v: usize) -> T;
    /// Check if value is NaN.
    fn is_nan(self) -> bool;
    /// Natural logarithm.
    fn ln(self) -> T;
    /// Exponential function.
    fn exp(self) -> T;
}

impl FloatData<f64> for f64 {
    const ZERO: f64 = 0.0;
    const ONE: f64 = 1.0;
    const NAN: f64 = f64::NAN;
    const INFINITY: f64 = f64::INFINITY;

    fn from_usize(v: usize) -> f64 {
        v as f64
    }
    fn is_nan(self) -> bool {
        self.is_nan()
    }
    fn ln(self) -> f64 {
        self.ln()
    }
    fn exp(self) -> f64 {
        self.exp()
    }
}

/// Contiguous Column Major Matrix data container.
///
/// Holds a dense covariate table in a single contiguous memory block in
/// column-major order, which allows for efficient column slicing and for
/// cheaply carving out the reduced design (covariates withheld) and the
/// per-fold train/test row subsets handed to the learner collaborator.
///
/// # Type Parameters
/// * `T` - The numeric type of the data (e.g., `f64`).
pub struct Matrix<'a, T> {
    /// The raw data stored in a single slice.
    pub data: &'a [T],
    /// Number of rows in the matrix.
    pub rows: usize,
    /// Number of columns in the matrix.
    pub cols: usize,
}

impl<'a, T> Matrix<'a, T> {
    /// Create a new Matrix.
    pub fn new(data: &'a [T], rows: usize, cols: usize) -> Self {
        Matrix { data, rows, cols }
    }

    /// Get a single reference to an item in the matrix.
    ///
    /// * `i` - The ith row of the data to get.
    /// * `j` - the jth column of the data to get.
    pub fn get(&self, i: usize, j: usize) -> &T {
        &self.data[self.item_index(i, j)]
    }

    fn item_index(&self, i: usize, j: usize) -> usize {
        j * self.rows + i
    }

    /// Get an entire column in the matrix.
    ///
    /// * `col` - The index of the column to get.
    pub fn get_col(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }
}

impl<'a, T> Matrix<'a, T>
where
    T: Copy,
{
    /// Build the reduced design by withholding a set of columns.
    ///
    /// Returns an owned column-major buffer holding every column whose index is
    /// not in `drop`, along with the remaining column count. The drop set must
    /// be a non-empty strict subset of the column index set.
    ///
    /// * `drop` - Sorted, deduplicated column indices to withhold.
    pub fn drop_columns(&self, drop: &[usize]) -> Result<(Vec<T>, usize), VarimpError> {
        if drop.is_empty() {
            return Err(VarimpError::InvalidInput(
                "the set of columns to withhold is empty".to_string(),
            ));
        }
        if let Some(&j) = drop.iter().find(|&&j| j >= self.cols) {
            return Err(VarimpError::InvalidInput(format!(
                "column index {} is out of bounds for a matrix with {} columns",
                j, self.cols
            )));
        }
        if drop.len() >= self.cols {
            return Err(VarimpError::InvalidInput(
                "withholding every column leaves an empty design; the feature set must be a strict subset".to_string(),
            ));
        }
        let kept = self.cols - drop.len();
        let mut data = Vec::with_capacity(kept * self.rows);
        for j in 0..self.cols {
            if drop.binary_search(&j).is_err() {
                data.extend_from_slice(self.get_col(j));
            }
        }
        Ok((data, kept))
    }

    /// Extract a row subset as an owned column-major buffer.
    ///
    /// * `rows` - Row indices to keep, in the order they should appear.
    pub fn take_rows(&self, rows: &[usize]) -> Vec<T> {
        let mut data = Vec::with_capacity(rows.len() * self.cols);
        for j in 0..self.cols {
            let col = self.get_col(j);
            for &i in rows {
                data.push(col[i]);
            }
        }
        data
    }
}

//! Folds
//!
//! Fold assignments for cross-fitting: a flat V-way partition, and the nested
//! form pairing an outer two-way sample split for hypothesis testing with an
//! inner V-way split per half. Folds are drawn once from a caller-supplied
//! random source, or supplied directly, and are immutable afterwards.
use crate::errors::VarimpError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A flat partition of observations into `v` folds of near-equal size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Folds {
    assignments: Vec<usize>,
    v: usize,
}

impl Folds {
    /// Draw a random partition; fold sizes differ by at most one.
    pub fn draw(n: usize, v: usize, rng: &mut StdRng) -> Result<Self, VarimpError> {
        validate_fold_count(n, v)?;
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        let mut assignments = vec![0; n];
        for (pos, &i) in order.iter().enumerate() {
            assignments[i] = pos % v;
        }
        Ok(Folds { assignments, v })
    }

    /// Draw a random partition preserving outcome-class proportions across folds.
    pub fn draw_stratified(y: &[f64], v: usize, rng: &mut StdRng) -> Result<Self, VarimpError> {
        let n = y.len();
        validate_fold_count(n, v)?;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| y[a].total_cmp(&y[b]));
        let mut assignments = vec![0; n];
        // Deal each outcome class round-robin, carrying the fold counter across
        // classes so overall fold sizes stay within one of each other.
        let mut next = 0;
        let mut i = 0;
        while i < n {
            let mut j = i;
            while j < n && y[order[j]].total_cmp(&y[order[i]]) == Ordering::Equal {
                j += 1;
            }
            let mut class: Vec<usize> = order[i..j].to_vec();
            class.shuffle(rng);
            for idx in class {
                assignments[idx] = next % v;
                next += 1;
            }
            i = j;
        }
        Ok(Folds { assignments, v })
    }

    /// Use a caller-supplied partition.
    pub fn from_assignments(assignments: Vec<usize>, v: usize) -> Result<Self, VarimpError> {
        if assignments.is_empty() {
            return Err(VarimpError::InvalidInput("fold assignments are empty".to_string()));
        }
        if let Some(&a) = assignments.iter().find(|&&a| a >= v) {
            return Err(VarimpError::InvalidInput(format!(
                "fold assignment {} is out of bounds for {} folds",
                a, v
            )));
        }
        let mut sizes = vec![0; v];
        for &a in &assignments {
            sizes[a] += 1;
        }
        if let Some(k) = sizes.iter().position(|&s| s == 0) {
            return Err(VarimpError::InvalidInput(format!("fold {} is empty", k)));
        }
        Ok(Folds { assignments, v })
    }

    pub fn v(&self) -> usize {
        self.v
    }

    /// Number of observations covered by the partition.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    /// Observation indices of fold `k`, in ascending order.
    pub fn fold_indices(&self, k: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|(_, &a)| a == k)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.v];
        for &a in &self.assignments {
            sizes[a] += 1;
        }
        sizes
    }
}

fn validate_fold_count(n: usize, v: usize) -> Result<(), VarimpError> {
    if v == 0 || v > n {
        return Err(VarimpError::InvalidParameter(
            "v".to_string(),
            format!("between 1 and the number of observations ({})", n),
            v.to_string(),
        ));
    }
    Ok(())
}

/// An outer two-way sample split with an inner V-way split per half.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NestedFolds {
    outer: Folds,
    inner: [Folds; 2],
}

impl NestedFolds {
    pub fn draw(n: usize, v: usize, rng: &mut StdRng) -> Result<Self, VarimpError> {
        let outer = Folds::draw(n, 2, rng)?;
        let inner0 = Folds::draw(outer.fold_indices(0).len(), v, rng)?;
        let inner1 = Folds::draw(outer.fold_indices(1).len(), v, rng)?;
        NestedFolds::new(outer, [inner0, inner1])
    }

    pub fn draw_stratified(y: &[f64], v: usize, rng: &mut StdRng) -> Result<Self, VarimpError> {
        let outer = Folds::draw_stratified(y, 2, rng)?;
        let y_half0: Vec<f64> = outer.fold_indices(0).iter().map(|&i| y[i]).collect();
        let inner0 = Folds::draw_stratified(&y_half0, v, rng)?;
        let y_half1: Vec<f64> = outer.fold_indices(1).iter().map(|&i| y[i]).collect();
        let inner1 = Folds::draw_stratified(&y_half1, v, rng)?;
        NestedFolds::new(outer, [inner0, inner1])
    }

    /// Use caller-supplied outer and inner partitions. The inner partition of
    /// half `h` is indexed against the ascending observation indices of that
    /// half.
    pub fn new(outer: Folds, inner: [Folds; 2]) -> Result<Self, VarimpError> {
        if outer.v() != 2 {
            return Err(VarimpError::InvalidParameter(
                "outer folds".to_string(),
                "a two-way split".to_string(),
                outer.v().to_string(),
            ));
        }
        for (h, inner_h) in inner.iter().enumerate() {
            let half = outer.fold_indices(h).len();
            if inner_h.len() != half {
                return Err(VarimpError::LengthMismatch(
                    format!("inner folds of outer half {}", h),
                    half,
                    inner_h.len(),
                ));
            }
        }
        if inner[0].v() != inner[1].v() {
            return Err(VarimpError::InvalidParameter(
                "inner folds".to_string(),
                "the same number of folds in both outer halves".to_string(),
                format!("{} and {}", inner[0].v(), inner[1].v()),
            ));
        }
        Ok(NestedFolds { outer, inner })
    }

    /// Number of inner cross-fitting folds.
    pub fn v(&self) -> usize {
        self.inner[0].v()
    }

    /// Total number of observations.
    pub fn len(&self) -> usize {
        self.outer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outer.is_empty()
    }

    pub fn outer(&self) -> &Folds {
        &self.outer
    }

    pub fn inner(&self, half: usize) -> &Folds {
        &self.inner[half]
    }

    /// Observation indices of outer half `half`, in ascending order.
    pub fn half_indices(&self, half: usize) -> Vec<usize> {
        self.outer.fold_indices(half)
    }

    /// Original observation indices of inner fold `k` within outer half `half`.
    pub fn inner_fold_indices(&self, half: usize, k: usize) -> Vec<usize> {
        let half_idx = self.half_indices(half);
        self.inner[half].fold_indices(k).iter().map(|&j| half_idx[j]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_draw_fold_sizes_differ_by_at_most_one() {
        let mut rng = StdRng::seed_from_u64(42);
        let folds = Folds::draw(103, 5, &mut rng).unwrap();
        let sizes = folds.sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 103);
        assert_eq!(*sizes.iter().max().unwrap() - *sizes.iter().min().unwrap(), 1);
    }

    #[test]
    fn test_draw_is_deterministic_given_seed() {
        let a = Folds::draw(50, 4, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Folds::draw(50, 4, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_draw_stratified_preserves_class_balance() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut y = vec![1.0; 30];
        y.extend(vec![0.0; 70]);
        let folds = Folds::draw_stratified(&y, 5, &mut rng).unwrap();
        for k in 0..5 {
            let cases = folds.fold_indices(k).iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(cases, 6);
            assert_eq!(folds.fold_indices(k).len(), 20);
        }
    }

    #[test]
    fn test_from_assignments_validation() {
        assert!(Folds::from_assignments(vec![0, 1, 2], 3).is_ok());
        assert!(Folds::from_assignments(vec![0, 1, 3], 3).is_err());
        assert!(Folds::from_assignments(vec![0, 0, 0], 2).is_err());
        assert!(Folds::from_assignments(vec![], 2).is_err());
    }

    #[test]
    fn test_invalid_fold_count() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Folds::draw(10, 0, &mut rng).is_err());
        assert!(Folds::draw(3, 5, &mut rng).is_err());
    }

    #[test]
    fn test_nested_partitions_cover_all_observations() {
        let mut rng = StdRng::seed_from_u64(42);
        let nested = NestedFolds::draw(103, 5, &mut rng).unwrap();
        let mut seen = vec![false; 103];
        for h in 0..2 {
            for k in 0..5 {
                for i in nested.inner_fold_indices(h, k) {
                    assert!(!seen[i]);
                    seen[i] = true;
                }
            }
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(nested.v(), 5);
    }

    #[test]
    fn test_nested_rejects_mismatched_inner() {
        let outer = Folds::from_assignments(vec![0, 1, 0, 1], 2).unwrap();
        let inner0 = Folds::from_assignments(vec![0, 1], 2).unwrap();
        let inner1 = Folds::from_assignments(vec![0, 1, 0], 2).unwrap();
        assert!(NestedFolds::new(outer, [inner0, inner1]).is_err());
    }
}

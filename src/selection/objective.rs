//! Thresholded coverage objective over one partition.
//!
//! The objective owns the similarity matrix of a single partition. Row `i`
//! describes how much coverage element `i` can donate to every element of the
//! partition; committing `i` zeroes that row.
//!
//! With a positive threshold the objective is not guaranteed to have
//! diminishing returns, so the lazy greedy shortcut is an approximation in
//! that regime.

use ndarray::Array2;

/// A set function that can be maximized greedily.
///
/// Elements are local positions `0..universe_size()`.
pub trait SubmodularObjective {
    /// Number of elements in the universe.
    fn universe_size(&self) -> usize;

    /// Gain of adding `candidate` to `selected`. Must not change state.
    fn marginal_gain(&self, selected: &[usize], candidate: usize) -> f64;

    /// Records that `element` has been selected.
    fn commit(&mut self, element: usize);
}

/// Facility-location style coverage over a similarity matrix.
///
/// The gain of `i` is the sum of the entries of row `i` that reach the
/// threshold, minus the coverage already provided to `i` by the selected
/// elements (`Σ D[s][i]`).
#[derive(Debug, Clone)]
pub struct CoverageObjective {
    distance: Array2<f64>,
    threshold: f64,
}

impl CoverageObjective {
    /// Creates an objective that takes ownership of `distance`.
    ///
    /// Callers that still need their matrix pass a clone; the objective
    /// mutates its own copy only.
    ///
    /// # Panics
    ///
    /// Panics if `distance` is not square.
    pub fn new(distance: Array2<f64>, threshold: f64) -> Self {
        assert_eq!(
            distance.nrows(),
            distance.ncols(),
            "Coverage objective requires a square matrix"
        );
        Self {
            distance,
            threshold,
        }
    }

    /// Significance threshold for coverage entries.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Current state of the similarity matrix.
    pub fn distance(&self) -> &Array2<f64> {
        &self.distance
    }

    /// Coverage `candidate` offers to the whole universe.
    fn significant_coverage(&self, candidate: usize) -> f64 {
        self.distance
            .row(candidate)
            .iter()
            .filter(|&&value| value >= self.threshold)
            .sum()
    }
}

impl SubmodularObjective for CoverageObjective {
    fn universe_size(&self) -> usize {
        self.distance.nrows()
    }

    fn marginal_gain(&self, selected: &[usize], candidate: usize) -> f64 {
        let already_covered: f64 = selected
            .iter()
            .map(|&s| self.distance[[s, candidate]])
            .sum();
        self.significant_coverage(candidate) - already_covered
    }

    fn commit(&mut self, element: usize) {
        self.distance.row_mut(element).fill(0.0);
    }
}

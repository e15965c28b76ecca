use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use super::measures::DependencyMeasures;

/// Initial best measure; every real dependency measure is larger
pub const NO_BEST_MEASURE: f64 = -10.0;

///
/// Strongest incoming and outgoing dependency of every event
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestRelations {
    /// Best measure of any edge into an event
    pub best_input_measure: Vec<f64>,
    /// Best measure of any edge out of an event
    pub best_output_measure: Vec<f64>,
    /// Source of the best incoming edge
    pub best_input_event: Vec<Option<usize>>,
    /// Target of the best outgoing edge
    pub best_output_event: Vec<Option<usize>>,
    /// Dependency measures of all pairs of distinct events
    pub all_measures: DMatrix<f64>,
}

impl BestRelations {
    ///
    /// Compute the best relations over all pairs of distinct events
    ///
    /// Ties keep the first maximum found.
    ///
    pub fn compute(measures: &DependencyMeasures<'_>) -> Self {
        let n = measures.index.num_events();
        let mut best = Self {
            best_input_measure: vec![NO_BEST_MEASURE; n],
            best_output_measure: vec![NO_BEST_MEASURE; n],
            best_input_event: vec![None; n],
            best_output_event: vec![None; n],
            all_measures: DMatrix::zeros(n, n),
        };
        for i in 0..n {
            for j in (0..n).filter(|j| *j != i) {
                let measure = measures.dependency(i, j);
                best.all_measures[(i, j)] = measure;
                if measure > best.best_output_measure[i] {
                    best.best_output_measure[i] = measure;
                    best.best_output_event[i] = Some(j);
                }
                if measure > best.best_input_measure[j] {
                    best.best_input_measure[j] = measure;
                    best.best_input_event[j] = Some(i);
                }
            }
        }
        best
    }
}

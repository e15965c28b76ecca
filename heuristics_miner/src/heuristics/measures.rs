use nalgebra::DMatrix;

use crate::event_log::event_index::EventIndex;

use super::{config::HeuristicsMinerConfig, statistics::RelationStatistics};

/// Penalty factor for differing occurrence counts in the long distance measure
const LONG_DISTANCE_OCCURRENCE_PENALTY: f64 = 5.0;

///
/// Dependency measures between events, computed from [`RelationStatistics`]
///
/// All measures are pure functions of the statistics and the configuration.
///
#[derive(Debug, Clone, Copy)]
pub struct DependencyMeasures<'a> {
    /// Index of events and activities
    pub index: &'a EventIndex,
    /// Collected statistics
    pub stats: &'a RelationStatistics,
    /// Parameters (divisor, overlap multiplier, positive observations threshold)
    pub config: &'a HeuristicsMinerConfig,
}

impl<'a> DependencyMeasures<'a> {
    /// Create measures over the given statistics
    pub fn new(
        index: &'a EventIndex,
        stats: &'a RelationStatistics,
        config: &'a HeuristicsMinerConfig,
    ) -> Self {
        Self {
            index,
            stats,
            config,
        }
    }

    fn ds(&self, i: usize, j: usize) -> f64 {
        self.stats.direct_succession[(i, j)] as f64
    }

    fn s2(&self, i: usize, j: usize) -> f64 {
        self.stats.succession2[(i, j)] as f64
    }

    /// Weighted parallel count of the activities of two events
    fn weighted_parallel(&self, i: usize, j: usize) -> f64 {
        let (ti, tj) = (self.index.transition_of(i), self.index.transition_of(j));
        self.stats.parallel[(ti, tj)] as f64 * self.config.overlap_multiplier
    }

    ///
    /// Direct dependency measure from `i` to `j`
    ///
    /// `1.0` from the start to the completion of the same activity, the
    /// (overlap-penalized) dependency from the completion of one activity to the
    /// start of another, and `0.0` for all other pairs.
    ///
    pub fn dependency(&self, i: usize, j: usize) -> f64 {
        let same = self.index.same_activity(i, j);
        if same && self.index.is_start(i) && self.index.is_complete(j) {
            1.0
        } else if !same && self.index.is_complete(i) && self.index.is_start(j) {
            (self.ds(i, j) - self.ds(j, i))
                / (self.ds(i, j)
                    + self.ds(j, i)
                    + self.weighted_parallel(i, j)
                    + self.config.dependency_divisor)
        } else {
            0.0
        }
    }

    /// Length-one loop measure of `i`
    pub fn l1l(&self, i: usize) -> f64 {
        self.ds(i, i) / (self.ds(i, i) + self.config.dependency_divisor)
    }

    ///
    /// Length-two loop measure between `i` and `j`
    ///
    /// Is `0.0` if one of both already has an accepted length-one loop (`l1l_relation`)
    /// backed by enough second-order successions.
    ///
    pub fn l2l(&self, i: usize, j: usize, l1l_relation: &[bool]) -> f64 {
        let pos = self.config.positive_observations_threshold;
        if (l1l_relation[i] && self.stats.succession2[(i, j)] >= pos)
            || (l1l_relation[j] && self.stats.succession2[(j, i)] >= pos)
        {
            return 0.0;
        }
        let s2 = self.s2(i, j) + self.s2(j, i);
        s2 / (s2 + self.config.dependency_divisor)
    }

    /// Long distance dependency measure from `i` to `j` (`0.0` if `i` never occurs)
    pub fn long_distance(&self, i: usize, j: usize) -> f64 {
        let occ_i = self.index.occurrences(i) as f64;
        if occ_i == 0.0 {
            return 0.0;
        }
        let occ_j = self.index.occurrences(j) as f64;
        self.stats.long_range_succession[(i, j)] as f64 / (occ_i + self.config.dependency_divisor)
            - LONG_DISTANCE_OCCURRENCE_PENALTY * (occ_i - occ_j).abs() / occ_i
    }

    /// All long distance measures (rows of events without occurrences stay `0.0`)
    pub fn long_distance_matrix(&self) -> DMatrix<f64> {
        let n = self.index.num_events();
        DMatrix::from_fn(n, n, |i, j| self.long_distance(i, j))
    }

    /// AND-measure of `old` and `new` as inputs of `owner`
    pub fn and_in(&self, owner: usize, old: usize, new: usize) -> f64 {
        if owner == new {
            return 0.0;
        }
        (self.ds(old, new) + self.ds(new, old) + self.weighted_parallel(new, old))
            / (self.ds(new, owner) + self.ds(old, owner) + 1.0)
    }

    /// AND-measure of `old` and `new` as outputs of `owner`
    pub fn and_out(&self, owner: usize, old: usize, new: usize) -> f64 {
        if owner == new {
            return 0.0;
        }
        (self.ds(old, new) + self.ds(new, old) + self.weighted_parallel(new, old))
            / (self.ds(owner, new) + self.ds(owner, old) + 1.0)
    }
}

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::heuristics_net::heuristics_net_struct::OrSet;

use super::measures::DependencyMeasures;

/// Whether an [`OrSet`] groups the inputs or the outputs of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    /// Inputs (join)
    Input,
    /// Outputs (split)
    Output,
}

///
/// AND-measures observed while building [`OrSet`]s
///
/// Entry `(new, old)` holds the last measure computed between a newly added neighbor and an existing subset member.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AndMeasures {
    /// Measures of input neighbors
    pub and_in: DMatrix<f64>,
    /// Measures of output neighbors
    pub and_out: DMatrix<f64>,
}

impl AndMeasures {
    /// Zero-filled measures for `num_events` events
    pub fn zeros(num_events: usize) -> Self {
        Self {
            and_in: DMatrix::zeros(num_events, num_events),
            and_out: DMatrix::zeros(num_events, num_events),
        }
    }
}

///
/// Builds [`OrSet`]s from flat neighbor lists using the "welcome" test
///
#[derive(Debug)]
pub struct OrSetBuilder<'a, 'm> {
    measures: &'a DependencyMeasures<'m>,
    and_threshold: f64,
    and_measures: &'a mut AndMeasures,
}

impl<'a, 'm> OrSetBuilder<'a, 'm> {
    /// Create a builder recording all computed AND-measures into `and_measures`
    pub fn new(measures: &'a DependencyMeasures<'m>, and_measures: &'a mut AndMeasures) -> Self {
        Self {
            measures,
            and_threshold: measures.config.and_threshold,
            and_measures,
        }
    }

    /// A subset welcomes `new` if `new` is in no AND-relation (w.r.t. `owner`) with any of its members
    fn welcomes(&mut self, kind: SetKind, owner: usize, new: usize, subset: &[usize]) -> bool {
        let mut welcome = true;
        for &old in subset {
            let (value, recorded) = match kind {
                SetKind::Input => (
                    self.measures.and_in(owner, old, new),
                    &mut self.and_measures.and_in,
                ),
                SetKind::Output => (
                    self.measures.and_out(owner, old, new),
                    &mut self.and_measures.and_out,
                ),
            };
            if new != old {
                recorded[(new, old)] = value;
            }
            if value > self.and_threshold {
                welcome = false;
            }
        }
        welcome
    }

    ///
    /// Distribute the `neighbors` of `owner` over subsets
    ///
    /// The first pass adds every neighbor to all subsets welcoming it (or to a new subset if none does).
    /// The second pass repeats the test once, so that neighbors can also join subsets created after them.
    /// No further passes are made.
    ///
    pub fn build(&mut self, kind: SetKind, owner: usize, neighbors: &[usize]) -> OrSet {
        let mut subsets: Vec<Vec<usize>> = Vec::new();
        for &new in neighbors {
            let mut welcomed = false;
            for subset in subsets.iter_mut() {
                if self.welcomes(kind, owner, new, subset) {
                    welcomed = true;
                    if !subset.contains(&new) {
                        subset.push(new);
                    }
                }
            }
            if !welcomed {
                subsets.push(vec![new]);
            }
        }
        for &new in neighbors {
            for subset in subsets.iter_mut() {
                if self.welcomes(kind, owner, new, subset) && !subset.contains(&new) {
                    subset.push(new);
                }
            }
        }
        OrSet::from_subsets(subsets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        event_log::event_index::{EventIndex, LifecycleType},
        heuristics::{config::HeuristicsMinerConfig, statistics::RelationStatistics},
    };

    /// Completion events of activities A, B, C, D with ids 0, 1, 2, 3
    fn four_activities() -> EventIndex {
        let mut index = EventIndex::new();
        for act in ["A", "B", "C", "D"] {
            index.insert(act, LifecycleType::Complete);
        }
        index
    }

    #[test]
    fn and_related_neighbors_are_split() {
        let index = four_activities();
        let mut stats = RelationStatistics::zeros(4, 4);
        // and_in(D, A, B) = (1 + 1 + 0) / (dS[B][D] + dS[A][D] + 1) = 2 / 4 = 0.5
        stats.direct_succession[(0, 1)] = 1;
        stats.direct_succession[(1, 0)] = 1;
        stats.direct_succession[(0, 3)] = 1;
        stats.direct_succession[(1, 3)] = 2;
        let config = HeuristicsMinerConfig::default();
        let measures = DependencyMeasures::new(&index, &stats, &config);
        assert!((measures.and_in(3, 0, 1) - 0.5).abs() < 1e-12);
        let mut and_measures = AndMeasures::zeros(4);
        let set = OrSetBuilder::new(&measures, &mut and_measures).build(SetKind::Input, 3, &[0, 1]);
        assert_eq!(set.subsets, vec![vec![0], vec![1]]);
        assert!((and_measures.and_in[(1, 0)] - 0.5).abs() < 1e-12);
        assert_eq!(and_measures.and_out.iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn unrelated_neighbors_share_a_subset() {
        let index = four_activities();
        let stats = RelationStatistics::zeros(4, 4);
        let config = HeuristicsMinerConfig::default();
        let measures = DependencyMeasures::new(&index, &stats, &config);
        let mut and_measures = AndMeasures::zeros(4);
        let set =
            OrSetBuilder::new(&measures, &mut and_measures).build(SetKind::Output, 3, &[2, 0, 1]);
        assert_eq!(set.subsets, vec![vec![2, 0, 1]]);
    }

    #[test]
    fn second_pass_completes_late_subsets() {
        let index = four_activities();
        let mut stats = RelationStatistics::zeros(4, 4);
        // A and C run in parallel, B is unrelated to both
        stats.parallel[(0, 2)] = 5;
        stats.parallel[(2, 0)] = 5;
        let config = HeuristicsMinerConfig::default();
        let measures = DependencyMeasures::new(&index, &stats, &config);
        let mut and_measures = AndMeasures::zeros(4);
        let set = OrSetBuilder::new(&measures, &mut and_measures).build(SetKind::Input, 3, &[1, 0, 2]);
        // (B xor A) and (C xor B)
        assert_eq!(set.subsets, vec![vec![1, 0], vec![2, 1]]);
        assert_eq!(and_measures.and_in[(2, 0)], 10.0);
    }

    #[test]
    fn empty_neighbors() {
        let index = four_activities();
        let stats = RelationStatistics::zeros(4, 4);
        let config = HeuristicsMinerConfig::default();
        let measures = DependencyMeasures::new(&index, &stats, &config);
        let mut and_measures = AndMeasures::zeros(4);
        assert!(OrSetBuilder::new(&measures, &mut and_measures)
            .build(SetKind::Input, 0, &[])
            .is_empty());
    }
}

use std::collections::{HashMap, HashSet};

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::event_log::{
    event_index::{EventIndex, LifecycleType},
    lifecycle_projection::{EventLogLifecycleProjection, TraceEntry},
};

use super::config::DanglingStartPolicy;

///
/// Relation statistics of an event log
///
/// Matrices indexed by event id are `E x E`, matrices indexed by transition (activity) id are `T x T`.
/// All times are in milliseconds.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationStatistics {
    /// Direct successions between a run of completions and the following start (event-indexed)
    pub direct_succession: DMatrix<u64>,
    /// Successions from the completion of an activity to every later start of another activity
    /// in the same trace, once per start (event-indexed)
    pub succession2: DMatrix<u64>,
    /// Number of times an activity was running when another one started (transition-indexed, symmetric)
    pub parallel: DMatrix<u64>,
    /// Summed duration of all completed activity instances (transition-indexed)
    pub total_activity_time: DVector<i64>,
    /// Number of completions (transition-indexed)
    pub total_activity_count: DVector<u64>,
    /// Summed time two activities were running at the same time (transition-indexed, symmetric)
    pub overlap_time: DMatrix<i64>,
    /// How often an event is the first start of a trace (event-indexed)
    pub start_count: DVector<u64>,
    /// How often an event is the last completion of a trace (event-indexed)
    pub end_count: DVector<u64>,
    /// Eventually-follows counts, once per distinct successor and scan position (event-indexed)
    pub long_range_succession: DMatrix<u64>,
    /// Number of recorded traces
    pub trace_count: u64,
}

impl RelationStatistics {
    /// Zero-filled statistics for `num_events` events of `num_transitions` activities
    pub fn zeros(num_events: usize, num_transitions: usize) -> Self {
        Self {
            direct_succession: DMatrix::zeros(num_events, num_events),
            succession2: DMatrix::zeros(num_events, num_events),
            parallel: DMatrix::zeros(num_transitions, num_transitions),
            total_activity_time: DVector::zeros(num_transitions),
            total_activity_count: DVector::zeros(num_transitions),
            overlap_time: DMatrix::zeros(num_transitions, num_transitions),
            start_count: DVector::zeros(num_events),
            end_count: DVector::zeros(num_events),
            long_range_succession: DMatrix::zeros(num_events, num_events),
            trace_count: 0,
        }
    }

    ///
    /// Collect the statistics of all traces of a projected log
    ///
    /// Traces are processed in parallel into partial statistics, which are then summed up.
    ///
    pub fn from_projection(
        projection: &EventLogLifecycleProjection,
        dangling_start_policy: DanglingStartPolicy,
    ) -> Self {
        let index = &projection.index;
        let (num_events, num_transitions) = (index.num_events(), index.num_transitions());
        projection
            .traces
            .par_iter()
            .fold(
                || Self::zeros(num_events, num_transitions),
                |mut stats, trace| {
                    stats.add_trace(index, trace, dangling_start_policy);
                    stats
                },
            )
            .reduce_with(|s1, s2| s1.merge(s2))
            .unwrap_or_else(|| Self::zeros(num_events, num_transitions))
    }

    /// Record all statistics of a single trace
    pub fn add_trace(
        &mut self,
        index: &EventIndex,
        trace: &[TraceEntry],
        dangling_start_policy: DanglingStartPolicy,
    ) {
        self.record_event_frequencies(index, trace, dangling_start_policy);
        self.record_long_range_successions(trace);
        self.trace_count += 1;
    }

    /// Sum up two partial statistics
    pub fn merge(mut self, other: Self) -> Self {
        self.direct_succession += other.direct_succession;
        self.succession2 += other.succession2;
        self.parallel += other.parallel;
        self.total_activity_time += other.total_activity_time;
        self.total_activity_count += other.total_activity_count;
        self.overlap_time += other.overlap_time;
        self.start_count += other.start_count;
        self.end_count += other.end_count;
        self.long_range_succession += other.long_range_succession;
        self.trace_count += other.trace_count;
        self
    }

    ///
    /// Update successions, parallelism, durations and start/end counts with a trace
    ///
    /// All per-trace bookkeeping is keyed by transition id.
    ///
    fn record_event_frequencies(
        &mut self,
        index: &EventIndex,
        trace: &[TraceEntry],
        dangling_start_policy: DanglingStartPolicy,
    ) {
        // Open instances: (count, timestamp of latest start)
        let mut started_not_finished: HashMap<usize, (u64, i64)> = HashMap::new();
        let mut finished_since_last_start: HashMap<usize, u64> = HashMap::new();
        let mut finished_ever: HashMap<usize, u64> = HashMap::new();
        let mut start_element: Option<usize> = None;
        let mut end_element: Option<usize> = None;
        let mut previous_was_complete = false;

        for entry in trace {
            let event = entry.event;
            let transition = index.transition_of(event);
            let now = entry.timestamp_ms;
            match index.event(event).lifecycle {
                LifecycleType::Start => {
                    start_element.get_or_insert(event);
                    for finished in finished_since_last_start.keys() {
                        if let Some(complete) = index.complete_event_of(*finished) {
                            self.direct_succession[(complete, event)] += 1;
                        }
                    }
                    for finished in finished_ever.keys().filter(|t| **t != transition) {
                        if let Some(complete) = index.complete_event_of(*finished) {
                            self.succession2[(complete, event)] += 1;
                        }
                    }
                    for running in started_not_finished.keys() {
                        self.parallel[(*running, transition)] += 1;
                        if *running != transition {
                            self.parallel[(transition, *running)] += 1;
                        }
                    }
                    let open = started_not_finished.entry(transition).or_insert((0, now));
                    open.0 += 1;
                    open.1 = now;
                    previous_was_complete = false;
                }
                LifecycleType::Complete => {
                    end_element = Some(event);
                    self.total_activity_count[transition] += 1;
                    if !previous_was_complete {
                        finished_since_last_start.clear();
                    }
                    if let Some((count, started)) = started_not_finished.remove(&transition) {
                        self.total_activity_time[transition] += now - started;
                        if count > 1 {
                            started_not_finished.insert(transition, (count - 1, started));
                        }
                        for (running, (_, running_started)) in &started_not_finished {
                            if *running != transition {
                                let overlap = now - running_started;
                                self.overlap_time[(transition, *running)] += overlap;
                                self.overlap_time[(*running, transition)] += overlap;
                            }
                        }
                    }
                    *finished_since_last_start.entry(transition).or_insert(0) += 1;
                    *finished_ever.entry(transition).or_insert(0) += 1;
                    previous_was_complete = true;
                }
                LifecycleType::Other(_) => {}
            }
        }

        if let Some(start) = start_element {
            self.start_count[start] += 1;
        }
        if let Some(end) = end_element {
            self.end_count[end] += 1;
        }
        if dangling_start_policy == DanglingStartPolicy::CloseAtTraceEnd {
            if let Some(last) = trace.last() {
                for (running, (count, started)) in started_not_finished {
                    self.total_activity_time[running] +=
                        (last.timestamp_ms - started) * count as i64;
                }
            }
        }
    }

    fn record_long_range_successions(&mut self, trace: &[TraceEntry]) {
        for (i, begin) in trace.iter().enumerate() {
            let row = begin.event;
            let mut done: HashSet<usize> = HashSet::new();
            for end in &trace[i + 1..] {
                let column = end.event;
                if done.insert(column) {
                    self.long_range_succession[(row, column)] += 1;
                }
                if row == column {
                    break;
                }
            }
        }
    }
}

///
/// Overlap measures between activities (transition-indexed)
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapMeasures {
    /// Product of the average overlap relative to the average durations of both activities (capped at 1 each)
    pub time: DMatrix<f64>,
    /// Squared parallel count relative to the product of both completion counts
    pub cardinality: DMatrix<f64>,
}

impl OverlapMeasures {
    /// Compute the overlap measures from collected statistics
    pub fn from_statistics(stats: &RelationStatistics) -> Self {
        let n = stats.parallel.nrows();
        let avg_time = |t: usize| {
            let count = stats.total_activity_count[t];
            let avg = if count == 0 {
                0.0
            } else {
                stats.total_activity_time[t] as f64 / count as f64
            };
            if avg == 0.0 {
                0.00001
            } else {
                avg
            }
        };
        let mut time = DMatrix::zeros(n, n);
        let mut cardinality = DMatrix::zeros(n, n);
        for a in 0..n {
            for b in 0..n {
                let parallel = stats.parallel[(a, b)];
                if parallel == 0 {
                    continue;
                }
                let avg_overlap = stats.overlap_time[(a, b)] as f64 / parallel as f64;
                let om_a = (avg_overlap / avg_time(a)).min(1.0);
                let om_b = (avg_overlap / avg_time(b)).min(1.0);
                time[(a, b)] = om_a * om_b;
                let counts =
                    stats.total_activity_count[a] as f64 * stats.total_activity_count[b] as f64;
                if counts > 0.0 {
                    cardinality[(a, b)] = (parallel as f64).powi(2) / counts;
                }
            }
        }
        Self { time, cardinality }
    }
}

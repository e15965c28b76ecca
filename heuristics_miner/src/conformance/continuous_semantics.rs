use std::collections::HashMap;

use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    event_log::lifecycle_projection::{EventLogLifecycleProjection, TraceEntry},
    heuristics_net::heuristics_net_struct::HeuristicsNet,
};

///
/// Result of replaying a log on a [`HeuristicsNet`] with continuous semantics
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Events that fired without missing tokens
    pub parsed_events: u64,
    /// All replayed events
    pub total_events: u64,
    /// Tokens that had to be created to fire events
    pub missing_tokens: u64,
    /// Tokens remaining after the end of traces
    pub tokens_left: u64,
    /// Number of replayed traces
    pub traces: u64,
    /// Traces with at least one missing token
    pub traces_with_missing_tokens: u64,
    /// Traces with at least one remaining token
    pub traces_with_tokens_left: u64,
    /// How often each edge passed a token
    pub arc_usage: DMatrix<u64>,
}

impl ReplayResult {
    fn empty(num_events: usize) -> Self {
        Self {
            parsed_events: 0,
            total_events: 0,
            missing_tokens: 0,
            tokens_left: 0,
            traces: 0,
            traces_with_missing_tokens: 0,
            traces_with_tokens_left: 0,
            arc_usage: DMatrix::zeros(num_events, num_events),
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.parsed_events += other.parsed_events;
        self.total_events += other.total_events;
        self.missing_tokens += other.missing_tokens;
        self.tokens_left += other.tokens_left;
        self.traces += other.traces;
        self.traces_with_missing_tokens += other.traces_with_missing_tokens;
        self.traces_with_tokens_left += other.traces_with_tokens_left;
        self.arc_usage += other.arc_usage;
        self
    }

    ///
    /// Continuous semantics fitness
    ///
    /// `(parsed - punishment) / events` with
    /// `punishment = missing / (traces - traces_missing + 1) + left / (traces - traces_left + 1)`.
    /// Is `0.0` if no events were replayed.
    ///
    pub fn fitness(&self) -> f64 {
        if self.total_events == 0 {
            return 0.0;
        }
        let punishment = self.missing_tokens as f64
            / (self.traces - self.traces_with_missing_tokens + 1) as f64
            + self.tokens_left as f64 / (self.traces - self.traces_with_tokens_left + 1) as f64;
        (self.parsed_events as f64 - punishment) / self.total_events as f64
    }
}

/// Tokens per (producer event, index of output subset)
struct Marking<'n> {
    net: &'n HeuristicsNet,
    tokens: HashMap<(usize, usize), u64>,
    start_token: bool,
}

impl<'n> Marking<'n> {
    fn new(net: &'n HeuristicsNet) -> Self {
        Self {
            net,
            tokens: HashMap::new(),
            start_token: true,
        }
    }

    /// Consume one token of an output subset of `from` that contains `to`
    fn consume_from(&mut self, from: usize, to: usize) -> bool {
        let subset = self
            .net
            .output_set(from)
            .subsets
            .iter()
            .enumerate()
            .position(|(k, s)| {
                s.contains(&to) && self.tokens.get(&(from, k)).is_some_and(|t| *t > 0)
            });
        match subset {
            Some(k) => {
                if let Some(t) = self.tokens.get_mut(&(from, k)) {
                    *t -= 1;
                }
                true
            }
            None => false,
        }
    }

    /// Fire `event`; returns the number of missing tokens
    fn fire(&mut self, event: usize, arc_usage: &mut DMatrix<u64>) -> u64 {
        let mut missing = 0;
        if self.start_token && self.net.start_tasks().contains(&event) {
            self.start_token = false;
        } else {
            for subset in &self.net.input_set(event).subsets {
                let producer = subset.iter().copied().find(|m| self.consume_from(*m, event));
                match producer {
                    Some(m) => arc_usage[(m, event)] += 1,
                    None => missing += 1,
                }
            }
        }
        for k in 0..self.net.output_set(event).len() {
            *self.tokens.entry((event, k)).or_insert(0) += 1;
        }
        missing
    }

    fn tokens_left(&self) -> u64 {
        self.tokens.values().sum::<u64>() + u64::from(self.start_token)
    }
}

fn replay_trace(
    net: &HeuristicsNet,
    event_ids: &[Option<usize>],
    trace: &[TraceEntry],
    result: &mut ReplayResult,
) {
    let mut marking = Marking::new(net);
    let mut trace_missing = 0;
    for entry in trace {
        result.total_events += 1;
        let Some(event) = event_ids[entry.event] else {
            // Not part of the net
            trace_missing += 1;
            continue;
        };
        let missing = marking.fire(event, &mut result.arc_usage);
        if missing == 0 {
            result.parsed_events += 1;
        }
        trace_missing += missing;
    }
    let left = marking.tokens_left();
    result.traces += 1;
    result.missing_tokens += trace_missing;
    result.tokens_left += left;
    if trace_missing > 0 {
        result.traces_with_missing_tokens += 1;
    }
    if left > 0 {
        result.traces_with_tokens_left += 1;
    }
}

///
/// Replay all traces of `log` on `net`
///
/// Events fire even if tokens are missing; missing and remaining tokens are counted.
/// The start task consumes a single initial token instead of its inputs (once per trace).
///
pub fn replay_net(net: &HeuristicsNet, log: &EventLogLifecycleProjection) -> ReplayResult {
    let num_events = net.num_events();
    // Map event ids of the log to event ids of the net
    let event_ids: Vec<Option<usize>> = log
        .index
        .events()
        .iter()
        .map(|e| net.index().event_of(&e.activity, &e.lifecycle))
        .collect();
    let unknown = event_ids.iter().filter(|e| e.is_none()).count();
    if unknown > 0 {
        tracing::debug!("{unknown} events of the log are not part of the net");
    }
    log.traces
        .par_iter()
        .fold(
            || ReplayResult::empty(num_events),
            |mut result, trace| {
                replay_trace(net, &event_ids, trace, &mut result);
                result
            },
        )
        .reduce_with(|r1, r2| r1.merge(r2))
        .unwrap_or_else(|| ReplayResult::empty(num_events))
}

///
/// Replay `log` on every net and report one [`ReplayResult`] per net
///
pub fn continuous_semantics_fitness(
    nets: &[HeuristicsNet],
    log: &EventLogLifecycleProjection,
) -> Vec<ReplayResult> {
    nets.iter().map(|net| replay_net(net, log)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heuristics::{
        config::HeuristicsMinerConfig,
        full::assemble,
        measures::DependencyMeasures,
        statistics::RelationStatistics,
    };

    fn mine(log: &EventLogLifecycleProjection, config: &HeuristicsMinerConfig) -> HeuristicsNet {
        let stats = RelationStatistics::from_projection(log, config.dangling_start_policy);
        assemble(&DependencyMeasures::new(&log.index, &stats, config)).net
    }

    fn sequence(activities: &[&'static str]) -> Vec<(&'static str, &'static str, i64)> {
        let mut trace = Vec::new();
        for (k, a) in activities.iter().enumerate() {
            trace.push((*a, "start", 2 * k as i64));
            trace.push((*a, "complete", 2 * k as i64 + 1));
        }
        trace
    }

    #[test]
    fn perfectly_fitting_sequence() {
        let log = EventLogLifecycleProjection::from_traces(vec![sequence(&["A", "B", "C"]); 15]);
        let net = mine(&log, &HeuristicsMinerConfig::default());
        let result = replay_net(&net, &log);
        assert_eq!(result.total_events, 90);
        assert_eq!(result.parsed_events, 90);
        assert_eq!(result.missing_tokens, 0);
        assert_eq!(result.tokens_left, 0);
        assert_eq!(result.fitness(), 1.0);
        // A complete -> B start was used once per trace
        assert_eq!(result.arc_usage[(1, 2)], 15);
    }

    #[test]
    fn deviating_trace_is_punished() {
        let mut traces = vec![sequence(&["A", "B", "C"]); 15];
        let train = EventLogLifecycleProjection::from_traces(traces.clone());
        let net = mine(&train, &HeuristicsMinerConfig::default());
        traces.push(sequence(&["A", "C"]));
        let test = EventLogLifecycleProjection::from_traces(traces);
        let results = continuous_semantics_fitness(&[net.clone(), net], &test);
        assert_eq!(results.len(), 2);
        let result = &results[0];
        assert_eq!(result.traces, 16);
        assert_eq!(result.traces_with_missing_tokens, 1);
        assert_eq!(result.traces_with_tokens_left, 1);
        // C start misses the token from B complete, A complete's token is left behind
        assert_eq!(result.missing_tokens, 1);
        assert_eq!(result.tokens_left, 1);
        assert_eq!(result.parsed_events, 93);
        let expected = (93.0 - (1.0 / 16.0 + 1.0 / 16.0)) / 94.0;
        assert!((result.fitness() - expected).abs() < 1e-12);
        assert_eq!(results[0], results[1]);
    }

    #[test]
    fn empty_log_has_zero_fitness() {
        let log = EventLogLifecycleProjection::default();
        let train = EventLogLifecycleProjection::from_traces(vec![sequence(&["A"])]);
        let net = mine(&train, &HeuristicsMinerConfig::default());
        let result = replay_net(&net, &log);
        assert_eq!(result.traces, 0);
        assert_eq!(result.fitness(), 0.0);
    }
}

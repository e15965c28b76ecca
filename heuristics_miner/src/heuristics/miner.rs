use std::collections::BTreeMap;

use nalgebra::DMatrix;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::{
    conformance::continuous_semantics::{replay_net, ReplayResult},
    event_log::{event_log_struct::EventLog, lifecycle_projection::EventLogLifecycleProjection},
    heuristics_net::heuristics_net_struct::HeuristicsNet,
};

use super::{
    config::HeuristicsMinerConfig,
    full::{assemble, NoiseCounters},
    measures::DependencyMeasures,
    or_sets::AndMeasures,
    statistics::{OverlapMeasures, RelationStatistics},
    threshold_values,
};

///
/// Statistics of a log that do not depend on thresholds
///
/// Measures derived from them (including the long distance dependencies) depend on the
/// configuration and are computed on demand.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicRelations {
    /// Collected relation statistics
    pub stats: RelationStatistics,
}

fn collect_basic_relations(
    log: &EventLogLifecycleProjection,
    config: &HeuristicsMinerConfig,
) -> BasicRelations {
    let stats = RelationStatistics::from_projection(log, config.dangling_start_policy);
    tracing::debug!(
        "Collected basic relations of {} traces over {} events",
        stats.trace_count,
        log.index.num_events()
    );
    BasicRelations { stats }
}

///
/// Result of mining a [`HeuristicsNet`]
///
#[derive(Debug, Clone)]
pub struct HeuristicsMiningResult {
    /// The mined net, with replay fitness and arc usage attached
    pub net: HeuristicsNet,
    /// Noise counters
    pub noise: NoiseCounters,
    /// Overlap measures between activities
    pub overlap: OverlapMeasures,
    /// Replay of the log on the mined net
    pub replay: ReplayResult,
    /// AND-measures observed while building the input and output sets
    pub and_measures: AndMeasures,
}

///
/// Mining session over one log
///
/// The basic relations are collected once and reused for all subsequent
/// [`HeuristicsMiner::mine`] calls, also after changing the configuration.
///
#[derive(Debug, Clone)]
pub struct HeuristicsMiner {
    log: EventLogLifecycleProjection,
    config: HeuristicsMinerConfig,
    basic_relations: Option<BasicRelations>,
}

impl HeuristicsMiner {
    /// Create a session over an already projected log
    pub fn new(log: EventLogLifecycleProjection, config: HeuristicsMinerConfig) -> Self {
        Self {
            log,
            config,
            basic_relations: None,
        }
    }

    /// Create a session over an [`EventLog`]
    pub fn from_event_log(log: &EventLog, config: HeuristicsMinerConfig) -> Self {
        Self::new(log.into(), config)
    }

    /// The projected log
    pub fn log(&self) -> &EventLogLifecycleProjection {
        &self.log
    }

    /// Current configuration
    pub fn config(&self) -> &HeuristicsMinerConfig {
        &self.config
    }

    /// Change the configuration (basic relations are kept)
    pub fn set_config(&mut self, config: HeuristicsMinerConfig) {
        self.config = config;
    }

    /// Replace the log (basic relations are reset)
    pub fn set_log(&mut self, log: EventLogLifecycleProjection) {
        self.log = log;
        self.reset_basic_relations();
    }

    /// Whether the basic relations were already collected
    pub fn basic_relations_made(&self) -> bool {
        self.basic_relations.is_some()
    }

    /// Forget the collected basic relations
    pub fn reset_basic_relations(&mut self) {
        self.basic_relations = None;
    }

    /// Whether the log contains any events a model could be mined from
    pub fn model_producible(&self) -> bool {
        self.log.index.total_occurrences() > 0
    }

    ///
    /// Collect the basic relations of the log (only once)
    ///
    /// The dangling start policy of the configuration at the time of the first call is used.
    ///
    pub fn make_basic_relations(&mut self) -> &BasicRelations {
        let Self {
            log,
            config,
            basic_relations,
        } = self;
        basic_relations.get_or_insert_with(|| collect_basic_relations(log, config))
    }

    ///
    /// Mine a [`HeuristicsNet`] with the current configuration
    ///
    /// The net is replayed on the log once; its fitness and arc usage are attached.
    /// Check [`HeuristicsMiner::model_producible`] first: a log without events yields
    /// an empty net.
    ///
    pub fn mine(&mut self) -> HeuristicsMiningResult {
        if !self.model_producible() {
            tracing::warn!("Log contains no events: no model producible");
        }
        let Self {
            log,
            config,
            basic_relations,
        } = self;
        let basic_relations =
            basic_relations.get_or_insert_with(|| collect_basic_relations(log, config));
        let stats = &basic_relations.stats;
        let measures = DependencyMeasures::new(&log.index, stats, config);
        let assembled = assemble(&measures);
        let overlap = OverlapMeasures::from_statistics(stats);

        let replay = replay_net(&assembled.net, log);
        tracing::info!(
            "Replayed {} traces: fitness {:.4}",
            replay.traces,
            replay.fitness()
        );
        let net = assembled
            .net
            .with_replay(replay.fitness(), replay.arc_usage.clone());
        HeuristicsMiningResult {
            net,
            noise: assembled.noise,
            overlap,
            replay,
            and_measures: assembled.and_measures,
        }
    }

    fn with_measures<R>(&mut self, f: impl FnOnce(&DependencyMeasures<'_>) -> R) -> R {
        let Self {
            log,
            config,
            basic_relations,
        } = self;
        let basic_relations =
            basic_relations.get_or_insert_with(|| collect_basic_relations(log, config));
        f(&DependencyMeasures::new(
            &log.index,
            &basic_relations.stats,
            config,
        ))
    }

    ///
    /// Long distance dependency measures of all event pairs
    ///
    /// Uses the current dependency divisor, like [`HeuristicsMiner::mine`].
    ///
    pub fn long_range_dependency(&mut self) -> DMatrix<f64> {
        self.with_measures(|measures| measures.long_distance_matrix())
    }

    /// See [`threshold_values::positive_observations_threshold_values`]
    pub fn positive_observations_threshold_values(&mut self) -> BTreeMap<u64, usize> {
        self.with_measures(threshold_values::positive_observations_threshold_values)
    }

    /// See [`threshold_values::dependency_threshold_values`]
    pub fn dependency_threshold_values(&mut self) -> BTreeMap<OrderedFloat<f64>, usize> {
        self.with_measures(threshold_values::dependency_threshold_values)
    }

    /// See [`threshold_values::relative_to_best_values`]
    pub fn relative_to_best_values(&mut self) -> Vec<f64> {
        self.with_measures(threshold_values::relative_to_best_values)
    }
}

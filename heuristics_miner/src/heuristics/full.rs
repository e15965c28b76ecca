use std::collections::HashSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::heuristics_net::heuristics_net_struct::{HeuristicsNet, CONNECTION_THRESHOLD};

use super::{
    best_relations::BestRelations,
    escape::can_escape,
    measures::DependencyMeasures,
    or_sets::{AndMeasures, OrSetBuilder, SetKind},
};

/// Accepted measures up to this value count as not yet accepted in the threshold pass
const NOT_ACCEPTED_MEASURE: f64 = 0.0001;

///
/// Stages of the net assembly, in the order they are passed
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssemblyStage {
    /// Nothing decided yet
    Initialized,
    /// Start and end task chosen
    StartEndChosen,
    /// Length-one and length-two loops accepted
    LoopsResolved,
    /// Best relations and threshold-passing edges accepted
    BestRelationsApplied,
    /// Input and output sets built
    OrSetsBuilt,
    /// Long distance edges added (or skipped if disabled)
    LongDistanceApplied,
    /// Net complete
    Finalized,
}

///
/// Noise counters of a mined net
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseCounters {
    /// Traces not starting with the chosen start task
    pub missing_start: u64,
    /// Traces not ending with the chosen end task
    pub missing_end: u64,
    /// Per accepted edge: direct successions observed in the opposite direction
    pub edges: DMatrix<u64>,
}

impl NoiseCounters {
    /// Sum of all counters
    pub fn total(&self) -> u64 {
        self.missing_start + self.missing_end + self.edges.iter().sum::<u64>()
    }
}

///
/// Result of the net assembly
///
#[derive(Debug, Clone)]
pub struct AssembledNet {
    /// The mined net (not yet replayed)
    pub net: HeuristicsNet,
    /// Noise counters
    pub noise: NoiseCounters,
    /// AND-measures observed while building input and output sets
    pub and_measures: AndMeasures,
    /// Best relations the assembly was based on
    pub best_relations: BestRelations,
}

///
/// Builds a [`HeuristicsNet`] from dependency measures, one [`AssemblyStage`] after the other
///
#[derive(Debug)]
pub struct NetAssembler<'a, 'm> {
    measures: &'a DependencyMeasures<'m>,
    stage: AssemblyStage,
    accepted: DMatrix<f64>,
    l1l_relation: Vec<bool>,
    l2l_relation: Vec<Option<usize>>,
    input_neighbors: Vec<Vec<usize>>,
    output_neighbors: Vec<Vec<usize>>,
    best_start: Option<usize>,
    best_end: Option<usize>,
    best_relations: Option<BestRelations>,
    noise: NoiseCounters,
    and_measures: AndMeasures,
    net: HeuristicsNet,
}

impl<'a, 'm> NetAssembler<'a, 'm> {
    /// Create an assembler over the given measures
    pub fn new(measures: &'a DependencyMeasures<'m>) -> Self {
        let n = measures.index.num_events();
        Self {
            measures,
            stage: AssemblyStage::Initialized,
            accepted: DMatrix::zeros(n, n),
            l1l_relation: vec![false; n],
            l2l_relation: vec![None; n],
            input_neighbors: vec![Vec::new(); n],
            output_neighbors: vec![Vec::new(); n],
            best_start: None,
            best_end: None,
            best_relations: None,
            noise: NoiseCounters {
                missing_start: 0,
                missing_end: 0,
                edges: DMatrix::zeros(n, n),
            },
            and_measures: AndMeasures::zeros(n),
            net: HeuristicsNet::new(
                measures.index.clone(),
                measures.stats.direct_succession.clone(),
            ),
        }
    }

    /// Current stage
    pub fn stage(&self) -> AssemblyStage {
        self.stage
    }

    fn advance(&mut self, from: AssemblyStage, to: AssemblyStage) {
        debug_assert_eq!(self.stage, from, "assembly stages must be passed in order");
        tracing::debug!("Net assembly: {:?} -> {:?}", from, to);
        self.stage = to;
    }

    fn num_events(&self) -> usize {
        self.measures.index.num_events()
    }

    fn ds(&self, i: usize, j: usize) -> u64 {
        self.measures.stats.direct_succession[(i, j)]
    }

    /// Add `from` to the inputs of `to` and `to` to the outputs of `from`
    fn connect(&mut self, from: usize, to: usize) {
        if !self.output_neighbors[from].contains(&to) {
            self.output_neighbors[from].push(to);
        }
        if !self.input_neighbors[to].contains(&from) {
            self.input_neighbors[to].push(from);
        }
    }

    fn accept_l2l(&mut self, i: usize, j: usize, measure: f64) {
        self.accepted[(i, j)] = measure;
        self.accepted[(j, i)] = measure;
        self.l2l_relation[i] = Some(j);
        self.l2l_relation[j] = Some(i);
        self.connect(j, i);
        self.connect(i, j);
    }

    ///
    /// Choose the events most often starting and ending a trace
    ///
    /// The first maximum wins.
    ///
    pub fn choose_start_end(&mut self) {
        let stats = self.measures.stats;
        let argmax = |counts: &nalgebra::DVector<u64>| {
            (0..counts.len()).fold(None, |best: Option<usize>, i| match best {
                Some(b) if counts[i] <= counts[b] => Some(b),
                _ => Some(i),
            })
        };
        self.best_start = argmax(&stats.start_count);
        self.best_end = argmax(&stats.end_count);
        if let Some(start) = self.best_start {
            self.net.set_start_tasks(vec![start]);
            self.noise.missing_start = stats.trace_count.saturating_sub(stats.start_count[start]);
        }
        if let Some(end) = self.best_end {
            self.net.set_end_tasks(vec![end]);
            self.noise.missing_end = stats.trace_count.saturating_sub(stats.end_count[end]);
        }
        self.advance(AssemblyStage::Initialized, AssemblyStage::StartEndChosen);
    }

    /// Accept length-one and length-two loops
    pub fn resolve_loops(&mut self) {
        let config = self.measures.config;
        let stats = self.measures.stats;
        let n = self.num_events();
        for i in 0..n {
            let measure = self.measures.l1l(i);
            if measure >= config.l1l_threshold
                && self.ds(i, i) >= config.positive_observations_threshold
            {
                self.accepted[(i, i)] = measure;
                self.l1l_relation[i] = true;
                self.connect(i, i);
            }
        }
        if config.use_length_two_loops {
            for i in 0..n {
                for j in (0..n).filter(|j| *j != i) {
                    let measure = self.measures.l2l(i, j, &self.l1l_relation);
                    if measure >= config.l2l_threshold
                        && stats.succession2[(i, j)] + stats.succession2[(j, i)]
                            >= config.positive_observations_threshold
                    {
                        self.accept_l2l(i, j, measure);
                    }
                }
            }
        }
        self.advance(AssemblyStage::StartEndChosen, AssemblyStage::LoopsResolved);
    }

    ///
    /// Accept the edges to and from the best partners and all edges passing the thresholds
    ///
    /// With all-connected heuristics every event except the start (end) task gets its best
    /// input (output), unless it is in a length-two loop with a partner having a better one.
    /// Otherwise every start event is connected to the completion of its activity.
    ///
    pub fn apply_best_relations(&mut self) {
        let config = self.measures.config;
        let n = self.num_events();
        let best = BestRelations::compute(self.measures);

        if config.use_length_two_loops {
            for i in 0..n {
                if Some(i) == self.best_start || Some(i) == self.best_end {
                    continue;
                }
                for j in (0..n).filter(|j| *j != i) {
                    let measure = self.measures.l2l(i, j, &self.l1l_relation);
                    if measure > 0.0 && measure > best.best_input_measure[i] {
                        self.accept_l2l(i, j, measure);
                    }
                }
            }
        }

        if config.use_all_connected_heuristics {
            for i in 0..n {
                let partner = self.l2l_relation[i];
                if Some(i) != self.best_start {
                    let covered =
                        partner.is_some_and(|j| best.best_input_measure[j] > best.best_input_measure[i]);
                    if let (false, Some(from)) = (covered, best.best_input_event[i]) {
                        self.accepted[(from, i)] = best.best_input_measure[i];
                        self.connect(from, i);
                        self.noise.edges[(from, i)] = self.ds(i, from);
                    }
                }
                if Some(i) != self.best_end {
                    let covered = partner
                        .is_some_and(|j| best.best_output_measure[j] > best.best_output_measure[i]);
                    if let (false, Some(to)) = (covered, best.best_output_event[i]) {
                        self.accepted[(i, to)] = best.best_output_measure[i];
                        self.connect(i, to);
                        self.noise.edges[(i, to)] = self.ds(to, i);
                    }
                }
            }
        } else {
            let index = self.measures.index;
            for i in 0..n {
                let transition = index.transition_of(i);
                let pair = if index.is_start(i) {
                    index.complete_event_of(transition).map(|c| (i, c))
                } else if index.is_complete(i) {
                    index.start_event_of(transition).map(|s| (s, i))
                } else {
                    None
                };
                if let Some((start, complete)) = pair {
                    self.accepted[(start, complete)] = self.measures.dependency(start, complete);
                    self.connect(start, complete);
                }
            }
        }

        for i in 0..n {
            for j in 0..n {
                if self.accepted[(i, j)] > NOT_ACCEPTED_MEASURE {
                    continue;
                }
                let measure = self.measures.dependency(i, j);
                if best.best_output_measure[i] - measure <= config.relative_to_best_threshold
                    && self.ds(i, j) >= config.positive_observations_threshold
                    && measure >= config.dependency_threshold
                {
                    self.accepted[(i, j)] = measure;
                    self.connect(i, j);
                    self.noise.edges[(i, j)] = self.ds(j, i);
                }
            }
        }
        self.best_relations = Some(best);
        self.advance(
            AssemblyStage::LoopsResolved,
            AssemblyStage::BestRelationsApplied,
        );
    }

    /// Group the accepted neighbors of every event into input and output sets
    pub fn build_or_sets(&mut self) {
        let mut builder = OrSetBuilder::new(self.measures, &mut self.and_measures);
        for event in 0..self.input_neighbors.len() {
            let inputs = builder.build(SetKind::Input, event, &self.input_neighbors[event]);
            let outputs = builder.build(SetKind::Output, event, &self.output_neighbors[event]);
            self.net.set_input_set(event, inputs);
            self.net.set_output_set(event, outputs);
        }
        self.advance(
            AssemblyStage::BestRelationsApplied,
            AssemblyStage::OrSetsBuilt,
        );
    }

    ///
    /// Add long distance edges (if enabled)
    ///
    /// Candidates are visited from the highest to the lowest event id; every accepted
    /// edge is part of the net the following escape checks run on.
    ///
    pub fn apply_long_distance(&mut self) {
        let config = self.measures.config;
        if let (true, Some(start)) = (config.use_long_distance_dependency, self.best_start) {
            let n = self.num_events();
            let always_visited: Vec<bool> = (0..n)
                .map(|i| i != start && !can_escape(&self.net, start, i, &HashSet::new()))
                .collect();
            let mut added = 0usize;
            for i in (0..n).rev() {
                for j in (0..n).rev() {
                    if i == j || (always_visited[j] && Some(j) != self.best_end) {
                        continue;
                    }
                    let score = self.measures.long_distance(i, j);
                    if score > config.long_distance_threshold
                        && can_escape(&self.net, i, j, &HashSet::new())
                    {
                        self.accepted[(i, j)] = score;
                        self.net.add_singleton_edge(i, j);
                        added += 1;
                    }
                }
            }
            tracing::debug!("Added {} long distance dependencies", added);
        }
        self.advance(
            AssemblyStage::OrSetsBuilt,
            AssemblyStage::LongDistanceApplied,
        );
    }

    /// Store the accepted measures in the net and return the result
    pub fn finalize(mut self) -> AssembledNet {
        self.advance(
            AssemblyStage::LongDistanceApplied,
            AssemblyStage::Finalized,
        );
        let connections = self
            .accepted
            .iter()
            .filter(|m| **m > CONNECTION_THRESHOLD)
            .count();
        self.net.set_dependency_measures(self.accepted);
        tracing::info!(
            "Mined heuristics net with {} connections (noise: {})",
            connections,
            self.noise.total()
        );
        let best_relations = match self.best_relations {
            Some(best) => best,
            None => BestRelations::compute(self.measures),
        };
        AssembledNet {
            net: self.net,
            noise: self.noise,
            and_measures: self.and_measures,
            best_relations,
        }
    }
}

/// Run all assembly stages
pub fn assemble(measures: &DependencyMeasures<'_>) -> AssembledNet {
    let mut assembler = NetAssembler::new(measures);
    assembler.choose_start_end();
    assembler.resolve_loops();
    assembler.apply_best_relations();
    assembler.build_or_sets();
    assembler.apply_long_distance();
    assembler.finalize()
}

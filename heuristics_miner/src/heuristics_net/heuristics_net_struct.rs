use std::fmt::Display;

use itertools::Itertools;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::event_log::event_index::EventIndex;

/// Dependency measures above this value count as connections
pub const CONNECTION_THRESHOLD: f64 = 0.01;

///
/// Split/join structure of the inputs or outputs of an event
///
/// A collection of subsets of event ids: the members of one subset are alternatives
/// (XOR) to each other, while distinct subsets are all required (AND).
/// Subsets keep the order in which their members were added.
///
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrSet {
    /// Subsets of event ids
    pub subsets: Vec<Vec<usize>>,
}

impl OrSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set from the given subsets
    pub fn from_subsets(subsets: Vec<Vec<usize>>) -> Self {
        Self { subsets }
    }

    /// Whether there are no subsets
    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    /// Number of subsets
    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    /// Append a subset
    pub fn push_subset(&mut self, subset: Vec<usize>) {
        self.subsets.push(subset);
    }

    /// All distinct event ids appearing in any subset (in order of first appearance)
    pub fn all_elements(&self) -> Vec<usize> {
        self.subsets.iter().flatten().copied().unique().collect()
    }

    /// All subsets containing `event`
    pub fn subsets_with_element(&self, event: usize) -> Vec<&Vec<usize>> {
        self.subsets.iter().filter(|s| s.contains(&event)).collect()
    }
}

impl Display for OrSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}]",
            self.subsets
                .iter()
                .map(|s| format!("[{}]", s.iter().join(", ")))
                .join(" ")
        )
    }
}

///
/// Heuristics net: input and output [`OrSet`]s per event, start/end tasks and dependency measures
///
/// Nets are created by the miner and not modified afterwards.
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicsNet {
    index: EventIndex,
    input_sets: Vec<OrSet>,
    output_sets: Vec<OrSet>,
    start_tasks: Vec<usize>,
    end_tasks: Vec<usize>,
    dependency_measures: DMatrix<f64>,
    direct_succession: DMatrix<u64>,
    arc_usage: DMatrix<u64>,
    fitness: Option<f64>,
}

impl HeuristicsNet {
    /// Create a net without any connections
    pub(crate) fn new(index: EventIndex, direct_succession: DMatrix<u64>) -> Self {
        let n = index.num_events();
        Self {
            index,
            input_sets: vec![OrSet::new(); n],
            output_sets: vec![OrSet::new(); n],
            start_tasks: Vec::new(),
            end_tasks: Vec::new(),
            dependency_measures: DMatrix::zeros(n, n),
            direct_succession,
            arc_usage: DMatrix::zeros(n, n),
            fitness: None,
        }
    }

    pub(crate) fn set_start_tasks(&mut self, start_tasks: Vec<usize>) {
        self.start_tasks = start_tasks;
    }

    pub(crate) fn set_end_tasks(&mut self, end_tasks: Vec<usize>) {
        self.end_tasks = end_tasks;
    }

    pub(crate) fn set_input_set(&mut self, event: usize, set: OrSet) {
        self.input_sets[event] = set;
    }

    pub(crate) fn set_output_set(&mut self, event: usize, set: OrSet) {
        self.output_sets[event] = set;
    }

    pub(crate) fn set_dependency_measures(&mut self, dependency_measures: DMatrix<f64>) {
        self.dependency_measures = dependency_measures;
    }

    /// Add `to` as singleton subset to the outputs of `from` and vice versa
    pub(crate) fn add_singleton_edge(&mut self, from: usize, to: usize) {
        self.output_sets[from].push_subset(vec![to]);
        self.input_sets[to].push_subset(vec![from]);
    }

    /// Attach replay results (fitness and arc usage)
    pub fn with_replay(mut self, fitness: f64, arc_usage: DMatrix<u64>) -> Self {
        self.fitness = Some(fitness);
        self.arc_usage = arc_usage;
        self
    }

    /// Index of the events of this net
    pub fn index(&self) -> &EventIndex {
        &self.index
    }

    /// Number of events
    pub fn num_events(&self) -> usize {
        self.index.num_events()
    }

    /// Input set of an event
    pub fn input_set(&self, event: usize) -> &OrSet {
        &self.input_sets[event]
    }

    /// Output set of an event
    pub fn output_set(&self, event: usize) -> &OrSet {
        &self.output_sets[event]
    }

    /// Start tasks
    pub fn start_tasks(&self) -> &[usize] {
        &self.start_tasks
    }

    /// End tasks
    pub fn end_tasks(&self) -> &[usize] {
        &self.end_tasks
    }

    /// Accepted dependency measures
    pub fn dependency_measures(&self) -> &DMatrix<f64> {
        &self.dependency_measures
    }

    /// Number of times each edge was used during replay
    pub fn arc_usage(&self) -> &DMatrix<u64> {
        &self.arc_usage
    }

    /// Accepted dependency measure and arc usage of an edge
    pub fn edge(&self, from: usize, to: usize) -> (f64, u64) {
        (
            self.dependency_measures[(from, to)],
            self.arc_usage[(from, to)],
        )
    }

    /// Number of direct successions observed from `from` to `to`
    pub fn direct_succession_count(&self, from: usize, to: usize) -> u64 {
        self.direct_succession[(from, to)]
    }

    /// Replay fitness (if the net was replayed)
    pub fn fitness(&self) -> Option<f64> {
        self.fitness
    }

    /// All events appearing in the output set of `event`
    pub fn all_elements_output_set(&self, event: usize) -> Vec<usize> {
        self.output_sets[event].all_elements()
    }

    /// All events appearing in the input set of `event`
    pub fn all_elements_input_set(&self, event: usize) -> Vec<usize> {
        self.input_sets[event].all_elements()
    }

    /// Subsets of the input set of `to` that contain `from`
    pub fn input_subsets_with_element(&self, to: usize, from: usize) -> Vec<&Vec<usize>> {
        self.input_sets[to].subsets_with_element(from)
    }

    /// Subsets of the output set of `from` that contain `to`
    pub fn output_subsets_with_element(&self, from: usize, to: usize) -> Vec<&Vec<usize>> {
        self.output_sets[from].subsets_with_element(to)
    }

    /// Number of edges with an accepted dependency measure above [`CONNECTION_THRESHOLD`]
    pub fn number_of_connections(&self) -> usize {
        self.dependency_measures
            .iter()
            .filter(|m| **m > CONNECTION_THRESHOLD)
            .count()
    }

    /// Events without any inputs and outputs
    pub fn disconnected_events(&self) -> Vec<usize> {
        (0..self.num_events())
            .filter(|e| self.input_sets[*e].is_empty() && self.output_sets[*e].is_empty())
            .collect()
    }

    /// Name of an event for display purposes
    fn event_label(&self, event: usize) -> String {
        self.index.event(event).to_string()
    }

    fn fmt_set(&self, set: &OrSet) -> String {
        set.subsets
            .iter()
            .map(|s| format!("[{}]", s.iter().map(|e| self.event_label(*e)).join(", ")))
            .join(" ")
    }
}

impl Display for HeuristicsNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in 0..self.num_events() {
            writeln!(f, "{}", self.event_label(event))?;
            writeln!(f, "  IN:  {}", self.fmt_set(&self.input_sets[event]))?;
            writeln!(f, "  OUT: {}", self.fmt_set(&self.output_sets[event]))?;
        }
        writeln!(
            f,
            "START: {}",
            self.start_tasks.iter().map(|e| self.event_label(*e)).join(", ")
        )?;
        write!(
            f,
            "END: {}",
            self.end_tasks.iter().map(|e| self.event_label(*e)).join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::event_index::LifecycleType;

    fn small_net() -> HeuristicsNet {
        let mut index = EventIndex::new();
        let a = index.insert("a", LifecycleType::Complete);
        let b = index.insert("b", LifecycleType::Complete);
        let c = index.insert("c", LifecycleType::Complete);
        let mut net = HeuristicsNet::new(index, DMatrix::zeros(3, 3));
        net.set_output_set(a, OrSet::from_subsets(vec![vec![b, c], vec![c]]));
        net.set_input_set(b, OrSet::from_subsets(vec![vec![a]]));
        net.set_input_set(c, OrSet::from_subsets(vec![vec![a]]));
        let mut measures = DMatrix::zeros(3, 3);
        measures[(a, b)] = 0.9;
        measures[(a, c)] = 0.005;
        net.set_dependency_measures(measures);
        net.set_start_tasks(vec![a]);
        net.set_end_tasks(vec![c]);
        net
    }

    #[test]
    fn set_queries() {
        let net = small_net();
        assert_eq!(net.all_elements_output_set(0), vec![1, 2]);
        assert_eq!(net.all_elements_input_set(1), vec![0]);
        assert_eq!(net.output_subsets_with_element(0, 2).len(), 2);
        assert_eq!(net.input_subsets_with_element(2, 0), vec![&vec![0]]);
        assert!(net.input_subsets_with_element(0, 1).is_empty());
        assert_eq!(net.number_of_connections(), 1);
        assert!(net.disconnected_events().is_empty());
        assert_eq!(net.output_set(0).to_string(), "[[1, 2] [2]]");
    }

    #[test]
    fn replay_is_attached() {
        let net = small_net();
        assert_eq!(net.fitness(), None);
        let mut usage = DMatrix::zeros(3, 3);
        usage[(0, 1)] = 4;
        let net = net.with_replay(0.75, usage);
        assert_eq!(net.fitness(), Some(0.75));
        assert_eq!(net.edge(0, 1), (0.9, 4));
    }

    #[test]
    fn display_lists_sets() {
        let text = small_net().to_string();
        assert!(text.contains("a (complete)\n  IN:  \n  OUT: [b (complete), c (complete)] [c (complete)]"));
        assert!(text.ends_with("END: c (complete)"));
    }

    #[test]
    fn singleton_edges_and_disconnected_events() {
        let mut net = small_net();
        net.set_output_set(0, OrSet::new());
        net.set_input_set(1, OrSet::new());
        assert_eq!(net.disconnected_events(), vec![0, 1]);
        net.add_singleton_edge(1, 2);
        assert_eq!(net.disconnected_events(), vec![0]);
        assert_eq!(net.input_set(2).subsets, vec![vec![0], vec![1]]);
        assert_eq!(net.output_set(1).subsets, vec![vec![2]]);
    }
}

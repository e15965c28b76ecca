#![warn(
    clippy::doc_markdown,
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs
)]

#![doc = include_str!("../README.md")]

///
/// Event Logs ([`EventLog`]) and their projection onto lifecycle events
///
pub mod event_log {
    /// Constants used in event logs
    pub mod constants;
    /// [`EventLog`] struct and sub-structs
    pub mod event_log_struct;
    /// Index of (activity, lifecycle) events of a log
    pub mod event_index;
    /// XES Import
    pub mod import_xes;
    /// Projection of an [`EventLog`] onto indexed lifecycle events with timestamps
    pub mod lifecycle_projection;

    pub use event_log_struct::{
        Attribute, AttributeValue, Attributes, Event, EventLog, Trace, XESEditableAttribute,
    };
}

///
/// `HeuristicsMiner++` discovery of [`HeuristicsNet`]s
///
pub mod heuristics {
    /// Selection of the strongest input and output of every event
    pub mod best_relations;
    /// Parameters of the miner
    pub mod config;
    /// Escape analysis for long distance dependencies
    pub mod escape;
    /// Assembly of the net from dependency measures
    pub mod full;
    /// Dependency, loop, long distance and AND-measures
    pub mod measures;
    /// Mining session caching the basic relations of a log
    pub mod miner;
    /// Grouping of neighbors into input and output sets
    pub mod or_sets;
    /// Relation statistics collected from traces
    pub mod statistics;
    /// Observed values of the thresholds
    pub mod threshold_values;

    #[cfg(test)]
    mod tests;
}

///
/// Heuristics nets
///
pub mod heuristics_net {
    /// Export [`HeuristicsNet`]s as DOT source
    pub mod export_dot;
    /// [`HeuristicsNet`] and [`OrSet`](heuristics_net_struct::OrSet) structs
    pub mod heuristics_net_struct;
    /// Export [`HeuristicsNet`]s as images (requires graphviz)
    #[cfg(feature = "graphviz-export")]
    pub mod image_export;
}

///
/// Conformance checking of [`HeuristicsNet`]s
///
pub mod conformance {
    /// Replay of logs on [`HeuristicsNet`]s with continuous semantics
    pub mod continuous_semantics;
}

#[doc(inline)]
pub use event_log::import_xes::import_xes_file;

#[doc(inline)]
pub use event_log::import_xes::import_xes_slice;

#[doc(inline)]
pub use event_log::import_xes::import_xes_str;

#[doc(inline)]
pub use event_log::import_xes::XESImportOptions;

#[doc(inline)]
pub use event_log::event_log_struct::EventLog;

#[doc(inline)]
pub use event_log::lifecycle_projection::EventLogLifecycleProjection;

#[doc(inline)]
pub use heuristics::config::HeuristicsMinerConfig;

#[doc(inline)]
pub use heuristics::miner::HeuristicsMiner;

#[doc(inline)]
pub use heuristics::miner::HeuristicsMiningResult;

#[doc(inline)]
pub use heuristics_net::heuristics_net_struct::HeuristicsNet;

#[doc(inline)]
pub use heuristics_net::export_dot::export_dot;

#[cfg(feature = "graphviz-export")]
#[doc(inline)]
pub use heuristics_net::image_export::export_heuristics_net_image_png;

#[cfg(feature = "graphviz-export")]
#[doc(inline)]
pub use heuristics_net::image_export::export_heuristics_net_image_svg;

#[doc(inline)]
pub use conformance::continuous_semantics::continuous_semantics_fitness;

///
/// Serialize a [`HeuristicsNet`] as a JSON [`String`]
///
pub fn heuristics_net_to_json(net: &HeuristicsNet) -> Result<String, serde_json::Error> {
    serde_json::to_string(net)
}

///
/// Deserialize a [`HeuristicsNet`] from a JSON [`str`]
///
pub fn json_to_heuristics_net(net_json: &str) -> Result<HeuristicsNet, serde_json::Error> {
    serde_json::from_str(net_json)
}

use std::{fs::File, io::Write, path::Path};

use graphviz_rust::{
    dot_generator::{attr, edge, graph, id, node, node_id, stmt},
    dot_structures::*,
    printer::{DotPrinter, PrinterContext},
};
use itertools::Itertools;

use crate::event_log::event_index::LifecycleType;

use super::heuristics_net_struct::HeuristicsNet;

/// Fill color of start tasks
const START_COLOR: &str = "#4B9969";
/// Fill color of end tasks
const END_COLOR: &str = "#D4001F";

///
/// Errors when exporting a [`HeuristicsNet`]
///
#[derive(Debug, thiserror::Error)]
pub enum NetExportError {
    /// IO error when writing the output (or running graphviz)
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
}

/// `esc` only adds the surrounding quotes, so quotes, backslashes and
/// (in record labels) field delimiters in names are escaped here
fn escape_label(s: &str, record: bool) -> String {
    s.chars().fold(String::with_capacity(s.len()), |mut escaped, c| {
        if matches!(c, '"' | '\\') || (record && matches!(c, '{' | '}' | '|' | '<' | '>')) {
            escaped.push('\\');
        }
        escaped.push(c);
        escaped
    })
}

fn node_name(event: usize) -> String {
    format!("e{event}")
}

fn fill_color(net: &HeuristicsNet, event: usize) -> String {
    let is_start = net.start_tasks().contains(&event);
    let is_end = net.end_tasks().contains(&event);
    match (is_start, is_end) {
        (true, true) => format!("{START_COLOR}:{END_COLOR}"),
        (true, false) => START_COLOR.to_string(),
        (false, true) => END_COLOR.to_string(),
        (false, false) => "white".to_string(),
    }
}

/// Name, lifecycle and occurrences of an event as label lines
fn label_lines(net: &HeuristicsNet, event: usize, record: bool) -> String {
    let e = net.index().event(event);
    format!(
        "{}\\n{}\\n{}",
        escape_label(&e.activity, record),
        escape_label(e.lifecycle.as_str(), record),
        e.occurrences
    )
}

fn event_node(net: &HeuristicsNet, event: usize, split_join: bool) -> Stmt {
    let (label, shape) = if split_join {
        let ports = |prefix: &str, len: usize| (0..len).map(|k| format!("<{prefix}{k}>")).join("|");
        (
            format!(
                "{{{{{}}}|{}|{{{}}}}}",
                ports("i", net.input_set(event).len()),
                label_lines(net, event, true),
                ports("o", net.output_set(event).len())
            ),
            "Mrecord",
        )
    } else {
        (label_lines(net, event, false), "box")
    };
    stmt!(node!(esc node_name(event); attr!("label", esc label), attr!("shape", shape), attr!("style", "filled"), attr!("fillcolor", esc fill_color(net, event))))
}

/// One cluster per activity, holding its start, completion and other events
fn activity_cluster(net: &HeuristicsNet, transition: usize, split_join: bool) -> Stmt {
    let index = net.index();
    let activity = &index.activities()[transition];
    let events = [LifecycleType::Start, LifecycleType::Complete]
        .iter()
        .filter_map(|lc| index.event_of(activity, lc))
        .chain(
            (0..index.num_events())
                .filter(|e| index.transition_of(*e) == transition)
                .filter(|e| !index.is_start(*e) && !index.is_complete(*e)),
        );
    let stmts = std::iter::once(stmt!(attr!("label", esc escape_label(activity, false))))
        .chain(events.map(|event| event_node(net, event, split_join)))
        .collect();
    Stmt::Subgraph(Subgraph {
        id: id!(format!("cluster_{transition}")),
        stmts,
    })
}

fn plain_edges(net: &HeuristicsNet, from: usize) -> Vec<Stmt> {
    net.all_elements_output_set(from)
        .into_iter()
        .map(|to| {
            let (measure, _) = net.edge(from, to);
            let count = net.direct_succession_count(from, to);
            let label = if count == 0 {
                format!("{measure:.3}")
            } else {
                format!("{measure:.3}\\n{count}")
            };
            stmt!(edge!(node_id!(esc node_name(from)) => node_id!(esc node_name(to)), vec![attr!("label", esc label)]))
        })
        .collect()
}

fn port_node_id(event: usize, port: String) -> NodeId {
    NodeId(id!(esc node_name(event)), Some(Port(Some(id!(port)), None)))
}

/// Edges from the output ports of `from` to the matching input ports of their targets
fn port_edges(net: &HeuristicsNet, from: usize) -> Vec<Stmt> {
    let mut edges = Vec::new();
    for (k, subset) in net.output_set(from).subsets.iter().enumerate() {
        for to in subset {
            let (_, usage) = net.edge(from, *to);
            for (l, _) in net
                .input_set(*to)
                .subsets
                .iter()
                .enumerate()
                .filter(|(_, s)| s.contains(&from))
            {
                edges.push(stmt!(edge!(port_node_id(from, format!("o{k}")) => port_node_id(*to, format!("i{l}")), vec![attr!("label", esc usage)])));
            }
        }
    }
    edges
}

///
/// Export a [`HeuristicsNet`] to a DOT graph (used in Graphviz)
///
/// Events of the same activity are grouped in a cluster. Edges are labelled with their
/// dependency measure and direct succession count.
/// With `split_join`, events are drawn as records with one port per input (output) subset
/// and edges are labelled with their arc usage.
///
pub fn export_dot_graph(net: &HeuristicsNet, split_join: bool, dpi_factor: Option<f32>) -> Graph {
    let mut global_graph_options = vec![stmt!(attr!("rankdir", "LR"))];
    if let Some(dpi_fac) = dpi_factor {
        global_graph_options.push(stmt!(attr!("dpi", (dpi_fac * 96.0))))
    }
    let clusters: Vec<Stmt> = (0..net.index().activities().len())
        .map(|transition| activity_cluster(net, transition, split_join))
        .collect();
    let arcs: Vec<Stmt> = (0..net.num_events())
        .flat_map(|from| {
            if split_join {
                port_edges(net, from)
            } else {
                plain_edges(net, from)
            }
        })
        .collect();

    graph!(di id!("heuristics_net"), vec![global_graph_options, clusters, arcs].into_iter().flatten().collect())
}

///
/// Convert a DOT graph to a String containing the DOT source
///
pub fn graph_to_dot(g: &Graph) -> String {
    g.print(&mut PrinterContext::default())
}

///
/// Export a [`HeuristicsNet`] as Graphviz DOT source
///
/// Also see [`export_dot_graph`].
///
pub fn export_dot(net: &HeuristicsNet, split_join: bool) -> String {
    graph_to_dot(&export_dot_graph(net, split_join, None))
}

///
/// Write the DOT source of a [`HeuristicsNet`] to a writer
///
/// Also see [`export_dot`].
///
pub fn export_dot_to_writer<W: Write>(
    net: &HeuristicsNet,
    split_join: bool,
    mut writer: W,
) -> Result<(), NetExportError> {
    writer.write_all(export_dot(net, split_join).as_bytes())?;
    writer.flush()?;
    Ok(())
}

///
/// Write the DOT source of a [`HeuristicsNet`] to a file
///
pub fn export_dot_path<P: AsRef<Path>>(
    net: &HeuristicsNet,
    split_join: bool,
    path: P,
) -> Result<(), NetExportError> {
    export_dot_to_writer(net, split_join, File::create(path)?)
}

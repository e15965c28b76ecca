//! `hmpp`: mine heuristics nets from XES event logs on the command line

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use heuristics_miner::{
    export_heuristics_net_image_png, export_heuristics_net_image_svg,
    heuristics_net::export_dot::export_dot_path, import_xes_file, EventLogLifecycleProjection,
    HeuristicsMiner, HeuristicsMinerConfig, XESImportOptions,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Discover heuristics nets from event logs with start/complete lifecycle information
#[derive(Parser, Debug)]
#[command(name = "hmpp")]
#[command(author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log debug messages (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mine a heuristics net from a XES log (`.xes` or `.xes.gz`)
    Mine(MineArgs),
    /// Print the observed values of the mining thresholds
    Thresholds {
        /// Path of the event log
        log: PathBuf,
    },
    /// Print the default miner parameters as JSON
    DefaultConfig,
}

#[derive(Args, Debug)]
struct MineArgs {
    /// Path of the event log
    log: PathBuf,

    /// JSON file with miner parameters (missing fields use their defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the net as DOT source
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Draw split and join ports in DOT and image output
    #[arg(long)]
    split_join: bool,

    /// Write the net as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Render the net as PNG (requires graphviz)
    #[arg(long, conflicts_with = "svg")]
    png: Option<PathBuf>,

    /// Render the net as SVG (requires graphviz)
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Add long distance dependencies
    #[arg(long)]
    long_distance: bool,

    /// Do not connect every event to its best input and output
    #[arg(long)]
    no_all_connected: bool,

    /// Accept length-two loops
    #[arg(long)]
    length_two_loops: bool,
}

fn load_log(path: &Path) -> Result<EventLogLifecycleProjection> {
    let now = Instant::now();
    let log = import_xes_file(path, XESImportOptions::default())
        .with_context(|| format!("Failed to import event log {}", path.display()))?;
    info!(
        "Imported {} traces from {} in {:#?}",
        log.traces.len(),
        path.display(),
        now.elapsed()
    );
    let projection = EventLogLifecycleProjection::from(&log);
    if projection.index.total_occurrences() == 0 {
        bail!("Event log {} contains no events: no model producible", path.display());
    }
    Ok(projection)
}

fn load_config(path: Option<&PathBuf>) -> Result<HeuristicsMinerConfig> {
    let config = match path {
        Some(path) => HeuristicsMinerConfig::from_json_file(path)
            .with_context(|| format!("Failed to read parameters from {}", path.display()))?,
        None => HeuristicsMinerConfig::default(),
    };
    Ok(config.sanitized())
}

fn mine(args: &MineArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    config.use_long_distance_dependency |= args.long_distance;
    config.use_all_connected_heuristics &= !args.no_all_connected;
    config.use_length_two_loops |= args.length_two_loops;
    let projection = load_log(&args.log)?;

    let now = Instant::now();
    let mut miner = HeuristicsMiner::new(projection, config);
    let result = miner.mine();
    info!("Mined net in {:#?}", now.elapsed());

    println!("{}", result.net);
    println!();
    println!("Connections: {}", result.net.number_of_connections());
    println!(
        "Noise: {} (missing start: {}, missing end: {})",
        result.noise.total(),
        result.noise.missing_start,
        result.noise.missing_end
    );
    println!(
        "Fitness: {:.4} ({} of {} events parsed, {} missing and {} remaining tokens)",
        result.replay.fitness(),
        result.replay.parsed_events,
        result.replay.total_events,
        result.replay.missing_tokens,
        result.replay.tokens_left
    );

    if let Some(path) = &args.dot {
        export_dot_path(&result.net, args.split_join, path)
            .with_context(|| format!("Failed to write DOT file {}", path.display()))?;
        info!("Wrote DOT source to {}", path.display());
    }
    if let Some(path) = &args.json {
        let json = serde_json::to_string_pretty(&result.net)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write JSON file {}", path.display()))?;
        info!("Wrote JSON to {}", path.display());
    }
    if let Some(path) = &args.png {
        export_heuristics_net_image_png(&result.net, path, args.split_join)
            .with_context(|| format!("Failed to render PNG {}", path.display()))?;
        info!("Rendered PNG to {}", path.display());
    }
    if let Some(path) = &args.svg {
        export_heuristics_net_image_svg(&result.net, path, args.split_join)
            .with_context(|| format!("Failed to render SVG {}", path.display()))?;
        info!("Rendered SVG to {}", path.display());
    }
    Ok(())
}

fn thresholds(log: &Path) -> Result<()> {
    let mut miner = HeuristicsMiner::new(load_log(log)?, HeuristicsMinerConfig::default());

    println!("Positive observations (threshold: pairs with at least as many direct successions)");
    for (observations, pairs) in miner.positive_observations_threshold_values() {
        println!("  {observations:>8}: {pairs}");
    }
    println!("Dependency (threshold: pairs with at least this measure)");
    for (measure, pairs) in miner.dependency_threshold_values() {
        println!("  {:>8.4}: {pairs}", measure.0);
    }
    println!("Relative to best (distinct values)");
    for value in miner.relative_to_best_values() {
        println!("  {value:.7}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Mine(args) => mine(&args),
        Commands::Thresholds { log } => thresholds(&log),
        Commands::DefaultConfig => {
            println!("{}", HeuristicsMinerConfig::default().to_json()?);
            Ok(())
        }
    }
}

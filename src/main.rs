//! iris-view: view logic of interactive validation-report charts
//!
//! Loads a per-residue validation dataset and a chart configuration, then
//! computes what the report's charts display: box-plot ranges, static iris
//! chart geometry, and the chart model after a scripted sequence of UI events.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::PathBuf;

mod config;
mod dataset;
mod geometry;
mod iris;
mod output;
mod palette;
mod selection;
mod stats;
mod view;

use crate::config::{ChartConfig, Variant};
use crate::dataset::Dataset;
use crate::iris::IrisChart;
use crate::selection::{Event, Redraw, ViewState};
use crate::view::{ChartModel, Renderer};

/// Compute chart geometry and view state for validation reports
#[derive(Parser, Debug)]
#[command(name = "iris-view")]
#[command(version)]
#[command(about = "Chart geometry and interaction state for molecular validation reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-model box plot ranges of the bar metrics
    Ranges(RangesArgs),

    /// Static iris chart geometry
    Layout(LayoutArgs),

    /// Replay a YAML event script and print the resulting chart model
    Replay(ReplayArgs),
}

/// Options shared by every subcommand
#[derive(Args, Debug)]
struct CommonArgs {
    /// Dataset JSON file (.json or .json.gz)
    #[arg(short, long)]
    dataset: PathBuf,

    /// YAML chart configuration (overrides on top of the variant preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Report variant preset used when no configuration file is given
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use compact JSON (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RangesArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Chain index (all chains when omitted)
    #[arg(long)]
    chain: Option<usize>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// YAML list of events, e.g. `- select_chain: 1` or `- toggle_model`
    #[arg(short, long)]
    events: PathBuf,

    /// Include the redraw set of every step in the output
    #[arg(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ranges(args) => run_ranges(args),
        Commands::Layout(args) => run_layout(args),
        Commands::Replay(args) => run_replay(args),
    }
}

fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

/// Load dataset and configuration, checking one against the other
fn load_inputs(common: &CommonArgs) -> Result<(Dataset, ChartConfig)> {
    let config = match (&common.config, common.variant) {
        (Some(path), Some(_)) => {
            log::warn!("--variant is ignored when --config is given; set `variant` in the file instead");
            ChartConfig::from_yaml(path)?
        }
        (Some(path), None) => ChartConfig::from_yaml(path)?,
        (None, variant) => ChartConfig::preset(variant.unwrap_or_default()),
    };
    info!("Report variant: {}", config.variant);

    let dataset = Dataset::load(&common.dataset)?;
    config
        .check_dataset(&dataset)
        .with_context(|| format!("Configuration does not fit dataset {}", common.dataset.display()))?;
    log::debug!("Chain lengths: {:?}", dataset.chain_lengths());
    Ok((dataset, config))
}

/// Run the ranges subcommand: dataset → box plot ranges (TSV or JSON)
fn run_ranges(args: RangesArgs) -> Result<()> {
    init_logging(args.common.verbose);
    info!("iris-view ranges v{}", env!("CARGO_PKG_VERSION"));

    let (dataset, config) = load_inputs(&args.common)?;
    let renderer = Renderer::new(&dataset, &config)?;
    let table = renderer.ranges();

    output::write_ranges(table, &dataset, args.common.output.as_deref(), args.common.compact)?;
    if let Some(path) = &args.common.output {
        info!("Ranges written to {}", path.display());
    }
    Ok(())
}

/// Run the layout subcommand: dataset → iris chart geometry (JSON)
fn run_layout(args: LayoutArgs) -> Result<()> {
    init_logging(args.common.verbose);
    info!("iris-view layout v{}", env!("CARGO_PKG_VERSION"));

    let (dataset, config) = load_inputs(&args.common)?;
    let charts = match args.chain {
        Some(chain) => vec![IrisChart::build(&dataset, chain, &config)?],
        None => IrisChart::build_all(&dataset, &config)?,
    };
    info!("Built geometry for {} chain(s)", charts.len());

    write_output(&charts, &args.common)
}

/// One replayed event
#[derive(Debug, Serialize)]
struct ReplayStep {
    event: Event,
    redraw: Redraw,
}

#[derive(Debug, Serialize)]
struct ReplayResult {
    state: ViewState,
    model: ChartModel,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    steps: Vec<ReplayStep>,
}

/// Run the replay subcommand: dataset + event script → final chart model (JSON)
fn run_replay(args: ReplayArgs) -> Result<()> {
    init_logging(args.common.verbose);
    info!("iris-view replay v{}", env!("CARGO_PKG_VERSION"));

    let (dataset, config) = load_inputs(&args.common)?;
    let events = selection::load_script(&args.events)?;
    info!("Replaying {} events", events.len());

    let renderer = Renderer::new(&dataset, &config)?;
    let mut state = ViewState::new(&dataset);
    let mut model = renderer.render(&state);
    let mut steps = Vec::new();

    for (i, event) in events.into_iter().enumerate() {
        let redraw = renderer
            .handle(&mut model, &mut state, event)
            .with_context(|| format!("Event {} ({}) failed", i + 1, event))?;
        if args.trace {
            steps.push(ReplayStep { event, redraw });
        }
    }

    info!(
        "Final selection: model {}, chain {}, residue {}",
        state.model, state.chain, state.residue
    );
    write_output(&ReplayResult { state, model, steps }, &args.common)
}

fn write_output<T: Serialize + ?Sized>(value: &T, common: &CommonArgs) -> Result<()> {
    output::write_json(value, common.output.as_deref(), common.compact)?;
    if let Some(path) = &common.output {
        info!("Output written to {}", path.display());
    }
    Ok(())
}

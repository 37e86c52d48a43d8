//! DQM monitor CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use dqm_hist::MonitorElement;
use dqm_monitor::{
    Event, JetMonitor, JetMonitorConfig, RecHitStripAggregator, StaticGeometry, StripMonitor,
    StripMonitorConfig, read_config, read_events, run_parallel,
};

#[derive(Parser)]
#[command(name = "dqm")]
#[command(about = "Trigger-efficiency and strip-occupancy monitoring over recorded events")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the jet trigger-efficiency monitor
    Jet {
        /// Monitor configuration (YAML, or JSON for `.json`). Defaults apply if omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Events (JSON lines)
        #[arg(short, long)]
        events: PathBuf,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = auto). Use 1 for a single in-order pass.
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Include full bin contents of every element in the summary.
        #[arg(long)]
        dump_elements: bool,
    },

    /// Run the GEM rec-hit strip occupancy monitor
    Strips {
        /// Monitor configuration (YAML, or JSON for `.json`). Defaults apply if omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// GEM eta-partition table (YAML, or JSON for `.json`)
        #[arg(short, long)]
        geometry: PathBuf,

        /// Events (JSON lines)
        #[arg(short, long)]
        events: PathBuf,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = auto). Use 1 for a single in-order pass.
        #[arg(long, default_value = "1")]
        threads: usize,

        /// Include full bin contents of every element in the summary.
        #[arg(long)]
        dump_elements: bool,
    },
}

#[derive(Serialize)]
struct ElementSummary<'a> {
    path: String,
    entries: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<&'a MonitorElement>,
}

fn element_summaries<'a>(
    handles: impl Iterator<Item = &'a MonitorElement>,
    dump: bool,
) -> Vec<ElementSummary<'a>> {
    handles
        .map(|h| ElementSummary { path: h.path(), entries: h.entries(), element: dump.then_some(h) })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Jet { config, events, output, threads, dump_elements } => {
            cmd_jet(config.as_ref(), &events, output.as_ref(), threads, dump_elements)
        }
        Commands::Strips { config, geometry, events, output, threads, dump_elements } => {
            cmd_strips(config.as_ref(), &geometry, &events, output.as_ref(), threads, dump_elements)
        }
    }
}

fn load_config<T: Default + serde::de::DeserializeOwned>(path: Option<&PathBuf>) -> Result<T> {
    match path {
        Some(p) => {
            tracing::info!(path = %p.display(), "loading config");
            read_config(p).with_context(|| format!("reading config {}", p.display()))
        }
        None => Ok(T::default()),
    }
}

fn load_events(path: &Path) -> Result<Vec<Event>> {
    tracing::info!(path = %path.display(), "loading events");
    let events = read_events(path).with_context(|| format!("reading events {}", path.display()))?;
    tracing::info!(count = events.len(), "events loaded");
    Ok(events)
}

/// Run `f` on a dedicated pool when `threads > 0`, otherwise on rayon's global pool.
fn with_threads<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> Result<T> {
    if threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .context("failed to create thread pool")?;
        Ok(pool.install(f))
    } else {
        Ok(f())
    }
}

fn cmd_jet(
    config: Option<&PathBuf>,
    events: &Path,
    output: Option<&PathBuf>,
    threads: usize,
    dump_elements: bool,
) -> Result<()> {
    let cfg: JetMonitorConfig = load_config(config)?;
    // Fail on a bad config before reading any events.
    JetMonitor::<MonitorElement>::new(cfg.clone())?;
    let events = load_events(events)?;

    let make = || JetMonitor::new(cfg.clone());
    let (monitor, summary) =
        with_threads(threads, || run_parallel::<JetMonitor, _>(&events, threads, make))??;
    let efficiencies = monitor.efficiencies()?;
    let elements: Vec<_> = match monitor.aggregator() {
        Some(agg) => element_summaries(agg.handles(), dump_elements),
        None => Vec::new(),
    };

    let output_json = serde_json::json!({
        "version": dqm_core::VERSION,
        "monitor": "jet",
        "collection": monitor.collection(),
        "loop": summary,
        "stats": monitor.stats(),
        "elements": elements,
        "efficiencies": efficiencies,
    });
    write_json(output, output_json)
}

fn cmd_strips(
    config: Option<&PathBuf>,
    geometry: &Path,
    events: &Path,
    output: Option<&PathBuf>,
    threads: usize,
    dump_elements: bool,
) -> Result<()> {
    let cfg: StripMonitorConfig = load_config(config)?;
    tracing::info!(path = %geometry.display(), "loading geometry");
    let geo = Arc::new(
        StaticGeometry::from_path(geometry)
            .with_context(|| format!("reading geometry {}", geometry.display()))?,
    );
    let events = load_events(events)?;

    let make = || -> dqm_core::Result<StripMonitor> {
        Ok(StripMonitor::new(RecHitStripAggregator::new(cfg.clone())?, geo.clone()))
    };
    let (monitor, summary) = with_threads(threads, || run_parallel(&events, threads, make))??;
    let agg = monitor.aggregator();
    let chambers: Vec<_> = agg.chambers().collect();

    let output_json = serde_json::json!({
        "version": dqm_core::VERSION,
        "monitor": "strips",
        "loop": summary,
        "chambers": chambers,
        "strips_filled": monitor.strips_filled(),
        "events_skipped": monitor.events_skipped(),
        "elements": element_summaries(agg.handles(), dump_elements),
    });
    write_json(output, output_json)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

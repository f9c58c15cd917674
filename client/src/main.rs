//! Hi-Fi Jitter Meter - network jitter checks for lossless audio streaming
//!
//! Probes streaming service endpoints, reports RTP-style jitter with a quality
//! verdict, and suggests network, system and player settings.

mod analysis;
#[cfg(feature = "png-charts")]
mod charts;
mod config;
mod measure;
mod output;
mod storage;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use measure::RunOutcome;
use meter::{CancellationToken, HistoryRecord, JitterMeter, catalog, generate_guidance};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "hifi-jitter")]
#[command(version)]
#[command(about = "Network jitter meter for Hi-Fi audio streaming", long_about = None)]
#[command(group(ArgGroup::new("mode").args(["target", "all", "list", "history", "export"])))]
struct Args {
    /// Configuration file path [default: hifi-jitter.toml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Measure a single service by id (see --list)
    #[arg(long)]
    target: Option<String>,

    /// Measure every service in sequence (default)
    #[arg(long)]
    all: bool,

    /// List known services
    #[arg(long)]
    list: bool,

    /// Show saved measurements
    #[arg(long)]
    history: bool,

    /// Export saved measurements
    #[arg(long)]
    export: bool,

    /// Save results to the history database
    #[arg(long)]
    save: bool,

    /// Print optimisation guidance after each result
    #[arg(long)]
    guide: bool,

    /// Write a PNG chart of a single-target run
    #[arg(long)]
    chart: bool,

    /// Output file for export or chart
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export as JSON (default)
    #[arg(long, conflicts_with = "csv")]
    json: bool,

    /// Export as CSV
    #[arg(long)]
    csv: bool,

    /// Measured samples per run
    #[arg(long)]
    samples: Option<u32>,

    /// Discarded warm-up probes per run
    #[arg(long)]
    warmup: Option<u32>,

    /// Delay between samples in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Per-probe timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Args {
    fn export_extension(&self) -> &'static str {
        if self.csv { "csv" } else { "json" }
    }

    fn wants_export(&self) -> bool {
        self.json || self.csv || self.output.is_some()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));
    let mut config = config::Config::load_or_default(&config_path, args.config.is_some())?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    apply_overrides(&mut config, &args);
    config.validate()?;

    let output = output::OutputManager::new(config.output.use_colors);
    let targets = config.all_targets();

    if args.list {
        output.catalog(&targets);
    } else if args.history {
        let db = open_database(&config)?;
        output.history(&db.recent(output::HISTORY_LISTING_LIMIT)?);
    } else if args.export {
        run_export(&config, &args)?;
    } else if let Some(id) = &args.target {
        let target = catalog::find(&targets, id)?.clone();
        run_single(&config, &args, &output, target).await?;
    } else {
        run_all(&config, &args, &output, &targets).await?;
    }

    Ok(())
}

fn apply_overrides(config: &mut config::Config, args: &Args) {
    let m = &mut config.measurement;
    if let Some(samples) = args.samples {
        m.sample_count = samples;
    }
    if let Some(warmup) = args.warmup {
        m.warmup_count = warmup;
    }
    if let Some(interval_ms) = args.interval_ms {
        m.interval_ms = interval_ms;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        m.timeout_ms = timeout_ms;
    }
}

fn open_database(config: &config::Config) -> Result<storage::Database> {
    let db = storage::Database::new(&config.storage.database_path, config.storage.max_history)?;
    db.initialize()?;
    Ok(db)
}

fn new_meter(config: &config::Config) -> Result<(JitterMeter, CancellationToken)> {
    let meter = JitterMeter::with_http(config.measurement.clone())
        .context("Failed to set up the HTTP prober")?;
    let cancel = CancellationToken::new();
    measure::cancel_on_ctrl_c(cancel.clone());
    Ok((meter, cancel))
}

/// Print a finished run and optionally its guidance
fn report(config: &config::Config, args: &Args, output: &output::OutputManager, outcome: &RunOutcome) {
    output.result(&outcome.target, &outcome.stats, outcome.cancelled);
    if args.guide || config.output.show_guidance {
        output.guidance(&generate_guidance(&outcome.stats, &outcome.target));
    }
}

/// Cancelled runs without a single sample are not worth keeping
fn save_outcomes(config: &config::Config, outcomes: &[RunOutcome]) -> Result<()> {
    let db = open_database(config)?;
    let now = chrono::Utc::now().timestamp_millis();
    let mut saved = 0;
    for outcome in outcomes.iter().filter(|o| !o.events.is_empty()) {
        db.save(&HistoryRecord::new(&outcome.target, &outcome.stats, now))?;
        saved += 1;
    }
    info!("Saved {} result(s) to {}", saved, config.storage.database_path);
    Ok(())
}

async fn run_single(
    config: &config::Config,
    args: &Args,
    output: &output::OutputManager,
    target: meter::Target,
) -> Result<()> {
    let (meter, cancel) = new_meter(config)?;
    let outcome = measure::run_target(&meter, &target, &cancel, output).await?;

    report(config, args, output, &outcome);

    if args.save {
        save_outcomes(config, std::slice::from_ref(&outcome))?;
    }

    if args.chart {
        let path = args.output.clone().unwrap_or_else(|| {
            Path::new(&config.output.export_directory).join(format!("hifi-jitter-{}.png", target.id))
        });
        write_chart(config, &outcome, &path)?;
    }

    Ok(())
}

async fn run_all(
    config: &config::Config,
    args: &Args,
    output: &output::OutputManager,
    targets: &[meter::Target],
) -> Result<()> {
    if args.chart {
        warn!("--chart only applies to single-target runs, ignoring");
    }

    let (meter, cancel) = new_meter(config)?;
    let outcomes = measure::run_batch(&meter, targets, &cancel, output).await?;

    for outcome in &outcomes {
        report(config, args, output, outcome);
    }

    let mut results: Vec<analysis::BatchResult> = outcomes
        .iter()
        .map(|o| analysis::BatchResult::new(&o.target, o.stats))
        .collect();
    analysis::rank_by_jitter(&mut results);
    output.batch_table(&results);

    if args.save {
        save_outcomes(config, &outcomes)?;
    }

    if args.wants_export() {
        let path = args.output.clone().unwrap_or_else(|| {
            output::default_batch_export_path(&config.output.export_directory, args.export_extension())
        });
        if args.csv {
            output::export_batch_csv(&results, &path)?;
        } else {
            output::export_json(&results, &path)?;
        }
        println!("Exported {} result(s) to {}", results.len(), path.display());
    }

    Ok(())
}

fn run_export(config: &config::Config, args: &Args) -> Result<()> {
    let db = open_database(config)?;
    let records = db.all()?;

    if records.is_empty() {
        anyhow::bail!("No saved measurements to export");
    }

    let path = args.output.clone().unwrap_or_else(|| {
        output::default_history_export_path(&config.output.export_directory, args.export_extension())
    });

    if args.csv {
        output::export_history_csv(&records, &path)?;
    } else {
        output::export_json(&records, &path)?;
    }

    println!("Exported {} measurement(s) to {}", records.len(), path.display());
    Ok(())
}

#[cfg(feature = "png-charts")]
fn write_chart(config: &config::Config, outcome: &RunOutcome, path: &Path) -> Result<()> {
    let title = format!("{} jitter", outcome.target.display_name);
    charts::generate_run_chart(&title, &outcome.events, path, &config.output)?;
    println!("Chart saved to {}", path.display());
    Ok(())
}

#[cfg(not(feature = "png-charts"))]
fn write_chart(_config: &config::Config, _outcome: &RunOutcome, _path: &Path) -> Result<()> {
    anyhow::bail!("Chart support not compiled in (enable the png-charts feature)")
}

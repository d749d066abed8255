//! Spectral synthesis runner.
//!
//! Loads a simulation snapshot, evaluates the line model at every pixel of
//! the requested region and writes the spectra (and optionally the model
//! resampled onto optical depth) to chunked Zarr stores.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use grid_dispatch::{execute, ExecutionMode, TracingSink};
use line_model::LineModel;
use synth_common::{PhysicsModel, RawCubeLoader};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::{load_runner_config, Overrides};

#[derive(Parser, Debug)]
#[command(name = "synth-runner")]
#[command(about = "Per-pixel spectral synthesis over a simulation snapshot")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "SYNTH_CONFIG", default_value = "config/synth.yaml")]
    config: PathBuf,

    /// Execution mode: serial or distributed
    #[arg(long)]
    mode: Option<String>,

    /// Participants in a distributed run, coordinator included
    #[arg(short = 'n', long, env = "SYNTH_PROCESSES")]
    processes: Option<usize>,

    /// Pixels per batch
    #[arg(long)]
    batch_size: Option<usize>,

    /// Also write the model resampled onto the optical depth grid
    #[arg(long)]
    interpolate: bool,

    /// Replace existing output stores
    #[arg(long)]
    overwrite: bool,

    /// Spectra store path (overrides the config file)
    #[arg(long)]
    spectra: Option<PathBuf>,

    /// Resampled model store path (overrides the config file)
    #[arg(long)]
    model_out: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the final metrics in Prometheus text format
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Number of tokio worker threads
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    worker_threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format: json or pretty
    #[arg(long, default_value = "json")]
    log_format: String,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    init_tracing(&args.log_level, &args.log_format)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    info!(config = %args.config.display(), "Starting synthesis runner");

    let mut config = load_runner_config(&args.config)?;
    config.apply(&Overrides {
        mode: args.mode.as_deref().map(parse_mode).transpose()?,
        processes: args.processes,
        batch_size: args.batch_size,
        interpolate: args.interpolate,
        overwrite: args.overwrite,
        spectra: args.spectra.clone(),
        model: args.model_out.clone(),
    });

    // Everything that can be checked without touching data fails here.
    config.validate()?;

    let plan = config.plan();
    info!(
        mode = %plan.run.mode,
        processes = plan.run.processes,
        batch_size = plan.run.batch_size,
        interpolate = plan.run.interpolate,
        spectra = %plan.outputs.spectra.display(),
        "Loaded configuration"
    );

    let model = LineModel::from_config(config.model.clone())?;
    let loader = RawCubeLoader::new(config.atmosphere.clone())?;

    let report = execute(&plan, &loader, &model, &TracingSink).await?;

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write run report to {:?}", path))?;
    }

    if let Some(path) = &args.metrics_out {
        std::fs::write(path, prometheus_handle.render())
            .with_context(|| format!("Failed to write metrics to {:?}", path))?;
    }

    info!(
        pixels = report.pixels,
        bytes_written = report.spectra.bytes_written,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Synthesis runner finished"
    );
    Ok(())
}

fn init_tracing(log_level: &str, log_format: &str) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    match log_format {
        "pretty" => tracing::subscriber::set_global_default(builder.pretty().finish())?,
        "json" => tracing::subscriber::set_global_default(builder.json().finish())?,
        other => anyhow::bail!("Unknown log format '{}', expected json or pretty", other),
    }
    Ok(())
}

fn parse_mode(value: &str) -> Result<ExecutionMode> {
    match value.to_lowercase().as_str() {
        "serial" => Ok(ExecutionMode::Serial),
        "distributed" => Ok(ExecutionMode::Distributed),
        other => anyhow::bail!("Unknown mode '{}', expected serial or distributed", other),
    }
}

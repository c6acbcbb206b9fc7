//! LMT analysis binary.
//!
//! Reads an analysis configuration, opens the configured recording, computes
//! the activity table, every configured event table and the sensor table,
//! and writes a JSON report.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin lmt-analyse -- analysis.toml > report.json
//! cargo run --bin lmt-analyse -- analysis.toml --output report.json
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log filter (default: info)
//!
//! Ctrl-C stops the running table between two chunks.

use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lmt_rust::binning::Bin;
use lmt_rust::config::AnalysisConfig;
use lmt_rust::db::{FrameRepository, FullRepository, RepositoryFactory};
use lmt_rust::models::{ActivityRow, EventRow, MetricTable, SensorTable};
use lmt_rust::services::AnalysisSession;
use lmt_rust::AnalysisError;

#[derive(Serialize)]
struct AnalysisReport {
    last_frame: i64,
    analysed_frames: u64,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    bins: Vec<Bin>,
    activity: Option<MetricTable<ActivityRow>>,
    events: Vec<MetricTable<EventRow>>,
    sensors: SensorTable,
}

struct Args {
    config: PathBuf,
    output: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut output = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                output = Some(PathBuf::from(
                    args.next().context("--output requires a file path")?,
                ));
            }
            _ if config.is_none() => config = Some(PathBuf::from(arg)),
            _ => bail!("Unexpected argument: {}", arg),
        }
    }

    match config {
        Some(config) => Ok(Args { config, output }),
        None => bail!("Usage: lmt-analyse <config.toml> [--output <report.json>]"),
    }
}

/// `Ok(None)` for a table without any detection.
fn skip_empty<T>(result: Result<T, AnalysisError>, what: &str) -> Result<Option<T>> {
    match result {
        Ok(table) => Ok(Some(table)),
        Err(AnalysisError::EmptyResult(reason)) => {
            warn!("Skipping {}: {}", what, reason);
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("Failed to compute {}", what)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let config = AnalysisConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let settings = config.to_settings()?;

    let repository = RepositoryFactory::create(&config.repository)?;
    if !repository.health_check().await? {
        bail!("Repository is not healthy");
    }
    let session = AnalysisSession::<dyn FullRepository>::open(repository, settings).await?;

    let cancel = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current chunk");
            cancel.cancel();
        }
    });

    let (start_time, end_time) = session.analysis_time_limits();
    info!(
        "Analysing {} to {} ({} bin(s), {} chunk(s))",
        start_time,
        end_time,
        session.bins().len(),
        session.chunks().len()
    );

    let activity = skip_empty(session.process_activity().await, "activity")?;
    let mut events = Vec::with_capacity(config.events.names.len());
    for name in &config.events.names {
        if let Some(table) = skip_empty(session.process_events(name).await, name)? {
            events.push(table);
        }
    }
    let sensors = session.process_sensors().await?;
    for sensor in sensors.available_sensors() {
        info!("{} available ({})", sensor.label(), sensor.unit());
    }

    let report = AnalysisReport {
        last_frame: session.recording().frame,
        analysed_frames: session.count_frames().await?,
        start_time,
        end_time,
        bins: session.bins().to_vec(),
        activity,
        events,
        sensors,
    };

    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writer.flush()?;
            info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &report)?;
            writeln!(writer)?;
        }
    }

    Ok(())
}

//! Command handlers

use std::path::{Path, PathBuf};

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{Cli, Commands, OutputFormat};
use crate::output::{
    output_dead_letters, output_evaluation, output_history, output_ingest, output_leaderboard,
    output_report,
};
use fleet_app::app::{LeaderboardOrder, Pipeline, PipelineError, PipelineStats, ScoringService};
use fleet_app::config::Config;
use fleet_app::repository::{open_repositories, Repositories};
use fleet_domain::service::evaluate;
use fleet_types::{Error, Result, TelemetryReading};

/// Execute CLI command
pub fn execute(cli: Cli) -> Result<()> {
    // Load config
    let mut config = Config::load()?;

    // Override from CLI args
    if let Some(ref store) = cli.store {
        config.store_dir = Some(store.clone());
    }
    let output_format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Ingest {
            file,
            jobs,
            dry_run,
        } => {
            if let Some(jobs) = jobs {
                config.workers = jobs;
            }
            cmd_ingest(&config, &file, dry_run, output_format)
        }

        Commands::Evaluate { file } => cmd_evaluate(&file, output_format),

        Commands::Score { driver, recompute } => {
            cmd_score(&config, &driver, recompute, output_format)
        }

        Commands::History { driver, days } => cmd_history(&config, &driver, days, output_format),

        Commands::Leaderboard { limit, bottom } => {
            let order = if bottom {
                LeaderboardOrder::Bottom
            } else {
                LeaderboardOrder::Top
            };
            cmd_leaderboard(&config, limit, order, output_format)
        }

        Commands::DeadLetters => cmd_dead_letters(&config, output_format),

        Commands::Config {
            show,
            set_window_days,
            set_workers,
            set_channel_capacity,
            set_timeout_ms,
            set_max_attempts,
            set_backoff_ms,
            set_store_dir,
            set_output,
            reset,
        } => cmd_config(
            show,
            set_window_days,
            set_workers,
            set_channel_capacity,
            set_timeout_ms,
            set_max_attempts,
            set_backoff_ms,
            set_store_dir,
            set_output,
            reset,
        ),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn pipeline_error(e: PipelineError) -> Error {
    match e {
        PipelineError::InvalidReading(msg) => Error::InvalidReading(msg),
        other => Error::Pipeline(other.to_string()),
    }
}

/// Parse a telemetry file (JSON array or JSON lines), keeping only readings
/// that parse and pass range validation. Returns the readings and the number
/// rejected.
fn load_readings(path: &Path) -> Result<(Vec<TelemetryReading>, usize)> {
    let content = std::fs::read_to_string(path)?;
    let mut rejected = 0;

    let values: Vec<(usize, serde_json::Value)> = if content.trim_start().starts_with('[') {
        let array: Vec<serde_json::Value> = serde_json::from_str(&content)?;
        array.into_iter().enumerate().map(|(i, v)| (i + 1, v)).collect()
    } else {
        let mut values = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(value) => values.push((i + 1, value)),
                Err(e) => {
                    log::warn!("line {}: malformed JSON: {}", i + 1, e);
                    rejected += 1;
                }
            }
        }
        values
    };

    let mut readings = Vec::with_capacity(values.len());
    for (position, value) in values {
        let reading: TelemetryReading = match serde_json::from_value(value) {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("record {}: not a telemetry reading: {}", position, e);
                rejected += 1;
                continue;
            }
        };
        if let Err(e) = reading.validate() {
            log::warn!(
                "record {} ({} / {}): rejected: {}",
                position,
                reading.truck_id,
                reading.driver_id,
                e
            );
            rejected += 1;
            continue;
        }
        readings.push(reading);
    }

    log::info!(
        "loaded {} readings from {} ({} rejected)",
        readings.len(),
        path.display(),
        rejected
    );
    Ok((readings, rejected))
}

fn cmd_ingest(
    config: &Config,
    file: &Path,
    dry_run: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let (readings, rejected) = load_readings(file)?;

    let repos = if dry_run {
        Repositories::in_memory()
    } else {
        open_repositories(config)?
    };
    let service = ScoringService::with_repositories(repos, config.clone());

    let pb = ProgressBar::new(readings.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message("queued");

    let stats = runtime()?
        .block_on(feed(service.start_pipeline(), readings, &pb))
        .map_err(pipeline_error)?;
    pb.finish_with_message("done");

    output_ingest(output_format, &stats, rejected, dry_run)
}

/// Submit every reading, then drain the pipeline. The pipeline is shut down
/// even when a submit fails; the submit error wins over the shutdown result.
async fn feed(
    pipeline: Pipeline,
    readings: Vec<TelemetryReading>,
    pb: &ProgressBar,
) -> std::result::Result<PipelineStats, PipelineError> {
    let mut submitted = Ok(());
    for reading in readings {
        if let Err(e) = pipeline.submit(reading).await {
            log::error!("submit failed, draining queued work: {}", e);
            submitted = Err(e);
            break;
        }
        pb.inc(1);
    }

    pb.set_message("draining");
    let stats = pipeline.shutdown().await;
    if let Ok(ref stats) = stats {
        if submitted.is_err() {
            log::warn!(
                "drained {} readings before stopping",
                stats.readings_processed
            );
        }
    }
    submitted.and(stats)
}

fn cmd_evaluate(file: &Path, output_format: OutputFormat) -> Result<()> {
    let (readings, _) = load_readings(file)?;
    let results: Vec<_> = readings
        .into_iter()
        .map(|reading| {
            let events = evaluate(&reading);
            (reading, events)
        })
        .collect();
    output_evaluation(output_format, &results)
}

fn cmd_score(
    config: &Config,
    driver: &str,
    recompute: bool,
    output_format: OutputFormat,
) -> Result<()> {
    let service = ScoringService::open(config.clone())?;

    if recompute {
        runtime()?
            .block_on(service.aggregator().recompute(driver))
            .map_err(|failure| failure.error)?;
    }

    match service.reports().driver_report(driver, Utc::now())? {
        Some(report) => output_report(output_format, &report),
        None => {
            if output_format == OutputFormat::Json {
                println!("null");
            } else {
                println!("No score recorded for driver {}", driver);
                println!("Compute one with: fleet-scoring score {} --recompute", driver);
            }
            Ok(())
        }
    }
}

fn cmd_history(config: &Config, driver: &str, days: u32, output_format: OutputFormat) -> Result<()> {
    let service = ScoringService::open(config.clone())?;
    let history = service.reports().violation_history(driver, days, Utc::now())?;
    output_history(output_format, &history)
}

fn cmd_leaderboard(
    config: &Config,
    limit: usize,
    order: LeaderboardOrder,
    output_format: OutputFormat,
) -> Result<()> {
    let service = ScoringService::open(config.clone())?;
    let entries = service.reports().leaderboard(limit, order, Utc::now())?;
    output_leaderboard(output_format, &entries, order)
}

fn cmd_dead_letters(config: &Config, output_format: OutputFormat) -> Result<()> {
    let service = ScoringService::open(config.clone())?;
    let letters = service.dead_letters()?;
    output_dead_letters(output_format, &letters)
}

#[allow(clippy::too_many_arguments)]
fn cmd_config(
    show: bool,
    set_window_days: Option<u32>,
    set_workers: Option<usize>,
    set_channel_capacity: Option<usize>,
    set_timeout_ms: Option<u64>,
    set_max_attempts: Option<u32>,
    set_backoff_ms: Option<u64>,
    set_store_dir: Option<PathBuf>,
    set_output: Option<OutputFormat>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save()?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load()?;
    let mut modified = false;

    if let Some(days) = set_window_days {
        config.window_days = days;
        modified = true;
    }

    if let Some(workers) = set_workers {
        config.workers = workers;
        modified = true;
    }

    if let Some(capacity) = set_channel_capacity {
        config.channel_capacity = capacity;
        modified = true;
    }

    if let Some(timeout_ms) = set_timeout_ms {
        config.persistence_timeout_ms = timeout_ms;
        modified = true;
    }

    if let Some(attempts) = set_max_attempts {
        config.max_attempts = attempts;
        modified = true;
    }

    if let Some(backoff_ms) = set_backoff_ms {
        config.retry_backoff_ms = backoff_ms;
        modified = true;
    }

    if let Some(dir) = set_store_dir {
        config.store_dir = Some(dir);
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if modified {
        config.save()?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("{}", config);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    const GOOD: &str = r#"{"truckId":"TRK-1","driverId":"DRV-1","speed":92.0,"fuelLevel":40.0,"engineTemp":95.0,"location":{"latitude":35.6,"longitude":139.7},"tirePressure":{"frontLeft":32.0,"frontRight":32.0,"rearLeft":32.0,"rearRight":32.0},"timestamp":1717243200000}"#;
    const OUT_OF_RANGE: &str = r#"{"truckId":"TRK-1","driverId":"DRV-1","speed":320.0,"fuelLevel":40.0,"engineTemp":95.0,"tirePressure":{"frontLeft":32.0,"frontRight":32.0,"rearLeft":32.0,"rearRight":32.0},"timestamp":1717243200000}"#;

    #[test]
    fn test_load_json_lines_with_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("{}\n\nnot json\n{}\n", GOOD, OUT_OF_RANGE);
        let path = write_file(dir.path(), "readings.jsonl", &content);

        let (readings, rejected) = load_readings(&path).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(rejected, 2);
        assert_eq!(readings[0].driver_id, "DRV-1");
        assert_eq!(readings[0].timestamp.timestamp_millis(), 1717243200000);
    }

    #[test]
    fn test_load_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let content = format!("[{}, {}, {{\"truckId\": 3}}]", GOOD, GOOD);
        let path = write_file(dir.path(), "readings.json", &content);

        let (readings, rejected) = load_readings(&path).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(rejected, 1);
    }

    #[tokio::test]
    async fn test_feed_drains_after_failed_submit() {
        let service = ScoringService::with_repositories(Repositories::in_memory(), Config::default());
        let (mut readings, _) = {
            let dir = tempfile::tempdir().unwrap();
            let path = write_file(dir.path(), "readings.jsonl", GOOD);
            load_readings(&path).unwrap()
        };
        let mut bad = readings[0].clone();
        bad.speed = -5.0;
        readings.push(bad);

        let result = feed(service.start_pipeline(), readings, &ProgressBar::hidden()).await;
        assert!(matches!(result, Err(PipelineError::InvalidReading(_))));

        // the reading queued ahead of the bad one was still processed
        let stored = service.repositories().violations.find_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].driver_id, "DRV-1");
        assert!(service
            .repositories()
            .scores
            .find_by_driver("DRV-1")
            .unwrap()
            .is_some());
    }
}

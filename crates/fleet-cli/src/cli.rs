//! Command line definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use fleet_types::OutputFormat;

/// Longest window or look-back accepted on the command line
const MAX_DAYS: i64 = 3650;

#[derive(Parser, Debug)]
#[command(name = "fleet-scoring")]
#[command(about = "Fleet telemetry rule evaluation and driver safety scoring")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Store directory (overrides config)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Output format (overrides config)
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a telemetry file through the scoring pipeline
    Ingest {
        /// JSON lines, or a JSON array of readings
        file: PathBuf,

        /// Shard workers (0 = CPU count)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Do not write to the store
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the violations each reading would raise, without recording them
    Evaluate {
        file: PathBuf,
    },

    /// Show a driver's score and violation breakdown
    Score {
        driver: String,

        /// Recompute from recorded violations first
        #[arg(long)]
        recompute: bool,
    },

    /// List a driver's recent violations
    History {
        driver: String,

        /// Days to look back
        #[arg(short, long, default_value = "30", value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
        days: u32,
    },

    /// Rank drivers by score
    Leaderboard {
        /// Number of drivers to show
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Lowest scores first, with recommended actions
        #[arg(long)]
        bottom: bool,
    },

    /// List work that failed after all retries
    DeadLetters,

    /// Show or update configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Set scoring window in days
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS))]
        set_window_days: Option<u32>,

        /// Set shard worker count (0 = auto)
        #[arg(long)]
        set_workers: Option<usize>,

        /// Set per-shard queue depth
        #[arg(long)]
        set_channel_capacity: Option<usize>,

        /// Set store call timeout in milliseconds
        #[arg(long)]
        set_timeout_ms: Option<u64>,

        /// Set attempts per store operation
        #[arg(long)]
        set_max_attempts: Option<u32>,

        /// Set first retry delay in milliseconds
        #[arg(long)]
        set_backoff_ms: Option<u64>,

        /// Set store directory
        #[arg(long)]
        set_store_dir: Option<PathBuf>,

        /// Set default output format
        #[arg(long, value_enum)]
        set_output: Option<OutputFormat>,

        /// Reset to defaults
        #[arg(long)]
        reset: bool,
    },
}

//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// viewcount - bounded-mailbox view counter with a selectable race
#[derive(Parser)]
#[command(
    name = "vc",
    about = "Count views through a bounded mailbox, with or without a lost-update race",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/viewcount/logs/viewcount.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start senders, aggregators and writers and print status lines
    Run {
        /// Let direct writers bypass the lock (aggregators keep their configured discipline)
        #[arg(long)]
        unlocked: bool,

        /// Number of direct-increment writers (overrides config)
        #[arg(short, long)]
        writers: Option<usize>,

        /// Number of senders (overrides config)
        #[arg(short, long)]
        senders: Option<usize>,

        /// Senders draw random magnitudes instead of replaying the script
        #[arg(long)]
        random: bool,

        /// Stop after this many seconds (default: run until Ctrl+C)
        #[arg(short, long)]
        duration: Option<u64>,

        /// Output format for the final report
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Race direct writers against a fresh total, repeatedly
    Race {
        /// Number of trials
        #[arg(short, long, default_value = "20")]
        trials: usize,

        /// Concurrent writers per trial
        #[arg(short, long, default_value = "4")]
        writers: usize,

        /// Increments per writer
        #[arg(short, long, default_value = "100")]
        increments: u64,

        /// Take the lock (expect zero lost updates)
        #[arg(long)]
        locked: bool,

        /// Width of the read-modify-write window in microseconds
        #[arg(long, default_value = "100")]
        latency_us: u64,

        /// Busy-wait the window instead of sleeping
        #[arg(long)]
        spin: bool,

        /// Base seed for magnitudes
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Output format for reports
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

/// Get the path to the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("viewcount")
        .join("logs")
        .join("viewcount.log")
}

//! viewcount - CLI entry point
//!
//! Starts the counting system or runs race trials.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use viewcount::cli::{Cli, Command, OutputFormat, get_log_path};
use viewcount::config::{Config, SenderMode};
use viewcount::sink::{ConsoleSink, TracingSink};
use viewcount::system::{RunReport, System};
use viewcount::total::SyntheticLatency;
use viewcount::trial::{TrialConfig, TrialSummary, run_trials};
use viewcount::Discipline;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration before logging so its log-level can apply
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    match cli.command {
        None => cmd_run(config, false, None, None, false, None, OutputFormat::Text).await,
        Some(Command::Run {
            unlocked,
            writers,
            senders,
            random,
            duration,
            format,
        }) => cmd_run(config, unlocked, writers, senders, random, duration, format).await,
        Some(Command::Race {
            trials,
            writers,
            increments,
            locked,
            latency_us,
            spin,
            seed,
            format,
        }) => {
            let latency = if spin {
                SyntheticLatency::Spin(Duration::from_micros(latency_us))
            } else {
                SyntheticLatency::Sleep(Duration::from_micros(latency_us))
            };
            let trial_config = TrialConfig {
                writers,
                increments,
                discipline: if locked { Discipline::Locked } else { Discipline::Unlocked },
                latency,
                min: config.writers.min,
                max: config.writers.max,
                seed,
            };
            cmd_race(&trial_config, trials, format).await
        }
        Some(Command::Config) => cmd_config(&config),
    }
}

async fn cmd_run(
    mut config: Config,
    unlocked: bool,
    writers: Option<usize>,
    senders: Option<usize>,
    random: bool,
    duration: Option<u64>,
    format: OutputFormat,
) -> Result<()> {
    debug!(unlocked, ?writers, ?senders, random, ?duration, "cmd_run: called");
    if unlocked {
        config.writers.discipline = Discipline::Unlocked;
    }
    if let Some(writers) = writers {
        config.writers.count = writers;
    }
    if let Some(senders) = senders {
        config.senders.count = senders;
    }
    if random {
        config.senders.mode = SenderMode::Random;
    }

    let handle = System::start(&config, Arc::new(ConsoleSink)).context("Failed to start the system")?;
    println!(
        "{} (aggregators {}, writers {}). Press Ctrl+C to stop.",
        "viewcount running".green().bold(),
        config.aggregators.discipline,
        config.writers.discipline
    );

    match duration {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    debug!("cmd_run: duration elapsed");
                }
                result = wait_for_signal() => result?,
            }
        }
        None => wait_for_signal().await?,
    }

    info!("Shutting down");
    let report = handle.shutdown().await?;
    print_run_report(&report, format)
}

async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => warn!("SIGINT received"),
            _ = sigterm.recv() => warn!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        warn!("Ctrl+C received");
    }

    Ok(())
}

fn print_run_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            println!();
            println!("viewcount Report");
            println!("----------------");
            println!(
                "Discipline:   aggregators {}, writers {}",
                report.aggregator_discipline, report.writer_discipline
            );
            println!("Total views:  {}", report.total.total);
            println!("Expected:     {}", report.total.expected);
            if report.lost_updates() {
                println!("Lost:         {}", report.total.lost.to_string().red().bold());
            } else {
                println!("Lost:         {}", "0".green());
            }
            println!();
            println!(
                "Channel:      {} sent, {} dropped, {} received, {} empty waits (peak depth {})",
                report.channel.sent,
                report.channel.rejected,
                report.channel.received,
                report.channel.timeouts,
                report.channel.peak_depth
            );
            for sender in &report.senders {
                println!("  {}: {} sent, {} dropped", sender.name, sender.sent, sender.dropped);
            }
            for writer in &report.writers {
                println!("  {}: {} direct increments", writer.name, writer.applied);
            }
            println!("Heartbeats:   {}", report.heartbeats);
        }
    }
    Ok(())
}

async fn cmd_race(config: &TrialConfig, trials: usize, format: OutputFormat) -> Result<()> {
    debug!(?config, trials, "cmd_race: called");
    let summary = run_trials(config, trials, Arc::new(TracingSink)).await?;
    print_trial_summary(&summary, format)
}

fn print_trial_summary(summary: &TrialSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(summary)?);
        }
        OutputFormat::Text => {
            println!(
                "Race: {} writers x {} increments, {} discipline",
                summary.writers, summary.increments, summary.discipline
            );
            println!("{:>6} {:>10} {:>10} {:>8}", "TRIAL", "EXPECTED", "ACTUAL", "LOST");
            for outcome in &summary.outcomes {
                let lost = if outcome.lost > 0 {
                    outcome.lost.to_string().red()
                } else {
                    outcome.lost.to_string().normal()
                };
                println!(
                    "{:>6} {:>10} {:>10} {:>8}",
                    outcome.trial, outcome.expected, outcome.actual, lost
                );
            }
            println!();
            println!(
                "Trials with lost updates: {}/{} ({} views lost in total)",
                summary.trials_with_loss,
                summary.outcomes.len(),
                summary.total_lost
            );
        }
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", serde_yaml::to_string(config).context("Failed to serialize configuration")?);
    Ok(())
}

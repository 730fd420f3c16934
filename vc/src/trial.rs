//! Race trials: bounded runs of direct writers against a fresh total
//!
//! A trial spawns `writers` direct writers, each applying `increments`
//! magnitudes, waits for all of them and compares the stored total with the
//! ledger. Under `Discipline::Unlocked` with a nonzero latency window the
//! total usually comes up short; under `Discipline::Locked` it never does.

use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::validate_range;
use crate::domain::Discipline;
use crate::sink::LogSink;
use crate::tasks::{DirectWriter, shutdown_channel};
use crate::total::{SharedTotal, SyntheticLatency};

/// Parameters of a race trial
#[derive(Debug, Clone)]
pub struct TrialConfig {
    /// Concurrent writers
    pub writers: usize,
    /// Increments per writer
    pub increments: u64,
    /// Lock discipline for every writer
    pub discipline: Discipline,
    /// Window between read and write
    pub latency: SyntheticLatency,
    /// Smallest magnitude
    pub min: u64,
    /// Largest magnitude
    pub max: u64,
    /// Base seed; writer `i` of trial `t` uses `seed + t * writers + i`
    pub seed: u64,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            writers: 4,
            increments: 100,
            discipline: Discipline::Unlocked,
            latency: SyntheticLatency::Sleep(Duration::from_micros(100)),
            min: 1,
            max: 10,
            seed: 0,
        }
    }
}

impl TrialConfig {
    /// Reject magnitude ranges a writer cannot draw from
    pub fn validate(&self) -> Result<()> {
        validate_range("writers", self.min, self.max)
    }
}

/// Result of one trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Trial index
    pub trial: usize,
    /// Exact sum of submitted magnitudes
    pub expected: u64,
    /// Value stored in the total
    pub actual: u64,
    /// expected - actual
    pub lost: u64,
}

/// Aggregate of many trials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSummary {
    /// Discipline the writers used
    pub discipline: Discipline,
    /// Writers per trial
    pub writers: usize,
    /// Increments per writer
    pub increments: u64,
    /// Every trial outcome in order
    pub outcomes: Vec<TrialOutcome>,
    /// Trials whose total came up short
    pub trials_with_loss: usize,
    /// Sum of lost views across all trials
    pub total_lost: u64,
}

/// Run a single trial
pub async fn run_trial(config: &TrialConfig, trial: usize, sink: Arc<dyn LogSink>) -> Result<TrialOutcome> {
    debug!(?config, trial, "run_trial: called");
    config.validate().context("Invalid trial configuration")?;
    let total = Arc::new(SharedTotal::new(config.latency));
    let (_trigger, shutdown) = shutdown_channel();

    let handles: Vec<_> = (0..config.writers)
        .map(|i| {
            let seed = config
                .seed
                .wrapping_add((trial * config.writers) as u64)
                .wrapping_add(i as u64);
            let writer = DirectWriter::new(
                format!("writer-{}", i),
                Arc::clone(&total),
                Arc::clone(&sink),
                shutdown.clone(),
                config.discipline,
            )
            .with_range(config.min, config.max)
            .with_seed(seed)
            .with_limit(config.increments)
            .with_interval(Duration::ZERO);
            tokio::spawn(writer.run())
        })
        .collect();

    let mut submitted = 0u64;
    for handle in handles {
        submitted += handle.await.context("Writer task failed")?.submitted_sum;
    }

    let snapshot = total.snapshot();
    debug_assert_eq!(snapshot.expected, submitted);

    let outcome = TrialOutcome {
        trial,
        expected: snapshot.expected,
        actual: snapshot.total,
        lost: snapshot.lost,
    };
    debug!(?outcome, "run_trial: finished");
    Ok(outcome)
}

/// Run `trials` trials back to back and summarize
pub async fn run_trials(config: &TrialConfig, trials: usize, sink: Arc<dyn LogSink>) -> Result<TrialSummary> {
    config.validate().context("Invalid trial configuration")?;
    info!(
        trials,
        writers = config.writers,
        increments = config.increments,
        discipline = %config.discipline,
        "Running race trials"
    );

    let mut outcomes = Vec::with_capacity(trials);
    for trial in 0..trials {
        outcomes.push(run_trial(config, trial, Arc::clone(&sink)).await?);
    }

    let trials_with_loss = outcomes.iter().filter(|o| o.lost > 0).count();
    let total_lost = outcomes.iter().map(|o| o.lost).sum();

    info!(trials_with_loss, total_lost, "Race trials finished");
    Ok(TrialSummary {
        discipline: config.discipline,
        writers: config.writers,
        increments: config.increments,
        outcomes,
        trials_with_loss,
        total_lost,
    })
}

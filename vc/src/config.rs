//! viewcount configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channel::{DEFAULT_CAPACITY, MAX_CHANNEL_CAPACITY};
use crate::domain::{DEFAULT_SCRIPT, Discipline};
use crate::total::SyntheticLatency;

/// Main viewcount configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Bounded channel settings
    pub channel: ChannelConfig,

    /// Event generators feeding the channel
    pub senders: SenderConfig,

    /// Aggregators draining the channel
    pub aggregators: AggregatorConfig,

    /// Direct-increment writers bypassing the channel
    pub writers: WriterConfig,

    /// Shared total settings
    pub total: TotalConfig,

    /// Heartbeat task settings
    pub heartbeat: HeartbeatConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.channel.capacity == 0 || self.channel.capacity > MAX_CHANNEL_CAPACITY {
            return Err(eyre!(
                "channel.capacity must be between 1 and {}, got {}",
                MAX_CHANNEL_CAPACITY,
                self.channel.capacity
            ));
        }

        match self.senders.mode {
            SenderMode::Scripted if self.senders.script.is_empty() => {
                return Err(eyre!("senders.script must not be empty in scripted mode"));
            }
            SenderMode::Scripted if self.senders.script.contains(&0) => {
                return Err(eyre!("senders.script magnitudes must be positive"));
            }
            _ => {}
        }

        validate_range("senders", self.senders.min, self.senders.max)?;
        validate_range("writers", self.writers.min, self.writers.max)?;

        if self.heartbeat.enabled && self.heartbeat.period_ms == 0 {
            return Err(eyre!("heartbeat.period-ms must be greater than zero"));
        }

        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .viewcount.yml
        let local_config = PathBuf::from(".viewcount.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/viewcount/viewcount.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("viewcount").join("viewcount.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate().context("Invalid configuration")?;

        tracing::info!(
            capacity = config.channel.capacity,
            aggregators = %config.aggregators.discipline,
            writers = %config.writers.discipline,
            "Loaded config from: {}",
            path.as_ref().display()
        );
        Ok(config)
    }
}

pub(crate) fn validate_range(section: &str, min: u64, max: u64) -> Result<()> {
    if min == 0 {
        return Err(eyre!("{}.min must be at least 1", section));
    }
    if min > max {
        return Err(eyre!("{}.min ({}) must not exceed {}.max ({})", section, min, section, max));
    }
    Ok(())
}

/// Bounded channel settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Number of events the channel can hold
    pub capacity: usize,

    /// How long an aggregator waits for an event, in milliseconds
    #[serde(rename = "receive-timeout-ms")]
    pub receive_timeout_ms: u64,

    /// How long a sender waits for a free slot, in milliseconds (0 = fail fast)
    #[serde(rename = "send-wait-ms")]
    pub send_wait_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            receive_timeout_ms: 100,
            send_wait_ms: 0,
        }
    }
}

impl ChannelConfig {
    /// Get the receive budget as a Duration
    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Get the send budget as a Duration
    pub fn send_wait(&self) -> Duration {
        Duration::from_millis(self.send_wait_ms)
    }
}

/// How senders produce magnitudes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderMode {
    /// Replay `script` once, then stop
    #[default]
    Scripted,
    /// Draw from `min..=max` until shutdown or `limit`
    Random,
}

/// Event generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Number of sender tasks
    pub count: usize,

    /// Scripted or random magnitudes
    pub mode: SenderMode,

    /// Magnitudes replayed in scripted mode
    pub script: Vec<u64>,

    /// Smallest random magnitude
    pub min: u64,

    /// Largest random magnitude
    pub max: u64,

    /// Pause between sends in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,

    /// Idle time after a script is exhausted, in milliseconds
    #[serde(rename = "linger-ms")]
    pub linger_ms: u64,

    /// Stop a random sender after this many events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Seed for random magnitudes (task index is added per sender)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            count: 1,
            mode: SenderMode::Scripted,
            script: DEFAULT_SCRIPT.to_vec(),
            min: 1,
            max: 10,
            interval_ms: 100,
            linger_ms: 10_000,
            limit: None,
            seed: None,
        }
    }
}

impl SenderConfig {
    /// Get the send interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Get the post-script linger as a Duration
    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }
}

/// Aggregator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Number of aggregator tasks
    pub count: usize,

    /// Whether aggregators take the lock when applying received events
    pub discipline: Discipline,

    /// Pause after each receive cycle in milliseconds
    #[serde(rename = "cycle-pause-ms")]
    pub cycle_pause_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            count: 1,
            discipline: Discipline::Locked,
            cycle_pause_ms: 100,
        }
    }
}

impl AggregatorConfig {
    /// Get the cycle pause as a Duration
    pub fn cycle_pause(&self) -> Duration {
        Duration::from_millis(self.cycle_pause_ms)
    }
}

/// Direct-increment writer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterConfig {
    /// Number of writer tasks (0 = channel path only)
    pub count: usize,

    /// Whether direct writers take the lock
    pub discipline: Discipline,

    /// Smallest random magnitude
    pub min: u64,

    /// Largest random magnitude
    pub max: u64,

    /// Pause between increments in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,

    /// Stop a writer after this many increments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Seed for random magnitudes (task index is added per writer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            count: 0,
            discipline: Discipline::Locked,
            min: 1,
            max: 10,
            interval_ms: 100,
            limit: None,
            seed: None,
        }
    }
}

impl WriterConfig {
    /// Get the increment interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Shared total settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalConfig {
    /// Delay injected between read and write
    pub latency: LatencyConfig,
}

/// Kind of synthetic latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LatencyMode {
    None,
    #[default]
    Sleep,
    Spin,
}

/// Synthetic latency settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    /// Sleep, spin or nothing
    pub mode: LatencyMode,

    /// Length of the window in microseconds
    pub micros: u64,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            mode: LatencyMode::Sleep,
            micros: 1_000,
        }
    }
}

impl LatencyConfig {
    /// Build the latency injector described by this config
    pub fn to_latency(&self) -> SyntheticLatency {
        let duration = Duration::from_micros(self.micros);
        match self.mode {
            LatencyMode::None => SyntheticLatency::None,
            LatencyMode::Sleep => SyntheticLatency::Sleep(duration),
            LatencyMode::Spin => SyntheticLatency::Spin(duration),
        }
    }
}

/// Heartbeat settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Whether the heartbeat task runs
    pub enabled: bool,

    /// Period in milliseconds
    #[serde(rename = "period-ms")]
    pub period_ms: u64,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period_ms: 1_000,
        }
    }
}

impl HeartbeatConfig {
    /// Get the period as a Duration
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

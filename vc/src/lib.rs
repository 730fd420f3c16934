//! viewcount - bounded-mailbox view counter with a selectable lost-update race
//!
//! Sender tasks produce batches of views; aggregator tasks drain them from a
//! bounded channel into a shared running total. Direct writers may bypass the
//! channel and, when configured `unlocked`, bypass the total's lock as well,
//! reproducing lost updates on demand.
//!
//! # Modules
//!
//! - [`channel`] - bounded FIFO mailbox with budgeted send/receive
//! - [`total`] - shared total, its lock, and the synthetic latency window
//! - [`tasks`] - sender, aggregator, writer and heartbeat entry points
//! - [`sink`] - line-oriented status output
//! - [`system`] - assembly of a running system from [`config::Config`]
//! - [`trial`] - repeated bounded races for measuring lost updates
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod channel;
pub mod cli;
pub mod config;
pub mod domain;
pub mod sink;
pub mod system;
pub mod tasks;
pub mod total;
pub mod trial;

// Re-export commonly used types
pub use channel::{BoundedChannel, ChannelError, ChannelStats};
pub use config::Config;
pub use domain::{DEFAULT_SCRIPT, Discipline, Event};
pub use sink::{ConsoleSink, LogSink, MemorySink, StatusLine, TracingSink};
pub use system::{RunReport, System, SystemHandle};
pub use tasks::{
    Aggregator, AggregatorReport, DirectWriter, EventSender, EventSource, Heartbeat, SenderReport, Shutdown,
    ShutdownTrigger, WriterReport, shutdown_channel,
};
pub use total::{SharedTotal, SyntheticLatency, TotalSnapshot};
pub use trial::{TrialConfig, TrialOutcome, TrialSummary, run_trial, run_trials};

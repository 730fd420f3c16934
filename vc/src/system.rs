//! System assembly: builds the shared state and spawns every task

use std::sync::Arc;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::channel::{BoundedChannel, ChannelStats};
use crate::config::{Config, SenderMode};
use crate::domain::{Discipline, Event};
use crate::sink::LogSink;
use crate::tasks::{
    Aggregator, AggregatorReport, DirectWriter, EventSender, EventSource, Heartbeat, SenderReport, ShutdownTrigger,
    WriterReport, shutdown_channel,
};
use crate::total::{SharedTotal, TotalSnapshot};

/// Final accounting of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Discipline the aggregators applied received events with
    pub aggregator_discipline: Discipline,
    /// Discipline the direct writers used
    pub writer_discipline: Discipline,
    /// Total and ledger after all tasks stopped
    pub total: TotalSnapshot,
    /// Channel counters
    pub channel: ChannelStats,
    /// Per-sender outcomes
    pub senders: Vec<SenderReport>,
    /// Per-aggregator outcomes
    pub aggregators: Vec<AggregatorReport>,
    /// Per-writer outcomes
    pub writers: Vec<WriterReport>,
    /// Heartbeats emitted
    pub heartbeats: u64,
}

impl RunReport {
    /// True when racing writers overwrote each other's contributions
    pub fn lost_updates(&self) -> bool {
        self.total.lost > 0
    }
}

/// Entry point for assembling a running system
pub struct System;

impl System {
    /// Build shared state from `config` and spawn every task on the current runtime.
    ///
    /// Fails before spawning anything if the configuration is invalid or the
    /// channel cannot be created.
    pub fn start(config: &Config, sink: Arc<dyn LogSink>) -> Result<SystemHandle> {
        debug!(?config, "System::start: called");
        config.validate().context("Invalid configuration")?;

        let channel: Arc<BoundedChannel<Event>> = Arc::new(
            BoundedChannel::new(config.channel.capacity).context("Failed to create the event channel")?,
        );
        let total = Arc::new(SharedTotal::new(config.total.latency.to_latency()));
        let aggregator_discipline = config.aggregators.discipline;
        let writer_discipline = config.writers.discipline;
        let (trigger, shutdown) = shutdown_channel();

        let heartbeat = config.heartbeat.enabled.then(|| {
            debug!("System::start: spawning heartbeat");
            tokio::spawn(Heartbeat::new(config.heartbeat.period(), Arc::clone(&sink), shutdown.clone()).run())
        });

        let aggregators = (0..config.aggregators.count)
            .map(|i| {
                let aggregator = Aggregator::new(
                    format!("aggregator-{}", i),
                    Arc::clone(&channel),
                    Arc::clone(&total),
                    Arc::clone(&sink),
                    shutdown.clone(),
                )
                .with_discipline(aggregator_discipline)
                .with_receive_timeout(config.channel.receive_timeout())
                .with_cycle_pause(config.aggregators.cycle_pause());
                tokio::spawn(aggregator.run())
            })
            .collect();

        let senders = (0..config.senders.count)
            .map(|i| {
                let source = match config.senders.mode {
                    SenderMode::Scripted => EventSource::Scripted(config.senders.script.clone()),
                    SenderMode::Random => EventSource::Random {
                        min: config.senders.min,
                        max: config.senders.max,
                        limit: config.senders.limit,
                    },
                };
                let mut sender = EventSender::new(
                    format!("sender-{}", i),
                    source,
                    Arc::clone(&channel),
                    Arc::clone(&sink),
                    shutdown.clone(),
                )
                .with_interval(config.senders.interval())
                .with_send_wait(config.channel.send_wait())
                .with_linger(config.senders.linger());
                if let Some(seed) = config.senders.seed {
                    sender = sender.with_seed(seed.wrapping_add(i as u64));
                }
                tokio::spawn(sender.run())
            })
            .collect();

        let writers = (0..config.writers.count)
            .map(|i| {
                let mut writer = DirectWriter::new(
                    format!("writer-{}", i),
                    Arc::clone(&total),
                    Arc::clone(&sink),
                    shutdown.clone(),
                    writer_discipline,
                )
                .with_range(config.writers.min, config.writers.max)
                .with_interval(config.writers.interval());
                if let Some(seed) = config.writers.seed {
                    writer = writer.with_seed(seed.wrapping_add(i as u64));
                }
                if let Some(limit) = config.writers.limit {
                    writer = writer.with_limit(limit);
                }
                tokio::spawn(writer.run())
            })
            .collect();

        info!(
            capacity = config.channel.capacity,
            senders = config.senders.count,
            aggregators = config.aggregators.count,
            writers = config.writers.count,
            %aggregator_discipline,
            %writer_discipline,
            "System started"
        );

        Ok(SystemHandle {
            trigger,
            channel,
            total,
            aggregator_discipline,
            writer_discipline,
            senders,
            aggregators,
            writers,
            heartbeat,
        })
    }
}

/// Handle to a running system
pub struct SystemHandle {
    trigger: ShutdownTrigger,
    channel: Arc<BoundedChannel<Event>>,
    total: Arc<SharedTotal>,
    aggregator_discipline: Discipline,
    writer_discipline: Discipline,
    senders: Vec<JoinHandle<SenderReport>>,
    aggregators: Vec<JoinHandle<AggregatorReport>>,
    writers: Vec<JoinHandle<WriterReport>>,
    heartbeat: Option<JoinHandle<u64>>,
}

impl SystemHandle {
    /// The shared total
    pub fn total(&self) -> Arc<SharedTotal> {
        Arc::clone(&self.total)
    }

    /// The shared channel
    pub fn channel(&self) -> Arc<BoundedChannel<Event>> {
        Arc::clone(&self.channel)
    }

    /// Current total and ledger
    pub fn snapshot(&self) -> TotalSnapshot {
        self.total.snapshot()
    }

    /// True once every sender task has returned
    pub fn senders_finished(&self) -> bool {
        self.senders.iter().all(|handle| handle.is_finished())
    }

    /// True once every writer task has returned
    pub fn writers_finished(&self) -> bool {
        self.writers.iter().all(|handle| handle.is_finished())
    }

    /// Signal every task, wait for all of them and report
    pub async fn shutdown(self) -> Result<RunReport> {
        debug!("SystemHandle::shutdown: called");
        self.trigger.fire();

        let mut senders = Vec::with_capacity(self.senders.len());
        for handle in self.senders {
            senders.push(handle.await.context("Sender task failed")?);
        }

        let mut writers = Vec::with_capacity(self.writers.len());
        for handle in self.writers {
            writers.push(handle.await.context("Writer task failed")?);
        }

        let mut aggregators = Vec::with_capacity(self.aggregators.len());
        for handle in self.aggregators {
            aggregators.push(handle.await.context("Aggregator task failed")?);
        }

        let heartbeats = match self.heartbeat {
            Some(handle) => handle.await.context("Heartbeat task failed")?,
            None => 0,
        };

        let report = RunReport {
            aggregator_discipline: self.aggregator_discipline,
            writer_discipline: self.writer_discipline,
            total: self.total.snapshot(),
            channel: self.channel.stats().await,
            senders,
            aggregators,
            writers,
            heartbeats,
        };

        info!(
            total = report.total.total,
            expected = report.total.expected,
            lost = report.total.lost,
            "System stopped"
        );
        Ok(report)
    }
}

//! Aggregator: drains the channel into the shared total

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::channel::{BoundedChannel, ChannelError};
use crate::domain::{Discipline, Event};
use crate::sink::{LogSink, StatusLine};
use crate::total::SharedTotal;

use super::shutdown::Shutdown;

/// Outcome of an aggregator task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorReport {
    /// Task name
    pub name: String,
    /// Events folded into the total
    pub received: u64,
    /// Receive budgets that elapsed empty
    pub timeouts: u64,
}

/// The consumer task: receive one event per cycle and apply it to the total
pub struct Aggregator {
    name: String,
    channel: Arc<BoundedChannel<Event>>,
    total: Arc<SharedTotal>,
    sink: Arc<dyn LogSink>,
    shutdown: Shutdown,
    discipline: Discipline,
    receive_timeout: Duration,
    cycle_pause: Duration,
    limit: Option<u64>,
    report: AggregatorReport,
}

impl Aggregator {
    /// Create an aggregator with locked updates, a 100ms receive budget and a 100ms pause
    pub fn new(
        name: impl Into<String>,
        channel: Arc<BoundedChannel<Event>>,
        total: Arc<SharedTotal>,
        sink: Arc<dyn LogSink>,
        shutdown: Shutdown,
    ) -> Self {
        let name = name.into();
        debug!(%name, "Aggregator::new: called");
        Self {
            report: AggregatorReport {
                name: name.clone(),
                ..Default::default()
            },
            name,
            channel,
            total,
            sink,
            shutdown,
            discipline: Discipline::Locked,
            receive_timeout: Duration::from_millis(100),
            cycle_pause: Duration::from_millis(100),
            limit: None,
        }
    }

    /// Lock discipline for updates to the total
    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    /// How long each receive may wait
    pub fn with_receive_timeout(mut self, receive_timeout: Duration) -> Self {
        self.receive_timeout = receive_timeout;
        self
    }

    /// Pause after every cycle
    pub fn with_cycle_pause(mut self, cycle_pause: Duration) -> Self {
        self.cycle_pause = cycle_pause;
        self
    }

    /// Stop after this many events have been received
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Run one receive cycle. Returns the new total, or the receive error.
    pub async fn cycle(&mut self) -> Result<u64, ChannelError> {
        debug!(task = %self.name, "Aggregator::cycle: called");
        let pending = self.channel.len().await;
        if pending > 0 {
            self.sink.emit(StatusLine::Backlog {
                task: self.name.clone(),
                pending,
            });
        }

        match self.channel.receive(self.receive_timeout).await {
            Ok(event) => {
                let total = self.total.apply(event.magnitude, self.discipline).await;
                self.report.received += 1;
                self.sink.emit(StatusLine::Received {
                    task: self.name.clone(),
                    source: event.source,
                    magnitude: event.magnitude,
                    total,
                });
                Ok(total)
            }
            Err(e) => {
                debug!(task = %self.name, error = %e, "Aggregator::cycle: nothing received");
                self.report.timeouts += 1;
                self.sink.emit(StatusLine::NothingReceived {
                    task: self.name.clone(),
                    total: self.total.current(),
                });
                Err(e)
            }
        }
    }

    /// Run until shutdown (or the configured limit)
    pub async fn run(mut self) -> AggregatorReport {
        info!(task = %self.name, discipline = %self.discipline, "Aggregator started");

        loop {
            if self.shutdown.is_requested() {
                debug!(task = %self.name, "Aggregator::run: shutdown requested");
                break;
            }
            if self.limit.is_some_and(|limit| self.report.received >= limit) {
                debug!(task = %self.name, "Aggregator::run: limit reached");
                break;
            }

            // Both outcomes are already reported to the sink
            let _ = self.cycle().await;

            if !self.shutdown.pause(self.cycle_pause).await {
                break;
            }
        }

        info!(
            task = %self.name,
            received = self.report.received,
            timeouts = self.report.timeouts,
            "Aggregator stopped"
        );
        self.report
    }
}

//! Event generators feeding the bounded channel

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::channel::BoundedChannel;
use crate::domain::Event;
use crate::sink::{LogSink, StatusLine};

use super::shutdown::Shutdown;

/// Where a sender's magnitudes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    /// Replay a fixed sequence once
    Scripted(Vec<u64>),
    /// Draw uniformly from `min..=max`, forever or until `limit` events
    Random { min: u64, max: u64, limit: Option<u64> },
}

/// Outcome of a sender task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderReport {
    /// Task name
    pub name: String,
    /// Events accepted by the channel
    pub sent: u64,
    /// Events dropped because the channel was full
    pub dropped: u64,
    /// Exact sum of accepted magnitudes
    pub sent_sum: u64,
    /// True when the source ran out (script or limit) rather than being shut down
    pub exhausted: bool,
}

/// A producer task sending view events into the channel
pub struct EventSender {
    name: String,
    source: EventSource,
    channel: Arc<BoundedChannel<Event>>,
    sink: Arc<dyn LogSink>,
    shutdown: Shutdown,
    interval: Duration,
    send_wait: Duration,
    linger: Duration,
    rng: StdRng,
}

impl EventSender {
    /// Create a sender with a 100ms interval, fail-fast sends and no linger
    pub fn new(
        name: impl Into<String>,
        source: EventSource,
        channel: Arc<BoundedChannel<Event>>,
        sink: Arc<dyn LogSink>,
        shutdown: Shutdown,
    ) -> Self {
        let name = name.into();
        debug!(%name, ?source, "EventSender::new: called");
        Self {
            name,
            source,
            channel,
            sink,
            shutdown,
            interval: Duration::from_millis(100),
            send_wait: Duration::ZERO,
            linger: Duration::ZERO,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Pause between sends
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Budget for each send (zero = fail fast)
    pub fn with_send_wait(mut self, send_wait: Duration) -> Self {
        self.send_wait = send_wait;
        self
    }

    /// Idle time after the source is exhausted
    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    /// Make random magnitudes reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the sender until its source is exhausted or shutdown is requested
    pub async fn run(mut self) -> SenderReport {
        info!(task = %self.name, "EventSender started");
        let mut report = SenderReport {
            name: self.name.clone(),
            ..Default::default()
        };

        let mut produced = 0u64;
        let mut script_pos = 0usize;
        loop {
            if self.shutdown.is_requested() {
                debug!(task = %self.name, "EventSender::run: shutdown requested");
                break;
            }

            let Some(magnitude) = self.next_magnitude(produced, &mut script_pos) else {
                report.exhausted = true;
                break;
            };
            produced += 1;

            self.send_one(magnitude, &mut report).await;

            if !self.shutdown.pause(self.interval).await {
                debug!(task = %self.name, "EventSender::run: shutdown during pause");
                break;
            }
        }

        if report.exhausted {
            info!(task = %self.name, sent = report.sent, dropped = report.dropped, "EventSender exhausted");
            self.sink.emit(StatusLine::NoMoreEvents {
                task: self.name.clone(),
                sent: report.sent,
                dropped: report.dropped,
            });
            self.shutdown.pause(self.linger).await;
        }

        report
    }

    fn next_magnitude(&mut self, produced: u64, script_pos: &mut usize) -> Option<u64> {
        match &self.source {
            EventSource::Scripted(script) => {
                let magnitude = script.get(*script_pos).copied();
                *script_pos += 1;
                magnitude
            }
            EventSource::Random { min, max, limit } => {
                if limit.is_some_and(|limit| produced >= limit) {
                    return None;
                }
                Some(self.rng.random_range(*min..=*max))
            }
        }
    }

    async fn send_one(&self, magnitude: u64, report: &mut SenderReport) {
        let event = Event::new(magnitude, self.name.clone());
        match self.channel.send(event, self.send_wait).await {
            Ok(()) => {
                debug!(task = %self.name, magnitude, "EventSender::send_one: sent");
                report.sent += 1;
                report.sent_sum += magnitude;
            }
            Err(e) => {
                warn!(task = %self.name, magnitude, error = %e, "Dropping event");
                report.dropped += 1;
                self.sink.emit(StatusLine::SendFailed {
                    task: self.name.clone(),
                    magnitude,
                });
            }
        }
    }
}

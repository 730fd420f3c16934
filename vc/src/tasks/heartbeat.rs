//! Heartbeat task

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::sink::{LogSink, StatusLine};

use super::shutdown::Shutdown;

/// Periodic liveness line. Touches no shared state besides the sink.
pub struct Heartbeat {
    period: Duration,
    sink: Arc<dyn LogSink>,
    shutdown: Shutdown,
}

impl Heartbeat {
    /// Create a heartbeat with the given period
    pub fn new(period: Duration, sink: Arc<dyn LogSink>, shutdown: Shutdown) -> Self {
        debug!(?period, "Heartbeat::new: called");
        Self { period, sink, shutdown }
    }

    /// Run until shutdown; returns the number of beats emitted
    pub async fn run(mut self) -> u64 {
        info!(period = ?self.period, "Heartbeat started");
        let mut iteration = 0u64;

        loop {
            self.sink.emit(StatusLine::Heartbeat { iteration });
            iteration += 1;

            if !self.shutdown.pause(self.period).await {
                break;
            }
        }

        debug!(iteration, "Heartbeat::run: stopped");
        iteration
    }
}

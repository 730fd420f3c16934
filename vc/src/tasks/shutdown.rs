//! Shutdown signal shared by every task

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

/// Create a connected trigger/signal pair
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

/// Owner side: fires the shutdown for every cloned [`Shutdown`]
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal every task to stop at its next suspension point
    pub fn fire(&self) {
        debug!(receivers = self.tx.receiver_count(), "ShutdownTrigger::fire: called");
        self.tx.send_replace(true);
    }

    /// Another signal observing this trigger
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

/// Task side of the shutdown signal.
///
/// Dropping the trigger without firing it also counts as shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// True once shutdown has been requested
    pub fn is_requested(&self) -> bool {
        let fired = *self.rx.borrow();
        fired || !self.trigger_alive()
    }

    fn trigger_alive(&self) -> bool {
        self.rx.has_changed().is_ok()
    }

    /// Pause for `duration`. Returns `false` if shutdown arrived first.
    ///
    /// A zero duration still yields to the scheduler.
    pub async fn pause(&mut self, duration: Duration) -> bool {
        if self.is_requested() {
            return false;
        }
        if duration.is_zero() {
            tokio::task::yield_now().await;
            return !self.is_requested();
        }

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.rx.changed() => true,
        };
        !interrupted && !self.is_requested()
    }

    /// Wait until shutdown is requested
    pub async fn wait(&mut self) {
        while !self.is_requested() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

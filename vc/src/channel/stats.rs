//! Channel statistics

use serde::{Deserialize, Serialize};

/// Counters maintained by the channel under its own lock
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Items accepted by `send`
    pub sent: u64,
    /// Sends that found no free slot within their budget
    pub rejected: u64,
    /// Items handed out by `receive`
    pub received: u64,
    /// Receives that timed out empty
    pub timeouts: u64,
    /// Highest queue depth observed
    pub peak_depth: usize,
}

impl ChannelStats {
    /// Items currently accounted as in flight (sent but not yet received)
    pub fn in_flight(&self) -> u64 {
        self.sent.saturating_sub(self.received)
    }
}

//! Channel error types

use std::time::Duration;

use thiserror::Error;

/// Errors from channel operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Channel full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("Nothing received within {waited:?}")]
    Empty { waited: Duration },

    #[error("Could not create channel with capacity {capacity}: {reason}")]
    Creation { capacity: usize, reason: String },
}

impl ChannelError {
    /// True for the recoverable full/empty conditions
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Full { .. } | Self::Empty { .. })
    }
}

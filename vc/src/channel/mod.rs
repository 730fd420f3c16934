//! Bounded FIFO mailbox between producers and aggregators
//!
//! The channel serializes its own access, so any number of senders and
//! receivers may share one instance behind an `Arc`. Every wait is bounded by
//! an explicit budget; a zero budget never waits.

mod bounded;
mod error;
mod stats;

pub use bounded::{BoundedChannel, DEFAULT_CAPACITY, MAX_CHANNEL_CAPACITY};
pub use error::ChannelError;
pub use stats::ChannelStats;

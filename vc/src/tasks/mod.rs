//! Long-running task entry points
//!
//! Each task is a plain value whose `run` consumes it and loops until the
//! shared [`Shutdown`] signal fires (or its own work runs out). The tasks never
//! hold the total's lock across a pause.

mod aggregator;
mod generator;
mod heartbeat;
mod shutdown;
mod writer;

pub use aggregator::{Aggregator, AggregatorReport};
pub use generator::{EventSender, EventSource, SenderReport};
pub use heartbeat::Heartbeat;
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use writer::{DirectWriter, WriterReport};

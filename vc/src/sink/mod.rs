//! Line-oriented status output
//!
//! Every task reports through a [`LogSink`]. The text of each line is not a
//! stable format; the information it carries (which event, the new total, or
//! the failure) is.

mod line;
mod sinks;

pub use line::StatusLine;
pub use sinks::{ConsoleSink, LogSink, MemorySink, TracingSink};

//! LogSink trait and the provided sinks

use std::sync::Mutex;

use colored::Colorize;
use tracing::{debug, info, warn};

use super::line::StatusLine;

/// Consumer of status lines
///
/// Implementations must be cheap and must not block; tasks call `emit` from
/// inside their cycles.
pub trait LogSink: Send + Sync {
    /// Consume one status line
    fn emit(&self, line: StatusLine);
}

/// Writes each line to stdout, diagnostics highlighted
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn emit(&self, line: StatusLine) {
        let text = line.to_string();
        match &line {
            StatusLine::SendFailed { .. } | StatusLine::NothingReceived { .. } => println!("{}", text.yellow()),
            StatusLine::NoMoreEvents { .. } => println!("{}", text.cyan().bold()),
            StatusLine::Heartbeat { .. } => println!("{}", text.dimmed()),
            _ => println!("{}", text),
        }
    }
}

/// Forwards each line as a tracing event
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, line: StatusLine) {
        if line.is_diagnostic() {
            warn!(line_type = line.line_type(), "{}", line);
        } else {
            info!(line_type = line.line_type(), "{}", line);
        }
    }
}

/// Records every line in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<StatusLine>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        debug!("MemorySink::new: called");
        Self::default()
    }

    /// Copy of every line recorded so far
    pub fn lines(&self) -> Vec<StatusLine> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Lines matching a predicate
    pub fn filter(&self, predicate: impl Fn(&StatusLine) -> bool) -> Vec<StatusLine> {
        self.lines().into_iter().filter(|line| predicate(line)).collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, line: StatusLine) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

//! Status line vocabulary

use serde::{Deserialize, Serialize};

/// One reportable occurrence in the running system
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StatusLine {
    // === Aggregator ===
    /// An event was received and folded into the total
    Received {
        task: String,
        source: String,
        magnitude: u64,
        total: u64,
    },
    /// The receive budget elapsed with nothing delivered
    NothingReceived { task: String, total: u64 },
    /// Items were waiting in the channel at the start of a cycle
    Backlog { task: String, pending: usize },

    // === Producers ===
    /// A send found the channel full; the event was dropped
    SendFailed { task: String, magnitude: u64 },
    /// A scripted sender exhausted its script
    NoMoreEvents { task: String, sent: u64, dropped: u64 },
    /// A direct writer applied a magnitude to the total
    Applied { task: String, magnitude: u64, total: u64 },

    // === Substrate ===
    /// Heartbeat iteration
    Heartbeat { iteration: u64 },
}

impl StatusLine {
    /// Get the line type as a string (for logging)
    pub fn line_type(&self) -> &'static str {
        match self {
            StatusLine::Received { .. } => "Received",
            StatusLine::NothingReceived { .. } => "NothingReceived",
            StatusLine::Backlog { .. } => "Backlog",
            StatusLine::SendFailed { .. } => "SendFailed",
            StatusLine::NoMoreEvents { .. } => "NoMoreEvents",
            StatusLine::Applied { .. } => "Applied",
            StatusLine::Heartbeat { .. } => "Heartbeat",
        }
    }

    /// True for lines reporting a dropped or missing event
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, StatusLine::SendFailed { .. } | StatusLine::NothingReceived { .. })
    }
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusLine::Received {
                task,
                source,
                magnitude,
                total,
            } => write!(f, "[{}] Viewed just now = {} (from {}), total = {}", task, magnitude, source, total),
            StatusLine::NothingReceived { task, total } => {
                write!(f, "[{}] Could not receive from the queue. Total viewers = {}", task, total)
            }
            StatusLine::Backlog { task, pending } => write!(f, "[{}] Queue is not empty ({} waiting)", task, pending),
            StatusLine::SendFailed { task, magnitude } => {
                write!(f, "[{}] Could not send to the queue, dropped {} views", task, magnitude)
            }
            StatusLine::NoMoreEvents { task, sent, dropped } => {
                write!(f, "[{}] No more viewers ({} sent, {} dropped)", task, sent, dropped)
            }
            StatusLine::Applied { task, magnitude, total } => {
                write!(f, "[{}] Added {} directly, total = {}", task, magnitude, total)
            }
            StatusLine::Heartbeat { iteration } => write!(f, "Main task iteration: 0x{:08x}", iteration),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_information() {
        let line = StatusLine::Received {
            task: "aggregator-0".to_string(),
            source: "sender-0".to_string(),
            magnitude: 23,
            total: 40,
        };
        let text = line.to_string();
        assert!(text.contains("23"));
        assert!(text.contains("40"));
        assert!(text.contains("sender-0"));
    }

    #[test]
    fn test_heartbeat_hex_counter() {
        assert_eq!(StatusLine::Heartbeat { iteration: 255 }.to_string(), "Main task iteration: 0x000000ff");
    }

    #[test]
    fn test_diagnostic_classification() {
        assert!(
            StatusLine::SendFailed {
                task: "s".to_string(),
                magnitude: 1
            }
            .is_diagnostic()
        );
        assert!(!StatusLine::Heartbeat { iteration: 0 }.is_diagnostic());
    }

    #[test]
    fn test_serde_tagged() {
        let json = serde_json::to_string(&StatusLine::Heartbeat { iteration: 3 }).unwrap();
        assert_eq!(json, r#"{"type":"Heartbeat","iteration":3}"#);
    }
}

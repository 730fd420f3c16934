//! View events flowing from producers to the total

use serde::{Deserialize, Serialize};

/// Scripted view counts replayed by a scripted sender (23 entries)
pub const DEFAULT_SCRIPT: [u64; 23] = [23, 5, 7, 2, 5, 8, 9, 4, 2, 4, 6, 4, 3, 2, 3, 6, 3, 2, 6, 7, 8, 6, 5];

/// A batch of views arriving at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Number of views in the batch, positive when built through [`Event::new`]
    pub magnitude: u64,

    /// Name of the task that produced the event
    pub source: String,
}

impl Event {
    /// Create a new event. Magnitudes must be positive.
    pub fn new(magnitude: u64, source: impl Into<String>) -> Self {
        debug_assert!(magnitude > 0, "event magnitude must be positive");
        Self {
            magnitude,
            source: source.into(),
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} views from {}", self.magnitude, self.source)
    }
}

//! Lock discipline for writers of the shared total

use serde::{Deserialize, Serialize};

/// Whether a writer takes the total's lock around its read-modify-write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// Acquire the lock; updates are never lost
    #[default]
    Locked,
    /// Bypass the lock; concurrent writers may lose updates
    Unlocked,
}

impl Discipline {
    /// True when writers acquire the lock
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked)
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

impl std::str::FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "locked" | "protected" => Ok(Self::Locked),
            "unlocked" | "racy" => Ok(Self::Unlocked),
            _ => Err(format!("Unknown discipline: {}. Use: locked or unlocked", s)),
        }
    }
}

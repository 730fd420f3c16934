//! Shared running total and the lock that serializes its updates
//!
//! Writers choose a [`Discipline`](crate::domain::Discipline): locked writers
//! serialize their read-modify-write behind the total's mutex, unlocked writers
//! race each other and may lose updates. A ledger records the exact sum of
//! everything submitted so lost updates can be measured from outside.

mod latency;
mod shared;

pub use latency::SyntheticLatency;
pub use shared::{SharedTotal, TotalSnapshot};

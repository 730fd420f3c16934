//! SharedTotal implementation

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::Discipline;

use super::latency::SyntheticLatency;

/// Exact record of submissions, kept apart from the stored total
#[derive(Debug, Default)]
struct Ledger {
    expected: AtomicU64,
    applications: AtomicU64,
}

/// Point-in-time view of the total and its ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalSnapshot {
    /// Value stored in the total
    pub total: u64,
    /// Exact sum of every submitted magnitude
    pub expected: u64,
    /// Contributions overwritten by racing writers
    pub lost: u64,
    /// Number of submissions
    pub applications: u64,
}

/// The running view count shared by every writer.
///
/// The stored value is only ever read and written as two separate steps, so
/// an unlocked writer can be interleaved between them.
#[derive(Debug)]
pub struct SharedTotal {
    value: AtomicU64,
    lock: Mutex<()>,
    latency: SyntheticLatency,
    ledger: Ledger,
}

impl SharedTotal {
    /// Create a total starting at zero
    pub fn new(latency: SyntheticLatency) -> Self {
        debug!(?latency, "SharedTotal::new: called");
        Self {
            value: AtomicU64::new(0),
            lock: Mutex::new(()),
            latency,
            ledger: Ledger::default(),
        }
    }

    /// Add `magnitude` under the given discipline and return the value written
    pub async fn apply(&self, magnitude: u64, discipline: Discipline) -> u64 {
        debug!(magnitude, %discipline, "SharedTotal::apply: called");
        self.ledger.expected.fetch_add(magnitude, Ordering::Relaxed);
        self.ledger.applications.fetch_add(1, Ordering::Relaxed);

        match discipline {
            Discipline::Locked => {
                let _guard = self.lock.lock().await;
                self.read_modify_write(magnitude).await
            }
            Discipline::Unlocked => self.read_modify_write(magnitude).await,
        }
    }

    /// Add `magnitude` inside the critical section
    pub async fn apply_locked(&self, magnitude: u64) -> u64 {
        self.apply(magnitude, Discipline::Locked).await
    }

    /// Add `magnitude` without taking the lock
    pub async fn apply_unlocked(&self, magnitude: u64) -> u64 {
        self.apply(magnitude, Discipline::Unlocked).await
    }

    async fn read_modify_write(&self, magnitude: u64) -> u64 {
        let buffer = self.value.load(Ordering::Acquire);
        let updated = buffer.saturating_add(magnitude);

        self.latency.inject().await;

        self.value.store(updated, Ordering::Release);
        updated
    }

    /// Current stored value
    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Exact sum of every magnitude submitted so far
    pub fn expected(&self) -> u64 {
        self.ledger.expected.load(Ordering::Relaxed)
    }

    /// Snapshot of the total and ledger.
    ///
    /// `lost` is only meaningful once writers have quiesced; an in-flight
    /// update is counted in the ledger before it reaches the total.
    pub fn snapshot(&self) -> TotalSnapshot {
        let total = self.current();
        let expected = self.expected();
        TotalSnapshot {
            total,
            expected,
            lost: expected.saturating_sub(total),
            applications: self.ledger.applications.load(Ordering::Relaxed),
        }
    }
}

impl Default for SharedTotal {
    fn default() -> Self {
        Self::new(SyntheticLatency::None)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_sequential_applies_sum() {
        let total = SharedTotal::default();
        assert_eq!(total.apply_locked(23).await, 23);
        assert_eq!(total.apply_unlocked(5).await, 28);

        let snapshot = total.snapshot();
        assert_eq!(snapshot.total, 28);
        assert_eq!(snapshot.expected, 28);
        assert_eq!(snapshot.lost, 0);
        assert_eq!(snapshot.applications, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_writers_never_lose_updates() {
        let total = Arc::new(SharedTotal::new(SyntheticLatency::Sleep(Duration::from_millis(1))));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let total = Arc::clone(&total);
                tokio::spawn(async move {
                    for m in 1..=25u64 {
                        total.apply_locked(m).await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let expected = 4 * (1..=25u64).sum::<u64>();
        assert_eq!(total.current(), expected);
        assert_eq!(total.snapshot().lost, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlocked_writers_lose_updates() {
        let total = Arc::new(SharedTotal::new(SyntheticLatency::Sleep(Duration::from_millis(1))));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let total = Arc::clone(&total);
                tokio::spawn(async move {
                    for _ in 0..10 {
                        total.apply_unlocked(1).await;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = total.snapshot();
        assert_eq!(snapshot.expected, 20);
        assert!(snapshot.total < snapshot.expected);
        assert_eq!(snapshot.lost, snapshot.expected - snapshot.total);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_released_when_update_cancelled() {
        let total = Arc::new(SharedTotal::new(SyntheticLatency::Sleep(Duration::from_secs(10))));

        let slow = Arc::clone(&total);
        let cancelled = tokio::time::timeout(Duration::from_millis(5), async move { slow.apply_locked(1).await }).await;
        assert!(cancelled.is_err());
        assert_eq!(total.current(), 0);

        // The guard from the cancelled update must not be held any more
        let acquired = tokio::time::timeout(Duration::from_millis(5), total.lock.lock()).await;
        assert!(acquired.is_ok());
    }
}

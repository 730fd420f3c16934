//! Bounded channel implementation

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

use super::error::ChannelError;
use super::stats::ChannelStats;

/// Default mailbox capacity
pub const DEFAULT_CAPACITY: usize = 5;

/// Largest capacity the channel will allocate
pub const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// Deadlines past this horizon are clamped to it
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + budget`, clamped so huge budgets cannot overflow `Instant`
fn deadline_after(budget: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(budget.min(FAR_FUTURE))
        .unwrap_or_else(|| now + Duration::from_secs(86_400))
}

/// Internal state protected by mutex
struct ChannelInner<T> {
    /// Queued items, oldest at the front
    items: VecDeque<T>,

    /// Statistics
    stats: ChannelStats,
}

/// A fixed-capacity FIFO queue shared by producers and consumers.
///
/// `send` with a zero budget fails fast with [`ChannelError::Full`];
/// `receive` waits up to its budget and wakes early when an item arrives.
pub struct BoundedChannel<T> {
    capacity: usize,
    inner: Mutex<ChannelInner<T>>,
    not_empty: Notify,
    not_full: Notify,
}

impl<T> BoundedChannel<T> {
    /// Create a new channel with room for `capacity` items
    pub fn new(capacity: usize) -> Result<Self, ChannelError> {
        debug!(capacity, "BoundedChannel::new: called");
        if capacity == 0 {
            debug!("BoundedChannel::new: zero capacity, rejecting");
            return Err(ChannelError::Creation {
                capacity,
                reason: "capacity must be at least 1".to_string(),
            });
        }
        if capacity > MAX_CHANNEL_CAPACITY {
            debug!(capacity, "BoundedChannel::new: capacity above maximum, rejecting");
            return Err(ChannelError::Creation {
                capacity,
                reason: format!("capacity exceeds maximum of {}", MAX_CHANNEL_CAPACITY),
            });
        }

        Ok(Self {
            capacity,
            inner: Mutex::new(ChannelInner {
                items: VecDeque::with_capacity(capacity),
                stats: ChannelStats::default(),
            }),
            not_empty: Notify::new(),
            not_full: Notify::new(),
        })
    }

    /// Fixed capacity chosen at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue an item, waiting up to `wait_budget` for a free slot.
    ///
    /// A zero budget never waits. On failure the item is dropped.
    pub async fn send(&self, item: T, wait_budget: Duration) -> Result<(), ChannelError> {
        debug!(?wait_budget, "BoundedChannel::send: called");
        let deadline = deadline_after(wait_budget);

        loop {
            {
                let mut inner = self.inner.lock().await;

                if inner.items.len() < self.capacity {
                    inner.items.push_back(item);
                    inner.stats.sent += 1;
                    inner.stats.peak_depth = inner.stats.peak_depth.max(inner.items.len());
                    debug!(depth = inner.items.len(), "BoundedChannel::send: enqueued");
                    drop(inner);

                    self.not_empty.notify_one();
                    return Ok(());
                }

                if wait_budget.is_zero() || Instant::now() >= deadline {
                    debug!(capacity = self.capacity, "BoundedChannel::send: full, rejecting");
                    inner.stats.rejected += 1;
                    return Err(ChannelError::Full {
                        capacity: self.capacity,
                    });
                }
            }

            debug!("BoundedChannel::send: full, waiting for a free slot");
            let _ = tokio::time::timeout_at(deadline, self.not_full.notified()).await;
        }
    }

    /// Enqueue without waiting
    pub async fn try_send(&self, item: T) -> Result<(), ChannelError> {
        self.send(item, Duration::ZERO).await
    }

    /// Dequeue the oldest item, waiting up to `wait_budget` for one to arrive
    pub async fn receive(&self, wait_budget: Duration) -> Result<T, ChannelError> {
        debug!(?wait_budget, "BoundedChannel::receive: called");
        let deadline = deadline_after(wait_budget);

        loop {
            {
                let mut inner = self.inner.lock().await;

                if let Some(item) = inner.items.pop_front() {
                    inner.stats.received += 1;
                    debug!(depth = inner.items.len(), "BoundedChannel::receive: dequeued");
                    drop(inner);

                    self.not_full.notify_one();
                    return Ok(item);
                }

                if Instant::now() >= deadline {
                    debug!("BoundedChannel::receive: budget elapsed, empty");
                    inner.stats.timeouts += 1;
                    return Err(ChannelError::Empty { waited: wait_budget });
                }
            }

            let _ = tokio::time::timeout_at(deadline, self.not_empty.notified()).await;
        }
    }

    /// Number of queued items
    pub async fn len(&self) -> usize {
        self.inner.lock().await.items.len()
    }

    /// True when nothing is queued
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Get the channel statistics
    pub async fn stats(&self) -> ChannelStats {
        debug!("BoundedChannel::stats: called");
        self.inner.lock().await.stats.clone()
    }
}

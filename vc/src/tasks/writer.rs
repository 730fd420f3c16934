//! Direct-increment writers that bypass the channel

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::Discipline;
use crate::sink::{LogSink, StatusLine};
use crate::total::SharedTotal;

use super::shutdown::Shutdown;

/// Magnitudes a writer applies
enum Magnitudes {
    Random { min: u64, max: u64, rng: StdRng },
    Fixed(VecDeque<u64>),
}

/// Outcome of a writer task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterReport {
    /// Task name
    pub name: String,
    /// Increments performed
    pub applied: u64,
    /// Exact sum of the magnitudes this writer submitted
    pub submitted_sum: u64,
}

/// A producer that applies magnitudes straight to the total
pub struct DirectWriter {
    name: String,
    total: Arc<SharedTotal>,
    sink: Arc<dyn LogSink>,
    shutdown: Shutdown,
    discipline: Discipline,
    interval: Duration,
    limit: Option<u64>,
    magnitudes: Magnitudes,
}

impl DirectWriter {
    /// Create a writer drawing from `min..=max` under the given discipline
    pub fn new(
        name: impl Into<String>,
        total: Arc<SharedTotal>,
        sink: Arc<dyn LogSink>,
        shutdown: Shutdown,
        discipline: Discipline,
    ) -> Self {
        let name = name.into();
        debug!(%name, %discipline, "DirectWriter::new: called");
        Self {
            name,
            total,
            sink,
            shutdown,
            discipline,
            interval: Duration::from_millis(100),
            limit: None,
            magnitudes: Magnitudes::Random {
                min: 1,
                max: 10,
                rng: StdRng::from_os_rng(),
            },
        }
    }

    /// Draw magnitudes uniformly from `min..=max`
    pub fn with_range(mut self, min: u64, max: u64) -> Self {
        let rng = match self.magnitudes {
            Magnitudes::Random { rng, .. } => rng,
            Magnitudes::Fixed(_) => StdRng::from_os_rng(),
        };
        self.magnitudes = Magnitudes::Random { min, max, rng };
        self
    }

    /// Make random magnitudes reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        if let Magnitudes::Random { rng, .. } = &mut self.magnitudes {
            *rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    /// Apply exactly these magnitudes, then stop
    pub fn with_magnitudes(mut self, magnitudes: impl IntoIterator<Item = u64>) -> Self {
        self.magnitudes = Magnitudes::Fixed(magnitudes.into_iter().collect());
        self
    }

    /// Pause between increments (zero = just yield)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Stop after this many increments
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    fn next_magnitude(&mut self) -> Option<u64> {
        match &mut self.magnitudes {
            Magnitudes::Random { min, max, rng } => Some(rng.random_range(*min..=*max)),
            Magnitudes::Fixed(queue) => queue.pop_front(),
        }
    }

    /// Run until shutdown, the limit, or the fixed magnitudes run out
    pub async fn run(mut self) -> WriterReport {
        info!(task = %self.name, discipline = %self.discipline, "DirectWriter started");
        let mut report = WriterReport {
            name: self.name.clone(),
            ..Default::default()
        };

        loop {
            if self.shutdown.is_requested() {
                debug!(task = %self.name, "DirectWriter::run: shutdown requested");
                break;
            }
            if self.limit.is_some_and(|limit| report.applied >= limit) {
                debug!(task = %self.name, "DirectWriter::run: limit reached");
                break;
            }
            let Some(magnitude) = self.next_magnitude() else {
                debug!(task = %self.name, "DirectWriter::run: magnitudes exhausted");
                break;
            };

            let total = self.total.apply(magnitude, self.discipline).await;
            report.applied += 1;
            report.submitted_sum += magnitude;
            self.sink.emit(StatusLine::Applied {
                task: self.name.clone(),
                magnitude,
                total,
            });

            if !self.shutdown.pause(self.interval).await {
                break;
            }
        }

        info!(task = %self.name, applied = report.applied, "DirectWriter stopped");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::tasks::shutdown::shutdown_channel;
    use crate::total::SyntheticLatency;

    #[tokio::test(start_paused = true)]
    async fn test_fixed_magnitudes_applied_in_order() {
        let (_trigger, shutdown) = shutdown_channel();
        let total = Arc::new(SharedTotal::default());
        let sink = Arc::new(MemorySink::new());

        let report = DirectWriter::new("writer-0", Arc::clone(&total), sink.clone(), shutdown, Discipline::Locked)
            .with_magnitudes([4, 6, 10])
            .run()
            .await;

        assert_eq!(report.applied, 3);
        assert_eq!(report.submitted_sum, 20);
        assert_eq!(total.current(), 20);

        let totals: Vec<u64> = sink
            .lines()
            .into_iter()
            .filter_map(|line| match line {
                StatusLine::Applied { total, .. } => Some(total),
                _ => None,
            })
            .collect();
        assert_eq!(totals, vec![4, 10, 20]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_limit_bounds_random_writer() {
        let (_trigger, shutdown) = shutdown_channel();
        let total = Arc::new(SharedTotal::default());

        let report = DirectWriter::new(
            "writer-0",
            Arc::clone(&total),
            Arc::new(MemorySink::new()),
            shutdown,
            Discipline::Locked,
        )
        .with_range(2, 3)
        .with_seed(11)
        .with_limit(10)
        .with_interval(Duration::ZERO)
        .run()
        .await;

        assert_eq!(report.applied, 10);
        assert!((20..=30).contains(&total.current()));
        assert_eq!(total.current(), report.submitted_sum);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_unlocked_writers_lose_updates() {
        let (_trigger, shutdown) = shutdown_channel();
        let total = Arc::new(SharedTotal::new(SyntheticLatency::Sleep(Duration::from_millis(1))));
        let sink = Arc::new(MemorySink::new());

        let handles: Vec<_> = (0..2)
            .map(|i| {
                tokio::spawn(
                    DirectWriter::new(
                        format!("writer-{}", i),
                        Arc::clone(&total),
                        sink.clone(),
                        shutdown.clone(),
                        Discipline::Unlocked,
                    )
                    .with_magnitudes(vec![1; 20])
                    .with_interval(Duration::ZERO)
                    .run(),
                )
            })
            .collect();

        let mut submitted = 0;
        for handle in handles {
            submitted += handle.await.unwrap().submitted_sum;
        }

        assert_eq!(submitted, 40);
        assert!(total.current() < submitted);
    }
}

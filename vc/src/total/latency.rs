//! Synthetic latency injected inside the read-modify-write window

use std::time::Duration;

/// Artificial processing delay between reading and writing the total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntheticLatency {
    /// No delay
    #[default]
    None,
    /// Suspend the task for the duration, letting other tasks run
    Sleep(Duration),
    /// Busy-wait on the clock for the duration, then yield once
    Spin(Duration),
}

impl SyntheticLatency {
    /// Inject the delay
    pub async fn inject(&self) {
        match *self {
            Self::None => {}
            Self::Sleep(duration) => tokio::time::sleep(duration).await,
            Self::Spin(duration) => {
                let start = std::time::Instant::now();
                while start.elapsed() < duration {
                    std::hint::spin_loop();
                }
                // A preemptive scheduler could switch tasks here too
                tokio::task::yield_now().await;
            }
        }
    }

    /// Length of the injected window
    pub fn duration(&self) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Sleep(duration) | Self::Spin(duration) => duration,
        }
    }
}

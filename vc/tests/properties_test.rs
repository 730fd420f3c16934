//! Property tests for channel ordering, backpressure and the locked sum

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use viewcount::{BoundedChannel, ChannelError, SharedTotal, SyntheticLatency};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("Failed to build runtime")
}

proptest! {
    #[test]
    fn prop_channel_preserves_fifo(magnitudes in prop::collection::vec(1u64..1000, 1..32)) {
        let rt = runtime();
        let received = rt.block_on(async {
            let channel = BoundedChannel::new(magnitudes.len()).unwrap();
            for m in &magnitudes {
                channel.try_send(*m).await.unwrap();
            }
            let mut received = Vec::new();
            while let Ok(m) = channel.receive(Duration::ZERO).await {
                received.push(m);
            }
            received
        });
        prop_assert_eq!(received, magnitudes);
    }

    #[test]
    fn prop_full_channel_rejects_and_keeps_contents(capacity in 1usize..20, extra in 1usize..5) {
        let rt = runtime();
        rt.block_on(async {
            let channel = BoundedChannel::new(capacity).unwrap();
            for i in 0..capacity {
                channel.try_send(i).await.unwrap();
            }
            for i in 0..extra {
                let result = channel.try_send(capacity + i).await;
                assert_eq!(result, Err(ChannelError::Full { capacity }));
            }
            assert_eq!(channel.len().await, capacity);

            let stats = channel.stats().await;
            assert_eq!(stats.rejected, extra as u64);

            for i in 0..capacity {
                assert_eq!(channel.receive(Duration::ZERO).await.unwrap(), i);
            }
            assert!(channel.is_empty().await);
        });
    }

    #[test]
    fn prop_locked_sum_is_exact(
        batches in prop::collection::vec(prop::collection::vec(1u64..100, 1..20), 2..6)
    ) {
        let rt = runtime();
        let expected: u64 = batches.iter().flatten().sum();
        let actual = rt.block_on(async {
            let total = Arc::new(SharedTotal::new(SyntheticLatency::Sleep(Duration::from_millis(1))));
            let handles: Vec<_> = batches
                .into_iter()
                .map(|batch| {
                    let total = Arc::clone(&total);
                    tokio::spawn(async move {
                        for m in batch {
                            total.apply_locked(m).await;
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.await.unwrap();
            }
            total.current()
        });
        prop_assert_eq!(actual, expected);
    }
}

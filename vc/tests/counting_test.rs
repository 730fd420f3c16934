//! Integration tests for the counting core
//!
//! These tests exercise the channel, total and task entry points together.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use viewcount::{
    Aggregator, BoundedChannel, ChannelError, DEFAULT_SCRIPT, DirectWriter, Discipline, Event, EventSender,
    EventSource, MemorySink, SharedTotal, StatusLine, SyntheticLatency, TrialConfig, run_trials, shutdown_channel,
};

fn received_magnitudes(sink: &MemorySink) -> Vec<u64> {
    sink.lines()
        .into_iter()
        .filter_map(|line| match line {
            StatusLine::Received { magnitude, .. } => Some(magnitude),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Sum invariant (locked writers)
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_locked_writers_sum_exactly_under_stress() {
    let (_trigger, shutdown) = shutdown_channel();
    let total = Arc::new(SharedTotal::new(SyntheticLatency::Spin(Duration::from_micros(20))));
    let sink = Arc::new(MemorySink::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            tokio::spawn(
                DirectWriter::new(
                    format!("writer-{}", i),
                    Arc::clone(&total),
                    sink.clone(),
                    shutdown.clone(),
                    Discipline::Locked,
                )
                .with_range(1, 10)
                .with_seed(i)
                .with_limit(150)
                .with_interval(Duration::ZERO)
                .run(),
            )
        })
        .collect();

    let mut submitted = 0;
    for handle in handles {
        submitted += handle.await.expect("writer panicked").submitted_sum;
    }

    assert_eq!(total.current(), submitted);
    assert_eq!(total.snapshot().lost, 0);
    assert_eq!(total.snapshot().applications, 8 * 150);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_channel_path_and_locked_writers_share_total() {
    let (trigger, shutdown) = shutdown_channel();
    let channel = Arc::new(BoundedChannel::new(5).unwrap());
    let total = Arc::new(SharedTotal::new(SyntheticLatency::Sleep(Duration::from_micros(50))));
    let sink = Arc::new(MemorySink::new());

    let senders: Vec<_> = (0..4)
        .map(|i| {
            tokio::spawn(
                EventSender::new(
                    format!("sender-{}", i),
                    EventSource::Scripted(vec![3; 25]),
                    Arc::clone(&channel),
                    sink.clone(),
                    shutdown.clone(),
                )
                .with_interval(Duration::from_millis(1))
                .with_send_wait(Duration::from_secs(5))
                .run(),
            )
        })
        .collect();

    let aggregators: Vec<_> = (0..2)
        .map(|i| {
            tokio::spawn(
                Aggregator::new(
                    format!("aggregator-{}", i),
                    Arc::clone(&channel),
                    Arc::clone(&total),
                    sink.clone(),
                    shutdown.clone(),
                )
                .with_receive_timeout(Duration::from_millis(20))
                .with_cycle_pause(Duration::ZERO)
                .run(),
            )
        })
        .collect();

    let writers: Vec<_> = (0..2)
        .map(|i| {
            tokio::spawn(
                DirectWriter::new(
                    format!("writer-{}", i),
                    Arc::clone(&total),
                    sink.clone(),
                    shutdown.clone(),
                    Discipline::Locked,
                )
                .with_magnitudes(vec![2; 50])
                .with_interval(Duration::ZERO)
                .run(),
            )
        })
        .collect();

    let mut sent = 0;
    for handle in senders {
        let report = handle.await.unwrap();
        assert_eq!(report.dropped, 0);
        sent += report.sent_sum;
    }
    for handle in writers {
        handle.await.unwrap();
    }

    // Let the aggregators drain what is left
    tokio::time::timeout(Duration::from_secs(10), async {
        while !channel.is_empty().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("channel never drained");

    trigger.fire();
    let mut received = 0;
    for handle in aggregators {
        received += handle.await.unwrap().received;
    }

    assert_eq!(received, 100);
    assert_eq!(total.current(), sent + 2 * 2 * 50);
    assert_eq!(total.snapshot().lost, 0);
}

// =============================================================================
// Race manifestation (unlocked writers)
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unlocked_writers_lose_updates_across_trials() {
    let config = TrialConfig {
        writers: 4,
        increments: 50,
        discipline: Discipline::Unlocked,
        latency: SyntheticLatency::Sleep(Duration::from_micros(200)),
        ..Default::default()
    };

    let summary = run_trials(&config, 10, Arc::new(MemorySink::new())).await.unwrap();

    assert!(summary.trials_with_loss > 0, "expected at least one trial to lose updates");
    for outcome in &summary.outcomes {
        assert!(outcome.actual <= outcome.expected);
        assert_eq!(outcome.lost, outcome.expected - outcome.actual);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_locked_trials_never_lose_updates() {
    let config = TrialConfig {
        writers: 4,
        increments: 50,
        discipline: Discipline::Locked,
        latency: SyntheticLatency::Spin(Duration::from_micros(20)),
        ..Default::default()
    };

    let summary = run_trials(&config, 5, Arc::new(MemorySink::new())).await.unwrap();

    assert_eq!(summary.trials_with_loss, 0);
    assert_eq!(summary.total_lost, 0);
}

// =============================================================================
// FIFO
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_aggregator_receives_single_producer_in_order() {
    let (_trigger, shutdown) = shutdown_channel();
    let channel = Arc::new(BoundedChannel::new(5).unwrap());
    let total = Arc::new(SharedTotal::default());
    let sink = Arc::new(MemorySink::new());

    let sender = tokio::spawn(
        EventSender::new(
            "sender-0",
            EventSource::Scripted(vec![23, 5, 7, 2, 5]),
            Arc::clone(&channel),
            sink.clone(),
            shutdown.clone(),
        )
        .run(),
    );
    let aggregator = tokio::spawn(
        Aggregator::new("aggregator-0", channel, Arc::clone(&total), sink.clone(), shutdown)
            .with_limit(5)
            .run(),
    );

    sender.await.unwrap();
    let report = aggregator.await.unwrap();

    assert_eq!(report.received, 5);
    assert_eq!(received_magnitudes(&sink), vec![23, 5, 7, 2, 5]);
    assert_eq!(total.current(), 42);
}

// =============================================================================
// Backpressure
// =============================================================================

#[tokio::test]
async fn test_capacity_plus_one_send_is_rejected() {
    let channel = BoundedChannel::new(5).unwrap();
    for m in 1..=5u64 {
        channel.try_send(Event::new(m, "sender-0")).await.unwrap();
    }

    let overflow = channel.try_send(Event::new(6, "sender-0")).await;
    assert_eq!(overflow, Err(ChannelError::Full { capacity: 5 }));

    let mut drained = Vec::new();
    while let Ok(event) = channel.receive(Duration::ZERO).await {
        drained.push(event.magnitude);
    }
    assert_eq!(drained, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_aggregator_causes_dropped_events() {
    let (trigger, shutdown) = shutdown_channel();
    let channel = Arc::new(BoundedChannel::new(5).unwrap());
    let total = Arc::new(SharedTotal::default());
    let sink = Arc::new(MemorySink::new());

    let sender = tokio::spawn(
        EventSender::new(
            "sender-0",
            EventSource::Scripted(DEFAULT_SCRIPT.to_vec()),
            Arc::clone(&channel),
            sink.clone(),
            shutdown.clone(),
        )
        .with_interval(Duration::from_millis(10))
        .run(),
    );
    let aggregator = tokio::spawn(
        Aggregator::new("aggregator-0", Arc::clone(&channel), Arc::clone(&total), sink.clone(), shutdown)
            .with_cycle_pause(Duration::from_millis(100))
            .run(),
    );

    let report = sender.await.unwrap();
    trigger.fire();
    aggregator.await.unwrap();

    assert!(report.dropped > 0);
    assert_eq!(report.sent + report.dropped, 23);
    let failures = sink.filter(|line| matches!(line, StatusLine::SendFailed { .. }));
    assert_eq!(failures.len() as u64, report.dropped);
}

// =============================================================================
// Timeout
// =============================================================================

#[tokio::test]
#[serial]
async fn test_receive_timeout_within_slack() {
    let channel = BoundedChannel::<Event>::new(5).unwrap();
    let budget = Duration::from_millis(100);

    let start = std::time::Instant::now();
    let result = channel.receive(budget).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(ChannelError::Empty { .. })));
    assert!(elapsed >= budget, "returned early after {:?}", elapsed);
    assert!(elapsed < budget + Duration::from_millis(250), "overslept: {:?}", elapsed);
}

// =============================================================================
// Scripted termination
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_scripted_sender_terminates_after_23_events() {
    let (_trigger, shutdown) = shutdown_channel();
    let channel = Arc::new(BoundedChannel::new(64).unwrap());
    let sink = Arc::new(MemorySink::new());

    let handle = tokio::spawn(
        EventSender::new(
            "sender-0",
            EventSource::Scripted(DEFAULT_SCRIPT.to_vec()),
            Arc::clone(&channel),
            sink.clone(),
            shutdown,
        )
        .with_linger(Duration::from_secs(10))
        .run(),
    );

    // Script takes 23 * 100ms; check mid-linger that nothing else was sent
    tokio::time::sleep(Duration::from_secs(5)).await;
    let notices = sink.filter(|line| matches!(line, StatusLine::NoMoreEvents { .. }));
    assert_eq!(notices.len(), 1);
    assert_eq!(channel.stats().await.sent, 23);

    let report = handle.await.unwrap();
    assert_eq!(report.sent, 23);
    assert!(report.exhausted);
    assert_eq!(channel.stats().await.sent, 23);
    assert_eq!(sink.filter(|line| matches!(line, StatusLine::NoMoreEvents { .. })).len(), 1);
}

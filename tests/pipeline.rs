//! End-to-end pipeline tests: publish → filtered fan-out → queues →
//! dispatchers → handlers, including retry via lease expiry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;
use tokio::time;
use tokio_util::sync::CancellationToken;

use bigfan::{
    attributes, Bus, Config, Delivery, DeliveryMode, Dispatcher, DurableQueue, FilterPolicy,
    HandlerError, HandlerFn, HandlerRef, PipelineEventKind, Subscription, Topic,
};

const VIS: Duration = Duration::from_secs(30);

fn test_config() -> Config {
    Config {
        visibility_timeout: VIS,
        batch_size: 10,
        wait_time: Duration::from_millis(100),
        max_concurrent: 4,
        bus_capacity: 256,
    }
}

/// Handler that records every payload it successfully processes.
fn recording_handler(name: &'static str, seen: Arc<Mutex<Vec<String>>>) -> HandlerRef {
    HandlerFn::arc(name, move |d: Delivery| {
        let seen = Arc::clone(&seen);
        async move {
            seen.lock()
                .await
                .push(String::from_utf8_lossy(&d.body).into_owned());
            Ok(())
        }
    })
}

struct BigFan {
    topic: Arc<Topic>,
    created_queue: Arc<DurableQueue>,
    any_other_queue: Arc<DurableQueue>,
}

fn big_fan_topology(cfg: &Config, bus: Bus) -> BigFan {
    let created_queue = DurableQueue::new("created-queue", cfg.visibility_timeout);
    let any_other_queue = DurableQueue::new("any-other-queue", cfg.visibility_timeout);
    let topic = Topic::new(
        "the-big-fan",
        vec![
            Subscription::new(
                "created-sub",
                created_queue.clone(),
                FilterPolicy::new().allow("status", ["created"]),
                DeliveryMode::Raw,
            ),
            Subscription::new(
                "any-other-sub",
                any_other_queue.clone(),
                FilterPolicy::new().deny("status", ["created"]),
                DeliveryMode::Raw,
            ),
        ],
        bus,
    );
    BigFan {
        topic,
        created_queue,
        any_other_queue,
    }
}

async fn wait_until_empty(queue: &Arc<DurableQueue>) {
    for _ in 0..200 {
        if queue.is_empty().await {
            return;
        }
        time::sleep(Duration::from_millis(500)).await;
    }
    panic!("queue '{}' did not drain", queue.name());
}

#[tokio::test(start_paused = true)]
async fn end_to_end_created_and_shipped_route_to_their_queues() {
    let cfg = test_config();
    let fan = big_fan_topology(&cfg, Bus::default());

    let created_seen = Arc::new(Mutex::new(Vec::new()));
    let any_other_seen = Arc::new(Mutex::new(Vec::new()));

    let ctx = CancellationToken::new();
    let w1 = Dispatcher::new(
        fan.created_queue.clone(),
        recording_handler("created-worker", Arc::clone(&created_seen)),
        &cfg,
        Bus::default(),
    )
    .spawn(ctx.clone());
    let w2 = Dispatcher::new(
        fan.any_other_queue.clone(),
        recording_handler("any-other-worker", Arc::clone(&any_other_seen)),
        &cfg,
        Bus::default(),
    )
    .spawn(ctx.clone());

    fan.topic
        .publish(
            Bytes::from_static(b"order#1"),
            attributes([("status", "created")]),
        )
        .await
        .unwrap();
    wait_until_empty(&fan.created_queue).await;

    fan.topic
        .publish(
            Bytes::from_static(b"order#2"),
            attributes([("status", "shipped")]),
        )
        .await
        .unwrap();
    wait_until_empty(&fan.any_other_queue).await;

    ctx.cancel();
    w1.await.unwrap();
    w2.await.unwrap();

    // Each payload processed exactly once, and only by its own queue's worker.
    assert_eq!(*created_seen.lock().await, vec!["order#1".to_string()]);
    assert_eq!(*any_other_seen.lock().await, vec!["order#2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn event_without_status_is_dropped_with_unmatched_trace() {
    let cfg = test_config();
    let bus = Bus::default();
    let mut rx = bus.subscribe();
    let fan = big_fan_topology(&cfg, bus);

    fan.topic
        .publish(Bytes::from_static(b"order#3"), attributes([("region", "eu")]))
        .await
        .unwrap();

    assert!(fan.created_queue.is_empty().await);
    assert!(fan.any_other_queue.is_empty().await);

    let first = rx.recv().await.unwrap();
    assert_eq!(first.kind, PipelineEventKind::EventPublished);
    let second = rx.recv().await.unwrap();
    assert_eq!(second.kind, PipelineEventKind::EventUnmatched);
}

#[tokio::test(start_paused = true)]
async fn failed_first_attempt_is_redelivered_and_terminally_processed_once() {
    let cfg = test_config();
    let fan = big_fan_topology(&cfg, Bus::default());

    let attempts = Arc::new(AtomicUsize::new(0));
    let successes = Arc::new(AtomicUsize::new(0));
    let (a, s) = (Arc::clone(&attempts), Arc::clone(&successes));
    let handler = HandlerFn::arc("flaky", move |_d: Delivery| {
        let (a, s) = (Arc::clone(&a), Arc::clone(&s));
        async move {
            if a.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(HandlerError::fail("transient"));
            }
            s.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    });

    let ctx = CancellationToken::new();
    let worker = Dispatcher::new(fan.created_queue.clone(), handler, &cfg, Bus::default())
        .spawn(ctx.clone());

    fan.topic
        .publish(
            Bytes::from_static(b"order#1"),
            attributes([("status", "created")]),
        )
        .await
        .unwrap();
    wait_until_empty(&fan.created_queue).await;

    ctx.cancel();
    worker.await.unwrap();

    assert_eq!(successes.load(Ordering::SeqCst), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn fanout_failure_in_one_queue_never_affects_the_other() {
    let cfg = test_config();
    let all_queue = DurableQueue::new("all-queue", cfg.visibility_timeout);
    let audit_queue = DurableQueue::new("audit-queue", cfg.visibility_timeout);
    let bus = Bus::default();
    let mut rx = bus.subscribe();
    let topic = Topic::new(
        "orders",
        vec![
            Subscription::new(
                "audit-sub",
                audit_queue.clone(),
                FilterPolicy::new(),
                DeliveryMode::Enveloped,
            ),
            Subscription::new("all-sub", all_queue.clone(), FilterPolicy::new(), DeliveryMode::Raw),
        ],
        bus,
    );

    audit_queue.close();

    let id = topic
        .publish(
            Bytes::from_static(b"order#1"),
            attributes([("status", "created")]),
        )
        .await
        .unwrap();
    assert!(!id.is_empty());

    // The healthy subscription got its copy; the closed one only produced
    // an isolated DeliveryFailed trace.
    assert_eq!(all_queue.len().await, 1);
    assert!(audit_queue.is_empty().await);

    let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
        .map(|ev| ev.kind)
        .collect();
    assert!(kinds.contains(&PipelineEventKind::DeliveryFailed));
    assert!(kinds.contains(&PipelineEventKind::EventDelivered));
}

#[tokio::test(start_paused = true)]
async fn two_dispatchers_on_one_queue_split_work_without_overlap() {
    let cfg = test_config();
    let fan = big_fan_topology(&cfg, Bus::default());

    let seen = Arc::new(Mutex::new(Vec::new()));
    let ctx = CancellationToken::new();
    let w1 = Dispatcher::new(
        fan.created_queue.clone(),
        recording_handler("worker-1", Arc::clone(&seen)),
        &cfg,
        Bus::default(),
    )
    .spawn(ctx.clone());
    let w2 = Dispatcher::new(
        fan.created_queue.clone(),
        recording_handler("worker-2", Arc::clone(&seen)),
        &cfg,
        Bus::default(),
    )
    .spawn(ctx.clone());

    for i in 0..20 {
        fan.topic
            .publish(
                Bytes::from(format!("order#{i}").into_bytes()),
                attributes([("status", "created")]),
            )
            .await
            .unwrap();
    }
    wait_until_empty(&fan.created_queue).await;

    ctx.cancel();
    w1.await.unwrap();
    w2.await.unwrap();

    // Lease exclusivity: every payload processed exactly once across both
    // competing dispatchers.
    let mut payloads = seen.lock().await.clone();
    payloads.sort();
    let mut expected: Vec<_> = (0..20).map(|i| format!("order#{i}")).collect();
    expected.sort();
    assert_eq!(payloads, expected);
}

//! # Big Fan Demo
//!
//! The classic two-subscription fan-out topology: one topic, a queue that
//! receives only `status=created` events (allow-list), and a queue that
//! receives every event with any *other* status (deny-list). Both use raw
//! delivery, so workers see the bare payload.
//!
//! ## Run
//! ```bash
//! cargo run --example big_fan
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use bigfan::{
    attributes, Bus, Config, Delivery, DeliveryMode, Dispatcher, DurableQueue, FilterPolicy,
    HandlerError, HandlerFn, LogSubscriber, Subscribe, SubscriberSet, Subscription, Topic,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::default(); // 300s visibility timeout
    let bus = Bus::new(cfg.bus_capacity);

    // Telemetry: fan pipeline events out to a stdout logger.
    let set = Arc::new(SubscriberSet::new(vec![
        Arc::new(LogSubscriber) as Arc<dyn Subscribe>
    ]));
    let _listener = Arc::clone(&set).spawn_listener(bus.subscribe());

    // Queues and subscriptions, built once up front.
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
        bus.clone(),
    );

    // One worker per queue.
    let ctx = CancellationToken::new();
    let created_worker = Dispatcher::new(
        created_queue.clone(),
        HandlerFn::arc("created-worker", |d: Delivery| async move {
            println!("created-worker got: {}", String::from_utf8_lossy(&d.body));
            Ok::<_, HandlerError>(())
        }),
        &cfg,
        bus.clone(),
    )
    .spawn(ctx.clone());
    let any_other_worker = Dispatcher::new(
        any_other_queue.clone(),
        HandlerFn::arc("any-other-worker", |d: Delivery| async move {
            println!("any-other-worker got: {}", String::from_utf8_lossy(&d.body));
            Ok::<_, HandlerError>(())
        }),
        &cfg,
        bus.clone(),
    )
    .spawn(ctx.clone());

    // Publish one event per status; only "created" reaches created-queue.
    for (payload, status) in [
        ("order#1", "created"),
        ("order#2", "shipped"),
        ("order#3", "cancelled"),
    ] {
        let id = topic
            .publish(Bytes::from(payload.as_bytes().to_vec()), attributes([("status", status)]))
            .await?;
        println!("published {payload} (status={status}) as {id}");
    }

    // An event with no status matches neither subscription and is dropped.
    topic
        .publish(Bytes::from_static(b"order#4"), attributes([("region", "eu")]))
        .await?;

    tokio::time::sleep(Duration::from_millis(200)).await;
    ctx.cancel();
    created_worker.await?;
    any_other_worker.await?;
    Ok(())
}

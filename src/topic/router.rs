//! # Topic: publish ingress and fan-out router.
//!
//! `publish` accepts an event and delivers an independent copy to every
//! subscription whose filter matches the event's attributes:
//!
//! ```text
//! publish(payload, attrs)
//!   │
//!   ├─► closed? ─► Err(PublishError::Unreachable)   (no partial state)
//!   │
//!   ├─► Event { fresh id, payload, attrs, now }
//!   │
//!   └─► for each subscription (judged in isolation, order-independent):
//!         ├─ policy.matches(attrs)?  no ─► skip
//!         └─ yes ─► enqueue(body per delivery mode)
//!                     ├─ Ok  ─► telemetry EventDelivered
//!                     └─ Err ─► telemetry DeliveryFailed (isolated,
//!                               never fails publish or other deliveries)
//!   matched == 0 ─► telemetry EventUnmatched, event dropped
//! ```
//!
//! ## Rules
//! - Publish always succeeds locally unless the topic itself is closed.
//! - Each delivery is independent: one queue's failure never blocks or
//!   rolls back another's.
//! - Events matching zero subscriptions are silently dropped (no implicit
//!   dead-letter capture); the `EventUnmatched` telemetry event is the only
//!   trace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{DeliveryError, PublishError, QueueError};
use crate::event::{Attributes, Event};
use crate::telemetry::{Bus, PipelineEvent, PipelineEventKind};
use crate::topic::Subscription;

/// Ingress point for published events, responsible for fan-out.
///
/// Constructed once from a fixed subscription list; immutable afterwards.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use bytes::Bytes;
/// use bigfan::{attributes, Bus, DeliveryMode, DurableQueue, FilterPolicy, Subscription, Topic};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let queue = DurableQueue::new("created-queue", Duration::from_secs(300));
/// let topic = Topic::new(
///     "orders",
///     vec![Subscription::new(
///         "created-sub",
///         queue.clone(),
///         FilterPolicy::new().allow("status", ["created"]),
///         DeliveryMode::Raw,
///     )],
///     Bus::default(),
/// );
///
/// let id = topic
///     .publish(Bytes::from_static(b"order#1"), attributes([("status", "created")]))
///     .await
///     .unwrap();
/// assert!(!id.is_empty());
/// assert_eq!(queue.len().await, 1);
/// # }
/// ```
pub struct Topic {
    name: String,
    subscriptions: Vec<Subscription>,
    bus: Bus,
    closed: AtomicBool,
}

impl Topic {
    /// Creates a topic over a fixed set of subscriptions.
    pub fn new(name: impl Into<String>, subscriptions: Vec<Subscription>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            subscriptions,
            bus,
            closed: AtomicBool::new(false),
        })
    }

    /// Topic name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered subscriptions (fixed at construction).
    #[must_use]
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Accepts an event and fans it out to every matching subscription.
    ///
    /// Returns the generated event id. Fails only with
    /// [`PublishError::Unreachable`] when the topic is closed, in which
    /// case the event was not accepted and no partial fan-out occurred.
    ///
    /// Per-subscription delivery failures are isolated: reported on the
    /// telemetry bus as [`PipelineEventKind::DeliveryFailed`] and skipped,
    /// never failing the publish or the other deliveries.
    pub async fn publish(
        &self,
        payload: Bytes,
        attributes: Attributes,
    ) -> Result<String, PublishError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PublishError::Unreachable {
                topic: self.name.clone(),
            });
        }

        let event = Event::new(payload, attributes);
        self.bus.publish(
            PipelineEvent::now(PipelineEventKind::EventPublished)
                .with_topic(&self.name)
                .with_message(&event.id),
        );

        let mut matched = 0usize;
        for sub in &self.subscriptions {
            if !sub.policy().matches(&event.attributes) {
                continue;
            }
            matched += 1;
            self.deliver(sub, &event).await;
        }

        if matched == 0 {
            self.bus.publish(
                PipelineEvent::now(PipelineEventKind::EventUnmatched)
                    .with_topic(&self.name)
                    .with_message(&event.id),
            );
        }

        Ok(event.id)
    }

    /// Closes the topic: subsequent publishes fail with `Unreachable`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Delivers one event copy to one subscription's queue, reporting the
    /// outcome on the telemetry bus. Failures stay scoped to `sub`.
    async fn deliver(&self, sub: &Subscription, event: &Event) {
        let body = event.body_for(sub.mode());
        match sub.queue().enqueue(event.id.clone(), body).await {
            Ok(()) => {
                self.bus.publish(
                    PipelineEvent::now(PipelineEventKind::EventDelivered)
                        .with_subscription(sub.id())
                        .with_queue(sub.queue().name())
                        .with_message(&event.id),
                );
            }
            Err(QueueError::Unavailable { queue }) => {
                let err = DeliveryError::QueueUnavailable {
                    subscription: sub.id().to_string(),
                    queue,
                };
                self.bus.publish(
                    PipelineEvent::now(PipelineEventKind::DeliveryFailed)
                        .with_subscription(sub.id())
                        .with_queue(sub.queue().name())
                        .with_message(&event.id)
                        .with_error(err.as_message()),
                );
            }
        }
    }
}

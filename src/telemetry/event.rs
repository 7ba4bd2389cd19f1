//! # Telemetry events emitted by the topic router and dispatchers.
//!
//! The [`PipelineEventKind`] enum classifies event types across the
//! pipeline's stages:
//! - **Publish events**: an event entered the topic (or matched nothing).
//! - **Delivery events**: fan-out to one subscription's queue.
//! - **Consume events**: lease, redelivery, deletion, handler failures.
//!
//! The [`PipelineEvent`] struct carries additional metadata such as
//! timestamps, subscription/queue names, message ids, and receive counts.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of pipeline telemetry events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEventKind {
    // === Publish events ===
    /// An event was accepted by the topic.
    ///
    /// Sets: `message_id`, `topic`, `at`, `seq`.
    EventPublished,

    /// An event matched zero subscriptions and was dropped.
    ///
    /// Not an error by design, but a data-loss risk worth surfacing to
    /// operators.
    ///
    /// Sets: `message_id`, `topic`, `at`, `seq`.
    EventUnmatched,

    // === Delivery events ===
    /// An event copy was enqueued onto one subscription's queue.
    ///
    /// Sets: `message_id`, `subscription`, `queue`, `at`, `seq`.
    EventDelivered,

    /// Delivery to one subscription failed (queue unavailable).
    ///
    /// Isolated to that subscription; other deliveries proceed.
    ///
    /// Sets: `message_id`, `subscription`, `queue`, `error`, `at`, `seq`.
    DeliveryFailed,

    // === Consume events ===
    /// A message was leased for its first delivery.
    ///
    /// Sets: `message_id`, `queue`, `receive_count`, `at`, `seq`.
    MessageLeased,

    /// A message was leased again after a lapsed lease (retry).
    ///
    /// Sets: `message_id`, `queue`, `receive_count`, `at`, `seq`.
    MessageRedelivered,

    /// A message was deleted after successful processing.
    ///
    /// Sets: `message_id`, `queue`, `receive_count`, `at`, `seq`.
    MessageDeleted,

    /// A handler reported failure or panicked; the message was abandoned
    /// and will become visible again once its lease expires.
    ///
    /// Sets: `message_id`, `queue`, `receive_count`, `error`, `at`, `seq`.
    HandlerFailed,
}

/// One telemetry event with its metadata.
///
/// Constructed with [`PipelineEvent::now`] and the `with_*` builders; only
/// the fields relevant to the kind are set (see [`PipelineEventKind`]).
#[derive(Debug, Clone)]
pub struct PipelineEvent {
    /// Event classification.
    pub kind: PipelineEventKind,
    /// Globally monotonic sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Topic name, when the event originates at the router.
    pub topic: Option<String>,
    /// Subscription id, for delivery-stage events.
    pub subscription: Option<String>,
    /// Queue name, for delivery/consume-stage events.
    pub queue: Option<String>,
    /// Id of the event/message involved.
    pub message_id: Option<String>,
    /// Receive count at the time of the event.
    pub receive_count: Option<u32>,
    /// Error rendered as text, for failure kinds.
    pub error: Option<String>,
}

impl PipelineEvent {
    /// Creates an event of `kind` stamped with the current time and the
    /// next global sequence number.
    pub fn now(kind: PipelineEventKind) -> Self {
        Self {
            kind,
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            topic: None,
            subscription: None,
            queue: None,
            message_id: None,
            receive_count: None,
            error: None,
        }
    }

    /// Sets the topic name.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Sets the subscription id.
    #[must_use]
    pub fn with_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.subscription = Some(subscription.into());
        self
    }

    /// Sets the queue name.
    #[must_use]
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Sets the message id.
    #[must_use]
    pub fn with_message(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    /// Sets the receive count.
    #[must_use]
    pub fn with_receive_count(mut self, count: u32) -> Self {
        self.receive_count = Some(count);
        self
    }

    /// Sets the error text.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

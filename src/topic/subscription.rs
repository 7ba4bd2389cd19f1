//! # Subscription: one interest registration on a topic.
//!
//! A [`Subscription`] pairs a filter policy and delivery mode with exactly
//! one target [`DurableQueue`]. Fan-out is achieved by registering multiple
//! subscriptions on the same topic, never by one subscription multiplexing
//! across queues.
//!
//! Created at configuration time and immutable during normal operation.

use std::sync::Arc;

use crate::event::DeliveryMode;
use crate::filter::FilterPolicy;
use crate::queue::DurableQueue;

/// Interest registration: filter policy + delivery mode + target queue.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use bigfan::{DeliveryMode, DurableQueue, FilterPolicy, Subscription};
///
/// let queue = DurableQueue::new("created-queue", Duration::from_secs(300));
/// let sub = Subscription::new(
///     "created-sub",
///     queue,
///     FilterPolicy::new().allow("status", ["created"]),
///     DeliveryMode::Raw,
/// );
/// assert_eq!(sub.id(), "created-sub");
/// ```
#[derive(Clone)]
pub struct Subscription {
    id: String,
    queue: Arc<DurableQueue>,
    policy: FilterPolicy,
    mode: DeliveryMode,
}

impl Subscription {
    /// Creates a new subscription.
    ///
    /// ### Parameters
    /// - `id`: stable identifier (for logs and telemetry)
    /// - `queue`: the one queue receiving this subscription's copies
    /// - `policy`: attribute filter deciding which events are delivered
    /// - `mode`: raw (bare payload) or enveloped (payload + metadata)
    pub fn new(
        id: impl Into<String>,
        queue: Arc<DurableQueue>,
        policy: FilterPolicy,
        mode: DeliveryMode,
    ) -> Self {
        Self {
            id: id.into(),
            queue,
            policy,
            mode,
        }
    }

    /// Subscription identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The subscription's target queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<DurableQueue> {
        &self.queue
    }

    /// The subscription's filter policy.
    #[must_use]
    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    /// The subscription's delivery mode.
    #[must_use]
    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }
}

//! Error types used by the fan-out pipeline.
//!
//! This module defines the pipeline's error taxonomy:
//!
//! - [`PublishError`] — the topic rejected a publish (surfaced to the caller).
//! - [`DeliveryError`] — one subscription's queue was unavailable during
//!   fan-out (isolated to that subscription, never fails the publish).
//! - [`QueueError`] — a durable queue refused an operation.
//! - [`HandlerError`] — a worker reported or raised a failure (recovered via
//!   redelivery once the message's lease expires).
//!
//! All types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics.

use thiserror::Error;

/// # Errors surfaced to a publisher.
///
/// A publish either fully succeeds (the event is accepted and fanned out)
/// or fails here with no partial state left behind.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum PublishError {
    /// The topic is unreachable (closed or shut down); the event was not accepted.
    #[error("topic '{topic}' is unreachable; event not accepted")]
    Unreachable {
        /// Name of the topic that rejected the publish.
        topic: String,
    },
}

impl PublishError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use bigfan::PublishError;
    ///
    /// let err = PublishError::Unreachable { topic: "orders".into() };
    /// assert_eq!(err.as_label(), "publish_unreachable");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PublishError::Unreachable { .. } => "publish_unreachable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PublishError::Unreachable { topic } => {
                format!("topic unreachable: {topic}")
            }
        }
    }
}

/// # Errors raised by a durable queue.
///
/// Queues only refuse `enqueue` once closed; `receive` and `delete` keep
/// working so in-flight consumers can drain.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// The queue has been closed and no longer accepts new messages.
    #[error("queue '{queue}' is unavailable")]
    Unavailable {
        /// Name of the unavailable queue.
        queue: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::Unavailable { .. } => "queue_unavailable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::Unavailable { queue } => format!("queue unavailable: {queue}"),
        }
    }
}

/// # Per-subscription delivery failure during fan-out.
///
/// Scoped to exactly one subscription: it is reported on the telemetry bus
/// and never blocks delivery to other subscriptions, nor does it fail the
/// publish call that triggered the fan-out.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The subscription's target queue refused the enqueue.
    #[error("delivery to subscription '{subscription}' failed: queue '{queue}' unavailable")]
    QueueUnavailable {
        /// Identifier of the subscription whose delivery failed.
        subscription: String,
        /// Name of the target queue.
        queue: String,
    },
}

impl DeliveryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DeliveryError::QueueUnavailable { .. } => "delivery_queue_unavailable",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            DeliveryError::QueueUnavailable {
                subscription,
                queue,
            } => format!("subscription={subscription} queue={queue}: queue unavailable"),
        }
    }
}

/// # Errors produced by worker handlers.
///
/// A handler failure is never surfaced to the publisher. The dispatcher
/// leaves the failed message un-deleted; it becomes visible again once its
/// lease expires and is retried with an incremented receive count.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Handler reported a failure; the message will be redelivered.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Handler panicked; treated exactly like a reported failure.
    #[error("handler panicked: {error}")]
    Panic {
        /// Panic payload rendered as text.
        error: String,
    },
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Fail`] from anything displayable.
    ///
    /// # Example
    /// ```
    /// use bigfan::HandlerError;
    ///
    /// let err = HandlerError::fail("boom");
    /// assert_eq!(err.as_label(), "handler_failed");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        HandlerError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::Fail { .. } => "handler_failed",
            HandlerError::Panic { .. } => "handler_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HandlerError::Fail { error } => format!("error: {error}"),
            HandlerError::Panic { error } => format!("panic: {error}"),
        }
    }
}

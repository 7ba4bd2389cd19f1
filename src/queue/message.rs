//! # Queue message state: bodies, leases, and tokens.
//!
//! A [`QueueMessage`] wraps one delivered event copy together with its
//! redelivery bookkeeping. A message with no active lease is **visible**;
//! one with a live lease is **in-flight** and hidden from other receivers
//! until the lease expires or the message is deleted.
//!
//! ## Rules
//! - `receive_count` starts at 0 and increments on every successful lease.
//! - At most one active lease exists per message at any instant.
//! - A lease expires passively: no sweeper, the queue checks expiry at
//!   `receive`/`delete` time.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

/// Caller-opaque token identifying one lease on one message.
///
/// Presented back to [`DurableQueue::delete`](crate::DurableQueue::delete)
/// to remove the message after successful processing. A token from an
/// expired lease no longer matches anything (stale deletes are no-ops).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LeaseToken(Uuid);

impl LeaseToken {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Active hold on a message: token plus expiry instant.
#[derive(Clone, Debug)]
pub(crate) struct Lease {
    pub(crate) token: LeaseToken,
    pub(crate) expires_at: Instant,
}

impl Lease {
    pub(crate) fn new(expires_at: Instant) -> Self {
        Self {
            token: LeaseToken::generate(),
            expires_at,
        }
    }

    pub(crate) fn is_active(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// One event copy stored in a queue, with its lease lifecycle state.
#[derive(Debug)]
pub(crate) struct QueueMessage {
    /// Id of the originating event (queue-internal; raw delivery still
    /// strips all metadata from what the worker sees).
    pub(crate) event_id: String,
    /// Delivered body, already transformed per the subscription's mode.
    pub(crate) body: Bytes,
    /// Number of successful leases so far.
    pub(crate) receive_count: u32,
    /// Current lease, if any. `None` or expired means visible.
    pub(crate) lease: Option<Lease>,
    /// Wall-clock enqueue timestamp.
    pub(crate) enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    pub(crate) fn new(event_id: String, body: Bytes) -> Self {
        Self {
            event_id,
            body,
            receive_count: 0,
            lease: None,
            enqueued_at: Utc::now(),
        }
    }

    pub(crate) fn is_visible(&self, now: Instant) -> bool {
        match &self.lease {
            Some(lease) => !lease.is_active(now),
            None => true,
        }
    }
}

/// The receive-side view of a leased message.
///
/// Returned by [`DurableQueue::receive`](crate::DurableQueue::receive);
/// holds everything a consumer needs to process and then delete (or
/// abandon) the message.
#[derive(Clone, Debug)]
pub struct LeasedMessage {
    /// Token to present to `delete` after successful processing.
    pub token: LeaseToken,
    /// Id of the originating event.
    pub event_id: String,
    /// Delivered body (bare payload or JSON envelope, per subscription).
    pub body: Bytes,
    /// Receive count after this lease (1 on first delivery).
    pub receive_count: u32,
    /// When the message was enqueued (wall clock).
    pub enqueued_at: DateTime<Utc>,
}

impl LeasedMessage {
    /// True if this message has been delivered before (retry in progress).
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}

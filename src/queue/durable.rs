//! # DurableQueue: lease-based at-least-once message store.
//!
//! Append-only per-subscription store with visibility-timeout semantics:
//!
//! ```text
//! enqueue ──► [visible] ──receive──► [in-flight, leased]
//!                ▲                        │
//!                │ lease expires          ├─ delete(token) ─► gone
//!                └────────────────────────┘ (receive_count += 1 on re-lease)
//! ```
//!
//! ## Rules
//! - A message is visible iff it has no lease or its lease has expired.
//! - `receive` atomically selects visible messages and marks them in-flight
//!   under one lock; two concurrent calls never lease the same message.
//! - `delete` with a stale/expired token is a no-op (idempotent).
//! - Lease expiry is passive: checked at `receive`/`delete` time, no
//!   background sweep.
//! - Delivery order is best-effort, not strict FIFO; duplicates are
//!   possible if a delete races with lease expiry, so consumers must be
//!   idempotent.
//!
//! Long-poll: `receive` blocks up to `wait` when nothing is visible, woken
//! early by `enqueue` or by the earliest in-flight lease expiry.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, Notify};
use tokio::time::{self, Instant};

use crate::error::QueueError;
use crate::queue::message::{Lease, LeaseToken, LeasedMessage, QueueMessage};

/// Lease-based durable queue feeding one consumer population.
///
/// Safe for concurrent `enqueue`/`receive`/`delete` from many callers; the
/// internal mutex over queue state is the only synchronization point, and
/// lease acquisition inside `receive` is the system's sole concurrency
/// control.
pub struct DurableQueue {
    name: String,
    visibility: Duration,
    state: Mutex<VecDeque<QueueMessage>>,
    notify: Notify,
    closed: AtomicBool,
}

impl DurableQueue {
    /// Creates a new queue with the given name and visibility timeout.
    pub fn new(name: impl Into<String>, visibility: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            visibility,
            state: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Queue name (for logs and telemetry).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured visibility timeout applied to every new lease.
    #[must_use]
    pub fn visibility(&self) -> Duration {
        self.visibility
    }

    /// Appends one message.
    ///
    /// Fails only if the queue has been [closed](DurableQueue::close).
    /// Wakes any long-polling receivers.
    pub async fn enqueue(&self, event_id: String, body: Bytes) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Unavailable {
                queue: self.name.clone(),
            });
        }
        let mut state = self.state.lock().await;
        state.push_back(QueueMessage::new(event_id, body));
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }

    /// Leases up to `max` visible messages, long-polling up to `wait`.
    ///
    /// Each returned message gets a fresh lease expiring at
    /// `now + visibility timeout` and its receive count incremented. If
    /// nothing becomes visible within `wait`, returns an empty vec rather
    /// than failing.
    ///
    /// ### Lease exclusivity
    /// Selection and marking happen atomically under the state lock, so a
    /// message with an active lease is never returned to a concurrent
    /// caller until that lease expires.
    pub async fn receive(&self, max: usize, wait: Duration) -> Vec<LeasedMessage> {
        if max == 0 {
            return Vec::new();
        }
        let deadline = Instant::now() + wait;
        loop {
            // Register for wakeups before inspecting state, so an enqueue
            // racing with the check below cannot be missed.
            let notified = self.notify.notified();

            let (batch, next_expiry) = self.lease_visible(max).await;
            if !batch.is_empty() {
                return batch;
            }

            let now = Instant::now();
            if now >= deadline {
                return Vec::new();
            }

            // Wake at the earliest in-flight lease expiry, or the poll
            // deadline, whichever comes first.
            let wake_at = match next_expiry {
                Some(expiry) if expiry < deadline => expiry,
                _ => deadline,
            };
            tokio::select! {
                _ = notified => {}
                _ = time::sleep_until(wake_at) => {}
            }
        }
    }

    /// Deletes the message held by `token` if that lease is still active.
    ///
    /// Returns `true` if a message was removed. A stale or expired token is
    /// a no-op returning `false`: it never touches a redelivered message's
    /// new lease or any other queue state.
    pub async fn delete(&self, token: &LeaseToken) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let pos = state.iter().position(|msg| {
            msg.lease
                .as_ref()
                .is_some_and(|lease| lease.token == *token && lease.is_active(now))
        });
        match pos {
            Some(pos) => {
                let _ = state.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Closes the queue: subsequent `enqueue` calls fail.
    ///
    /// `receive` and `delete` keep working so consumers can drain.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Total number of stored messages (visible + in-flight).
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    /// True if the queue holds no messages at all.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.is_empty()
    }

    /// Number of messages currently in-flight (active lease).
    pub async fn in_flight(&self) -> usize {
        let now = Instant::now();
        let state = self.state.lock().await;
        state.iter().filter(|msg| !msg.is_visible(now)).count()
    }

    /// Atomically leases visible messages; also reports the earliest
    /// expiry among in-flight leases so an empty poll knows when to wake.
    async fn lease_visible(&self, max: usize) -> (Vec<LeasedMessage>, Option<Instant>) {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let mut batch = Vec::new();
        let mut next_expiry: Option<Instant> = None;

        for msg in state.iter_mut() {
            if batch.len() == max {
                break;
            }
            if msg.is_visible(now) {
                msg.receive_count += 1;
                let lease = Lease::new(now + self.visibility);
                batch.push(LeasedMessage {
                    token: lease.token.clone(),
                    event_id: msg.event_id.clone(),
                    body: msg.body.clone(),
                    receive_count: msg.receive_count,
                    enqueued_at: msg.enqueued_at,
                });
                msg.lease = Some(lease);
            } else if let Some(lease) = &msg.lease {
                next_expiry = Some(match next_expiry {
                    Some(e) => e.min(lease.expires_at),
                    None => lease.expires_at,
                });
            }
        }
        (batch, next_expiry)
    }
}

//! Durable queue: append-only, lease-based, at-least-once message store.
//!
//! ## Contents
//! - [`DurableQueue`] — `enqueue` / `receive` / `delete` with long-poll and
//!   passive lease-expiry checks
//! - [`LeasedMessage`], [`LeaseToken`] — the receive-side view of a message
//!
//! One queue feeds one consumer population; fan-out is achieved by giving
//! each subscription its own queue, never by sharing one.

mod durable;
mod message;

pub use durable::DurableQueue;
pub use message::{LeaseToken, LeasedMessage};

//! # Core telemetry subscriber trait.
//!
//! `Subscribe` is the extension point for plugging custom telemetry sinks
//! into the pipeline. Each subscriber is driven by a dedicated worker loop
//! fed by a bounded queue owned by the
//! [`SubscriberSet`](crate::telemetry::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) — they do **not** block
//!   the publisher nor other subscribers.
//! - Each subscriber declares its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, events for that
//!   subscriber are **dropped** (warn).

use async_trait::async_trait;

use super::event::PipelineEvent;

/// Contract for telemetry subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative
/// waits).
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single telemetry event for this subscriber.
    async fn on_event(&self, event: &PipelineEvent);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// On overflow, events for this subscriber are dropped (warn).
    fn queue_capacity(&self) -> usize {
        1024
    }
}

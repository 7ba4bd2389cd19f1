//! Pipeline telemetry: observability events, broadcast bus, subscribers.
//!
//! This module groups the telemetry **data model** and the **bus** used to
//! publish/subscribe to events emitted by the topic router and the consumer
//! dispatchers.
//!
//! ## Contents
//! - [`PipelineEventKind`], [`PipelineEvent`] — event classification and
//!   payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//! - [`Subscribe`], [`SubscriberSet`] — pluggable sinks with per-subscriber
//!   bounded queues and worker tasks
//! - [`LogSubscriber`] — stdout sink for demos and debugging
//!
//! ## Quick reference
//! - **Publishers**: `Topic` (published/delivered/unmatched/delivery
//!   failures), `Dispatcher` (leased/redelivered/deleted/handler failures).
//! - **Consumers**: anything attached via [`SubscriberSet`], typically a
//!   [`LogSubscriber`] plus user-defined sinks (metrics, audit).

mod bus;
mod event;
mod log;
mod set;
mod subscribe;

pub use bus::Bus;
pub use event::{PipelineEvent, PipelineEventKind};
pub use log::LogSubscriber;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;

//! # bigfan
//!
//! **bigfan** is a lightweight in-process publish/fan-out/consume pipeline
//! for Rust: one ingress topic, attribute-filtered fan-out to independent
//! durable queues, and lease-based at-least-once consumption with automatic
//! retry.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                       publish(payload, attributes)
//!                                  │
//!                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Topic (router)                                                   │
//! │  - evaluates every Subscription's FilterPolicy (pure, AND-combined)│
//! │  - delivers an independent copy per match (raw or enveloped)      │
//! │  - per-subscription failures isolated, reported on the Bus        │
//! └──────┬──────────────────────────┬─────────────────────────────────┘
//!        ▼                          ▼
//! ┌──────────────┐           ┌──────────────┐
//! │ DurableQueue │           │ DurableQueue │    (one per subscription)
//! │ lease-based  │           │ lease-based  │
//! │ at-least-once│           │ at-least-once│
//! └──────┬───────┘           └──────┬───────┘
//!        ▼ receive/delete           ▼
//! ┌──────────────┐           ┌──────────────┐
//! │  Dispatcher  │           │  Dispatcher  │
//! │ (poll loop,  │           │ (poll loop,  │
//! │  conc. cap)  │           │  conc. cap)  │
//! └──────┬───────┘           └──────┬───────┘
//!        ▼                          ▼
//!    Handler::handle            Handler::handle
//!    Ok  → delete               Err/panic → abandon,
//!                               redelivered after lease expiry
//!
//! Telemetry: Topic + Dispatchers ──► Bus (broadcast) ──► SubscriberSet
//!                                                         └─► LogSubscriber, ...
//! ```
//!
//! ### Delivery guarantees
//! - **At-least-once**: a message is deleted only after its handler
//!   succeeds; failures and panics lead to redelivery once the lease's
//!   visibility timeout expires. Duplicates are possible (delete racing a
//!   lease expiry), so handlers must be idempotent.
//! - **Lease exclusivity**: receive atomically leases visible messages, so
//!   two concurrent receivers never hold the same message at once.
//! - **Fan-out isolation**: N matching subscriptions get N independent
//!   copies with independent lease lifecycles; one queue's failure never
//!   affects another, nor the publish call.
//! - **No ordering guarantee**: delivery order is best-effort, not FIFO.
//!
//! ### Known gaps (deliberate)
//! - No dead-letter destination and no receive-count ceiling: a message
//!   whose handler always fails is redelivered indefinitely. Production
//!   systems should add a maximum receive count with a dead-letter sink.
//! - Events matching zero subscriptions are dropped (with an
//!   `EventUnmatched` telemetry event as the only trace).
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Publishing**    | Ingress topic with attribute-filtered fan-out.               | [`Topic`], [`Subscription`], [`FilterPolicy`]|
//! | **Queues**        | Lease-based at-least-once stores with long-poll receive.     | [`DurableQueue`], [`LeasedMessage`]         |
//! | **Consumption**   | Poll loops invoking handlers with a concurrency ceiling.     | [`Dispatcher`], [`Handler`], [`HandlerFn`]  |
//! | **Telemetry**     | Broadcast bus with pluggable subscribers.                    | [`Bus`], [`Subscribe`], [`LogSubscriber`]   |
//! | **Errors**        | Typed errors per pipeline stage.                             | [`PublishError`], [`HandlerError`]          |
//! | **Configuration** | Centralized knobs (visibility, batch, concurrency).          | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bytes::Bytes;
//! use tokio_util::sync::CancellationToken;
//! use bigfan::{
//!     attributes, Bus, Config, Delivery, DeliveryMode, Dispatcher, DurableQueue,
//!     FilterPolicy, HandlerError, HandlerFn, Subscription, Topic,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let bus = Bus::new(cfg.bus_capacity);
//!
//!     // Topology is built once, up front: queue + subscription + topic.
//!     let created_queue = DurableQueue::new("created-queue", cfg.visibility_timeout);
//!     let topic = Topic::new(
//!         "orders",
//!         vec![Subscription::new(
//!             "created-sub",
//!             created_queue.clone(),
//!             FilterPolicy::new().allow("status", ["created"]),
//!             DeliveryMode::Raw,
//!         )],
//!         bus.clone(),
//!     );
//!
//!     // One dispatcher drives one handler from the queue.
//!     let handler = HandlerFn::arc("printer", |d: Delivery| async move {
//!         println!("got {} bytes", d.body.len());
//!         Ok::<_, HandlerError>(())
//!     });
//!     let ctx = CancellationToken::new();
//!     let worker = Dispatcher::new(created_queue.clone(), handler, &cfg, bus.clone())
//!         .spawn(ctx.clone());
//!
//!     topic
//!         .publish(Bytes::from_static(b"order#1"), attributes([("status", "created")]))
//!         .await?;
//!
//!     // ... let the dispatcher drain, then shut down.
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     ctx.cancel();
//!     worker.await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod filter;
pub mod queue;
pub mod telemetry;
pub mod topic;

pub use config::Config;
pub use dispatch::{Delivery, Dispatcher, Handler, HandlerFn, HandlerRef};
pub use error::{DeliveryError, HandlerError, PublishError, QueueError};
pub use event::{attributes, Attributes, DeliveryMode, Envelope, Event};
pub use filter::{Condition, FilterPolicy};
pub use queue::{DurableQueue, LeaseToken, LeasedMessage};
pub use telemetry::{Bus, LogSubscriber, PipelineEvent, PipelineEventKind, Subscribe, SubscriberSet};
pub use topic::{Subscription, Topic};

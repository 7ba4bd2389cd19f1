//! Topic router: the ingress point that fans events out to queues.
//!
//! ## Contents
//! - [`Subscription`] — interest registration: filter policy, delivery
//!   mode, target queue
//! - [`Topic`] — accepts publishes and delivers independent copies to every
//!   matching subscription's queue
//!
//! Topology is explicit composition: subscriptions are constructed once at
//! process start and handed to [`Topic::new`]; nothing mutates the graph at
//! runtime and there is no global registry.

mod router;
mod subscription;

pub use router::Topic;
pub use subscription::Subscription;

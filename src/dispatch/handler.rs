//! # Worker contract and function-backed handler.
//!
//! This module defines the [`Handler`] trait (async, fallible) and a
//! convenient function-backed implementation [`HandlerFn`]. The common
//! handle type is [`HandlerRef`], an `Arc<dyn Handler>` suitable for
//! sharing across dispatcher invocations.
//!
//! ## Contract
//! - `handle` returns `Ok(())` for success; the dispatcher then deletes the
//!   message.
//! - `Err(HandlerError)` or a panic counts as failure; the message is
//!   abandoned and redelivered after its lease expires.
//! - Processing must be **idempotent**: at-least-once delivery means a
//!   handler can see the same message again (receive count > 1), including
//!   after a success that raced with lease expiry.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::HandlerError;

/// What a handler receives for one leased message.
///
/// The body is already transformed per the subscription's delivery mode:
/// bare payload bytes for raw, a JSON envelope for enveloped (parse with
/// [`Envelope::from_bytes`](crate::Envelope::from_bytes)).
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Delivered body bytes.
    pub body: Bytes,
    /// Receive count for this lease (1 on first delivery).
    pub receive_count: u32,
}

impl Delivery {
    /// True if this message has been delivered before (retry in progress).
    #[must_use]
    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}

/// Shared handle to a worker handler.
pub type HandlerRef = Arc<dyn Handler>;

/// # Asynchronous, fallible worker unit.
///
/// A `Handler` has a stable [`name`](Handler::name) and an async
/// [`handle`](Handler::handle) method invoked once per leased message.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use bigfan::{Delivery, Handler, HandlerError};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Handler for Demo {
///     fn name(&self) -> &str { "demo" }
///
///     async fn handle(&self, delivery: Delivery) -> Result<(), HandlerError> {
///         if delivery.body.is_empty() {
///             return Err(HandlerError::fail("empty body"));
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Returns a stable, human-readable handler name.
    fn name(&self) -> &str;

    /// Processes one delivered message.
    ///
    /// Must be idempotent: redelivery of an already-processed message is a
    /// normal at-least-once occurrence, not a bug in the queue.
    async fn handle(&self, delivery: Delivery) -> Result<(), HandlerError>;
}

/// Function-backed handler implementation.
///
/// Wraps a closure that *creates* a new future per invocation, avoiding
/// shared mutable state. If shared state is needed, move an `Arc<...>` into
/// the closure explicitly.
///
/// ## Example
/// ```
/// use bigfan::{Delivery, HandlerError, HandlerFn, HandlerRef};
///
/// let h: HandlerRef = HandlerFn::arc("acker", |_delivery: Delivery| async move {
///     Ok::<_, HandlerError>(())
/// });
/// assert_eq!(h.name(), "acker");
/// ```
#[derive(Debug)]
pub struct HandlerFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> HandlerFn<F> {
    /// Creates a new function-backed handler.
    ///
    /// Prefer [`HandlerFn::arc`] when you immediately need a [`HandlerRef`].
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the handler and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(Delivery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Delivery) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, delivery: Delivery) -> Result<(), HandlerError> {
        (self.f)(delivery).await
    }
}

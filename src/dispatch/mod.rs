//! Consumer dispatch: poll loops driving worker handlers from queue state.
//!
//! ## Contents
//! - [`Handler`], [`HandlerFn`], [`HandlerRef`] — the worker contract and a
//!   function-backed implementation
//! - [`Delivery`] — what a handler receives per message
//! - [`Dispatcher`] — the poll/invoke/settle loop with a concurrency
//!   ceiling
//!
//! Retry is implicit: a failed (or panicked) handler leaves its message
//! un-deleted, and the queue's lease expiry redelivers it.

mod dispatcher;
mod handler;

pub use dispatcher::Dispatcher;
pub use handler::{Delivery, Handler, HandlerFn, HandlerRef};

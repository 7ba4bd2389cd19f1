//! Attribute filtering: the pure predicate that decides fan-out targets.
//!
//! ## Contents
//! - [`FilterPolicy`] — per-attribute conditions combined with AND
//! - [`Condition`] — allow-set or deny-set of string values
//!
//! Evaluation is a pure function of (attribute map, policy): no side
//! effects, deterministic across repeated calls.

mod policy;

pub use policy::{Condition, FilterPolicy};

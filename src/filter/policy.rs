//! # Filter policy: per-attribute allow/deny conditions.
//!
//! A [`FilterPolicy`] maps attribute names to exactly one [`Condition`]
//! each — an allow-set or a deny-set of string values, never both for the
//! same attribute (last insert wins, keeping exclusivity by construction).
//! All conditions combine with logical AND; a policy with zero conditions
//! matches every event.
//!
//! ## Rules
//! - **Allow-set**: matches iff the attribute is present AND its value is
//!   in the set.
//! - **Deny-set**: matches iff the attribute is present AND its value is
//!   NOT in the set.
//! - **Absent attribute**: never satisfies any condition, allow or deny.
//!   An event without the attribute matches neither an allow-list nor a
//!   deny-list subscription on that attribute.
//!
//! ## Example
//! ```
//! use bigfan::{attributes, FilterPolicy};
//!
//! let created = FilterPolicy::new().allow("status", ["created"]);
//! let any_other = FilterPolicy::new().deny("status", ["created"]);
//!
//! assert!(created.matches(&attributes([("status", "created")])));
//! assert!(any_other.matches(&attributes([("status", "shipped")])));
//!
//! // Absent attribute matches neither.
//! assert!(!created.matches(&attributes([("region", "eu")])));
//! assert!(!any_other.matches(&attributes([("region", "eu")])));
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::event::Attributes;

/// A single per-attribute condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Attribute must be present with a value in this set.
    Allow(HashSet<String>),
    /// Attribute must be present with a value NOT in this set.
    Deny(HashSet<String>),
}

impl Condition {
    /// Evaluates this condition against an attribute's value, if present.
    ///
    /// `None` (absent attribute) never satisfies a condition.
    fn satisfied_by(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (_, None) => false,
            (Condition::Allow(set), Some(v)) => set.contains(v),
            (Condition::Deny(set), Some(v)) => !set.contains(v),
        }
    }
}

/// Per-subscription filter policy: attribute name → one condition.
///
/// Immutable during normal operation; built once at configuration time via
/// the [`FilterPolicy::allow`] / [`FilterPolicy::deny`] builder methods.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterPolicy {
    conditions: BTreeMap<String, Condition>,
}

impl FilterPolicy {
    /// Creates an empty policy (matches every event).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an allow-set condition for `attribute`.
    ///
    /// Replaces any previous condition on the same attribute, so a policy
    /// never holds both an allow-set and a deny-set for one attribute.
    #[must_use]
    pub fn allow<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = values.into_iter().map(Into::into).collect();
        self.conditions
            .insert(attribute.into(), Condition::Allow(set));
        self
    }

    /// Adds a deny-set condition for `attribute`.
    ///
    /// Replaces any previous condition on the same attribute.
    #[must_use]
    pub fn deny<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = values.into_iter().map(Into::into).collect();
        self.conditions
            .insert(attribute.into(), Condition::Deny(set));
        self
    }

    /// Evaluates the policy against an event's attribute map.
    ///
    /// Pure and deterministic: depends only on the inputs. All conditions
    /// must be satisfied (AND); an empty policy matches everything.
    #[must_use]
    pub fn matches(&self, attributes: &Attributes) -> bool {
        self.conditions
            .iter()
            .all(|(name, cond)| cond.satisfied_by(attributes.get(name).map(String::as_str)))
    }

    /// Number of attribute conditions in this policy.
    #[must_use]
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// True if the policy has no conditions (matches everything).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{attributes, Attributes};

    #[test]
    fn test_empty_policy_matches_everything() {
        let policy = FilterPolicy::new();
        assert!(policy.matches(&Attributes::new()));
        assert!(policy.matches(&attributes([("status", "created")])));
    }

    #[test]
    fn test_allow_requires_membership() {
        let policy = FilterPolicy::new().allow("status", ["created"]);
        assert!(policy.matches(&attributes([("status", "created")])));
        assert!(!policy.matches(&attributes([("status", "shipped")])));
    }

    #[test]
    fn test_deny_requires_present_and_not_member() {
        let policy = FilterPolicy::new().deny("status", ["created"]);
        assert!(!policy.matches(&attributes([("status", "created")])));
        assert!(policy.matches(&attributes([("status", "shipped")])));
        assert!(policy.matches(&attributes([("status", "cancelled")])));
    }

    #[test]
    fn test_absent_attribute_matches_no_condition() {
        // Pinned interpretation: an absent attribute never satisfies a
        // condition, for allow-sets and deny-sets alike.
        let allow = FilterPolicy::new().allow("status", ["created"]);
        let deny = FilterPolicy::new().deny("status", ["created"]);
        let no_status = attributes([("region", "eu")]);
        assert!(!allow.matches(&no_status));
        assert!(!deny.matches(&no_status));
    }

    #[test]
    fn test_multiple_conditions_combine_with_and() {
        let policy = FilterPolicy::new()
            .allow("status", ["created"])
            .deny("region", ["cn"]);

        assert!(policy.matches(&attributes([("status", "created"), ("region", "eu")])));
        assert!(!policy.matches(&attributes([("status", "created"), ("region", "cn")])));
        assert!(!policy.matches(&attributes([("status", "shipped"), ("region", "eu")])));
        // Missing "region" fails the deny condition too.
        assert!(!policy.matches(&attributes([("status", "created")])));
    }

    #[test]
    fn test_last_condition_per_attribute_wins() {
        let policy = FilterPolicy::new()
            .allow("status", ["created"])
            .deny("status", ["created"]);
        assert_eq!(policy.len(), 1);
        assert!(policy.matches(&attributes([("status", "shipped")])));
        assert!(!policy.matches(&attributes([("status", "created")])));
    }

    #[test]
    fn test_allow_with_multiple_values() {
        let policy = FilterPolicy::new().allow("status", ["created", "confirmed"]);
        assert!(policy.matches(&attributes([("status", "created")])));
        assert!(policy.matches(&attributes([("status", "confirmed")])));
        assert!(!policy.matches(&attributes([("status", "shipped")])));
    }

    #[test]
    fn test_evaluation_is_stable() {
        let policy = FilterPolicy::new().allow("status", ["created"]);
        let attrs = attributes([("status", "created")]);
        for _ in 0..100 {
            assert!(policy.matches(&attrs));
        }
    }
}

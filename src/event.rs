//! # Published events and delivery transformations.
//!
//! An [`Event`] is created by the topic at publish time: a generated id, an
//! opaque payload, a flat string attribute map, and a publish timestamp. It
//! is immutable once created; fan-out copies it into each matching queue
//! after applying the subscription's [`DeliveryMode`]:
//!
//! - [`DeliveryMode::Raw`] — the bare payload bytes, metadata stripped.
//! - [`DeliveryMode::Enveloped`] — a JSON [`Envelope`] carrying payload,
//!   id, attributes, and timestamp.
//!
//! ## Envelope wire format
//! ```json
//! { "MessageId": "...", "Timestamp": "...", "Attributes": {...}, "Payload": [...] }
//! ```
//! `Timestamp` is RFC 3339 / ISO 8601.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat attribute map attached to an event (string key → string value).
pub type Attributes = BTreeMap<String, String>;

/// How a subscription's queue receives an event's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Deliver only the payload bytes; event metadata is stripped.
    Raw,
    /// Deliver the full JSON [`Envelope`] (payload + id + attributes + timestamp).
    Enveloped,
}

/// An immutable published event, owned by the topic until fanned out.
#[derive(Clone, Debug)]
pub struct Event {
    /// Unique identifier, generated at publish time.
    pub id: String,
    /// Opaque payload bytes.
    pub payload: Bytes,
    /// Flat string attribute map used for filter evaluation.
    pub attributes: Attributes,
    /// Wall-clock publish timestamp.
    pub published_at: DateTime<Utc>,
}

impl Event {
    /// Creates a new event with a fresh v4 UUID id and the current timestamp.
    pub fn new(payload: Bytes, attributes: Attributes) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload,
            attributes,
            published_at: Utc::now(),
        }
    }

    /// Renders the event body for one subscription's delivery mode.
    ///
    /// `Raw` returns the payload unchanged (cheap clone of `Bytes`);
    /// `Enveloped` serializes the full [`Envelope`] to JSON.
    pub fn body_for(&self, mode: DeliveryMode) -> Bytes {
        match mode {
            DeliveryMode::Raw => self.payload.clone(),
            DeliveryMode::Enveloped => Envelope::from_event(self).to_bytes(),
        }
    }
}

/// JSON wire format for enveloped delivery.
///
/// Field names follow the external contract exactly (`MessageId`,
/// `Timestamp`, `Attributes`, `Payload`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Id of the originating event.
    #[serde(rename = "MessageId")]
    pub message_id: String,
    /// Publish timestamp (RFC 3339 / ISO 8601).
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    /// The event's attribute map.
    #[serde(rename = "Attributes")]
    pub attributes: Attributes,
    /// The original payload bytes.
    #[serde(rename = "Payload")]
    pub payload: Bytes,
}

impl Envelope {
    /// Builds an envelope for the given event.
    pub fn from_event(event: &Event) -> Self {
        Self {
            message_id: event.id.clone(),
            timestamp: event.published_at,
            attributes: event.attributes.clone(),
            payload: event.payload.clone(),
        }
    }

    /// Serializes the envelope to JSON bytes.
    ///
    /// Envelope fields are all JSON-representable, so serialization cannot
    /// fail; an empty body would indicate a serde_json regression.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(serde_json::to_vec(self).unwrap_or_default())
    }

    /// Parses an envelope from a delivered body.
    ///
    /// Returns `None` if the body is not a valid envelope (e.g. the
    /// subscription used raw delivery).
    pub fn from_bytes(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}

/// Convenience builder for attribute maps.
///
/// # Example
/// ```
/// use bigfan::attributes;
///
/// let attrs = attributes([("status", "created"), ("region", "eu")]);
/// assert_eq!(attrs.get("status").map(String::as_str), Some("created"));
/// ```
pub fn attributes<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Attributes
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

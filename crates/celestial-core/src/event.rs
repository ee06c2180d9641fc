//! Event data model for the CelestialTree ledger.
//!
//! An [`Event`] is the smallest unit of history: an immutable record with a
//! store-assigned id, a capture timestamp, a type tag, opaque content, and
//! the ids of the earlier events it descends from.
//!
//! # Wire format
//!
//! Events serialize to JSON in the shape the HTTP transport exposes:
//!
//! ```text
//! {"id":3,"time_unix_nano":1700000000000000000,"type":"step","parents":[1,2],
//!  "message":"optional text","payload":"<base64>"}
//! ```
//!
//! `message` and `payload` are omitted when empty.

use std::collections::HashSet;
use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier assigned by the ledger. Never zero for a stored event.
pub type EventId = u64;

/// Opaque event content. The store never inspects it.
///
/// Serialized as a standard base64 string so arbitrary bytes survive JSON.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Payload(Vec<u8>);

impl Payload {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// A single immutable event in the DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Ledger-assigned id, strictly increasing in append order.
    pub id: EventId,

    /// Capture time in nanoseconds since the Unix epoch.
    ///
    /// Non-decreasing with `id`; two events may share a timestamp.
    #[serde(rename = "time_unix_nano")]
    pub created_at: i64,

    /// Classification tag. Never blank.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Normalized parent ids: no zeros, no duplicates, first-seen order.
    pub parents: Vec<EventId>,

    /// Free-form text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Opaque content.
    #[serde(default, skip_serializing_if = "Payload::is_empty")]
    pub payload: Payload,
}

impl Event {
    /// Returns `true` if this event has no parents.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Input to [`crate::Store::emit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewEvent {
    /// Missing is accepted here and rejected by validation as blank.
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default)]
    pub parents: Vec<EventId>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub payload: Payload,
}

impl NewEvent {
    /// Start a request for an event of the given type with no parents.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_parents(mut self, parents: impl IntoIterator<Item = EventId>) -> Self {
        self.parents = parents.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }
}

/// Drop zero ids and repeats, keeping the first occurrence of each id.
pub(crate) fn normalize_parents(parents: &[EventId]) -> Vec<EventId> {
    let mut seen = HashSet::with_capacity(parents.len());
    parents
        .iter()
        .copied()
        .filter(|&parent| parent != 0 && seen.insert(parent))
        .collect()
}

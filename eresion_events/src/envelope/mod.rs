//! Raw event envelope as published by the game-logic collaborator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for a published event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a nil/empty event ID.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Context markers an event may carry. Each one selects a fusion multiplier
/// in the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextMarker {
    Environmental,
    Biometric,
    Social,
}

impl ContextMarker {
    pub const ALL: [ContextMarker; 3] = [
        ContextMarker::Environmental,
        ContextMarker::Biometric,
        ContextMarker::Social,
    ];

    /// The payload key whose presence signals this context.
    pub fn key(&self) -> &'static str {
        match self {
            ContextMarker::Environmental => "environmental_context",
            ContextMarker::Biometric => "biometric_data",
            ContextMarker::Social => "social_context",
        }
    }
}

/// An event exactly as it crosses the boundary: an open type string and an
/// untyped payload. Use [`crate::GameEvent::try_from`] to get the typed form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: EventId,

    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub data: Map<String, Value>,

    #[serde(default)]
    pub source: String,

    /// Milliseconds on the game's own clock.
    pub timestamp_ms: u64,
}

impl RawEvent {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<String>, source: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            id: EventId::new(),
            event_type: event_type.into(),
            data: Map::new(),
            source: source.into(),
            timestamp_ms,
        }
    }

    /// Set a payload field.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attach a context marker with the given descriptive value.
    pub fn with_context(mut self, marker: ContextMarker, value: impl Into<Value>) -> Self {
        self.data.insert(marker.key().to_string(), value.into());
        self
    }

    /// Check whether the payload carries a context marker.
    pub fn has_context(&self, marker: ContextMarker) -> bool {
        self.data.contains_key(marker.key())
    }

    /// All context markers present, in [`ContextMarker::ALL`] order.
    pub fn context_markers(&self) -> Vec<ContextMarker> {
        ContextMarker::ALL
            .into_iter()
            .filter(|m| self.has_context(*m))
            .collect()
    }

    /// Timestamp in seconds.
    pub fn timestamp_s(&self) -> f64 {
        self.timestamp_ms as f64 / 1000.0
    }
}

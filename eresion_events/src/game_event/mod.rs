//! Typed game events. Every inbound event class has a fixed payload schema,
//! so a misspelled key can never produce unreachable metadata.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::envelope::RawEvent;
use crate::mechanics::{MovementType, SocialOutcome};

/// Reasons a raw event cannot be turned into a [`GameEvent`].
#[derive(Debug, Error)]
pub enum EventError {
    #[error("unknown event type '{0}'")]
    UnknownEventType(String),

    #[error("malformed payload for '{event_type}': {reason}")]
    MalformedPayload { event_type: String, reason: String },
}

fn default_interaction() -> String {
    "talk".to_string()
}

fn default_defensive_action() -> String {
    "defend".to_string()
}

fn default_observation_action() -> String {
    "look".to_string()
}

fn default_recursion_depth() -> u32 {
    1
}

/// All event classes the pipeline understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GameEvent {
    /// The command parser recognised a player command.
    CommandParsed {
        verb: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        raw_input: String,
    },

    DamageDealt {
        #[serde(default)]
        amount: f64,
        #[serde(default)]
        is_critical: bool,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        weapon: Option<String>,
    },

    DamageTaken {
        #[serde(default)]
        amount: f64,
        #[serde(default)]
        attacker: Option<String>,
    },

    PlayerMoved {
        #[serde(default)]
        movement_type: MovementType,
        #[serde(default)]
        new_location: Option<String>,
        #[serde(default)]
        previous_location: Option<String>,
    },

    SocialInteraction {
        #[serde(default)]
        outcome: SocialOutcome,
        #[serde(default = "default_interaction")]
        interaction_type: String,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        relationship_change: f64,
    },

    DefensiveAction {
        #[serde(default = "default_defensive_action")]
        action_type: String,
        #[serde(default)]
        health_recovered: f64,
        #[serde(default)]
        stamina_recovered: f64,
    },

    ObservationAction {
        #[serde(default = "default_observation_action")]
        action_type: String,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        information_gained: Vec<String>,
    },

    ActionFailed {
        verb: String,
        #[serde(default)]
        failure_reason: String,
        #[serde(default)]
        raw_input: String,
    },

    /// A previously crystallized ability was used.
    AbilityUsed {
        #[serde(default)]
        ability_id: String,
        #[serde(default)]
        ability_name: String,
        #[serde(default)]
        success: bool,
        #[serde(default)]
        effect_strength: f64,
        #[serde(default = "default_recursion_depth")]
        recursion_depth: u32,
        #[serde(default)]
        source_motif_id: Option<String>,
    },

    /// A snapshot of state changes; may describe several at once.
    GameStateChanged {
        #[serde(default)]
        combat_started: bool,
        #[serde(default)]
        combat_ended: bool,
        #[serde(default)]
        location_changed: Option<String>,
        /// Current health / max health.
        #[serde(default)]
        health_ratio: Option<f64>,
        /// Social tension from 0.0 to 1.0.
        #[serde(default)]
        social_tension: Option<f64>,
    },

    /// Normalised biometric readings (0.0 - 1.0).
    BiometricSample {
        #[serde(default)]
        arousal: Option<f64>,
        #[serde(default)]
        focus: Option<f64>,
    },
}

impl GameEvent {
    /// Type strings of every known event class.
    pub const EVENT_TYPES: [&'static str; 11] = [
        "CommandParsed",
        "DamageDealt",
        "DamageTaken",
        "PlayerMoved",
        "SocialInteraction",
        "DefensiveAction",
        "ObservationAction",
        "ActionFailed",
        "AbilityUsed",
        "GameStateChanged",
        "BiometricSample",
    ];

    /// Check whether a type string names a known event class.
    pub fn is_known_type(event_type: &str) -> bool {
        Self::EVENT_TYPES.contains(&event_type)
    }

    /// The wire type string of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::CommandParsed { .. } => "CommandParsed",
            GameEvent::DamageDealt { .. } => "DamageDealt",
            GameEvent::DamageTaken { .. } => "DamageTaken",
            GameEvent::PlayerMoved { .. } => "PlayerMoved",
            GameEvent::SocialInteraction { .. } => "SocialInteraction",
            GameEvent::DefensiveAction { .. } => "DefensiveAction",
            GameEvent::ObservationAction { .. } => "ObservationAction",
            GameEvent::ActionFailed { .. } => "ActionFailed",
            GameEvent::AbilityUsed { .. } => "AbilityUsed",
            GameEvent::GameStateChanged { .. } => "GameStateChanged",
            GameEvent::BiometricSample { .. } => "BiometricSample",
        }
    }

    /// Wrap this event in a raw envelope.
    pub fn into_raw(self, source: impl Into<String>, timestamp_ms: u64) -> RawEvent {
        let mut raw = RawEvent::new(self.event_type(), source, timestamp_ms);
        if let Ok(Value::Object(mut wire)) = serde_json::to_value(&self) {
            if let Some(Value::Object(data)) = wire.remove("data") {
                raw.data = data;
            }
        }
        raw
    }
}

impl TryFrom<&RawEvent> for GameEvent {
    type Error = EventError;

    fn try_from(raw: &RawEvent) -> Result<Self, Self::Error> {
        if !GameEvent::is_known_type(&raw.event_type) {
            return Err(EventError::UnknownEventType(raw.event_type.clone()));
        }

        let wire = json!({
            "type": raw.event_type,
            "data": Value::Object(raw.data.clone()),
        });

        serde_json::from_value(wire).map_err(|e| EventError::MalformedPayload {
            event_type: raw.event_type.clone(),
            reason: e.to_string(),
        })
    }
}

//! Closed vocabularies used inside event payloads: action kinds, movement
//! types, and social outcomes.

use serde::{Deserialize, Serialize};

/// The player intent behind a parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Attack,
    Defend,
    Move,
    Rest,
    Observe,
    Interact,
    UseAbility,
}

impl ActionKind {
    /// Map a command verb to an action kind. Unrecognized verbs are treated
    /// as interactions.
    pub fn from_verb(verb: &str) -> Self {
        match verb.trim().to_ascii_lowercase().as_str() {
            "attack" | "fight" | "strike" | "hit" => ActionKind::Attack,
            "defend" | "dodge" | "block" => ActionKind::Defend,
            "move" | "go" | "travel" | "dash" => ActionKind::Move,
            "rest" | "heal" | "recover" => ActionKind::Rest,
            "look" | "examine" | "search" => ActionKind::Observe,
            "use" | "cast" | "activate" => ActionKind::UseAbility,
            _ => ActionKind::Interact,
        }
    }

    /// Map the verb of a failed command. Only attacks, movement and social
    /// actions have distinct failure classes.
    pub fn failure_class(verb: &str) -> Self {
        match ActionKind::from_verb(verb) {
            ActionKind::Attack => ActionKind::Attack,
            ActionKind::Move => ActionKind::Move,
            _ => ActionKind::Interact,
        }
    }
}

/// How the player moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum MovementType {
    Walk,
    #[default]
    Move,
    Run,
    Dash,
}

impl MovementType {
    /// Intensity contribution of this movement style.
    pub fn intensity_bonus(&self) -> f64 {
        match self {
            MovementType::Dash => 0.8,
            MovementType::Run => 0.7,
            MovementType::Move => 0.5,
            MovementType::Walk => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Walk => "walk",
            MovementType::Move => "move",
            MovementType::Run => "run",
            MovementType::Dash => "dash",
        }
    }
}

impl From<String> for MovementType {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "walk" => MovementType::Walk,
            "run" => MovementType::Run,
            "dash" => MovementType::Dash,
            _ => MovementType::Move,
        }
    }
}

impl From<MovementType> for String {
    fn from(value: MovementType) -> Self {
        value.as_str().to_string()
    }
}

/// Result of a social interaction as reported by the dialogue system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum SocialOutcome {
    Success,
    Improved,
    #[default]
    Neutral,
    Failure,
    Worsened,
}

impl SocialOutcome {
    /// Whether the interaction went badly.
    pub fn is_failure(&self) -> bool {
        matches!(self, SocialOutcome::Failure | SocialOutcome::Worsened)
    }

    /// Intensity adjustment for this outcome.
    pub fn intensity_bonus(&self) -> f64 {
        match self {
            SocialOutcome::Success | SocialOutcome::Improved => 0.3,
            SocialOutcome::Failure | SocialOutcome::Worsened => -0.2,
            SocialOutcome::Neutral => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialOutcome::Success => "success",
            SocialOutcome::Improved => "improved",
            SocialOutcome::Neutral => "neutral",
            SocialOutcome::Failure => "failure",
            SocialOutcome::Worsened => "worsened",
        }
    }
}

impl From<String> for SocialOutcome {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "success" => SocialOutcome::Success,
            "improved" => SocialOutcome::Improved,
            "failure" => SocialOutcome::Failure,
            "worsened" => SocialOutcome::Worsened,
            _ => SocialOutcome::Neutral,
        }
    }
}

impl From<SocialOutcome> for String {
    fn from(value: SocialOutcome) -> Self {
        value.as_str().to_string()
    }
}

//! Token definitions - the closed vocabulary and typed metadata.

use eresion_events::{ContextMarker, MovementType, SocialOutcome};
use serde::{Deserialize, Serialize};

/// Vocabulary categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenCategory {
    Action,
    Outcome,
    Failure,
    Context,
    Pattern,
    Biometric,
}

/// The finite token vocabulary. Anything outside this set is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    // Player intent
    ActionAttack,
    ActionDefend,
    ActionMove,
    ActionRest,
    ActionObserve,
    ActionInteract,
    ActionUseAbility,

    // Results
    OutcomeDamageDealt,
    OutcomeDamageTaken,
    OutcomeMovementSuccess,
    OutcomeSocialSuccess,
    OutcomeSocialFailure,
    OutcomeDiscovery,
    OutcomeRecovery,
    OutcomeAbilityTriggered,

    // Failed intent
    FailureActionAttack,
    FailureActionMove,
    FailureActionInteract,

    // Environmental state
    ContextLocationChange,
    ContextCombatStart,
    ContextCombatEnd,
    ContextResourceLow,
    ContextResourceHigh,
    ContextSocialTension,

    // Behavior runs
    PatternAggressiveSequence,
    PatternCautiousSequence,
    PatternExplorationSequence,
    PatternSocialSequence,
    PatternRecoverySequence,
    PatternTacticalAdaptation,

    // Biometric readings
    BiometricArousalHigh,
    BiometricArousalLow,
    BiometricFocusHigh,
    BiometricFocusLow,
}

impl TokenType {
    pub const ALL: [TokenType; 34] = [
        TokenType::ActionAttack,
        TokenType::ActionDefend,
        TokenType::ActionMove,
        TokenType::ActionRest,
        TokenType::ActionObserve,
        TokenType::ActionInteract,
        TokenType::ActionUseAbility,
        TokenType::OutcomeDamageDealt,
        TokenType::OutcomeDamageTaken,
        TokenType::OutcomeMovementSuccess,
        TokenType::OutcomeSocialSuccess,
        TokenType::OutcomeSocialFailure,
        TokenType::OutcomeDiscovery,
        TokenType::OutcomeRecovery,
        TokenType::OutcomeAbilityTriggered,
        TokenType::FailureActionAttack,
        TokenType::FailureActionMove,
        TokenType::FailureActionInteract,
        TokenType::ContextLocationChange,
        TokenType::ContextCombatStart,
        TokenType::ContextCombatEnd,
        TokenType::ContextResourceLow,
        TokenType::ContextResourceHigh,
        TokenType::ContextSocialTension,
        TokenType::PatternAggressiveSequence,
        TokenType::PatternCautiousSequence,
        TokenType::PatternExplorationSequence,
        TokenType::PatternSocialSequence,
        TokenType::PatternRecoverySequence,
        TokenType::PatternTacticalAdaptation,
        TokenType::BiometricArousalHigh,
        TokenType::BiometricArousalLow,
        TokenType::BiometricFocusHigh,
        TokenType::BiometricFocusLow,
    ];

    /// The wire name, e.g. `ACTION_ATTACK`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::ActionAttack => "ACTION_ATTACK",
            TokenType::ActionDefend => "ACTION_DEFEND",
            TokenType::ActionMove => "ACTION_MOVE",
            TokenType::ActionRest => "ACTION_REST",
            TokenType::ActionObserve => "ACTION_OBSERVE",
            TokenType::ActionInteract => "ACTION_INTERACT",
            TokenType::ActionUseAbility => "ACTION_USE_ABILITY",
            TokenType::OutcomeDamageDealt => "OUTCOME_DAMAGE_DEALT",
            TokenType::OutcomeDamageTaken => "OUTCOME_DAMAGE_TAKEN",
            TokenType::OutcomeMovementSuccess => "OUTCOME_MOVEMENT_SUCCESS",
            TokenType::OutcomeSocialSuccess => "OUTCOME_SOCIAL_SUCCESS",
            TokenType::OutcomeSocialFailure => "OUTCOME_SOCIAL_FAILURE",
            TokenType::OutcomeDiscovery => "OUTCOME_DISCOVERY",
            TokenType::OutcomeRecovery => "OUTCOME_RECOVERY",
            TokenType::OutcomeAbilityTriggered => "OUTCOME_ABILITY_TRIGGERED",
            TokenType::FailureActionAttack => "FAILURE_ACTION_ATTACK",
            TokenType::FailureActionMove => "FAILURE_ACTION_MOVE",
            TokenType::FailureActionInteract => "FAILURE_ACTION_INTERACT",
            TokenType::ContextLocationChange => "CONTEXT_LOCATION_CHANGE",
            TokenType::ContextCombatStart => "CONTEXT_COMBAT_START",
            TokenType::ContextCombatEnd => "CONTEXT_COMBAT_END",
            TokenType::ContextResourceLow => "CONTEXT_RESOURCE_LOW",
            TokenType::ContextResourceHigh => "CONTEXT_RESOURCE_HIGH",
            TokenType::ContextSocialTension => "CONTEXT_SOCIAL_TENSION",
            TokenType::PatternAggressiveSequence => "PATTERN_AGGRESSIVE_SEQUENCE",
            TokenType::PatternCautiousSequence => "PATTERN_CAUTIOUS_SEQUENCE",
            TokenType::PatternExplorationSequence => "PATTERN_EXPLORATION_SEQUENCE",
            TokenType::PatternSocialSequence => "PATTERN_SOCIAL_SEQUENCE",
            TokenType::PatternRecoverySequence => "PATTERN_RECOVERY_SEQUENCE",
            TokenType::PatternTacticalAdaptation => "PATTERN_TACTICAL_ADAPTATION",
            TokenType::BiometricArousalHigh => "BIOMETRIC_AROUSAL_HIGH",
            TokenType::BiometricArousalLow => "BIOMETRIC_AROUSAL_LOW",
            TokenType::BiometricFocusHigh => "BIOMETRIC_FOCUS_HIGH",
            TokenType::BiometricFocusLow => "BIOMETRIC_FOCUS_LOW",
        }
    }

    /// Look up a wire name. Returns `None` for anything outside the vocabulary.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    pub fn category(&self) -> TokenCategory {
        use TokenType::*;
        match self {
            ActionAttack | ActionDefend | ActionMove | ActionRest | ActionObserve
            | ActionInteract | ActionUseAbility => TokenCategory::Action,
            OutcomeDamageDealt | OutcomeDamageTaken | OutcomeMovementSuccess
            | OutcomeSocialSuccess | OutcomeSocialFailure | OutcomeDiscovery
            | OutcomeRecovery | OutcomeAbilityTriggered => TokenCategory::Outcome,
            FailureActionAttack | FailureActionMove | FailureActionInteract => {
                TokenCategory::Failure
            }
            ContextLocationChange | ContextCombatStart | ContextCombatEnd
            | ContextResourceLow | ContextResourceHigh | ContextSocialTension => {
                TokenCategory::Context
            }
            PatternAggressiveSequence | PatternCautiousSequence | PatternExplorationSequence
            | PatternSocialSequence | PatternRecoverySequence | PatternTacticalAdaptation => {
                TokenCategory::Pattern
            }
            BiometricArousalHigh | BiometricArousalLow | BiometricFocusHigh
            | BiometricFocusLow => TokenCategory::Biometric,
        }
    }

    pub fn is_action(&self) -> bool {
        self.category() == TokenCategory::Action
    }

    /// Outcomes and failures are the effects that get correlated with actions.
    pub fn is_effect(&self) -> bool {
        matches!(
            self.category(),
            TokenCategory::Outcome | TokenCategory::Failure
        )
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Biometric channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiometricChannel {
    Arousal,
    Focus,
}

/// Category-specific payload of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenDetail {
    Action {
        verb: String,
        args: Vec<String>,
        raw_input: String,
    },
    DamageDealt {
        amount: f64,
        is_critical: bool,
        target: Option<String>,
        weapon: Option<String>,
    },
    DamageTaken {
        amount: f64,
        attacker: Option<String>,
    },
    Movement {
        movement_type: MovementType,
        new_location: Option<String>,
        previous_location: Option<String>,
    },
    Social {
        interaction_type: String,
        outcome: SocialOutcome,
        target: Option<String>,
        relationship_change: f64,
    },
    Recovery {
        action_type: String,
        health_recovered: f64,
        stamina_recovered: f64,
    },
    Discovery {
        action_type: String,
        target: Option<String>,
        information_gained: Vec<String>,
    },
    Failure {
        failed_verb: String,
        failure_reason: String,
        raw_input: String,
    },
    AbilityTriggered {
        ability_id: String,
        ability_name: String,
        success: bool,
        effect_strength: f64,
        recursion_depth: u32,
        source_motif_id: Option<String>,
    },
    Context {
        /// The observed value that crossed the context threshold, if any.
        reading: Option<f64>,
        location: Option<String>,
    },
    Biometric {
        channel: BiometricChannel,
        reading: f64,
    },
    Pattern {
        actions: Vec<TokenType>,
    },
    /// Tokens built directly by a host rather than from an event.
    Bare,
}

/// How a token's intensity was derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityFactors {
    pub base: f64,
    /// Sum of the feature adjustments added to `base` before the sigmoid.
    pub adjustment: f64,
    /// Product of the fusion multipliers applied after the sigmoid.
    pub fusion_product: f64,
    pub fusion_markers: Vec<ContextMarker>,
}

impl Default for IntensityFactors {
    fn default() -> Self {
        Self {
            base: 0.0,
            adjustment: 0.0,
            fusion_product: 1.0,
            fusion_markers: Vec::new(),
        }
    }
}

/// An action that plausibly caused an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedAction {
    pub action_type: TokenType,
    pub action_timestamp: f64,
    pub delay_ms: f64,
}

/// Typed token metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub detail: TokenDetail,
    pub factors: IntensityFactors,
    pub correlated_actions: Vec<CorrelatedAction>,
}

impl TokenMetadata {
    pub fn new(detail: TokenDetail) -> Self {
        Self {
            detail,
            factors: IntensityFactors::default(),
            correlated_actions: Vec::new(),
        }
    }
}

/// The minimal unit of observed behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,

    /// Seconds on the event clock.
    pub timestamp: f64,

    /// Bounded intensity in (0, 1].
    pub intensity: f64,

    pub metadata: TokenMetadata,
}

impl Token {
    /// Create a bare token. Intensity is clamped to [0, 1].
    pub fn new(token_type: TokenType, timestamp: f64, intensity: f64) -> Self {
        Self {
            token_type,
            timestamp,
            intensity: crate::math::unit(intensity),
            metadata: TokenMetadata::new(TokenDetail::Bare),
        }
    }

    /// Create a bare token from a wire name. Out-of-vocabulary names are
    /// logged and dropped.
    pub fn from_wire(name: &str, timestamp: f64, intensity: f64) -> Option<Self> {
        match TokenType::parse(name) {
            Some(token_type) => Some(Self::new(token_type, timestamp, intensity)),
            None => {
                log::debug!("dropping out-of-vocabulary token '{}'", name);
                None
            }
        }
    }

    pub fn timestamp_ms(&self) -> f64 {
        self.timestamp * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for token_type in TokenType::ALL {
            assert_eq!(TokenType::parse(token_type.as_str()), Some(token_type));
            let json = serde_json::to_string(&token_type).unwrap();
            assert_eq!(json, format!("\"{}\"", token_type.as_str()));
        }
    }

    #[test]
    fn test_vocabulary_is_closed() {
        assert_eq!(TokenType::parse("ACTION_JUGGLE"), None);
        assert!(Token::from_wire("ABILITY_EMERGENCE", 0.0, 0.5).is_none());
        assert!(Token::from_wire("ACTION_REST", 0.0, 0.5).is_some());
    }

    #[test]
    fn test_categories() {
        assert_eq!(TokenType::ActionUseAbility.category(), TokenCategory::Action);
        assert_eq!(TokenType::FailureActionMove.category(), TokenCategory::Failure);
        assert_eq!(TokenType::BiometricFocusLow.category(), TokenCategory::Biometric);
        assert!(TokenType::OutcomeRecovery.is_effect());
        assert!(TokenType::FailureActionAttack.is_effect());
        assert!(!TokenType::ContextCombatStart.is_effect());
        assert!(TokenType::ActionObserve.is_action());
    }

    #[test]
    fn test_bare_token_clamps_intensity() {
        let token = Token::new(TokenType::ActionAttack, 1.0, 3.0);
        assert_eq!(token.intensity, 1.0);
        assert_eq!(token.metadata.detail, TokenDetail::Bare);
        assert!((token.timestamp_ms() - 1000.0).abs() < 1e-9);
    }
}

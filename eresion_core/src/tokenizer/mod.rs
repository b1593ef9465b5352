//! Tokenizer - turns gameplay events into bounded-intensity tokens.
//!
//! Each event class has a fixed generator:
//! 1. **Generate**: pick the token type(s) and compute `base + adjustments`
//! 2. **Normalize**: squash through the bounded sigmoid into (0, 1)
//! 3. **Fuse**: multiply by the context multipliers the event carries, re-clamp to ≤ 1
//! 4. **Correlate**: actions are queued, outcomes and failures pick up the
//!    queued actions inside the correlation window
//! 5. **Detect runs**: consecutive actions of one style emit a pattern token

mod correlation;
mod token;

pub use correlation::*;
pub use token::*;

use eresion_events::{ActionKind, ContextMarker, GameEvent, RawEvent};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::config::{FusionConfig, TokenizerConfig};
use crate::math::sigmoid;

/// Typical damage used to normalise damage amounts.
const TYPICAL_MAX_DAMAGE: f64 = 20.0;

/// Typical health + stamina recovered by one defensive action.
const TYPICAL_RECOVERY: f64 = 20.0;

/// Running tokenizer counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenizerStats {
    pub events_seen: u64,
    pub events_dropped: u64,
    pub tokens_emitted: u64,
    pub correlations_attached: u64,
    pub patterns_emitted: u64,
    pub token_counts: BTreeMap<TokenType, u64>,
}

/// A token before normalisation.
struct Draft {
    token_type: TokenType,
    base: f64,
    adjustment: f64,
    detail: TokenDetail,
}

impl Draft {
    fn new(token_type: TokenType, base: f64, adjustment: f64, detail: TokenDetail) -> Self {
        Self {
            token_type,
            base,
            adjustment,
            detail,
        }
    }
}

/// Deterministic event-to-token transducer.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    config: TokenizerConfig,
    fusion: FusionConfig,
    pending: PendingActions,
    runs: ActionRuns,
    history: VecDeque<Token>,
    stats: TokenizerStats,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig, fusion: FusionConfig) -> Self {
        Self {
            pending: PendingActions::new(
                config.pending_action_capacity,
                config.correlation_window_ms,
            ),
            runs: ActionRuns::new(config.pattern_run_length),
            history: VecDeque::new(),
            stats: TokenizerStats::default(),
            config,
            fusion,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TokenizerConfig::default(), FusionConfig::default())
    }

    /// Transform one event into zero or more tokens.
    ///
    /// Unknown or malformed events are logged and yield no tokens.
    pub fn handle_event(&mut self, raw: &RawEvent) -> Vec<Token> {
        let event = match GameEvent::try_from(raw) {
            Ok(event) => event,
            Err(err) => {
                self.stats.events_dropped += 1;
                debug!("tokenizer ignoring event {}: {}", raw.id, err);
                return Vec::new();
            }
        };
        self.stats.events_seen += 1;

        let timestamp = raw.timestamp_s();
        let markers = raw.context_markers();
        let mut emitted = Vec::new();

        for draft in generate(&event) {
            let mut token = self.normalise(draft, timestamp, &markers);

            if token.token_type.is_action() {
                self.pending.push(token.token_type, token.timestamp);
                let run = self.runs.observe(token.token_type, token.intensity);
                emitted.push(token);

                if let Some(run) = run {
                    self.stats.patterns_emitted += 1;
                    emitted.push(self.pattern_token(run, timestamp));
                }
            } else {
                if token.token_type.is_effect() {
                    let correlated = self.pending.correlate(raw.timestamp_ms as f64);
                    if !correlated.is_empty() {
                        self.stats.correlations_attached += 1;
                        debug!(
                            "{} correlated with {:?}",
                            token.token_type,
                            correlated.iter().map(|c| c.action_type).collect::<Vec<_>>()
                        );
                    }
                    token.metadata.correlated_actions = correlated;
                }
                emitted.push(token);
            }
        }

        for token in &emitted {
            self.record(token.clone());
        }
        emitted
    }

    fn normalise(&self, draft: Draft, timestamp: f64, markers: &[ContextMarker]) -> Token {
        let mut intensity = sigmoid(draft.base + draft.adjustment);

        let fusion_product: f64 = markers.iter().map(|m| self.multiplier(*m)).product();
        if fusion_product != 1.0 {
            intensity = (intensity * fusion_product).min(1.0);
        }

        Token {
            token_type: draft.token_type,
            timestamp,
            intensity,
            metadata: TokenMetadata {
                detail: draft.detail,
                factors: IntensityFactors {
                    base: draft.base,
                    adjustment: draft.adjustment,
                    fusion_product,
                    fusion_markers: markers.to_vec(),
                },
                correlated_actions: Vec::new(),
            },
        }
    }

    fn multiplier(&self, marker: ContextMarker) -> f64 {
        match marker {
            ContextMarker::Environmental => self.fusion.environment,
            ContextMarker::Biometric => self.fusion.biometric,
            ContextMarker::Social => self.fusion.social,
        }
    }

    fn pattern_token(&self, run: BehaviorRun, timestamp: f64) -> Token {
        let base = 0.5;
        let adjustment = run.mean_intensity;
        Token {
            token_type: run.pattern,
            timestamp,
            intensity: sigmoid(base + adjustment),
            metadata: TokenMetadata {
                detail: TokenDetail::Pattern {
                    actions: run.actions,
                },
                factors: IntensityFactors {
                    base,
                    adjustment,
                    ..Default::default()
                },
                correlated_actions: Vec::new(),
            },
        }
    }

    fn record(&mut self, token: Token) {
        self.stats.tokens_emitted += 1;
        *self.stats.token_counts.entry(token.token_type).or_default() += 1;

        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        if self.config.history_capacity > 0 {
            self.history.push_back(token);
        }
    }

    /// Most recent tokens, oldest first.
    pub fn history(&self, limit: Option<usize>) -> Vec<&Token> {
        let skip = limit
            .map(|l| self.history.len().saturating_sub(l))
            .unwrap_or(0);
        self.history.iter().skip(skip).collect()
    }

    pub fn pending_actions(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> &TokenizerStats {
        &self.stats
    }

    pub fn vocabulary(&self) -> &'static [TokenType] {
        &TokenType::ALL
    }

    /// Forget history, pending actions and runs. Counters are kept.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.pending.clear();
        self.runs.clear();
    }
}

/// The static event-class → generator table.
fn generate(event: &GameEvent) -> Vec<Draft> {
    match event {
        GameEvent::CommandParsed {
            verb,
            args,
            raw_input,
        } => {
            let token_type = match ActionKind::from_verb(verb) {
                ActionKind::Attack => TokenType::ActionAttack,
                ActionKind::Defend => TokenType::ActionDefend,
                ActionKind::Move => TokenType::ActionMove,
                ActionKind::Rest => TokenType::ActionRest,
                ActionKind::Observe => TokenType::ActionObserve,
                ActionKind::Interact => TokenType::ActionInteract,
                ActionKind::UseAbility => TokenType::ActionUseAbility,
            };
            let complexity = (args.len() as f64 / 3.0).min(1.0);
            vec![Draft::new(
                token_type,
                0.7,
                complexity * 0.2,
                TokenDetail::Action {
                    verb: verb.clone(),
                    args: args.clone(),
                    raw_input: raw_input.clone(),
                },
            )]
        }

        GameEvent::DamageDealt {
            amount,
            is_critical,
            target,
            weapon,
        } => {
            let damage_ratio = (amount.max(0.0) / TYPICAL_MAX_DAMAGE).min(1.0);
            let critical_bonus = if *is_critical { 0.3 } else { 0.0 };
            vec![Draft::new(
                TokenType::OutcomeDamageDealt,
                0.8,
                damage_ratio + critical_bonus,
                TokenDetail::DamageDealt {
                    amount: *amount,
                    is_critical: *is_critical,
                    target: target.clone(),
                    weapon: weapon.clone(),
                },
            )]
        }

        GameEvent::DamageTaken { amount, attacker } => {
            let damage_ratio = (amount.max(0.0) / TYPICAL_MAX_DAMAGE).min(1.0);
            vec![Draft::new(
                TokenType::OutcomeDamageTaken,
                0.7,
                damage_ratio,
                TokenDetail::DamageTaken {
                    amount: *amount,
                    attacker: attacker.clone(),
                },
            )]
        }

        GameEvent::PlayerMoved {
            movement_type,
            new_location,
            previous_location,
        } => vec![Draft::new(
            TokenType::OutcomeMovementSuccess,
            0.6,
            movement_type.intensity_bonus(),
            TokenDetail::Movement {
                movement_type: *movement_type,
                new_location: new_location.clone(),
                previous_location: previous_location.clone(),
            },
        )],

        GameEvent::SocialInteraction {
            outcome,
            interaction_type,
            target,
            relationship_change,
        } => {
            let token_type = if outcome.is_failure() {
                TokenType::OutcomeSocialFailure
            } else {
                TokenType::OutcomeSocialSuccess
            };
            vec![Draft::new(
                token_type,
                0.5,
                outcome.intensity_bonus(),
                TokenDetail::Social {
                    interaction_type: interaction_type.clone(),
                    outcome: *outcome,
                    target: target.clone(),
                    relationship_change: *relationship_change,
                },
            )]
        }

        GameEvent::DefensiveAction {
            action_type,
            health_recovered,
            stamina_recovered,
        } => {
            let recovered = (health_recovered + stamina_recovered).max(0.0);
            vec![Draft::new(
                TokenType::OutcomeRecovery,
                0.4,
                (recovered / TYPICAL_RECOVERY).min(1.0),
                TokenDetail::Recovery {
                    action_type: action_type.clone(),
                    health_recovered: *health_recovered,
                    stamina_recovered: *stamina_recovered,
                },
            )]
        }

        GameEvent::ObservationAction {
            action_type,
            target,
            information_gained,
        } => vec![Draft::new(
            TokenType::OutcomeDiscovery,
            0.3,
            (information_gained.len() as f64 / 3.0).min(1.0),
            TokenDetail::Discovery {
                action_type: action_type.clone(),
                target: target.clone(),
                information_gained: information_gained.clone(),
            },
        )],

        GameEvent::ActionFailed {
            verb,
            failure_reason,
            raw_input,
        } => {
            let token_type = match ActionKind::failure_class(verb) {
                ActionKind::Attack => TokenType::FailureActionAttack,
                ActionKind::Move => TokenType::FailureActionMove,
                _ => TokenType::FailureActionInteract,
            };
            vec![Draft::new(
                token_type,
                0.6,
                0.0,
                TokenDetail::Failure {
                    failed_verb: verb.clone(),
                    failure_reason: failure_reason.clone(),
                    raw_input: raw_input.clone(),
                },
            )]
        }

        GameEvent::AbilityUsed {
            ability_id,
            ability_name,
            success,
            effect_strength,
            recursion_depth,
            source_motif_id,
        } => {
            let base = 1.0;
            let mut raw = base;
            if *success {
                raw *= 1.0 + effect_strength;
            }
            raw *= 1.0 + (recursion_depth.saturating_sub(1)) as f64 * 0.2;
            vec![Draft::new(
                TokenType::OutcomeAbilityTriggered,
                base,
                raw - base,
                TokenDetail::AbilityTriggered {
                    ability_id: ability_id.clone(),
                    ability_name: ability_name.clone(),
                    success: *success,
                    effect_strength: *effect_strength,
                    recursion_depth: *recursion_depth,
                    source_motif_id: source_motif_id.clone(),
                },
            )]
        }

        GameEvent::GameStateChanged {
            combat_started,
            combat_ended,
            location_changed,
            health_ratio,
            social_tension,
        } => context_drafts(
            *combat_started,
            *combat_ended,
            location_changed.as_deref(),
            *health_ratio,
            *social_tension,
        ),

        GameEvent::BiometricSample { arousal, focus } => {
            let mut drafts = Vec::new();
            for (channel, reading, high, low) in [
                (
                    BiometricChannel::Arousal,
                    *arousal,
                    TokenType::BiometricArousalHigh,
                    TokenType::BiometricArousalLow,
                ),
                (
                    BiometricChannel::Focus,
                    *focus,
                    TokenType::BiometricFocusHigh,
                    TokenType::BiometricFocusLow,
                ),
            ] {
                let Some(reading) = reading else { continue };
                let detail = TokenDetail::Biometric { channel, reading };
                if reading >= 0.7 {
                    drafts.push(Draft::new(high, 0.5, reading - 0.7, detail));
                } else if reading <= 0.3 {
                    drafts.push(Draft::new(low, 0.5, 0.3 - reading, detail));
                }
            }
            drafts
        }
    }
}

fn context_drafts(
    combat_started: bool,
    combat_ended: bool,
    location: Option<&str>,
    health_ratio: Option<f64>,
    social_tension: Option<f64>,
) -> Vec<Draft> {
    let base = 0.5;
    let bare = |reading: Option<f64>| TokenDetail::Context {
        reading,
        location: None,
    };
    let mut drafts = Vec::new();

    if combat_started {
        drafts.push(Draft::new(TokenType::ContextCombatStart, base, 0.3, bare(None)));
    }
    if combat_ended {
        drafts.push(Draft::new(TokenType::ContextCombatEnd, base, 0.0, bare(None)));
    }
    if let Some(location) = location {
        drafts.push(Draft::new(
            TokenType::ContextLocationChange,
            base,
            0.1,
            TokenDetail::Context {
                reading: None,
                location: Some(location.to_string()),
            },
        ));
    }
    match health_ratio {
        Some(ratio) if ratio < 0.3 => drafts.push(Draft::new(
            TokenType::ContextResourceLow,
            base,
            (0.3 - ratio) * 2.0,
            bare(Some(ratio)),
        )),
        Some(ratio) if ratio > 0.8 => drafts.push(Draft::new(
            TokenType::ContextResourceHigh,
            base,
            ratio - 0.8,
            bare(Some(ratio)),
        )),
        _ => {}
    }
    if let Some(tension) = social_tension {
        if tension > 0.6 {
            drafts.push(Draft::new(
                TokenType::ContextSocialTension,
                base,
                tension - 0.6,
                bare(Some(tension)),
            ));
        }
    }

    if drafts.is_empty() {
        warn!("state change event carried no recognised context change");
    }
    drafts
}

#[cfg(test)]
mod tests {
    use super::*;
    use eresion_events::{MovementType, SocialOutcome};
    use serde_json::json;

    fn command(verb: &str, ts: u64) -> RawEvent {
        RawEvent::new("CommandParsed", "parser", ts).with_data("verb", verb)
    }

    #[test]
    fn test_command_maps_to_action() {
        let mut tokenizer = Tokenizer::with_defaults();
        let tokens = tokenizer.handle_event(&command("strike", 1000));

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::ActionAttack);
        assert!((tokens[0].timestamp - 1.0).abs() < 1e-9);
        assert!((tokens[0].intensity - sigmoid(0.7)).abs() < 1e-12);
        assert_eq!(tokenizer.pending_actions(), 1);
    }

    #[test]
    fn test_command_complexity_raises_intensity() {
        let mut tokenizer = Tokenizer::with_defaults();
        let plain = tokenizer.handle_event(&command("look", 0));
        let detailed = tokenizer.handle_event(
            &command("look", 10).with_data("args", json!(["at", "the", "altar"])),
        );
        assert!(detailed[0].intensity > plain[0].intensity);
        assert!((detailed[0].intensity - sigmoid(0.9)).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_event_dropped() {
        let mut tokenizer = Tokenizer::with_defaults();
        let tokens = tokenizer.handle_event(&RawEvent::new("WeatherChanged", "world", 0));

        assert!(tokens.is_empty());
        assert_eq!(tokenizer.stats().events_dropped, 1);
        assert_eq!(tokenizer.stats().events_seen, 0);
        assert!(tokenizer.history(None).is_empty());
    }

    #[test]
    fn test_damage_outcome_intensity() {
        let mut tokenizer = Tokenizer::with_defaults();
        let event = GameEvent::DamageDealt {
            amount: 10.0,
            is_critical: true,
            target: Some("goblin".to_string()),
            weapon: None,
        }
        .into_raw("combat", 500);

        let tokens = tokenizer.handle_event(&event);
        assert_eq!(tokens[0].token_type, TokenType::OutcomeDamageDealt);
        assert!((tokens[0].intensity - sigmoid(0.8 + 0.5 + 0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_outcome_correlates_with_recent_actions() {
        let mut tokenizer = Tokenizer::with_defaults();
        tokenizer.handle_event(&command("attack", 0));
        tokenizer.handle_event(&command("defend", 2500));
        let event = GameEvent::DamageDealt {
            amount: 5.0,
            is_critical: false,
            target: None,
            weapon: None,
        }
        .into_raw("combat", 3000);

        let tokens = tokenizer.handle_event(&event);
        let correlated = &tokens[0].metadata.correlated_actions;

        // The attack at t=0 is outside the 2000 ms window.
        assert_eq!(correlated.len(), 1);
        assert_eq!(correlated[0].action_type, TokenType::ActionDefend);
        assert!((correlated[0].delay_ms - 500.0).abs() < 1e-9);
        assert_eq!(tokenizer.pending_actions(), 1);
    }

    #[test]
    fn test_failure_tokens_are_correlated() {
        let mut tokenizer = Tokenizer::with_defaults();
        tokenizer.handle_event(&command("go", 100));
        let failed = RawEvent::new("ActionFailed", "parser", 600).with_data("verb", "go");

        let tokens = tokenizer.handle_event(&failed);
        assert_eq!(tokens[0].token_type, TokenType::FailureActionMove);
        assert_eq!(tokens[0].metadata.correlated_actions.len(), 1);
    }

    #[test]
    fn test_fusion_multipliers() {
        let mut tokenizer = Tokenizer::with_defaults();
        let event = GameEvent::SocialInteraction {
            outcome: SocialOutcome::Failure,
            interaction_type: "persuade".to_string(),
            target: None,
            relationship_change: -1.0,
        }
        .into_raw("dialogue", 0)
        .with_context(ContextMarker::Social, "crowd")
        .with_context(ContextMarker::Environmental, "storm");

        let tokens = tokenizer.handle_event(&event);
        let token = &tokens[0];
        let expected = (sigmoid(0.5 - 0.2) * 1.1 * 1.2).min(1.0);

        assert_eq!(token.token_type, TokenType::OutcomeSocialFailure);
        assert!((token.intensity - expected).abs() < 1e-12);
        assert!((token.metadata.factors.fusion_product - 1.32).abs() < 1e-12);
        assert_eq!(token.metadata.factors.fusion_markers.len(), 2);
    }

    #[test]
    fn test_fusion_reclamps_to_one() {
        let fusion = FusionConfig {
            environment: 5.0,
            biometric: 5.0,
            social: 5.0,
        };
        let mut tokenizer = Tokenizer::new(TokenizerConfig::default(), fusion);
        let event = command("attack", 0).with_context(ContextMarker::Biometric, json!({"hr": 140}));

        let tokens = tokenizer.handle_event(&event);
        assert_eq!(tokens[0].intensity, 1.0);
    }

    #[test]
    fn test_intensity_bounded_for_extreme_inputs() {
        let mut tokenizer = Tokenizer::with_defaults();
        for amount in [-1e6, -1.0, 0.0, 1e6] {
            let event = GameEvent::DamageDealt {
                amount,
                is_critical: true,
                target: None,
                weapon: None,
            }
            .into_raw("combat", 0);
            for token in tokenizer.handle_event(&event) {
                assert!(token.intensity > 0.0 && token.intensity < 1.0);
            }
        }
        for effect_strength in [-1e6, 0.0, 1e6] {
            let event = GameEvent::AbilityUsed {
                ability_id: "a".to_string(),
                ability_name: "A".to_string(),
                success: true,
                effect_strength,
                recursion_depth: 1_000_000,
                source_motif_id: None,
            }
            .into_raw("game", 0);
            for token in tokenizer.handle_event(&event) {
                assert!(token.intensity > 0.0 && token.intensity < 1.0);
            }
        }
    }

    #[test]
    fn test_movement_recovery_discovery() {
        let mut tokenizer = Tokenizer::with_defaults();

        let moved = GameEvent::PlayerMoved {
            movement_type: MovementType::Walk,
            new_location: Some("Cave".to_string()),
            previous_location: None,
        }
        .into_raw("movement", 0);
        assert_eq!(
            tokenizer.handle_event(&moved)[0].token_type,
            TokenType::OutcomeMovementSuccess
        );

        let rested = RawEvent::new("DefensiveAction", "combat", 0)
            .with_data("health_recovered", 8)
            .with_data("stamina_recovered", 4);
        let tokens = tokenizer.handle_event(&rested);
        assert_eq!(tokens[0].token_type, TokenType::OutcomeRecovery);
        assert!((tokens[0].intensity - sigmoid(0.4 + 0.6)).abs() < 1e-12);

        let looked = RawEvent::new("ObservationAction", "world", 0)
            .with_data("information_gained", json!(["door", "key"]));
        assert_eq!(
            tokenizer.handle_event(&looked)[0].token_type,
            TokenType::OutcomeDiscovery
        );
    }

    #[test]
    fn test_context_and_biometric_tokens() {
        let mut tokenizer = Tokenizer::with_defaults();

        let changed = GameEvent::GameStateChanged {
            combat_started: true,
            combat_ended: false,
            location_changed: Some("Crypt".to_string()),
            health_ratio: Some(0.1),
            social_tension: Some(0.2),
        }
        .into_raw("state", 0);
        let types: Vec<_> = tokenizer
            .handle_event(&changed)
            .iter()
            .map(|t| t.token_type)
            .collect();
        assert_eq!(
            types,
            vec![
                TokenType::ContextCombatStart,
                TokenType::ContextLocationChange,
                TokenType::ContextResourceLow,
            ]
        );

        let sample = GameEvent::BiometricSample {
            arousal: Some(0.9),
            focus: Some(0.5),
        }
        .into_raw("sensor", 0);
        let tokens = tokenizer.handle_event(&sample);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::BiometricArousalHigh);
    }

    #[test]
    fn test_pattern_token_after_run() {
        let mut tokenizer = Tokenizer::with_defaults();
        tokenizer.handle_event(&command("attack", 0));
        tokenizer.handle_event(&command("attack", 500));
        let tokens = tokenizer.handle_event(&command("attack", 1000));

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::ActionAttack);
        assert_eq!(tokens[1].token_type, TokenType::PatternAggressiveSequence);
        assert!(tokens[1].intensity > 0.0 && tokens[1].intensity < 1.0);
        assert_eq!(tokenizer.stats().patterns_emitted, 1);
    }

    #[test]
    fn test_deterministic_token_sequence() {
        let events = vec![
            command("attack", 0),
            command("defend", 300),
            RawEvent::new("DamageDealt", "combat", 700).with_data("amount", 7),
            command("look", 5000).with_context(ContextMarker::Environmental, "fog"),
            RawEvent::new("ObservationAction", "world", 5200),
        ];

        let run = |events: &[RawEvent]| {
            let mut tokenizer = Tokenizer::with_defaults();
            events
                .iter()
                .flat_map(|e| tokenizer.handle_event(e))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(&events), run(&events));
    }

    #[test]
    fn test_history_is_bounded() {
        let config = TokenizerConfig {
            history_capacity: 3,
            ..Default::default()
        };
        let mut tokenizer = Tokenizer::new(config, FusionConfig::default());
        for i in 0..5 {
            tokenizer.handle_event(&command("rest", i * 10_000));
        }
        // Five actions plus one recovery pattern after the third.
        assert_eq!(tokenizer.stats().tokens_emitted, 6);
        assert_eq!(tokenizer.history(None).len(), 3);
        assert_eq!(tokenizer.history(Some(1)).len(), 1);
        assert_eq!(
            tokenizer.stats().token_counts[&TokenType::ActionRest],
            5
        );
    }
}

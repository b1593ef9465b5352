//! Essence extraction - a motif reduced to bounded behavioral dimensions.

use serde::{Deserialize, Serialize};

use crate::math::sigmoid;
use crate::temporal_graph::{BehavioralMotif, FeatureVector};
use crate::tokenizer::TokenType;

/// Named dimensions of an [`EssenceVector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Aggression,
    Exploration,
    Social,
    Recovery,
    Tactical,
    Intensity,
    Consistency,
    Complexity,
}

impl Dimension {
    /// The five behavioral aspects, in tie-break order.
    pub const BEHAVIORAL: [Dimension; 5] = [
        Dimension::Aggression,
        Dimension::Exploration,
        Dimension::Social,
        Dimension::Recovery,
        Dimension::Tactical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Aggression => "aggression",
            Dimension::Exploration => "exploration",
            Dimension::Social => "social",
            Dimension::Recovery => "recovery",
            Dimension::Tactical => "tactical",
            Dimension::Intensity => "intensity",
            Dimension::Consistency => "consistency",
            Dimension::Complexity => "complexity",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        [
            Dimension::Aggression,
            Dimension::Exploration,
            Dimension::Social,
            Dimension::Recovery,
            Dimension::Tactical,
            Dimension::Intensity,
            Dimension::Consistency,
            Dimension::Complexity,
        ]
        .into_iter()
        .find(|d| d.as_str() == name)
    }

    /// `Aggression`, `Tactical`, ...
    pub fn title(&self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Behavioral summary of one motif. Every dimension is in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EssenceVector {
    pub motif_id: String,

    pub aggression: f64,
    pub exploration: f64,
    pub social: f64,
    pub recovery: f64,
    pub tactical: f64,

    /// Pattern strength: stability plus the average endpoint intensity.
    pub intensity: f64,
    /// Equal to the motif's stability.
    pub consistency: f64,
    /// Sequence length over five.
    pub complexity: f64,
}

impl EssenceVector {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Aggression => self.aggression,
            Dimension::Exploration => self.exploration,
            Dimension::Social => self.social,
            Dimension::Recovery => self.recovery,
            Dimension::Tactical => self.tactical,
            Dimension::Intensity => self.intensity,
            Dimension::Consistency => self.consistency,
            Dimension::Complexity => self.complexity,
        }
    }

    /// Value of a named feature; features that are not dimensions read as 0.
    pub fn feature(&self, name: &str) -> f64 {
        Dimension::parse(name).map(|d| self.get(d)).unwrap_or(0.0)
    }

    /// The strongest behavioral aspect. Ties go to the earlier aspect in
    /// [`Dimension::BEHAVIORAL`].
    pub fn dominant_aspect(&self) -> Dimension {
        let mut best = Dimension::Aggression;
        for aspect in Dimension::BEHAVIORAL {
            if self.get(aspect) > self.get(best) {
                best = aspect;
            }
        }
        best
    }

    /// `max(5, (intensity + complexity)·scale - 0.3·consistency)`.
    pub fn power_budget_estimate(&self, scale: f64) -> f64 {
        ((self.intensity + self.complexity) * scale - self.consistency * 0.3).max(5.0)
    }
}

/// Unnormalised per-aspect contributions.
#[derive(Debug, Clone, Copy, Default)]
struct Signals {
    aggression: f64,
    exploration: f64,
    social: f64,
    recovery: f64,
    tactical: f64,
}

impl Signals {
    fn scale(&mut self, factor: f64) {
        self.aggression *= factor;
        self.exploration *= factor;
        self.social *= factor;
        self.recovery *= factor;
        self.tactical *= factor;
    }
}

/// Extract the essence of a motif. Pure; never fails.
pub fn extract_essence(motif: &BehavioralMotif) -> EssenceVector {
    let sequence = sequence_signals(&motif.sequence);
    let (features, feature_intensity) = feature_signals(&motif.feature_vector);

    let stability = motif.stability.clamp(0.0, 1.0);
    EssenceVector {
        motif_id: motif.id.clone(),
        aggression: sigmoid(sequence.aggression + features.aggression),
        exploration: sigmoid(sequence.exploration + features.exploration),
        social: sigmoid(sequence.social + features.social),
        recovery: sigmoid(sequence.recovery + features.recovery),
        tactical: sigmoid(sequence.tactical + features.tactical),
        intensity: (stability + feature_intensity).clamp(0.0, 1.0),
        consistency: stability,
        complexity: (motif.sequence.len() as f64 / 5.0).min(1.0),
    }
}

fn sequence_signals(sequence: &[TokenType]) -> Signals {
    let mut signals = Signals::default();
    if sequence.is_empty() {
        return signals;
    }

    for token_type in sequence {
        let name = token_type.as_str();
        let has = |marker: &str| name.contains(marker);

        if has("ACTION_ATTACK") || has("OUTCOME_DAMAGE") {
            signals.aggression += 0.9;
        } else if has("ACTION_DEFEND") || has("ACTION_DODGE") {
            signals.tactical += 0.8;
            signals.aggression += 0.3;
        } else if has("ACTION_MOVE") || has("OUTCOME_MOVEMENT") {
            signals.exploration += 0.6;
            signals.tactical += 0.4;
        } else if has("ACTION_OBSERVE") || has("OUTCOME_DISCOVERY") {
            signals.exploration += 0.8;
        } else if has("ACTION_INTERACT") || has("OUTCOME_SOCIAL") {
            signals.social += 0.9;
        } else if has("ACTION_REST") || has("OUTCOME_RECOVERY") {
            signals.recovery += 0.9;
        } else if has("ATTACK") || has("DAMAGE") {
            signals.aggression += 0.8;
        } else if has("OBSERVE") || has("DISCOVERY") {
            signals.exploration += 0.7;
        } else if has("SOCIAL") || has("INTERACT") {
            signals.social += 0.8;
        } else if has("RECOVERY") || has("REST") {
            signals.recovery += 0.8;
        } else if has("DEFEND") || has("DODGE") {
            signals.tactical += 0.6;
        } else if has("MOVE") {
            signals.exploration += 0.4;
            signals.tactical += 0.3;
        }
    }

    use TokenType::*;
    for pair in sequence.windows(2) {
        match (pair[0], pair[1]) {
            (ActionAttack, ActionDefend) => {
                signals.tactical += 0.5;
                signals.aggression += 0.3;
            }
            (ActionAttack, ActionAttack) => signals.aggression += 0.7,
            (ActionMove, ActionObserve) => {
                signals.exploration += 0.8;
                signals.tactical += 0.2;
            }
            (ActionInteract, ActionAttack) => {
                signals.social += 0.4;
                signals.tactical += 0.6;
            }
            (ActionDefend, ActionDefend) => signals.tactical += 0.9,
            (ActionAttack, OutcomeRecovery) => signals.recovery += 0.5,
            _ => {}
        }
    }

    signals.scale(1.0 / sequence.len() as f64);
    signals
}

/// Returns the feature contributions and the feature intensity.
fn feature_signals(features: &FeatureVector) -> (Signals, f64) {
    let mut signals = Signals::default();
    let strength = features.edge_weight;

    let intensity = (features.source_intensity + features.target_intensity) / 2.0;
    signals.tactical = features.temporal_consistency * strength;

    if features.co_occurrence_ratio > 0.7 {
        signals.tactical += 0.3 * strength;
    } else if features.co_occurrence_ratio < 0.3 {
        signals.aggression += 0.2 * strength;
    }

    (signals, intensity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motif(sequence: Vec<TokenType>, stability: f64, features: FeatureVector) -> BehavioralMotif {
        BehavioralMotif {
            id: "test".to_string(),
            sequence,
            stability,
            feature_vector: features,
            session_seen_in: 1,
            detected_at: 0.0,
        }
    }

    fn combat_features() -> FeatureVector {
        FeatureVector {
            edge_weight: 0.8,
            source_intensity: 0.7,
            target_intensity: 0.6,
            co_occurrence_ratio: 0.9,
            temporal_consistency: 0.5,
            session_breadth: 1.0,
        }
    }

    #[test]
    fn test_attack_defend_essence_is_combat_oriented() {
        let essence = extract_essence(&motif(
            vec![TokenType::ActionAttack, TokenType::ActionDefend],
            0.6,
            combat_features(),
        ));

        for strong in [essence.tactical, essence.aggression] {
            assert!(strong > essence.social);
            assert!(strong > essence.recovery);
        }
        assert!(matches!(
            essence.dominant_aspect(),
            Dimension::Aggression | Dimension::Tactical
        ));
        // tactical = σ((0.8 + 0.5)/2 + 0.5·0.8 + 0.3·0.8)
        assert!((essence.tactical - sigmoid(1.29)).abs() < 1e-9);
        assert!((essence.aggression - sigmoid(0.75)).abs() < 1e-9);
    }

    #[test]
    fn test_meta_dimensions() {
        let essence = extract_essence(&motif(
            vec![TokenType::ActionMove, TokenType::ActionObserve],
            0.5,
            combat_features(),
        ));
        assert!((essence.intensity - 1.0).abs() < 1e-12);
        assert!((essence.consistency - 0.5).abs() < 1e-12);
        assert!((essence.complexity - 0.4).abs() < 1e-12);
        assert_eq!(essence.dominant_aspect(), Dimension::Exploration);
    }

    #[test]
    fn test_dimensions_bounded_for_extreme_features() {
        let features = FeatureVector {
            edge_weight: 1e6,
            source_intensity: 1e6,
            target_intensity: -1e6,
            co_occurrence_ratio: 0.1,
            temporal_consistency: 1e6,
            session_breadth: 0.0,
        };
        let essence = extract_essence(&motif(
            vec![TokenType::ActionAttack, TokenType::ActionAttack],
            1e6,
            features,
        ));
        for d in Dimension::BEHAVIORAL {
            let value = essence.get(d);
            assert!(value > 0.0 && value < 1.0, "{} = {}", d, value);
        }
        assert!(essence.intensity <= 1.0 && essence.consistency <= 1.0);
    }

    #[test]
    fn test_empty_sequence_is_neutral() {
        let essence = extract_essence(&motif(Vec::new(), 0.0, FeatureVector::default()));
        assert!((essence.social - 0.5).abs() < 1e-12);
        assert_eq!(essence.complexity, 0.0);
        assert_eq!(essence.dominant_aspect(), Dimension::Aggression);
    }

    #[test]
    fn test_power_budget_estimate() {
        let essence = EssenceVector {
            intensity: 0.9,
            complexity: 0.4,
            consistency: 0.5,
            ..Default::default()
        };
        assert!((essence.power_budget_estimate(10.0) - 12.85).abs() < 1e-9);

        let quiet = EssenceVector::default();
        assert_eq!(quiet.power_budget_estimate(10.0), 5.0);
    }

    #[test]
    fn test_dimension_names() {
        assert_eq!(Dimension::parse("tactical"), Some(Dimension::Tactical));
        assert_eq!(Dimension::parse("power"), None);
        assert_eq!(Dimension::Exploration.title(), "Exploration");

        let essence = EssenceVector {
            recovery: 0.7,
            ..Default::default()
        };
        assert_eq!(essence.feature("recovery"), 0.7);
        assert_eq!(essence.feature("speed"), 0.0);
    }
}

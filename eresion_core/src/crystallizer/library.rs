//! Static ability archetypes and primitives.

use serde::{Deserialize, Serialize};

use super::essence::{Dimension, EssenceVector};

/// An ability archetype with the essence profile it expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityTemplate {
    /// May contain an `{aspect}` placeholder.
    pub name_pattern: String,
    /// May contain an `{aspect}` placeholder.
    pub description_pattern: String,
    pub trigger_type: String,
    pub effect_type: String,
    pub modifier_type: String,
    pub base_power_cost: f64,
    pub requirements: Vec<(Dimension, f64)>,
}

impl AbilityTemplate {
    pub fn new(name_pattern: impl Into<String>, description_pattern: impl Into<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
            description_pattern: description_pattern.into(),
            trigger_type: String::new(),
            effect_type: String::new(),
            modifier_type: String::new(),
            base_power_cost: 0.0,
            requirements: Vec::new(),
        }
    }

    pub fn with_kinds(
        mut self,
        trigger_type: impl Into<String>,
        effect_type: impl Into<String>,
        modifier_type: impl Into<String>,
    ) -> Self {
        self.trigger_type = trigger_type.into();
        self.effect_type = effect_type.into();
        self.modifier_type = modifier_type.into();
        self
    }

    pub fn with_cost(mut self, base_power_cost: f64) -> Self {
        self.base_power_cost = base_power_cost;
        self
    }

    pub fn require(mut self, dimension: Dimension, level: f64) -> Self {
        self.requirements.push((dimension, level));
        self
    }

    /// Mean of `max(0, 1 - |actual - required|)` over the requirements;
    /// 0.5 for a template without requirements.
    pub fn match_score(&self, essence: &EssenceVector) -> f64 {
        if self.requirements.is_empty() {
            return 0.5;
        }
        let total: f64 = self
            .requirements
            .iter()
            .map(|(dimension, required)| (1.0 - (essence.get(*dimension) - required).abs()).max(0.0))
            .sum();
        total / self.requirements.len() as f64
    }

    pub fn render_name(&self, aspect: Dimension) -> String {
        self.name_pattern.replace("{aspect}", &aspect.title())
    }

    pub fn render_description(&self, aspect: Dimension) -> String {
        self.description_pattern.replace("{aspect}", aspect.as_str())
    }
}

/// Grammatical role of a primitive within an ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Verb,
    Noun,
    Adjective,
}

/// A building block an ability is composed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityPrimitive {
    pub id: String,
    pub kind: PrimitiveKind,
    /// Named features; names that are not essence dimensions align against 0.
    pub features: Vec<(String, f64)>,
    pub base_power_cost: f64,
}

impl AbilityPrimitive {
    pub fn new(id: impl Into<String>, kind: PrimitiveKind, base_power_cost: f64) -> Self {
        Self {
            id: id.into(),
            kind,
            features: Vec::new(),
            base_power_cost,
        }
    }

    pub fn with_feature(mut self, name: impl Into<String>, value: f64) -> Self {
        self.features.push((name.into(), value));
        self
    }

    pub fn total_weight(&self) -> f64 {
        self.features.iter().map(|(_, v)| v).sum()
    }

    /// Alignment with the essence, plus 0.5 per effect keyword found in the id.
    pub fn alignment(&self, essence: &EssenceVector, effect_type: &str) -> f64 {
        let feature_score: f64 = self
            .features
            .iter()
            .map(|(name, value)| (1.0 - (value - essence.feature(name)).abs()) * value)
            .sum();

        let effect = effect_type.to_lowercase();
        let keyword_bonus = effect
            .split('_')
            .filter(|k| !k.is_empty() && self.id.contains(k))
            .count() as f64
            * 0.5;

        feature_score + keyword_bonus
    }
}

/// The built-in archetypes.
pub fn default_templates() -> Vec<AbilityTemplate> {
    use Dimension::*;
    vec![
        AbilityTemplate::new(
            "Berserker's {aspect}",
            "Your aggressive combat style has crystallized into raw {aspect} power.",
        )
        .with_kinds("COMBAT_START", "DAMAGE_BOOST", "AGGRESSIVE")
        .with_cost(25.0)
        .require(Aggression, 0.7)
        .require(Intensity, 0.6),
        AbilityTemplate::new(
            "Tactical {aspect}",
            "Your strategic approach to combat grants enhanced {aspect} capabilities.",
        )
        .with_kinds("ENEMY_SPOTTED", "ACCURACY_BOOST", "TACTICAL")
        .with_cost(20.0)
        .require(Aggression, 0.5)
        .require(Tactical, 0.6),
        AbilityTemplate::new(
            "Explorer's {aspect}",
            "Your keen observation skills manifest as heightened {aspect} awareness.",
        )
        .with_kinds("ENTER_NEW_LOCATION", "DISCOVERY_BOOST", "PERCEPTIVE")
        .with_cost(15.0)
        .require(Exploration, 0.6)
        .require(Intensity, 0.4),
        AbilityTemplate::new(
            "Pathfinder's {aspect}",
            "Your exploration patterns grant you enhanced {aspect} when venturing into unknown areas.",
        )
        .with_kinds("MOVEMENT_ACTION", "MOVEMENT_BOOST", "SWIFT")
        .with_cost(18.0)
        .require(Exploration, 0.5)
        .require(Tactical, 0.3),
        AbilityTemplate::new(
            "Diplomat's {aspect}",
            "Your social interactions have honed your {aspect} to remarkable levels.",
        )
        .with_kinds("SOCIAL_INTERACTION", "PERSUASION_BOOST", "CHARISMATIC")
        .with_cost(12.0)
        .require(Social, 0.6)
        .require(Consistency, 0.5),
        AbilityTemplate::new(
            "Survivor's {aspect}",
            "Your resilience and recovery patterns manifest as enhanced {aspect} regeneration.",
        )
        .with_kinds("LOW_HEALTH", "HEALING_BOOST", "RESILIENT")
        .with_cost(22.0)
        .require(Recovery, 0.7)
        .require(Consistency, 0.6),
        AbilityTemplate::new(
            "Meditation {aspect}",
            "Your disciplined rest patterns grant deep {aspect} restoration abilities.",
        )
        .with_kinds("REST_ACTION", "STAMINA_BOOST", "FOCUSED")
        .with_cost(16.0)
        .require(Recovery, 0.5)
        .require(Tactical, 0.4),
        AbilityTemplate::new(
            "Battlefield Tactician",
            "Your attack-defense patterns grant tactical superiority in combat sequences.",
        )
        .with_kinds("COMBAT_START", "TACTICAL_ADVANTAGE", "STRATEGIC")
        .with_cost(25.0)
        .require(Aggression, 0.4)
        .require(Tactical, 0.7),
        AbilityTemplate::new(
            "Scout's Intuition",
            "Your movement and observation patterns manifest as enhanced environmental awareness.",
        )
        .with_kinds("MOVEMENT_ACTION", "AWARENESS_BOOST", "PERCEPTIVE")
        .with_cost(18.0)
        .require(Exploration, 0.6)
        .require(Tactical, 0.3),
        AbilityTemplate::new(
            "Diplomatic Warrior",
            "Your pattern of negotiation followed by combat creates unique conflict resolution abilities.",
        )
        .with_kinds("SOCIAL_INTERACTION", "INFLUENCE_THEN_FORCE", "PERSUASIVE")
        .with_cost(22.0)
        .require(Social, 0.5)
        .require(Tactical, 0.6)
        .require(Aggression, 0.3),
        AbilityTemplate::new(
            "Fortress Mind",
            "Your defensive patterns create an unbreakable mental and physical fortification.",
        )
        .with_kinds("UNDER_ATTACK", "DEFENSIVE_MASTERY", "RESILIENT")
        .with_cost(20.0)
        .require(Tactical, 0.8)
        .require(Consistency, 0.6),
        AbilityTemplate::new(
            "Relentless Assault",
            "Your repeated attack patterns manifest as devastating offensive sequences.",
        )
        .with_kinds("FIRST_ATTACK", "COMBO_STRIKES", "AGGRESSIVE")
        .with_cost(28.0)
        .require(Aggression, 0.8)
        .require(Intensity, 0.7),
        AbilityTemplate::new(
            "Adaptive {aspect}",
            "Your varied behavioral patterns create flexible {aspect} adaptation abilities.",
        )
        .with_kinds("CONTEXT_CHANGE", "VERSATILITY_BOOST", "ADAPTIVE")
        .with_cost(30.0)
        .require(Complexity, 0.6)
        .require(Consistency, 0.5),
    ]
}

/// The built-in primitives.
pub fn default_primitives() -> Vec<AbilityPrimitive> {
    use PrimitiveKind::*;
    vec![
        AbilityPrimitive::new("damage_boost", Verb, 8.0)
            .with_feature("power", 0.8)
            .with_feature("aggression", 1.0),
        AbilityPrimitive::new("accuracy_boost", Verb, 6.0)
            .with_feature("precision", 0.7)
            .with_feature("tactical", 0.8),
        AbilityPrimitive::new("critical_chance", Adjective, 10.0)
            .with_feature("intensity", 0.9)
            .with_feature("aggression", 0.7),
        AbilityPrimitive::new("discovery_boost", Verb, 5.0)
            .with_feature("perception", 0.8)
            .with_feature("exploration", 1.0),
        AbilityPrimitive::new("movement_boost", Verb, 4.0)
            .with_feature("speed", 0.7)
            .with_feature("exploration", 0.6),
        AbilityPrimitive::new("hidden_detection", Noun, 7.0)
            .with_feature("awareness", 0.9)
            .with_feature("exploration", 0.8),
        AbilityPrimitive::new("persuasion_boost", Verb, 6.0)
            .with_feature("charisma", 0.8)
            .with_feature("social", 1.0),
        AbilityPrimitive::new("relationship_bonus", Noun, 5.0)
            .with_feature("empathy", 0.7)
            .with_feature("social", 0.8),
        AbilityPrimitive::new("healing_boost", Verb, 8.0)
            .with_feature("restoration", 0.9)
            .with_feature("recovery", 1.0),
        AbilityPrimitive::new("stamina_boost", Verb, 6.0)
            .with_feature("endurance", 0.7)
            .with_feature("recovery", 0.8),
        AbilityPrimitive::new("resistance_bonus", Adjective, 9.0)
            .with_feature("resilience", 0.8)
            .with_feature("recovery", 0.6),
        AbilityPrimitive::new("planning_boost", Verb, 7.0)
            .with_feature("strategy", 0.8)
            .with_feature("tactical", 1.0),
        AbilityPrimitive::new("timing_bonus", Adjective, 8.0)
            .with_feature("precision", 0.9)
            .with_feature("tactical", 0.7),
        AbilityPrimitive::new("versatility_boost", Noun, 12.0)
            .with_feature("adaptability", 1.0)
            .with_feature("complexity", 0.8),
        AbilityPrimitive::new("consistency_bonus", Adjective, 10.0)
            .with_feature("stability", 0.9)
            .with_feature("consistency", 1.0),
    ]
}

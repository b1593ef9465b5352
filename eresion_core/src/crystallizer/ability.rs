//! Ability types and the narrative seam.
//!
//! Crystallization is two-phase: the crystallizer produces a
//! [`PendingAbility`] with a draft narrative, and `finalize` turns it into an
//! [`AssembledAbility`] once a [`NarrativeSource`] has supplied the text.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::essence::Dimension;
use super::library::AbilityPrimitive;

/// Unique identifier for abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub Uuid);

impl AbilityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AbilityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AbilityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When an ability fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCondition {
    /// Template trigger, e.g. `COMBAT_START`.
    pub trigger_type: String,
    /// The aspect that shaped the ability.
    pub aspect: Dimension,
}

/// Presentation hints for the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManifestationDirective {
    VisualEffect { effect: String, intensity: f64 },
    AudioCue { sound: String, volume: f64 },
}

/// A composed, budget-valid ability waiting for its narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAbility {
    pub id: AbilityId,
    pub name: String,
    /// Template description with the aspect filled in.
    pub draft_narrative: String,
    pub source_motif_id: String,
    pub trigger: TriggerCondition,
    pub primitives: Vec<AbilityPrimitive>,
    pub cooldown_s: f64,
    pub resource_cost: f64,
    pub match_score: f64,
    pub manifestation: Vec<ManifestationDirective>,
}

/// A finished ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledAbility {
    pub id: AbilityId,
    pub name: String,
    pub narrative: String,
    pub source_motif_id: String,
    pub trigger: TriggerCondition,
    pub primitives: Vec<AbilityPrimitive>,
    pub cooldown_s: f64,
    pub resource_cost: f64,
    pub manifestation: Vec<ManifestationDirective>,
}

impl PendingAbility {
    /// Complete the ability with its narrative. An empty narrative falls
    /// back to the draft.
    pub fn finalize(self, narrative: impl Into<String>) -> AssembledAbility {
        let narrative = narrative.into();
        let narrative = if narrative.trim().is_empty() {
            self.draft_narrative
        } else {
            narrative
        };
        AssembledAbility {
            id: self.id,
            name: self.name,
            narrative,
            source_motif_id: self.source_motif_id,
            trigger: self.trigger,
            primitives: self.primitives,
            cooldown_s: self.cooldown_s,
            resource_cost: self.resource_cost,
            manifestation: self.manifestation,
        }
    }
}

/// Supplies ability narratives, e.g. from a text generator.
pub trait NarrativeSource {
    fn narrate(&self, pending: &PendingAbility) -> String;
}

/// Uses the template description as the narrative.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateNarrator;

impl NarrativeSource for TemplateNarrator {
    fn narrate(&self, pending: &PendingAbility) -> String {
        pending.draft_narrative.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingAbility {
        PendingAbility {
            id: AbilityId::new(),
            name: "Tactical Aggression".to_string(),
            draft_narrative: "draft".to_string(),
            source_motif_id: "ACTION_ATTACK→ACTION_DEFEND".to_string(),
            trigger: TriggerCondition {
                trigger_type: "ENEMY_SPOTTED".to_string(),
                aspect: Dimension::Aggression,
            },
            primitives: Vec::new(),
            cooldown_s: 12.0,
            resource_cost: 30.0,
            match_score: 0.8,
            manifestation: Vec::new(),
        }
    }

    #[test]
    fn test_finalize_uses_narrative() {
        let p = pending();
        let id = p.id;
        let ability = p.finalize("The blade remembers.");
        assert_eq!(ability.id, id);
        assert_eq!(ability.narrative, "The blade remembers.");
        assert_eq!(ability.resource_cost, 30.0);
    }

    #[test]
    fn test_empty_narrative_falls_back_to_draft() {
        assert_eq!(pending().finalize("  ").narrative, "draft");
    }

    #[test]
    fn test_template_narrator() {
        let p = pending();
        assert_eq!(TemplateNarrator.narrate(&p), "draft");
    }

    #[test]
    fn test_directive_wire_shape() {
        let directive = ManifestationDirective::AudioCue {
            sound: "damage_boost_activation".to_string(),
            volume: 0.5,
        };
        let json = serde_json::to_value(&directive).unwrap();
        assert_eq!(json["type"], "AUDIO_CUE");
        assert_eq!(json["sound"], "damage_boost_activation");
    }
}

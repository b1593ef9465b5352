//! Crystallizer - turns detected motifs into budget-bounded abilities.
//!
//! Per motif: extract the essence, rank the templates against it, compose at
//! most one ability per top template, and keep only those inside the power
//! budget. Empty results are normal and only show up in [`CrystallizerStats`].

mod ability;
mod essence;
mod library;

pub use ability::*;
pub use essence::*;
pub use library::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::CrystallizerConfig;
use crate::temporal_graph::BehavioralMotif;

/// Crystallization counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrystallizerStats {
    pub motifs_processed: u64,
    pub abilities_generated: u64,
    pub abilities_finalized: u64,
    pub rejected_budget: u64,
    /// Motifs for which no template scored high enough.
    pub rejected_template: u64,
    /// Templates for which no primitive qualified.
    pub composition_failures: u64,
    /// Mean cost over every generated ability.
    pub average_power_cost: f64,
    pub cached_essences: usize,
}

/// `(template + Σ primitives) · (0.5 + 0.5·intensity) · (1 + 0.3·complexity)`.
pub fn ability_cost(template_cost: f64, primitive_costs: f64, essence: &EssenceVector) -> f64 {
    let intensity_multiplier = 0.5 + essence.intensity * 0.5;
    let complexity_multiplier = 1.0 + essence.complexity * 0.3;
    (template_cost + primitive_costs) * intensity_multiplier * complexity_multiplier
}

/// Seconds between uses: `10 + 5·complexity`.
pub fn ability_cooldown(essence: &EssenceVector) -> f64 {
    10.0 + essence.complexity * 5.0
}

#[derive(Debug, Clone)]
pub struct AbilityCrystallizer {
    config: CrystallizerConfig,
    templates: Vec<AbilityTemplate>,
    primitives: Vec<AbilityPrimitive>,
    essence_cache: BTreeMap<String, EssenceVector>,
    stats: CrystallizerStats,
    total_cost: f64,
}

impl AbilityCrystallizer {
    /// Create a crystallizer over the built-in libraries.
    pub fn new(config: CrystallizerConfig) -> Self {
        Self::with_library(config, default_templates(), default_primitives())
    }

    pub fn with_defaults() -> Self {
        Self::new(CrystallizerConfig::default())
    }

    pub fn with_library(
        config: CrystallizerConfig,
        templates: Vec<AbilityTemplate>,
        primitives: Vec<AbilityPrimitive>,
    ) -> Self {
        Self {
            config,
            templates,
            primitives,
            essence_cache: BTreeMap::new(),
            stats: CrystallizerStats::default(),
            total_cost: 0.0,
        }
    }

    pub fn templates(&self) -> &[AbilityTemplate] {
        &self.templates
    }

    pub fn primitives(&self) -> &[AbilityPrimitive] {
        &self.primitives
    }

    /// Templates scoring above the minimum, best first.
    pub fn find_matching_templates(&self, essence: &EssenceVector) -> Vec<(&AbilityTemplate, f64)> {
        let mut matches: Vec<(&AbilityTemplate, f64)> = self
            .templates
            .iter()
            .map(|t| (t, t.match_score(essence)))
            .filter(|(_, score)| *score > self.config.min_template_score)
            .collect();
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        matches
    }

    /// Primitives aligned with the essence and the template's effect,
    /// heaviest first, at most `max_primitives`.
    pub fn select_primitives(
        &self,
        essence: &EssenceVector,
        template: &AbilityTemplate,
    ) -> Vec<AbilityPrimitive> {
        let mut selected: Vec<&AbilityPrimitive> = self
            .primitives
            .iter()
            .filter(|p| p.alignment(essence, &template.effect_type) > self.config.min_primitive_score)
            .collect();
        selected.sort_by(|a, b| {
            b.total_weight()
                .partial_cmp(&a.total_weight())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        selected
            .into_iter()
            .take(self.config.max_primitives)
            .cloned()
            .collect()
    }

    /// Compose one ability. `None` when no primitive qualifies.
    pub fn compose_ability(
        &self,
        motif: &BehavioralMotif,
        essence: &EssenceVector,
        template: &AbilityTemplate,
        match_score: f64,
    ) -> Option<PendingAbility> {
        let primitives = self.select_primitives(essence, template);
        if primitives.is_empty() {
            return None;
        }

        let aspect = essence.dominant_aspect();
        let primitive_costs: f64 = primitives.iter().map(|p| p.base_power_cost).sum();

        Some(PendingAbility {
            id: AbilityId::new(),
            name: template.render_name(aspect),
            draft_narrative: template.render_description(aspect),
            source_motif_id: motif.id.clone(),
            trigger: TriggerCondition {
                trigger_type: template.trigger_type.clone(),
                aspect,
            },
            primitives,
            cooldown_s: ability_cooldown(essence),
            resource_cost: ability_cost(template.base_power_cost, primitive_costs, essence),
            match_score,
            manifestation: vec![
                ManifestationDirective::VisualEffect {
                    effect: template.modifier_type.to_lowercase(),
                    intensity: essence.intensity,
                },
                ManifestationDirective::AudioCue {
                    sound: format!("{}_activation", template.effect_type.to_lowercase()),
                    volume: 0.3 + essence.intensity * 0.4,
                },
            ],
        })
    }

    /// A hard threshold: `resource_cost ≤ power_budget`.
    pub fn validate_power_budget(&self, ability: &PendingAbility) -> bool {
        ability.resource_cost <= self.config.power_budget
    }

    /// Run the full pipeline for one motif.
    pub fn crystallize(&mut self, motif: &BehavioralMotif) -> Vec<PendingAbility> {
        self.stats.motifs_processed += 1;

        let essence = extract_essence(motif);
        debug!(
            "essence of {}: dominant {} (intensity {:.3}, budget estimate {:.1})",
            motif.id,
            essence.dominant_aspect(),
            essence.intensity,
            essence.power_budget_estimate(self.config.power_scale)
        );

        let candidates: Vec<(AbilityTemplate, f64)> = self
            .find_matching_templates(&essence)
            .into_iter()
            .take(self.config.max_templates_per_motif)
            .map(|(t, score)| (t.clone(), score))
            .collect();

        if candidates.is_empty() {
            self.stats.rejected_template += 1;
            debug!("no template matches motif {}", motif.id);
        }

        let mut accepted = Vec::new();
        for (template, score) in &candidates {
            let Some(ability) = self.compose_ability(motif, &essence, template, *score) else {
                self.stats.composition_failures += 1;
                continue;
            };
            if !self.validate_power_budget(&ability) {
                self.stats.rejected_budget += 1;
                info!(
                    "rejected {}: cost {:.1} exceeds budget {:.1}",
                    ability.name, ability.resource_cost, self.config.power_budget
                );
                continue;
            }
            self.stats.abilities_generated += 1;
            self.total_cost += ability.resource_cost;
            accepted.push(ability);
        }

        if self.stats.abilities_generated > 0 {
            self.stats.average_power_cost =
                self.total_cost / self.stats.abilities_generated as f64;
        }
        self.essence_cache.insert(motif.id.clone(), essence);
        self.stats.cached_essences = self.essence_cache.len();
        accepted
    }

    /// Second phase: attach the narrative.
    pub fn finalize(
        &mut self,
        pending: PendingAbility,
        narrator: &dyn NarrativeSource,
    ) -> AssembledAbility {
        let narrative = narrator.narrate(&pending);
        let ability = pending.finalize(narrative);
        self.stats.abilities_finalized += 1;
        info!(
            "crystallized {} from {} (cost {:.1})",
            ability.name, ability.source_motif_id, ability.resource_cost
        );
        ability
    }

    /// The last essence extracted for a motif.
    pub fn essence(&self, motif_id: &str) -> Option<&EssenceVector> {
        self.essence_cache.get(motif_id)
    }

    pub fn stats(&self) -> &CrystallizerStats {
        &self.stats
    }

    pub fn clear_cache(&mut self) {
        self.essence_cache.clear();
        self.stats = CrystallizerStats::default();
        self.total_cost = 0.0;
    }
}

impl Default for AbilityCrystallizer {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal_graph::FeatureVector;
    use crate::tokenizer::TokenType;

    fn combat_motif() -> BehavioralMotif {
        BehavioralMotif::from_pair(
            TokenType::ActionAttack,
            TokenType::ActionDefend,
            0.6,
            FeatureVector {
                edge_weight: 0.8,
                source_intensity: 0.7,
                target_intensity: 0.6,
                co_occurrence_ratio: 0.9,
                temporal_consistency: 0.5,
                session_breadth: 1.0,
            },
            1,
            10.0,
        )
    }

    fn budget(power_budget: f64) -> CrystallizerConfig {
        CrystallizerConfig {
            power_budget,
            ..Default::default()
        }
    }

    /// One template of cost 25 and two primitives of cost 8 and 6 that
    /// always qualify for an aggressive essence.
    fn costed_library(config: CrystallizerConfig) -> AbilityCrystallizer {
        AbilityCrystallizer::with_library(
            config,
            vec![AbilityTemplate::new("Vanguard {aspect}", "{aspect} vanguard")
                .with_kinds("COMBAT_START", "ONSLAUGHT", "AGGRESSIVE")
                .with_cost(25.0)
                .require(Dimension::Aggression, 0.9)],
            vec![
                AbilityPrimitive::new("heavy_blow", PrimitiveKind::Verb, 8.0)
                    .with_feature("aggression", 1.0),
                AbilityPrimitive::new("quick_jab", PrimitiveKind::Verb, 6.0)
                    .with_feature("aggression", 0.95),
            ],
        )
    }

    fn costed_essence() -> EssenceVector {
        EssenceVector {
            motif_id: "test".to_string(),
            aggression: 0.9,
            intensity: 0.9,
            complexity: 0.9,
            ..Default::default()
        }
    }

    #[test]
    fn test_cost_formula() {
        let cost = ability_cost(25.0, 14.0, &costed_essence());
        assert!((cost - 39.0 * 0.95 * 1.27).abs() < 1e-9);
        assert!((cost - 47.05).abs() < 0.01);
    }

    #[test]
    fn test_budget_accepts_and_rejects() {
        let motif = combat_motif();
        let essence = costed_essence();

        for (power_budget, valid) in [(60.0, true), (40.0, false)] {
            let crystallizer = costed_library(budget(power_budget));
            let (template, score) = crystallizer.find_matching_templates(&essence)[0];
            let ability = crystallizer
                .compose_ability(&motif, &essence, template, score)
                .unwrap();

            assert_eq!(ability.primitives.len(), 2);
            assert!((ability.resource_cost - 47.05).abs() < 0.01);
            assert!((ability.cooldown_s - 14.5).abs() < 1e-9);
            assert_eq!(crystallizer.validate_power_budget(&ability), valid);
        }
    }

    #[test]
    fn test_no_primitive_means_no_ability() {
        let crystallizer = AbilityCrystallizer::with_library(
            CrystallizerConfig::default(),
            vec![AbilityTemplate::new("Calm", "calm").with_cost(5.0)],
            vec![AbilityPrimitive::new("focus", PrimitiveKind::Noun, 3.0).with_feature("stillness", 1.0)],
        );
        let essence = costed_essence();
        let template = &crystallizer.templates()[0];
        assert!(crystallizer
            .compose_ability(&combat_motif(), &essence, template, 0.5)
            .is_none());
    }

    #[test]
    fn test_crystallize_combat_motif() {
        let mut crystallizer = AbilityCrystallizer::with_defaults();
        let pending = crystallizer.crystallize(&combat_motif());

        assert!(!pending.is_empty() && pending.len() <= 2);
        let first = &pending[0];
        assert_eq!(first.name, "Fortress Mind");
        assert_eq!(first.trigger.trigger_type, "UNDER_ATTACK");
        assert_eq!(first.trigger.aspect, Dimension::Tactical);
        assert_eq!(first.source_motif_id, "ACTION_ATTACK→ACTION_DEFEND");

        let ids: Vec<&str> = first.primitives.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["damage_boost", "planning_boost", "critical_chance"]);
        // (20 + 25) · 1.0 · 1.12
        assert!((first.resource_cost - 50.4).abs() < 1e-9);
        assert!(matches!(
            &first.manifestation[1],
            ManifestationDirective::AudioCue { sound, .. } if sound == "defensive_mastery_activation"
        ));

        assert!(crystallizer.essence(&first.source_motif_id).is_some());
        assert_eq!(crystallizer.stats().motifs_processed, 1);
    }

    #[test]
    fn test_every_emitted_ability_within_budget() {
        for power_budget in [10.0, 40.0, 55.0, 100.0] {
            let mut crystallizer = AbilityCrystallizer::new(budget(power_budget));
            let pending = crystallizer.crystallize(&combat_motif());
            for ability in &pending {
                assert!(ability.resource_cost <= power_budget);
            }
            let stats = crystallizer.stats();
            assert_eq!(
                stats.abilities_generated + stats.rejected_budget + stats.composition_failures,
                2
            );
        }
    }

    #[test]
    fn test_no_matching_template_is_counted() {
        let mut crystallizer = AbilityCrystallizer::with_library(
            CrystallizerConfig::default(),
            vec![AbilityTemplate::new("Impossible", "never")
                .with_cost(1.0)
                .require(Dimension::Intensity, 0.0)
                .require(Dimension::Complexity, 1.0)],
            default_primitives(),
        );
        assert!(crystallizer.crystallize(&combat_motif()).is_empty());
        assert_eq!(crystallizer.stats().rejected_template, 1);
    }

    #[test]
    fn test_finalize_with_template_narrator() {
        let mut crystallizer = AbilityCrystallizer::with_defaults();
        let pending = crystallizer.crystallize(&combat_motif());
        let draft = pending[0].draft_narrative.clone();

        let ability = crystallizer.finalize(pending[0].clone(), &TemplateNarrator);
        assert_eq!(ability.narrative, draft);
        assert_eq!(crystallizer.stats().abilities_finalized, 1);

        crystallizer.clear_cache();
        assert!(crystallizer.essence("ACTION_ATTACK→ACTION_DEFEND").is_none());
        assert_eq!(crystallizer.stats().motifs_processed, 0);
    }
}

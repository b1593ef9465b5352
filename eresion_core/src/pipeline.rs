//! Pipeline - owns every stage and wires them together.
//!
//! ```text
//! RawEvent → Tokenizer → TemporalGraph → AbilityCrystallizer → pending
//!                  ↓              ↓                                ↓
//!            TokenEmitted   MotifDetected      finalize_pending → AbilityCrystallized
//! ```

use eresion_events::RawEvent;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::crystallizer::{
    AbilityCrystallizer, AssembledAbility, CrystallizerStats, NarrativeSource, PendingAbility,
};
use crate::error::ConfigResult;
use crate::events::{AbilityCrystallized, EventBus, MotifDetected, PipelineEvent, Subscriber};
use crate::temporal_graph::{BehavioralMotif, GraphStats, TemporalGraph};
use crate::tokenizer::{Token, Tokenizer, TokenizerStats};

/// Combined statistics of all stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStats {
    pub tokenizer: TokenizerStats,
    pub graph: GraphStats,
    pub crystallizer: CrystallizerStats,
    pub pending_abilities: usize,
    pub abilities: usize,
    pub zero_output_warning_issued: bool,
}

/// The single owner of the tokenizer, graph, crystallizer and bus.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    tokenizer: Tokenizer,
    graph: TemporalGraph,
    crystallizer: AbilityCrystallizer,
    bus: EventBus,
    pending: Vec<PendingAbility>,
    abilities: Vec<AssembledAbility>,
    tokens_processed: u64,
    motifs_seen: u64,
    zero_output_warned: bool,
}

impl Pipeline {
    /// Build a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self {
            tokenizer: Tokenizer::new(config.tokenizer.clone(), config.fusion.clone()),
            graph: TemporalGraph::new(config.graph.clone()),
            crystallizer: AbilityCrystallizer::new(config.crystallizer.clone()),
            bus: EventBus::new(),
            pending: Vec::new(),
            abilities: Vec::new(),
            tokens_processed: 0,
            motifs_seen: 0,
            zero_output_warned: false,
            config,
        })
    }

    /// Use a custom crystallizer, e.g. one with its own libraries.
    pub fn with_crystallizer(mut self, crystallizer: AbilityCrystallizer) -> Self {
        self.crystallizer = crystallizer;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.bus.subscribe(subscriber);
    }

    /// Process one inbound event through every stage.
    ///
    /// Returns the tokens it produced. Motifs detected on the way are
    /// crystallized immediately; the resulting abilities wait in the pending
    /// queue until [`Pipeline::finalize_pending`].
    pub fn handle_event(&mut self, raw: &RawEvent) -> Vec<Token> {
        let tokens = self.tokenizer.handle_event(raw);
        for token in &tokens {
            self.bus.publish(&PipelineEvent::TokenEmitted(token.clone()));
            let motifs = self.graph.add_token(token, None);
            self.tokens_processed += 1;
            self.process_motifs(motifs);
        }
        self.check_zero_output();
        tokens
    }

    /// Force an analysis pass at `now` (event-clock seconds).
    pub fn run_analysis(&mut self, now: f64) -> Vec<MotifDetected> {
        let motifs = self.graph.run_analysis(now);
        self.process_motifs(motifs)
    }

    fn process_motifs(&mut self, motifs: Vec<BehavioralMotif>) -> Vec<MotifDetected> {
        let mut published = Vec::with_capacity(motifs.len());
        for motif in motifs {
            self.motifs_seen += 1;
            let detected = MotifDetected::from(&motif);
            self.bus.publish(&PipelineEvent::MotifDetected(detected.clone()));
            published.push(detected);

            let abilities = self.crystallizer.crystallize(&motif);
            if !abilities.is_empty() {
                info!("{} ability(ies) pending from {}", abilities.len(), motif.id);
            }
            self.pending.extend(abilities);
        }
        published
    }

    fn check_zero_output(&mut self) {
        let threshold = self.config.diagnostics.zero_output_warning_tokens;
        if self.zero_output_warned || threshold == 0 || self.motifs_seen > 0 {
            return;
        }
        if self.tokens_processed >= threshold {
            self.zero_output_warned = true;
            warn!(
                "{} tokens processed without a single motif; check min_edge_weight ({}), \
                 pmi_threshold ({}) and motif_stability_threshold ({})",
                self.tokens_processed,
                self.config.graph.min_edge_weight,
                self.config.graph.pmi_threshold,
                self.config.graph.motif_stability_threshold
            );
        }
    }

    pub fn pending(&self) -> &[PendingAbility] {
        &self.pending
    }

    /// Finalize every pending ability in composition order, then publish
    /// one `AbilityCrystallized` per ability.
    pub fn finalize_pending(&mut self, narrator: &dyn NarrativeSource) -> Vec<AssembledAbility> {
        let pending = std::mem::take(&mut self.pending);
        let finished: Vec<AssembledAbility> = pending
            .into_iter()
            .map(|p| self.crystallizer.finalize(p, narrator))
            .collect();

        for ability in &finished {
            self.bus
                .publish(&PipelineEvent::AbilityCrystallized(AbilityCrystallized::from(ability)));
        }
        self.abilities.extend(finished.iter().cloned());
        finished
    }

    /// Every finalized ability, oldest first.
    pub fn abilities(&self) -> &[AssembledAbility] {
        &self.abilities
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn graph(&self) -> &TemporalGraph {
        &self.graph
    }

    pub fn crystallizer(&self) -> &AbilityCrystallizer {
        &self.crystallizer
    }

    pub fn start_new_session(&mut self) -> u32 {
        self.graph.start_new_session()
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            tokenizer: self.tokenizer.stats().clone(),
            graph: self.graph.stats(),
            crystallizer: self.crystallizer.stats().clone(),
            pending_abilities: self.pending.len(),
            abilities: self.abilities.len(),
            zero_output_warning_issued: self.zero_output_warned,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiagnosticsConfig;
    use crate::crystallizer::TemplateNarrator;
    use crate::events::{EventKind, RecordingSubscriber};

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn command(verb: &str, ts: u64) -> RawEvent {
        RawEvent::new("CommandParsed", "parser", ts).with_data("verb", verb)
    }

    /// Attack/defend pairs 0.5 s apart, 15 s between pairs.
    fn combat_events(pairs: u64) -> Vec<RawEvent> {
        (0..pairs)
            .flat_map(|i| {
                let t = i * 15_000;
                [command("attack", t), command("defend", t + 500)]
            })
            .collect()
    }

    struct Echo;

    impl NarrativeSource for Echo {
        fn narrate(&self, pending: &PendingAbility) -> String {
            format!("{} awakens.", pending.name)
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = PipelineConfig::default();
        config.crystallizer.power_budget = 0.0;
        assert!(Pipeline::new(config).is_err());
    }

    #[test]
    fn test_combat_stream_end_to_end() {
        init_logging();
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let recorder = RecordingSubscriber::new();
        let events = recorder.handle();
        pipeline.subscribe(Box::new(recorder));

        for event in combat_events(8) {
            pipeline.handle_event(&event);
        }
        pipeline.run_analysis(110.0);

        let recorded = events.events();
        let combat_motifs = recorded
            .iter()
            .filter(|e| matches!(e, PipelineEvent::MotifDetected(m) if m.motif_id == "ACTION_ATTACK→ACTION_DEFEND"))
            .count();
        assert_eq!(combat_motifs, 1);
        assert!(!pipeline.pending().is_empty());

        let finished = pipeline.finalize_pending(&Echo);
        assert!(pipeline.pending().is_empty());
        for ability in &finished {
            assert!(ability.resource_cost <= pipeline.config().crystallizer.power_budget);
            assert!(ability.narrative.ends_with("awakens."));
        }

        let crystallized: Vec<_> = events
            .events()
            .into_iter()
            .filter(|e| e.kind() == EventKind::AbilityCrystallized)
            .collect();
        assert_eq!(crystallized.len(), finished.len());
        assert_eq!(pipeline.abilities().len(), finished.len());

        // Crystallization events follow every motif event.
        let all = events.events();
        let last_motif = all.iter().rposition(|e| e.kind() == EventKind::MotifDetected);
        let first_ability = all.iter().position(|e| e.kind() == EventKind::AbilityCrystallized);
        assert!(last_motif < first_ability);
    }

    #[test]
    fn test_token_events_published_in_order() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        let recorder = RecordingSubscriber::only([EventKind::TokenEmitted]);
        let events = recorder.handle();
        pipeline.subscribe(Box::new(recorder));

        let tokens: Vec<Token> = combat_events(2)
            .iter()
            .flat_map(|e| pipeline.handle_event(e))
            .collect();

        let published: Vec<Token> = events
            .events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::TokenEmitted(token) => Some(token),
                _ => None,
            })
            .collect();
        assert_eq!(published, tokens);
    }

    #[test]
    fn test_replay_is_deterministic() {
        let run = || {
            let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
            let tokens: Vec<Token> = combat_events(6)
                .iter()
                .flat_map(|e| pipeline.handle_event(e))
                .collect();
            (tokens, pipeline.graph().edge_snapshot(), pipeline.graph().motifs(None).to_vec())
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_zero_output_diagnostic() {
        init_logging();
        let config = PipelineConfig {
            diagnostics: DiagnosticsConfig {
                zero_output_warning_tokens: 5,
            },
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(config).unwrap();

        // Mixed verbs 30 s apart: no runs and no relationships.
        let verbs = ["attack", "rest", "look", "talk", "attack"];
        for (i, verb) in verbs.iter().enumerate().take(4) {
            pipeline.handle_event(&command(verb, i as u64 * 30_000));
        }
        assert!(!pipeline.stats().zero_output_warning_issued);

        pipeline.handle_event(&command(verbs[4], 120_000));
        assert!(pipeline.stats().zero_output_warning_issued);
    }

    #[test]
    fn test_template_narrator_keeps_draft() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).unwrap();
        for event in combat_events(8) {
            pipeline.handle_event(&event);
        }
        pipeline.run_analysis(110.0);

        let drafts: Vec<String> = pipeline
            .pending()
            .iter()
            .map(|p| p.draft_narrative.clone())
            .collect();
        let finished = pipeline.finalize_pending(&TemplateNarrator);
        let narratives: Vec<String> = finished.into_iter().map(|a| a.narrative).collect();
        assert_eq!(narratives, drafts);
        assert_eq!(pipeline.stats().abilities, drafts.len());
    }
}

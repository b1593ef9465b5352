//! Outbound contracts and in-process dispatch.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::crystallizer::{AbilityId, AssembledAbility};
use crate::temporal_graph::{BehavioralMotif, FeatureVector};
use crate::tokenizer::{Token, TokenType};

/// Published once per detected, non-duplicate motif.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifDetected {
    pub motif_id: String,
    pub stability: f64,
    pub sequence: Vec<TokenType>,
    pub feature_vector: FeatureVector,
    pub session: u32,
}

impl From<&BehavioralMotif> for MotifDetected {
    fn from(motif: &BehavioralMotif) -> Self {
        Self {
            motif_id: motif.id.clone(),
            stability: motif.stability,
            sequence: motif.sequence.clone(),
            feature_vector: motif.feature_vector,
            session: motif.session_seen_in,
        }
    }
}

/// Published once per finalized, budget-valid ability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityCrystallized {
    pub ability_id: AbilityId,
    pub ability_name: String,
    pub source_motif_id: String,
    pub power_cost: f64,
    pub trigger_type: String,
    pub narrative: String,
}

impl From<&AssembledAbility> for AbilityCrystallized {
    fn from(ability: &AssembledAbility) -> Self {
        Self {
            ability_id: ability.id,
            ability_name: ability.name.clone(),
            source_motif_id: ability.source_motif_id.clone(),
            power_cost: ability.resource_cost,
            trigger_type: ability.trigger.trigger_type.clone(),
            narrative: ability.narrative.clone(),
        }
    }
}

/// Everything the pipeline publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    TokenEmitted(Token),
    MotifDetected(MotifDetected),
    AbilityCrystallized(AbilityCrystallized),
}

/// Kinds of [`PipelineEvent`], for subscription filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TokenEmitted,
    MotifDetected,
    AbilityCrystallized,
}

impl PipelineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PipelineEvent::TokenEmitted(_) => EventKind::TokenEmitted,
            PipelineEvent::MotifDetected(_) => EventKind::MotifDetected,
            PipelineEvent::AbilityCrystallized(_) => EventKind::AbilityCrystallized,
        }
    }
}

/// Receives pipeline events synchronously.
pub trait Subscriber {
    /// Only events of these kinds are delivered; `None` means all.
    fn kinds(&self) -> Option<&[EventKind]> {
        None
    }

    fn on_event(&mut self, event: &PipelineEvent);
}

/// Delivers every published event to the subscribers in registration order.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Box<dyn Subscriber>>,
    published: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn publish(&mut self, event: &PipelineEvent) {
        self.published += 1;
        let kind = event.kind();
        for subscriber in &mut self.subscribers {
            let wanted = subscriber.kinds().map_or(true, |kinds| kinds.contains(&kind));
            if wanted {
                subscriber.on_event(event);
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("published", &self.published)
            .finish()
    }
}

/// Collects events into a shared buffer.
#[derive(Debug, Clone, Default)]
pub struct RecordingSubscriber {
    kinds: Option<Vec<EventKind>>,
    events: Arc<Mutex<Vec<PipelineEvent>>>,
}

impl RecordingSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record only the given kinds.
    pub fn only(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            kinds: Some(kinds.into_iter().collect()),
            events: Arc::default(),
        }
    }

    /// A handle that sees everything this subscriber records.
    pub fn handle(&self) -> RecordingSubscriber {
        self.clone()
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Subscriber for RecordingSubscriber {
    fn kinds(&self) -> Option<&[EventKind]> {
        self.kinds.as_deref()
    }

    fn on_event(&mut self, event: &PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

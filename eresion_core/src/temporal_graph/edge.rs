//! Nodes and edges of the temporal graph.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::tokenizer::{Token, TokenType};

/// Per-token-type statistics. Created on first sight, never removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub token_type: TokenType,
    pub count: u64,
    pub total_intensity: f64,
    pub last_seen: f64,
    pub sessions_seen: BTreeSet<u32>,
}

impl GraphNode {
    pub fn new(token_type: TokenType) -> Self {
        Self {
            token_type,
            count: 0,
            total_intensity: 0.0,
            last_seen: 0.0,
            sessions_seen: BTreeSet::new(),
        }
    }

    pub fn observe(&mut self, token: &Token, session: u32) {
        self.count += 1;
        self.total_intensity += token.intensity;
        self.last_seen = self.last_seen.max(token.timestamp);
        self.sessions_seen.insert(session);
    }

    pub fn average_intensity(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_intensity / self.count as f64
        }
    }
}

/// How two tokens were related when an edge was reinforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relationship {
    CoOccurrence,
    Succession,
}

/// Decay and growth constants for edge updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeDynamics {
    pub beta: f64,
    pub lambda: f64,
    pub tau_ms: f64,
}

/// Directed relationship `source → target`.
///
/// `weight` stays in [0, 1] after every update. The raw counters are kept
/// apart from the weight since significance testing works on joint counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: TokenType,
    pub target: TokenType,
    pub weight: f64,
    /// Seconds on the event clock.
    pub last_update: f64,
    pub co_occurrence_count: u64,
    pub succession_count: u64,
    pub total_reinforcement: f64,
}

impl GraphEdge {
    pub fn new(source: TokenType, target: TokenType, created_at: f64) -> Self {
        Self {
            source,
            target,
            weight: 0.0,
            last_update: created_at,
            co_occurrence_count: 0,
            succession_count: 0,
            total_reinforcement: 0.0,
        }
    }

    pub fn occurrences(&self) -> u64 {
        self.co_occurrence_count + self.succession_count
    }

    /// `weight *= exp(-λ·Δt_ms/τ)`, then move `last_update` to `now`.
    ///
    /// Time never runs backwards for an edge: an earlier `now` is a no-op.
    /// Returns `true` if the weight changed.
    pub fn apply_decay(&mut self, now: f64, dynamics: &EdgeDynamics) -> bool {
        let elapsed_ms = (now - self.last_update) * 1000.0;
        if !(elapsed_ms > 0.0) {
            return false;
        }
        let before = self.weight;
        let factor = if dynamics.tau_ms > 0.0 {
            (-dynamics.lambda * elapsed_ms / dynamics.tau_ms).exp()
        } else {
            0.0
        };
        self.weight = (self.weight * factor).clamp(0.0, 1.0);
        self.last_update = now;
        self.weight != before
    }

    /// Decay to `now`, then grow by `β·strength·fusion`, capped at 1.
    pub fn reinforce(
        &mut self,
        relationship: Relationship,
        strength: f64,
        fusion: f64,
        now: f64,
        dynamics: &EdgeDynamics,
    ) {
        self.apply_decay(now, dynamics);

        let growth = (dynamics.beta * strength * fusion).max(0.0);
        let growth = if growth.is_finite() { growth } else { 0.0 };
        self.weight = (self.weight + growth).min(1.0);
        self.total_reinforcement += growth;

        match relationship {
            Relationship::CoOccurrence => self.co_occurrence_count += 1,
            Relationship::Succession => self.succession_count += 1,
        }
    }
}

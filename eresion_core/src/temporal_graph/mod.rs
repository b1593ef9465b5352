//! Temporal Graph - a decaying relationship graph over token types.
//!
//! Every token updates its node and reinforces edges from the recent tokens
//! it co-occurs with or follows. A periodic analysis pass decays all edges
//! and tests the strong ones for significance; the survivors become
//! [`BehavioralMotif`]s.
//!
//! Time comes only from token timestamps, so replaying the same stream gives
//! the same graph.

mod edge;
mod motif;

pub use edge::*;
pub use motif::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::config::GraphConfig;
use crate::tokenizer::{Token, TokenType};

/// Edges at or above this weight count as strong in [`GraphStats`].
const STRONG_EDGE_WEIGHT: f64 = 0.5;

/// Snapshot of graph counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub strong_edges: usize,
    pub average_edge_weight: f64,
    pub current_session: u32,
    pub tokens_processed: u64,
    pub edges_created: u64,
    pub reinforcements_applied: u64,
    pub decay_operations: u64,
    pub analysis_runs: u64,
    pub motifs_detected: u64,
}

#[derive(Debug, Clone, Default)]
struct Counters {
    tokens_processed: u64,
    edges_created: u64,
    reinforcements_applied: u64,
    decay_operations: u64,
    analysis_runs: u64,
}

/// The decaying relationship graph and its motif detector.
#[derive(Debug, Clone)]
pub struct TemporalGraph {
    config: GraphConfig,
    nodes: BTreeMap<TokenType, GraphNode>,
    /// Adjacency: source → target → edge.
    edges: BTreeMap<TokenType, BTreeMap<TokenType, GraphEdge>>,
    window: VecDeque<(Token, u32)>,
    current_session: u32,
    last_analysis: Option<f64>,
    detected: Vec<BehavioralMotif>,
    recent_motif_ids: VecDeque<String>,
    counters: Counters,
}

impl TemporalGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
            window: VecDeque::new(),
            current_session: 1,
            last_analysis: None,
            detected: Vec::new(),
            recent_motif_ids: VecDeque::new(),
            counters: Counters::default(),
        }
    }

    fn dynamics(&self) -> EdgeDynamics {
        EdgeDynamics {
            beta: self.config.beta,
            lambda: self.config.lambda,
            tau_ms: self.config.tau_ms,
        }
    }

    pub fn current_session(&self) -> u32 {
        self.current_session
    }

    /// Add a token observed in `session` (the current session if `None`).
    ///
    /// Returns the motifs found if this token triggered an analysis pass.
    pub fn add_token(&mut self, token: &Token, session: Option<u32>) -> Vec<BehavioralMotif> {
        let session = session.unwrap_or(self.current_session);
        let now = token.timestamp;

        self.nodes
            .entry(token.token_type)
            .or_insert_with(|| GraphNode::new(token.token_type))
            .observe(token, session);

        if self.window.len() >= self.config.window_capacity.max(1) {
            self.window.pop_front();
        }
        self.window.push_back((token.clone(), session));

        self.update_relationships(token, now);
        self.counters.tokens_processed += 1;

        match self.last_analysis {
            None => {
                self.last_analysis = Some(now);
                Vec::new()
            }
            Some(last) if now - last > self.config.analysis_interval_s => self.run_analysis(now),
            Some(_) => Vec::new(),
        }
    }

    fn update_relationships(&mut self, current: &Token, now: f64) {
        let dynamics = self.dynamics();
        let fusion = current.metadata.factors.fusion_product;

        let preceding = self.window.len().saturating_sub(1);
        let start = preceding.saturating_sub(self.config.relationship_window);

        let mut updates = Vec::new();
        for (other, _) in self.window.range(start..preceding) {
            if other.token_type == current.token_type {
                continue;
            }
            let time_diff = (current.timestamp - other.timestamp).abs();

            let (relationship, strength) = if time_diff <= self.config.co_occurrence_window_s {
                (
                    Relationship::CoOccurrence,
                    (current.intensity + other.intensity) / 2.0,
                )
            } else if time_diff <= self.config.succession_window_s {
                let falloff = if self.config.succession_half_life_s > 0.0 {
                    (-time_diff / self.config.succession_half_life_s).exp()
                } else {
                    0.0
                };
                (Relationship::Succession, current.intensity * falloff)
            } else {
                continue;
            };
            updates.push((other.token_type, relationship, strength));
        }

        for (source, relationship, strength) in updates {
            let targets = self.edges.entry(source).or_default();
            let edge = targets.entry(current.token_type).or_insert_with(|| {
                self.counters.edges_created += 1;
                debug!("created edge {}→{}", source, current.token_type);
                GraphEdge::new(source, current.token_type, now)
            });
            edge.reinforce(relationship, strength, fusion, now, &dynamics);
            self.counters.reinforcements_applied += 1;
        }
    }

    /// Decay every edge to `now` and test the strong ones for significance.
    ///
    /// Never fails; insufficient signal yields an empty result.
    pub fn run_analysis(&mut self, now: f64) -> Vec<BehavioralMotif> {
        self.last_analysis = Some(now);
        self.counters.analysis_runs += 1;

        let dynamics = self.dynamics();
        let mut decayed = 0;
        for edge in self.edges.values_mut().flat_map(|t| t.values_mut()) {
            if edge.apply_decay(now, &dynamics) {
                decayed += 1;
            }
        }
        self.counters.decay_operations += decayed;

        let total: u64 = self.nodes.values().map(|n| n.count).sum();
        let mut found = Vec::new();

        for edge in self.edges.values().flat_map(|t| t.values()) {
            if edge.weight < self.config.min_edge_weight {
                continue;
            }
            let (Some(source), Some(target)) =
                (self.nodes.get(&edge.source), self.nodes.get(&edge.target))
            else {
                continue;
            };

            let joint = edge.occurrences().max(1);
            let pmi = pmi(joint, source.count, target.count, total);
            if pmi < self.config.pmi_threshold {
                continue;
            }
            let chi2 = chi_squared(joint, source.count, target.count, total);
            if chi2 < self.config.chi2_threshold {
                continue;
            }
            let stability = stability(chi2, self.config.stability_k, self.config.stability_theta);
            debug!(
                "{}→{}: pmi={:.3} chi2={:.3} stability={:.3}",
                edge.source, edge.target, pmi, chi2, stability
            );
            if stability < self.config.motif_stability_threshold {
                continue;
            }

            let id = motif_id(edge.source, edge.target);
            if self.recent_motif_ids.contains(&id) || found.iter().any(|m: &BehavioralMotif| m.id == id) {
                continue;
            }

            let features = self.features(edge, source, target);
            found.push(BehavioralMotif::from_pair(
                edge.source,
                edge.target,
                stability,
                features,
                self.current_session,
                now,
            ));
        }

        for motif in &found {
            info!("detected motif {} (stability {:.3})", motif.id, motif.stability);
            self.remember(motif.id.clone());
        }
        self.detected.extend(found.iter().cloned());
        found
    }

    fn remember(&mut self, id: String) {
        if self.config.duplicate_suppression_window == 0 {
            return;
        }
        if self.recent_motif_ids.len() >= self.config.duplicate_suppression_window {
            self.recent_motif_ids.pop_front();
        }
        self.recent_motif_ids.push_back(id);
    }

    fn features(&self, edge: &GraphEdge, source: &GraphNode, target: &GraphNode) -> FeatureVector {
        let occurrences = edge.occurrences().max(1) as f64;
        let sessions = source.sessions_seen.union(&target.sessions_seen).count();
        FeatureVector {
            edge_weight: edge.weight,
            source_intensity: source.average_intensity(),
            target_intensity: target.average_intensity(),
            co_occurrence_ratio: edge.co_occurrence_count as f64 / occurrences,
            temporal_consistency: (edge.total_reinforcement / occurrences).min(1.0),
            session_breadth: sessions as f64 / self.current_session.max(1) as f64,
        }
    }

    pub fn node(&self, token_type: TokenType) -> Option<&GraphNode> {
        self.nodes.get(&token_type)
    }

    pub fn edge(&self, source: TokenType, target: TokenType) -> Option<&GraphEdge> {
        self.edges.get(&source).and_then(|t| t.get(&target))
    }

    /// All edges, strongest first.
    pub fn edge_snapshot(&self) -> Vec<GraphEdge> {
        let mut edges: Vec<GraphEdge> = self
            .edges
            .values()
            .flat_map(|t| t.values().cloned())
            .collect();
        edges.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        edges
    }

    /// Detected motifs, oldest first; `limit` keeps only the most recent.
    pub fn motifs(&self, limit: Option<usize>) -> &[BehavioralMotif] {
        let skip = limit
            .map(|l| self.detected.len().saturating_sub(l))
            .unwrap_or(0);
        &self.detected[skip..]
    }

    pub fn stats(&self) -> GraphStats {
        let weights: Vec<f64> = self
            .edges
            .values()
            .flat_map(|t| t.values().map(|e| e.weight))
            .collect();
        let average_edge_weight = if weights.is_empty() {
            0.0
        } else {
            weights.iter().sum::<f64>() / weights.len() as f64
        };

        GraphStats {
            nodes: self.nodes.len(),
            edges: weights.len(),
            strong_edges: weights.iter().filter(|w| **w > STRONG_EDGE_WEIGHT).count(),
            average_edge_weight,
            current_session: self.current_session,
            tokens_processed: self.counters.tokens_processed,
            edges_created: self.counters.edges_created,
            reinforcements_applied: self.counters.reinforcements_applied,
            decay_operations: self.counters.decay_operations,
            analysis_runs: self.counters.analysis_runs,
            motifs_detected: self.detected.len() as u64,
        }
    }

    pub fn start_new_session(&mut self) -> u32 {
        self.current_session += 1;
        info!("started session {}", self.current_session);
        self.current_session
    }

    /// Drop all nodes, edges, motifs and counters. The session counter is kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.window.clear();
        self.detected.clear();
        self.recent_motif_ids.clear();
        self.last_analysis = None;
        self.counters = Counters::default();
    }
}

impl Default for TemporalGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

//! Behavioral motifs and the significance statistics used to find them.

use serde::{Deserialize, Serialize};

use crate::math::logistic;
use crate::tokenizer::TokenType;

/// Graph-derived features of a motif.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub edge_weight: f64,
    pub source_intensity: f64,
    pub target_intensity: f64,
    /// Share of the joint observations that were co-occurrences.
    pub co_occurrence_ratio: f64,
    /// Mean reinforcement per observation, capped at 1.
    pub temporal_consistency: f64,
    /// Fraction of sessions so far in which either endpoint was seen.
    pub session_breadth: f64,
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            edge_weight: 0.0,
            source_intensity: 0.0,
            target_intensity: 0.0,
            co_occurrence_ratio: 0.5,
            temporal_consistency: 0.0,
            session_breadth: 0.0,
        }
    }
}

/// A statistically significant relationship between token types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralMotif {
    /// `SOURCE→TARGET`.
    pub id: String,
    /// Ordered token types; the graph always produces pairs.
    pub sequence: Vec<TokenType>,
    pub stability: f64,
    pub feature_vector: FeatureVector,
    pub session_seen_in: u32,
    /// Event-clock seconds of the analysis pass that found it.
    pub detected_at: f64,
}

impl BehavioralMotif {
    pub fn from_pair(
        source: TokenType,
        target: TokenType,
        stability: f64,
        feature_vector: FeatureVector,
        session_seen_in: u32,
        detected_at: f64,
    ) -> Self {
        Self {
            id: motif_id(source, target),
            sequence: vec![source, target],
            stability,
            feature_vector,
            session_seen_in,
            detected_at,
        }
    }
}

pub fn motif_id(source: TokenType, target: TokenType) -> String {
    format!("{}→{}", source, target)
}

/// Pointwise mutual information `ln(P(joint) / (P(source)·P(target)))`.
///
/// Any zero count yields 0.
pub fn pmi(joint: u64, source_count: u64, target_count: u64, total: u64) -> f64 {
    if total == 0 || source_count == 0 || target_count == 0 || joint == 0 {
        return 0.0;
    }
    let total = total as f64;
    let p_joint = joint as f64 / total;
    let p_source = source_count as f64 / total;
    let p_target = target_count as f64 / total;
    (p_joint / (p_source * p_target)).ln()
}

/// χ² statistic `(joint - expected)² / expected` with
/// `expected = source·target / total`. Any zero count yields 0.
pub fn chi_squared(joint: u64, source_count: u64, target_count: u64, total: u64) -> f64 {
    if total == 0 || source_count == 0 || target_count == 0 {
        return 0.0;
    }
    let expected = source_count as f64 * target_count as f64 / total as f64;
    if expected <= 0.0 {
        return 0.0;
    }
    (joint as f64 - expected).powi(2) / expected
}

/// Stability in [0, 1] from the logistic curve over χ².
pub fn stability(chi2: f64, k: f64, theta: f64) -> f64 {
    logistic(chi2, k, theta)
}

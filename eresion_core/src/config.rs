//! Pipeline configuration. Every tunable is a plain number with a documented
//! default; loading from TOML is provided for hosts that want it.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Tokenizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// How far back an outcome looks for the actions that caused it.
    pub correlation_window_ms: u64,

    /// Maximum number of pending actions kept for correlation.
    pub pending_action_capacity: usize,

    /// Maximum number of tokens kept in the tokenizer history.
    pub history_capacity: usize,

    /// Number of consecutive actions that form a behavior run.
    pub pattern_run_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            correlation_window_ms: 2000,
            pending_action_capacity: 100,
            history_capacity: 10_000,
            pattern_run_length: 3,
        }
    }
}

/// Per-context intensity multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub environment: f64,
    pub biometric: f64,
    pub social: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            environment: 1.2,
            biometric: 1.5,
            social: 1.1,
        }
    }
}

/// Temporal graph and motif detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Reinforcement rate β.
    pub beta: f64,

    /// Decay time constant τ in milliseconds.
    pub tau_ms: f64,

    /// Decay rate λ.
    pub lambda: f64,

    /// Sliding window of recent tokens.
    pub window_capacity: usize,

    /// How many of the most recent tokens a new token is related to.
    pub relationship_window: usize,

    pub co_occurrence_window_s: f64,
    pub succession_window_s: f64,
    pub succession_half_life_s: f64,

    /// Seconds of event time between analysis passes.
    pub analysis_interval_s: f64,

    /// Edges below this weight are not tested for significance.
    pub min_edge_weight: f64,

    pub pmi_threshold: f64,
    pub chi2_threshold: f64,

    /// Steepness k of the stability curve.
    pub stability_k: f64,

    /// Midpoint θ of the stability curve.
    pub stability_theta: f64,

    pub motif_stability_threshold: f64,

    /// A motif is not re-emitted while its id is among this many most recent detections.
    pub duplicate_suppression_window: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            beta: 0.1,
            tau_ms: 60_000.0,
            lambda: 0.1,
            window_capacity: 1000,
            relationship_window: 20,
            co_occurrence_window_s: 2.0,
            succession_window_s: 10.0,
            succession_half_life_s: 5.0,
            analysis_interval_s: 5.0,
            min_edge_weight: 0.3,
            pmi_threshold: 0.5,
            chi2_threshold: 0.0,
            stability_k: 1.0,
            stability_theta: 1.5,
            motif_stability_threshold: 0.4,
            duplicate_suppression_window: 10,
        }
    }
}

/// Crystallization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrystallizerConfig {
    /// Maximum resource cost of an accepted ability.
    pub power_budget: f64,

    /// Scale used by the essence power estimate.
    pub power_scale: f64,

    pub max_templates_per_motif: usize,
    pub min_template_score: f64,
    pub min_primitive_score: f64,
    pub max_primitives: usize,
}

impl Default for CrystallizerConfig {
    fn default() -> Self {
        Self {
            power_budget: 100.0,
            power_scale: 10.0,
            max_templates_per_motif: 2,
            min_template_score: 0.3,
            min_primitive_score: 0.8,
            max_primitives: 3,
        }
    }
}

/// Operator diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Warn once if this many tokens pass without a single motif.
    pub zero_output_warning_tokens: u64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            zero_output_warning_tokens: 500,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub tokenizer: TokenizerConfig,
    pub fusion: FusionConfig,
    pub graph: GraphConfig,
    pub crystallizer: CrystallizerConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl PipelineConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: PipelineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every value is in its meaningful range.
    pub fn validate(&self) -> ConfigResult<()> {
        let g = &self.graph;
        let c = &self.crystallizer;

        positive("graph.tau_ms", g.tau_ms)?;
        non_negative("graph.lambda", g.lambda)?;
        non_negative("graph.beta", g.beta)?;
        positive("graph.co_occurrence_window_s", g.co_occurrence_window_s)?;
        positive("graph.succession_half_life_s", g.succession_half_life_s)?;
        non_negative("graph.analysis_interval_s", g.analysis_interval_s)?;
        non_negative("graph.chi2_threshold", g.chi2_threshold)?;
        non_negative("graph.stability_k", g.stability_k)?;
        probability("graph.min_edge_weight", g.min_edge_weight)?;
        probability("graph.motif_stability_threshold", g.motif_stability_threshold)?;

        if g.succession_window_s < g.co_occurrence_window_s {
            return Err(ConfigError::Invalid {
                field: "graph.succession_window_s",
                reason: "must not be shorter than the co-occurrence window".to_string(),
            });
        }
        if g.window_capacity < 2 {
            return Err(ConfigError::Invalid {
                field: "graph.window_capacity",
                reason: "must hold at least two tokens".to_string(),
            });
        }

        non_negative("fusion.environment", self.fusion.environment)?;
        non_negative("fusion.biometric", self.fusion.biometric)?;
        non_negative("fusion.social", self.fusion.social)?;

        positive("crystallizer.power_budget", c.power_budget)?;
        non_negative("crystallizer.power_scale", c.power_scale)?;
        probability("crystallizer.min_template_score", c.min_template_score)?;

        if self.tokenizer.pattern_run_length < 2 {
            return Err(ConfigError::Invalid {
                field: "tokenizer.pattern_run_length",
                reason: "a run needs at least two actions".to_string(),
            });
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a positive number, got {}", value),
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a non-negative number, got {}", value),
        })
    }
}

fn probability(field: &'static str, value: f64) -> ConfigResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("expected a value in [0, 1], got {}", value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tokenizer.correlation_window_ms, 2000);
        assert_eq!(config.graph.beta, 0.1);
        assert_eq!(config.graph.motif_stability_threshold, 0.4);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [graph]
            beta = 0.25
            pmi_threshold = 0.8

            [crystallizer]
            power_budget = 60.0
            "#,
        )
        .unwrap();

        assert_eq!(config.graph.beta, 0.25);
        assert_eq!(config.graph.pmi_threshold, 0.8);
        assert_eq!(config.graph.tau_ms, 60_000.0);
        assert_eq!(config.crystallizer.power_budget, 60.0);
        assert_eq!(config.fusion.biometric, 1.5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PipelineConfig::from_toml_str("[graph]\ntau_ms = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "graph.tau_ms", .. }));

        let err = PipelineConfig::from_toml_str("[crystallizer]\npower_budget = -5.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "crystallizer.power_budget", .. }));

        let err = PipelineConfig::from_toml_str("[graph]\nmotif_stability_threshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_parse_error() {
        let err = PipelineConfig::from_toml_str("[graph\nbeta = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_toml_round_trip_of_effective_config() {
        let mut config = PipelineConfig::default();
        config.fusion.social = 1.3;

        let rendered = config.to_toml_string().unwrap();
        let parsed = PipelineConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.fusion.social, 1.3);
    }
}

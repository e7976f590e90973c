use serde::Deserialize;

/// Engine-wide defaults. Per-experiment values in an
/// [`ExperimentDefinition`](crate::types::ExperimentDefinition)
/// override these; a definition field left unset falls back here.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Exploration rate used by epsilon-greedy when the experiment
    /// does not carry its own.
    #[serde(default = "default_epsilon")]
    pub default_epsilon: f64,
    /// Confidence level for the significance test (e.g. 0.95).
    #[serde(default = "default_confidence_level")]
    pub default_confidence_level: f64,
    /// Per-variant visitor floor before a verdict is trusted.
    #[serde(default = "default_min_sample_size")]
    pub default_min_sample_size: u64,
    /// Wall-clock budget for the client-side deterministic fallback.
    /// Enforced by the embedding snippet, not by this core; exposed so
    /// the serving layer and the snippet generator share one number.
    #[serde(default = "default_fallback_budget_ms")]
    pub fallback_budget_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_epsilon: default_epsilon(),
            default_confidence_level: default_confidence_level(),
            default_min_sample_size: default_min_sample_size(),
            fallback_budget_ms: default_fallback_budget_ms(),
        }
    }
}

fn default_epsilon() -> f64 {
    0.1
}

fn default_confidence_level() -> f64 {
    0.95
}

fn default_min_sample_size() -> u64 {
    100
}

fn default_fallback_budget_ms() -> u64 {
    1500
}

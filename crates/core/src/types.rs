//! Experiment, variant, and event types shared across the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{SplitError, SplitResult};

/// Variant weights are relative traffic shares out of 100. The CRUD
/// layer distributes any rounding remainder to the first variants, so
/// by the time a definition reaches this core the sum must be exact.
pub const TOTAL_WEIGHT: u32 = 100;

/// Variant selection policy, dispatched as a closed enum through a
/// single selection entry point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Weighted random draw over the configured traffic shares.
    #[default]
    Uniform,
    /// Beta-posterior sampling over conversion rate; argmax sample.
    ThompsonSampling,
    /// Mean reward plus an exploration bonus shrinking with pulls.
    Ucb1,
    /// Random variant with probability epsilon, else current best.
    EpsilonGreedy {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

fn default_epsilon() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    /// Relative traffic share, 0–100.
    pub weight: u32,
    pub is_control: bool,
}

/// Experiment definition as handed over by the CRUD layer at
/// activation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub id: Uuid,
    pub name: String,
    pub variants: Vec<Variant>,
    pub algorithm: Algorithm,
    /// Per-variant visitor floor; falls back to the engine default.
    pub min_sample_size: Option<u64>,
    /// Falls back to the engine default.
    pub confidence_level: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl ExperimentDefinition {
    /// Validate the invariants this core refuses to run without:
    /// exactly one control variant, weights summing to exactly
    /// [`TOTAL_WEIGHT`], and a sane epsilon. Called once at
    /// activation; a definition that fails here is never assignable.
    pub fn validate(&self) -> SplitResult<()> {
        if self.variants.is_empty() {
            return Err(SplitError::InvalidConfiguration(format!(
                "experiment {} has no variants",
                self.id
            )));
        }

        let controls = self.variants.iter().filter(|v| v.is_control).count();
        if controls != 1 {
            return Err(SplitError::InvalidConfiguration(format!(
                "experiment {} has {} control variants, expected exactly 1",
                self.id, controls
            )));
        }

        let total: u32 = self.variants.iter().map(|v| v.weight).sum();
        if total != TOTAL_WEIGHT {
            return Err(SplitError::InvalidConfiguration(format!(
                "experiment {} weights sum to {}, expected {}",
                self.id, total, TOTAL_WEIGHT
            )));
        }

        if let Algorithm::EpsilonGreedy { epsilon } = self.algorithm {
            if !(0.0..=1.0).contains(&epsilon) {
                return Err(SplitError::InvalidConfiguration(format!(
                    "experiment {} epsilon {} outside [0, 1]",
                    self.id, epsilon
                )));
            }
        }

        if self.min_sample_size == Some(0) {
            return Err(SplitError::InvalidConfiguration(format!(
                "experiment {} min_sample_size must be positive",
                self.id
            )));
        }

        Ok(())
    }

    /// The designated control variant. Valid definitions have exactly
    /// one; this is the fail-open target of every assignment path.
    pub fn control(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_control)
    }

    pub fn variant(&self, variant_id: &Uuid) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == *variant_id)
    }

    pub fn min_sample_size_or(&self, config: &EngineConfig) -> u64 {
        self.min_sample_size
            .unwrap_or(config.default_min_sample_size)
    }

    pub fn confidence_level_or(&self, config: &EngineConfig) -> f64 {
        self.confidence_level
            .unwrap_or(config.default_confidence_level)
    }
}

/// Point-in-time per-variant aggregates. The live counters are owned
/// by the reward model; this snapshot form is what the policies and
/// the analyzer read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantStats {
    pub visitors: u64,
    pub conversions: u64,
    pub revenue: f64,
}

impl VariantStats {
    /// Observed conversion rate; 0 with no visitors.
    pub fn conversion_rate(&self) -> f64 {
        if self.visitors == 0 {
            0.0
        } else {
            self.conversions as f64 / self.visitors as f64
        }
    }

    /// Beta posterior alpha (uniform prior), derived on the fly so
    /// the reward counters stay the single source of truth.
    pub fn posterior_alpha(&self) -> f64 {
        self.conversions as f64 + 1.0
    }

    /// Beta posterior beta (uniform prior).
    pub fn posterior_beta(&self) -> f64 {
        self.visitors.saturating_sub(self.conversions) as f64 + 1.0
    }

    /// Pull count as seen by UCB1.
    pub fn pulls(&self) -> u64 {
        self.visitors
    }
}

/// Raw visit/conversion events as produced by the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Visit,
    Conversion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardEvent {
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub visitor_id: String,
    pub event_type: EventType,
    /// Revenue attributed to a conversion event.
    pub value: Option<f64>,
}

//! Shared types, configuration, and error taxonomy for the SplitFlow
//! experiment assignment and inference core.

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{SplitError, SplitResult};
pub use types::{
    Algorithm, EventType, ExperimentDefinition, RewardEvent, Variant, VariantStats,
};

use thiserror::Error;
use uuid::Uuid;

pub type SplitResult<T> = Result<T, SplitError>;

/// Error taxonomy of the assignment/inference core.
///
/// Only configuration-class errors halt normal operation. Degenerate
/// statistical inputs produce neutral results instead of errors, and
/// concurrent first-time assignments are resolved internally, so
/// neither appears here.
#[derive(Error, Debug)]
pub enum SplitError {
    #[error("Invalid experiment configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Experiment not found: {0}")]
    ExperimentNotFound(Uuid),

    #[error("Variant {variant_id} not found in experiment {experiment_id}")]
    VariantNotFound {
        experiment_id: Uuid,
        variant_id: Uuid,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

use thiserror::Error;

use crate::error::CapabilityError;

use super::stage::Stage;

/// Why a stage failed. The display string is what lands in the stage's
/// `error` field.
#[derive(Error, Debug)]
pub enum StageError {
    /// Policy failure: the scan succeeded and found an infection.
    #[error("virus detected")]
    Infected { signature: Option<String> },

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("internal error: {stage} needs {needs} output, which is missing")]
    MissingInput { stage: Stage, needs: Stage },

    #[error("internal error: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Tracker(String),
}

pub mod capability;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod sanitize;
pub mod status;

pub use config::{load_config, Config};
pub use error::{CapabilityError, CompliflowError, ConfigError, LoggingError, Result};
pub use logging::init_logging;
pub use pipeline::{
    BroadcastProgress, Collaborators, Pipeline, ProcessingContext, ProcessingResult,
    ProcessingSummary, Stage, StageState, StageStatus,
};
pub use status::{UploadState, UploadStatus};

use std::path::Path;

/// Service startup: loads the config at `path`, installs the global
/// subscriber it describes and builds the pipeline.
pub fn bootstrap(path: impl AsRef<Path>) -> Result<Pipeline> {
    let config = load_config(path)?;
    init_logging(&config.logging)?;
    Ok(Pipeline::from_config(&config)?)
}

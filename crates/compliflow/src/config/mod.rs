pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, load_config_from_yaml_str, validate_config};
pub use schema::{
    ArtifactsConfig, Config, ControlConfig, DetectionConfig, FrameworkConfig, LogFormat,
    LoggingConfig, MalwareConfig, PipelineSettings, SensitivePattern, SignatureConfig,
};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompliflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("Invalid control '{framework}/{id}': {reason}")]
    InvalidControl {
        framework: String,
        id: String,
        reason: String,
    },
}

/// Failure reported by a capability collaborator.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document is {size} bytes, limit is {limit}")]
    DocumentTooLarge { size: u64, limit: u64 },

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Malware scan failed: {0}")]
    Scan(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Sensitive data detection failed: {0}")]
    Detection(String),

    #[error("Framework mapping failed: {0}")]
    Mapping(String),

    #[error("Gap analysis failed: {0}")]
    Analysis(String),

    #[error("Redlining failed: {0}")]
    Redlining(String),

    #[error("Artifact generation failed: {0}")]
    Generation(String),

    #[error("Failed to serialize artifact: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

pub type Result<T> = std::result::Result<T, CompliflowError>;

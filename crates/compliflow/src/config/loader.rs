use std::collections::HashSet;
use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

/// Loads a config file, choosing the parser from the extension
/// (`.yaml`/`.yml` for YAML, anything else is read as JSON).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        load_config_from_yaml_str(&content)
    } else {
        load_config_from_str(&content)
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;
    load_config_from_value(json_value)
}

pub fn load_config_from_yaml_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_yaml::from_str(content)?;
    load_config_from_value(json_value)
}

fn load_config_from_value(json_value: serde_json::Value) -> Result<Config, ConfigError> {
    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks the schema cannot express.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.pipeline.max_document_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "pipeline.max_document_bytes must be greater than zero".to_string(),
        });
    }

    for signature in &config.malware.signatures {
        if signature.pattern.is_empty() {
            return Err(ConfigError::InvalidPattern {
                name: signature.name.clone(),
                reason: "Signature pattern is empty".to_string(),
            });
        }
    }

    for pattern in &config.detection.patterns {
        if let Err(e) = regex::Regex::new(&pattern.pattern) {
            return Err(ConfigError::InvalidPattern {
                name: pattern.kind.clone(),
                reason: e.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&pattern.confidence) {
            return Err(ConfigError::InvalidPattern {
                name: pattern.kind.clone(),
                reason: format!("Confidence {} is outside 0.0..=1.0", pattern.confidence),
            });
        }
    }

    let mut framework_names = HashSet::new();
    for framework in &config.frameworks {
        if !framework_names.insert(framework.name.as_str()) {
            return Err(ConfigError::Validation {
                message: format!("Duplicate framework name: {}", framework.name),
            });
        }

        let mut control_ids = HashSet::new();
        for control in &framework.controls {
            if !control_ids.insert(control.id.as_str()) {
                return Err(ConfigError::InvalidControl {
                    framework: framework.name.clone(),
                    id: control.id.clone(),
                    reason: "Duplicate control ID".to_string(),
                });
            }
            if control.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::InvalidControl {
                    framework: framework.name.clone(),
                    id: control.id.clone(),
                    reason: "Control needs at least one non-empty keyword".to_string(),
                });
            }
        }
    }

    Ok(())
}

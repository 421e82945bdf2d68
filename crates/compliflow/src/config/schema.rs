use serde::{Deserialize, Serialize};

use crate::capability::{ArtifactKind, RiskLevel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default)]
    pub malware: MalwareConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub frameworks: Vec<FrameworkConfig>,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            logging: LoggingConfig::default(),
            pipeline: PipelineSettings::default(),
            malware: MalwareConfig::default(),
            detection: DetectionConfig::default(),
            frameworks: Vec::new(),
            artifacts: ArtifactsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_filter() -> String {
    "compliflow=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Used for framework mapping when the context carries no institution type.
    #[serde(default = "default_institution_type")]
    pub default_institution_type: String,
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: u64,
}

fn default_institution_type() -> String {
    "general".to_string()
}

fn default_max_document_bytes() -> u64 {
    50 * 1024 * 1024
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_institution_type: default_institution_type(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MalwareConfig {
    #[serde(default = "default_signatures")]
    pub signatures: Vec<SignatureConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureConfig {
    pub name: String,
    /// Literal byte sequence (UTF-8) to look for.
    pub pattern: String,
}

pub const EICAR_TEST_SIGNATURE: &str =
    r"X5O!P%@AP[4\PZX54(P^)7CC)7}$EICAR-STANDARD-ANTIVIRUS-TEST-FILE!$H+H*";

fn default_signatures() -> Vec<SignatureConfig> {
    vec![SignatureConfig {
        name: "EICAR-Test-File".to_string(),
        pattern: EICAR_TEST_SIGNATURE.to_string(),
    }]
}

impl Default for MalwareConfig {
    fn default() -> Self {
        Self {
            signatures: default_signatures(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default = "default_sensitive_patterns")]
    pub patterns: Vec<SensitivePattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivePattern {
    pub kind: String,
    pub pattern: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    /// Require the match to pass a Luhn checksum (payment card numbers).
    #[serde(default)]
    pub luhn: bool,
}

fn default_confidence() -> f32 {
    0.8
}

fn default_sensitive_patterns() -> Vec<SensitivePattern> {
    vec![
        SensitivePattern {
            kind: "email".to_string(),
            pattern: r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b".to_string(),
            confidence: 0.95,
            luhn: false,
        },
        SensitivePattern {
            kind: "us_ssn".to_string(),
            pattern: r"\b\d{3}-\d{2}-\d{4}\b".to_string(),
            confidence: 0.9,
            luhn: false,
        },
        SensitivePattern {
            kind: "phone".to_string(),
            pattern: r"\(?\b\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b".to_string(),
            confidence: 0.7,
            luhn: false,
        },
        SensitivePattern {
            kind: "payment_card".to_string(),
            pattern: r"\b(?:\d[ -]?){12,18}\d\b".to_string(),
            confidence: 0.85,
            luhn: true,
        },
    ]
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            patterns: default_sensitive_patterns(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    pub name: String,
    /// Institution types this framework applies to; empty means all.
    #[serde(default)]
    pub institution_types: Vec<String>,
    /// Document types this framework applies to; empty means all.
    #[serde(default)]
    pub document_types: Vec<String>,
    #[serde(default)]
    pub controls: Vec<ControlConfig>,
}

impl FrameworkConfig {
    pub fn applies_to(&self, document_type: &str, institution_type: &str) -> bool {
        let matches = |allowed: &[String], value: &str| {
            allowed.is_empty() || allowed.iter().any(|a| a.eq_ignore_ascii_case(value))
        };
        matches(&self.institution_types, institution_type)
            && matches(&self.document_types, document_type)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub id: String,
    pub requirement: String,
    pub keywords: Vec<String>,
    pub risk_level: RiskLevel,
    pub remediation: String,
    #[serde(default)]
    pub protects_sensitive_data: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    #[serde(default = "default_artifact_kinds")]
    pub kinds: Vec<ArtifactKind>,
}

fn default_artifact_kinds() -> Vec<ArtifactKind> {
    vec![ArtifactKind::GapReport, ArtifactKind::RedlineSummary]
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            kinds: default_artifact_kinds(),
        }
    }
}

//! Capability collaborators called by the pipeline.
//!
//! Each trait is a narrow, stateless-per-call dependency. Inputs are
//! borrowed for the duration of the call only; every failure comes back as a
//! [`CapabilityError`] so the pipeline can attribute it to the running stage.
//!
//! The submodules hold the configuration-driven reference implementations
//! used by [`Pipeline::from_config`](crate::pipeline::Pipeline::from_config).

pub mod artifacts;
pub mod detect;
pub mod extract;
pub mod gaps;
pub mod malware;
pub mod mapping;
pub mod reader;
pub mod redline;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::pipeline::ProcessingSummary;

pub use artifacts::ReportGenerator;
pub use detect::PatternDetector;
pub use extract::ExtractorRegistry;
pub use gaps::CoverageAnalyzer;
pub use malware::SignatureScanner;
pub use mapping::CatalogMapper;
pub use reader::FsDocumentReader;
pub use redline::TemplateRedliner;

// ============================================================================
// Shared types
// ============================================================================

/// Severity of a compliance gap, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// One level more severe, saturating at `Critical`.
    pub fn raised(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium => Self::High,
            Self::High | Self::Critical => Self::Critical,
        }
    }

    /// One level less severe, saturating at `Low`.
    pub fn lowered(self) -> Self {
        match self {
            Self::Critical => Self::High,
            Self::High => Self::Medium,
            Self::Medium | Self::Low => Self::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanVerdict {
    pub infected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ScanVerdict {
    pub fn clean() -> Self {
        Self {
            infected: false,
            signature: None,
        }
    }

    pub fn infected(signature: impl Into<String>) -> Self {
        Self {
            infected: true,
            signature: Some(signature.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ExtractedText {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_count: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Byte range into the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensitiveMatch {
    /// Entity kind, e.g. `email` or `us_ssn`.
    #[serde(rename = "type")]
    pub kind: String,
    pub location: TextSpan,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub matches: Vec<SensitiveMatch>,
}

impl DetectionReport {
    /// Number of matches per entity kind.
    pub fn counts_by_kind(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for m in &self.matches {
            *counts.entry(m.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// A regulatory control judged applicable to the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMapping {
    pub framework: String,
    pub control: String,
    pub requirement: String,
    pub risk_level: RiskLevel,
    pub remediation: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Keywords from `keywords` found in the document text.
    #[serde(default)]
    pub matched_keywords: Vec<String>,
    #[serde(default)]
    pub protects_sensitive_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapRecord {
    pub requirement: String,
    pub current_state: String,
    pub gap: String,
    pub risk_level: RiskLevel,
    pub framework: String,
    pub remediation: String,
}

/// The view of a gap handed to the redliner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GapSummary {
    pub requirement: String,
    pub current_state: String,
    pub gap: String,
    pub risk_level: RiskLevel,
    pub framework: String,
    pub remediation: String,
}

impl From<&GapRecord> for GapSummary {
    fn from(record: &GapRecord) -> Self {
        Self {
            requirement: record.requirement.clone(),
            current_state: record.current_state.clone(),
            gap: record.gap.clone(),
            risk_level: record.risk_level,
            framework: record.framework.clone(),
            remediation: record.remediation.clone(),
        }
    }
}

/// Document under redline review.
#[derive(Debug, Clone, Copy)]
pub struct RedlineDocument<'a> {
    pub upload_id: &'a str,
    pub document_type: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedlineAction {
    Insert,
    Revise,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedlineRecord {
    pub section: String,
    pub action: RedlineAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    pub suggested_text: String,
    pub rationale: String,
    pub framework: String,
    pub risk_level: RiskLevel,
}

/// Everything the artifact generator may draw on.
#[derive(Debug, Clone, Copy)]
pub struct ArtifactBundle<'a> {
    pub upload_id: &'a str,
    pub document_type: &'a str,
    pub summary: &'a ProcessingSummary,
    pub mappings: &'a [ControlMapping],
    pub gaps: &'a [GapRecord],
    pub redlines: &'a [RedlineRecord],
    pub detection: &'a DetectionReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    GapReport,
    RedlineSummary,
    SensitiveDataReport,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GapReport => "gap_report",
            Self::RedlineSummary => "redline_summary",
            Self::SensitiveDataReport => "sensitive_data_report",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ArtifactKind,
    pub name: String,
    pub media_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationOutput {
    pub artifacts: Vec<GeneratedArtifact>,
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Resolves a document path to its raw bytes.
pub trait DocumentReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Vec<u8>, CapabilityError>;
}

pub trait MalwareScanner: Send + Sync {
    fn scan(&self, bytes: &[u8]) -> Result<ScanVerdict, CapabilityError>;
}

pub trait TextExtractor: Send + Sync {
    /// `bytes` is the already-read content of `path`.
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedText, CapabilityError>;
}

pub trait SensitiveDataDetector: Send + Sync {
    fn scan(&self, text: &str) -> Result<DetectionReport, CapabilityError>;
}

pub trait FrameworkMapper: Send + Sync {
    /// Zero applicable controls is `Ok(vec![])`, not an error.
    fn map(
        &self,
        text: &str,
        document_type: &str,
        institution_type: &str,
    ) -> Result<Vec<ControlMapping>, CapabilityError>;
}

pub trait GapAnalyzer: Send + Sync {
    fn analyze(
        &self,
        text: &str,
        mappings: &[ControlMapping],
        entities: &[SensitiveMatch],
    ) -> Result<Vec<GapRecord>, CapabilityError>;
}

pub trait PolicyRedliner: Send + Sync {
    fn redline(
        &self,
        document: &RedlineDocument<'_>,
        gaps: &[GapSummary],
    ) -> Result<Vec<RedlineRecord>, CapabilityError>;
}

pub trait ArtifactGenerator: Send + Sync {
    fn generate(&self, bundle: &ArtifactBundle<'_>) -> Result<GenerationOutput, CapabilityError>;
}

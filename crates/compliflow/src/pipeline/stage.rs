use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stages. Declaration order is execution order, and `Ord`
/// follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[serde(rename = "virus_scan", alias = "malware_scan")]
    MalwareScan,
    TextExtraction,
    PiiDetection,
    FrameworkMapping,
    GapAnalysis,
    PolicyRedlining,
    ArtifactGeneration,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::MalwareScan,
        Stage::TextExtraction,
        Stage::PiiDetection,
        Stage::FrameworkMapping,
        Stage::GapAnalysis,
        Stage::PolicyRedlining,
        Stage::ArtifactGeneration,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Key used in serialized stage maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::MalwareScan => "virus_scan",
            Stage::TextExtraction => "text_extraction",
            Stage::PiiDetection => "pii_detection",
            Stage::FrameworkMapping => "framework_mapping",
            Stage::GapAnalysis => "gap_analysis",
            Stage::PolicyRedlining => "policy_redlining",
            Stage::ArtifactGeneration => "artifact_generation",
        }
    }

    /// Human-readable activity label.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::MalwareScan => "Scanning for malware",
            Stage::TextExtraction => "Extracting text",
            Stage::PiiDetection => "Detecting sensitive data",
            Stage::FrameworkMapping => "Mapping regulatory frameworks",
            Stage::GapAnalysis => "Analyzing compliance gaps",
            Stage::PolicyRedlining => "Redlining policy",
            Stage::ArtifactGeneration => "Generating artifacts",
        }
    }

    /// Zero-based position in the pipeline.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage of the pipeline done once `completed` stages have finished.
pub fn progress_percent(completed: usize) -> u8 {
    (completed.min(Stage::COUNT) * 100 / Stage::COUNT) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl StageState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StageState::Completed | StageState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageStatus {
    pub status: StageState,
    /// Set when the stage reaches a terminal state, including failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageStatus {
    pub fn processing() -> Self {
        Self {
            status: StageState::Processing,
            completed_at: None,
            error: None,
        }
    }

    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: StageState::Completed,
            completed_at: Some(at),
            error: None,
        }
    }

    pub fn failed(at: DateTime<Utc>, error: impl Into<String>) -> Self {
        Self {
            status: StageState::Failed,
            completed_at: Some(at),
            error: Some(error.into()),
        }
    }
}

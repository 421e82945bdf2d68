use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capability::{
    ControlMapping, DetectionReport, ExtractedText, GapRecord, GeneratedArtifact, RedlineRecord,
};

use super::error::StageError;
use super::stage::Stage;

/// Caller-supplied description of one document to process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingContext {
    pub upload_id: String,
    pub file_path: PathBuf,
    pub user_id: String,
    pub institution_id: String,
    pub document_type: String,
    /// Falls back to the configured default institution type when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_type: Option<String>,
}

impl ProcessingContext {
    pub fn new(
        upload_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        user_id: impl Into<String>,
        institution_id: impl Into<String>,
        document_type: impl Into<String>,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            file_path: file_path.into(),
            user_id: user_id.into(),
            institution_id: institution_id.into(),
            document_type: document_type.into(),
            institution_type: None,
        }
    }

    pub fn with_institution_type(mut self, institution_type: impl Into<String>) -> Self {
        self.institution_type = Some(institution_type.into());
        self
    }
}

/// Outputs accumulated by completed stages of one invocation.
#[derive(Debug, Default)]
pub struct StageOutputs {
    // Malware scan: raw bytes of a clean document, released once text
    // extraction consumes them
    pub document: Option<Vec<u8>>,

    // Text extraction
    pub extracted: Option<ExtractedText>,

    // PII detection
    pub detection: Option<DetectionReport>,

    // Framework mapping
    pub mappings: Option<Vec<ControlMapping>>,

    // Gap analysis
    pub gaps: Option<Vec<GapRecord>>,

    // Policy redlining
    pub redlines: Option<Vec<RedlineRecord>>,

    // Artifact generation
    pub artifacts: Option<Vec<GeneratedArtifact>>,
}

impl StageOutputs {
    pub fn text(&self, stage: Stage) -> Result<&str, StageError> {
        self.extracted
            .as_ref()
            .map(|e| e.text.as_str())
            .ok_or(StageError::MissingInput {
                stage,
                needs: Stage::TextExtraction,
            })
    }

    pub fn detection(&self, stage: Stage) -> Result<&DetectionReport, StageError> {
        self.detection.as_ref().ok_or(StageError::MissingInput {
            stage,
            needs: Stage::PiiDetection,
        })
    }

    pub fn mappings(&self, stage: Stage) -> Result<&[ControlMapping], StageError> {
        self.mappings.as_deref().ok_or(StageError::MissingInput {
            stage,
            needs: Stage::FrameworkMapping,
        })
    }

    pub fn gaps(&self, stage: Stage) -> Result<&[GapRecord], StageError> {
        self.gaps.as_deref().ok_or(StageError::MissingInput {
            stage,
            needs: Stage::GapAnalysis,
        })
    }

    pub fn redlines(&self, stage: Stage) -> Result<&[RedlineRecord], StageError> {
        self.redlines.as_deref().ok_or(StageError::MissingInput {
            stage,
            needs: Stage::PolicyRedlining,
        })
    }
}

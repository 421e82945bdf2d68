//! Per-upload status view derived from a processing result.

use serde::{Deserialize, Serialize};

use crate::pipeline::{progress_percent, ProcessingResult, Stage, StageState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Processing,
    Completed,
    Failed,
}

/// What a caller polling an upload sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatus {
    pub upload_id: String,
    pub state: UploadState,
    /// The failed or still-processing stage. Absent once complete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<Stage>,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<u8>,
}

impl UploadStatus {
    pub fn from_result(result: &ProcessingResult) -> Self {
        let completed = result.completed_stages().count();

        if let Some((stage, error)) = result.failure() {
            return Self {
                upload_id: result.upload_id.clone(),
                state: UploadState::Failed,
                current_stage: Some(stage),
                progress: progress_percent(completed),
                error_message: Some(error.to_string()),
                compliance_score: None,
            };
        }

        if result.success {
            return Self {
                upload_id: result.upload_id.clone(),
                state: UploadState::Completed,
                current_stage: None,
                progress: 100,
                error_message: None,
                compliance_score: Some(result.summary.compliance_score),
            };
        }

        let current_stage = result
            .stages
            .iter()
            .find(|(_, s)| s.status == StageState::Processing)
            .map(|(stage, _)| *stage);

        Self {
            upload_id: result.upload_id.clone(),
            state: UploadState::Processing,
            current_stage,
            progress: progress_percent(completed),
            error_message: None,
            compliance_score: None,
        }
    }
}

impl From<&ProcessingResult> for UploadStatus {
    fn from(result: &ProcessingResult) -> Self {
        Self::from_result(result)
    }
}

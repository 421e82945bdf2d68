use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::stage::{progress_percent, Stage};
use super::summary::ProcessingSummary;

/// Events emitted by the pipeline while a document moves through its stages.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted { stage: Stage },
    StageCompleted { stage: Stage },
    StageFailed { stage: Stage, error: String },
    Finished {
        success: bool,
        summary: ProcessingSummary,
    },
}

/// Receives pipeline events. `at` comes from the pipeline's clock.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent, at: DateTime<Utc>);
}

/// No-op reporter for callers that do not observe progress.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent, _at: DateTime<Utc>) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Processing,
    Completed,
    Failed,
}

/// Serializable progress notification for one upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageProgressEvent {
    pub upload_id: String,
    /// Stage the event refers to. Absent on the final event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    pub status: ProgressStatus,
    /// Percentage of stages completed so far.
    pub progress: u8,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set on the final event of a successful run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<u8>,
}

impl StageProgressEvent {
    fn new(
        upload_id: &str,
        stage: Option<Stage>,
        status: ProgressStatus,
        progress: u8,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            upload_id: upload_id.to_string(),
            stage,
            status,
            progress,
            message,
            timestamp,
            error: None,
            compliance_score: None,
        }
    }
}

/// Bridges pipeline events onto a broadcast channel for streaming.
pub struct BroadcastProgress {
    upload_id: String,
    completed: AtomicUsize,
    sender: Arc<broadcast::Sender<StageProgressEvent>>,
}

impl BroadcastProgress {
    pub fn new(upload_id: &str, sender: Arc<broadcast::Sender<StageProgressEvent>>) -> Self {
        Self {
            upload_id: upload_id.to_string(),
            completed: AtomicUsize::new(0),
            sender,
        }
    }

    fn send(&self, event: StageProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent, at: DateTime<Utc>) {
        let done = self.completed.load(Ordering::SeqCst);
        let event = match event {
            ProgressEvent::StageStarted { stage } => StageProgressEvent::new(
                &self.upload_id,
                Some(stage),
                ProgressStatus::Processing,
                progress_percent(done),
                format!("{}...", stage.label()),
                at,
            ),
            ProgressEvent::StageCompleted { stage } => {
                let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
                StageProgressEvent::new(
                    &self.upload_id,
                    Some(stage),
                    ProgressStatus::Processing,
                    progress_percent(done),
                    format!("{} done", stage.label()),
                    at,
                )
            }
            ProgressEvent::StageFailed { stage, error } => {
                let mut event = StageProgressEvent::new(
                    &self.upload_id,
                    Some(stage),
                    ProgressStatus::Failed,
                    progress_percent(done),
                    format!("{} failed", stage.label()),
                    at,
                );
                event.error = Some(error);
                event
            }
            ProgressEvent::Finished { success, summary } => {
                if success {
                    let mut event = StageProgressEvent::new(
                        &self.upload_id,
                        None,
                        ProgressStatus::Completed,
                        100,
                        "Processing completed successfully".to_string(),
                        at,
                    );
                    event.compliance_score = Some(summary.compliance_score);
                    event
                } else {
                    StageProgressEvent::new(
                        &self.upload_id,
                        None,
                        ProgressStatus::Failed,
                        progress_percent(done),
                        "Processing failed".to_string(),
                        at,
                    )
                }
            }
        };
        self.send(event);
    }
}

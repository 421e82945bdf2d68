use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::capability::GeneratedArtifact;

use super::clock::Clock;
use super::error::StageError;
use super::stage::{Stage, StageState, StageStatus};
use super::summary::ProcessingSummary;

/// Outcome of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub upload_id: String,
    pub success: bool,
    /// Only stages that were entered appear here. Iteration follows
    /// pipeline order.
    pub stages: BTreeMap<Stage, StageStatus>,
    pub artifact_ids: Vec<String>,
    pub summary: ProcessingSummary,
    /// Artifact payloads, for callers that persist them.
    #[serde(skip)]
    pub artifacts: Vec<GeneratedArtifact>,
}

impl ProcessingResult {
    pub fn stage(&self, stage: Stage) -> Option<&StageStatus> {
        self.stages.get(&stage)
    }

    /// The stage that failed, if any, with its message.
    pub fn failure(&self) -> Option<(Stage, &str)> {
        self.stages.iter().find_map(|(stage, status)| {
            (status.status == StageState::Failed)
                .then(|| (*stage, status.error.as_deref().unwrap_or_default()))
        })
    }

    pub fn completed_stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.stages
            .iter()
            .filter(|(_, s)| s.status == StageState::Completed)
            .map(|(stage, _)| *stage)
    }

    pub fn is_completed(&self, stage: Stage) -> bool {
        self.stage(stage)
            .is_some_and(|s| s.status == StageState::Completed)
    }
}

/// Stage state machine for one invocation.
///
/// Stages enter in pipeline order, at most one is processing at a time,
/// and each reaches exactly one terminal state. Terminal timestamps never
/// go backwards even if the clock does.
pub(crate) struct StageTracker<'c> {
    clock: &'c dyn Clock,
    stages: BTreeMap<Stage, StageStatus>,
    current: Option<Stage>,
    last_stamp: Option<DateTime<Utc>>,
}

impl<'c> StageTracker<'c> {
    pub fn new(clock: &'c dyn Clock) -> Self {
        Self {
            clock,
            stages: BTreeMap::new(),
            current: None,
            last_stamp: None,
        }
    }

    pub fn current(&self) -> Option<Stage> {
        self.current
    }

    pub fn begin(&mut self, stage: Stage) -> Result<(), StageError> {
        if let Some(running) = self.current {
            return Err(StageError::Tracker(format!(
                "cannot start {} while {} is processing",
                stage, running
            )));
        }
        if let Some((last, _)) = self.stages.last_key_value() {
            if *last >= stage {
                return Err(StageError::Tracker(format!(
                    "cannot start {} after {}",
                    stage, last
                )));
            }
        }
        if let Some((_, status)) = self.stages.iter().find(|(_, s)| s.status == StageState::Failed)
        {
            return Err(StageError::Tracker(format!(
                "cannot start {} after a failure: {}",
                stage,
                status.error.as_deref().unwrap_or_default()
            )));
        }

        self.stages.insert(stage, StageStatus::processing());
        self.current = Some(stage);
        Ok(())
    }

    pub fn complete(&mut self, stage: Stage) -> Result<(), StageError> {
        self.ensure_current(stage)?;
        let at = self.stamp();
        self.stages.insert(stage, StageStatus::completed(at));
        self.current = None;
        Ok(())
    }

    /// Marks `stage` failed. A stage that never began is recorded as failed
    /// directly so that every failure is attributed somewhere.
    pub fn fail(&mut self, stage: Stage, error: impl Into<String>) {
        let at = self.stamp();
        self.stages.insert(stage, StageStatus::failed(at, error));
        self.current = None;
    }

    pub fn finish(
        self,
        upload_id: &str,
        summary: ProcessingSummary,
        artifacts: Vec<GeneratedArtifact>,
    ) -> ProcessingResult {
        let success = self.stages.len() == Stage::COUNT
            && self.stages.values().all(|s| s.status == StageState::Completed);

        // Artifacts only count once their stage has completed.
        let artifacts = if self
            .stages
            .get(&Stage::ArtifactGeneration)
            .is_some_and(|s| s.status == StageState::Completed)
        {
            artifacts
        } else {
            Vec::new()
        };
        let artifact_ids = artifacts.iter().map(|a| a.id.clone()).collect();

        ProcessingResult {
            upload_id: upload_id.to_string(),
            success,
            stages: self.stages,
            artifact_ids,
            summary,
            artifacts,
        }
    }

    fn ensure_current(&self, stage: Stage) -> Result<(), StageError> {
        match self.current {
            Some(running) if running == stage => Ok(()),
            Some(running) => Err(StageError::Tracker(format!(
                "cannot finish {} while {} is processing",
                stage, running
            ))),
            None => Err(StageError::Tracker(format!(
                "cannot finish {}, it is not processing",
                stage
            ))),
        }
    }

    fn stamp(&mut self) -> DateTime<Utc> {
        let now = self.clock.now();
        let at = match self.last_stamp {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last_stamp = Some(at);
        at
    }
}

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, info, info_span, warn};

use crate::capability::{
    ArtifactBundle, ArtifactGenerator, CatalogMapper, CoverageAnalyzer, DocumentReader,
    ExtractorRegistry, FrameworkMapper, FsDocumentReader, GapAnalyzer, GapSummary,
    MalwareScanner, PatternDetector, PolicyRedliner, RedlineDocument, ReportGenerator,
    SensitiveDataDetector, SignatureScanner, TemplateRedliner, TextExtractor,
};
use crate::config::{validate_config, Config, PipelineSettings};
use crate::error::ConfigError;
use crate::sanitize;

use super::clock::{Clock, SystemClock};
use super::context::{ProcessingContext, StageOutputs};
use super::error::StageError;
use super::progress::{NoopProgress, ProgressEvent, ProgressReporter};
use super::result::{ProcessingResult, StageTracker};
use super::stage::Stage;
use super::summary::ProcessingSummary;

/// The capability implementations a pipeline delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub reader: Arc<dyn DocumentReader>,
    pub scanner: Arc<dyn MalwareScanner>,
    pub extractor: Arc<dyn TextExtractor>,
    pub detector: Arc<dyn SensitiveDataDetector>,
    pub mapper: Arc<dyn FrameworkMapper>,
    pub analyzer: Arc<dyn GapAnalyzer>,
    pub redliner: Arc<dyn PolicyRedliner>,
    pub generator: Arc<dyn ArtifactGenerator>,
}

impl Collaborators {
    /// Builds the reference implementations from a validated config.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let scanner = SignatureScanner::new(&config.malware.signatures);
        debug!(signatures = scanner.signature_count(), "Signature scanner ready");

        Ok(Self {
            reader: Arc::new(FsDocumentReader::new(config.pipeline.max_document_bytes)),
            scanner: Arc::new(scanner),
            extractor: Arc::new(ExtractorRegistry::new()),
            detector: Arc::new(PatternDetector::new(&config.detection.patterns)?),
            mapper: Arc::new(CatalogMapper::new(config.frameworks.clone())),
            analyzer: Arc::new(CoverageAnalyzer::new()),
            redliner: Arc::new(TemplateRedliner::new()),
            generator: Arc::new(ReportGenerator::new(config.artifacts.kinds.clone())),
        })
    }
}

type StageFn = fn(&Pipeline, &ProcessingContext, &mut StageOutputs) -> Result<(), StageError>;

struct StageStep {
    stage: Stage,
    run: StageFn,
}

const STEPS: [StageStep; Stage::COUNT] = [
    StageStep {
        stage: Stage::MalwareScan,
        run: Pipeline::step_malware_scan,
    },
    StageStep {
        stage: Stage::TextExtraction,
        run: Pipeline::step_text_extraction,
    },
    StageStep {
        stage: Stage::PiiDetection,
        run: Pipeline::step_pii_detection,
    },
    StageStep {
        stage: Stage::FrameworkMapping,
        run: Pipeline::step_framework_mapping,
    },
    StageStep {
        stage: Stage::GapAnalysis,
        run: Pipeline::step_gap_analysis,
    },
    StageStep {
        stage: Stage::PolicyRedlining,
        run: Pipeline::step_policy_redlining,
    },
    StageStep {
        stage: Stage::ArtifactGeneration,
        run: Pipeline::step_artifact_generation,
    },
];

/// Runs documents through the fixed stage sequence.
///
/// Holds no per-document state, so one instance can serve concurrent
/// invocations for different uploads.
pub struct Pipeline {
    collaborators: Collaborators,
    settings: PipelineSettings,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Production constructor. Builds every collaborator from config.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        validate_config(config)?;
        let collaborators = Collaborators::from_config(config)?;
        info!(
            frameworks = config.frameworks.len(),
            patterns = config.detection.patterns.len(),
            "Pipeline configured"
        );
        Ok(Self::new(collaborators, config.pipeline.clone()))
    }

    pub fn new(collaborators: Collaborators, settings: PipelineSettings) -> Self {
        Self {
            collaborators,
            settings,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn process(&self, ctx: ProcessingContext) -> ProcessingResult {
        self.process_with_progress(ctx, &NoopProgress)
    }

    /// Run every stage for one document. Never panics and never returns
    /// an error: all failures are recorded on the result. The context and
    /// every intermediate output are dropped on return.
    pub fn process_with_progress(
        &self,
        ctx: ProcessingContext,
        progress: &dyn ProgressReporter,
    ) -> ProcessingResult {
        let ctx = &ctx;
        let _pipeline_span = info_span!("pipeline",
            upload_id = %ctx.upload_id,
            file = %sanitize::redact_path(&ctx.file_path),
            file_id = %sanitize::hash_path(&ctx.file_path),
            document_type = %ctx.document_type,
        )
        .entered();

        let mut tracker = StageTracker::new(self.clock.as_ref());
        let mut outputs = StageOutputs::default();

        for step in STEPS.iter() {
            let stage = step.stage;
            let _step = info_span!("stage", stage = %stage).entered();

            if let Err(e) = tracker.begin(stage) {
                let failed = tracker.current().unwrap_or(stage);
                return self.fail(tracker, outputs, ctx, failed, e, progress);
            }
            self.notify(progress, ProgressEvent::StageStarted { stage });

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                (step.run)(self, ctx, &mut outputs)
            }))
            .unwrap_or_else(|payload| {
                Err(StageError::Panicked(format!(
                    "stage panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })
            .and_then(|()| tracker.complete(stage));

            match outcome {
                Ok(()) => {
                    info!("Stage completed");
                    self.notify(progress, ProgressEvent::StageCompleted { stage });
                }
                Err(e) => return self.fail(tracker, outputs, ctx, stage, e, progress),
            }
        }

        self.finish(tracker, outputs, ctx, progress)
    }

    fn fail(
        &self,
        mut tracker: StageTracker<'_>,
        outputs: StageOutputs,
        ctx: &ProcessingContext,
        stage: Stage,
        error: StageError,
        progress: &dyn ProgressReporter,
    ) -> ProcessingResult {
        let message = error.to_string();
        warn!(stage = %stage, error = %message, "Stage failed");
        tracker.fail(stage, message.clone());
        self.notify(
            progress,
            ProgressEvent::StageFailed {
                stage,
                error: message,
            },
        );
        self.finish(tracker, outputs, ctx, progress)
    }

    fn finish(
        &self,
        tracker: StageTracker<'_>,
        outputs: StageOutputs,
        ctx: &ProcessingContext,
        progress: &dyn ProgressReporter,
    ) -> ProcessingResult {
        // Unscored unless gap analysis produced output.
        let summary = outputs
            .gaps
            .as_deref()
            .map(ProcessingSummary::from_gaps)
            .unwrap_or_default();
        let result = tracker.finish(
            &ctx.upload_id,
            summary,
            outputs.artifacts.unwrap_or_default(),
        );

        info!(
            success = result.success,
            compliance_score = summary.compliance_score,
            critical_gaps = summary.critical_gaps,
            total_gaps = summary.total_gaps,
            artifacts = result.artifact_ids.len(),
            "Processing finished"
        );
        self.notify(
            progress,
            ProgressEvent::Finished {
                success: result.success,
                summary,
            },
        );
        result
    }

    /// Hands an event to the reporter. A panicking reporter is logged and
    /// does not affect the run.
    fn notify(&self, progress: &dyn ProgressReporter, event: ProgressEvent) {
        let at = self.clock.now();
        if let Err(payload) =
            panic::catch_unwind(AssertUnwindSafe(|| progress.report(event, at)))
        {
            warn!(
                error = %panic_message(payload.as_ref()),
                "Progress reporter panicked"
            );
        }
    }

    // ── stages ──

    fn step_malware_scan(
        &self,
        ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let bytes = self.collaborators.reader.read(&ctx.file_path)?;
        let verdict = self.collaborators.scanner.scan(&bytes)?;
        if verdict.infected {
            warn!(
                signature = verdict.signature.as_deref().unwrap_or("unknown"),
                "Infected document rejected"
            );
            return Err(StageError::Infected {
                signature: verdict.signature,
            });
        }
        debug!(bytes = bytes.len(), "Document is clean");
        outputs.document = Some(bytes);
        Ok(())
    }

    fn step_text_extraction(
        &self,
        ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let bytes = outputs.document.take().ok_or(StageError::MissingInput {
            stage: Stage::TextExtraction,
            needs: Stage::MalwareScan,
        })?;
        let extracted = self.collaborators.extractor.extract(&ctx.file_path, &bytes)?;
        debug!(
            chars = extracted.text.len(),
            pages = extracted.page_count,
            "Text extracted"
        );
        outputs.extracted = Some(extracted);
        Ok(())
    }

    fn step_pii_detection(
        &self,
        _ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let report = {
            let text = outputs.text(Stage::PiiDetection)?;
            self.collaborators.detector.scan(text)?
        };
        debug!(matches = report.matches.len(), "Sensitive data scan finished");
        outputs.detection = Some(report);
        Ok(())
    }

    fn step_framework_mapping(
        &self,
        ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let institution_type = ctx
            .institution_type
            .as_deref()
            .unwrap_or(&self.settings.default_institution_type);
        let mappings = {
            let text = outputs.text(Stage::FrameworkMapping)?;
            self.collaborators
                .mapper
                .map(text, &ctx.document_type, institution_type)?
        };
        debug!(controls = mappings.len(), institution_type, "Frameworks mapped");
        outputs.mappings = Some(mappings);
        Ok(())
    }

    fn step_gap_analysis(
        &self,
        _ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let gaps = {
            let text = outputs.text(Stage::GapAnalysis)?;
            let mappings = outputs.mappings(Stage::GapAnalysis)?;
            let detection = outputs.detection(Stage::GapAnalysis)?;
            self.collaborators
                .analyzer
                .analyze(text, mappings, &detection.matches)?
        };
        debug!(gaps = gaps.len(), "Gap analysis finished");
        outputs.gaps = Some(gaps);
        Ok(())
    }

    fn step_policy_redlining(
        &self,
        ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let redlines = {
            let text = outputs.text(Stage::PolicyRedlining)?;
            let summaries: Vec<GapSummary> = outputs
                .gaps(Stage::PolicyRedlining)?
                .iter()
                .map(GapSummary::from)
                .collect();
            let document = RedlineDocument {
                upload_id: &ctx.upload_id,
                document_type: &ctx.document_type,
                text,
            };
            self.collaborators.redliner.redline(&document, &summaries)?
        };
        debug!(redlines = redlines.len(), "Redlines produced");
        outputs.redlines = Some(redlines);
        Ok(())
    }

    fn step_artifact_generation(
        &self,
        ctx: &ProcessingContext,
        outputs: &mut StageOutputs,
    ) -> Result<(), StageError> {
        let generated = {
            let gaps = outputs.gaps(Stage::ArtifactGeneration)?;
            let summary = ProcessingSummary::from_gaps(gaps);
            let bundle = ArtifactBundle {
                upload_id: &ctx.upload_id,
                document_type: &ctx.document_type,
                summary: &summary,
                mappings: outputs.mappings(Stage::ArtifactGeneration)?,
                gaps,
                redlines: outputs.redlines(Stage::ArtifactGeneration)?,
                detection: outputs.detection(Stage::ArtifactGeneration)?,
            };
            self.collaborators.generator.generate(&bundle)?
        };
        debug!(artifacts = generated.artifacts.len(), "Artifacts generated");
        outputs.artifacts = Some(generated.artifacts);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

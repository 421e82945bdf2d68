//! End-to-end tests running real documents through the configured pipeline.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use tokio::sync::broadcast;

use common::{bank_config, docx_bytes, docx_with_runs, TestHarness};
use compliflow::capability::artifacts::artifact_id;
use compliflow::capability::{ArtifactKind, RiskLevel};
use compliflow::config::schema::EICAR_TEST_SIGNATURE;
use compliflow::pipeline::{FixedClock, ProgressStatus};
use compliflow::{
    BroadcastProgress, Config, Pipeline, ProcessingSummary, Stage, StageState, UploadState,
    UploadStatus,
};

fn pipeline(config: &Config) -> Pipeline {
    let clock = FixedClock(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap());
    Pipeline::from_config(config)
        .expect("config should build a pipeline")
        .with_clock(Arc::new(clock))
}

// ── success path ──

#[test]
fn test_policy_with_gaps() {
    let harness = TestHarness::new();
    let path = harness.upload_fixture("security-policy.txt");
    let ctx = harness.context("u-100", &path);

    let result = pipeline(&bank_config()).process(ctx);

    assert!(result.success, "stages: {:?}", result.stages);
    assert_eq!(result.stages.len(), Stage::COUNT);
    assert!(result
        .stages
        .values()
        .all(|s| s.status == StageState::Completed));

    // GLBA-314.4c is raised to critical by the email address in the text,
    // GLBA-314.4a and CC6.1 are partially addressed.
    assert_eq!(
        result.summary,
        ProcessingSummary {
            critical_gaps: 1,
            total_gaps: 3,
            compliance_score: 70,
        }
    );

    let expected_ids: Vec<String> = [
        ArtifactKind::GapReport,
        ArtifactKind::RedlineSummary,
        ArtifactKind::SensitiveDataReport,
    ]
    .into_iter()
    .map(|kind| artifact_id("u-100", kind))
    .collect();
    assert_eq!(result.artifact_ids, expected_ids);

    let gap_report = result
        .artifacts
        .iter()
        .find(|a| a.kind == ArtifactKind::GapReport)
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&gap_report.content).unwrap();
    assert_eq!(json["uploadId"], "u-100");
    assert_eq!(json["controlsEvaluated"], 3);
    assert_eq!(json["summary"]["complianceScore"], 70);
    let gaps = json["gaps"].as_array().unwrap();
    assert!(gaps
        .iter()
        .any(|g| g["riskLevel"] == serde_json::json!(RiskLevel::Critical)));

    let sensitive = result
        .artifacts
        .iter()
        .find(|a| a.kind == ArtifactKind::SensitiveDataReport)
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&sensitive.content).unwrap();
    assert_eq!(json["countsByKind"]["email"], 1);
}

#[test]
fn test_fully_compliant_policy_scores_100() {
    let harness = TestHarness::new();
    let path = harness.upload_fixture("complete-policy.txt");
    let result = pipeline(&bank_config()).process(harness.context("u-101", &path));

    assert!(result.success);
    assert_eq!(result.summary.total_gaps, 0);
    assert_eq!(result.summary.compliance_score, 100);
    assert_eq!(result.artifact_ids.len(), 3);
}

#[test]
fn test_docx_upload() {
    let harness = TestHarness::new();
    let path = harness.upload(
        "policy.docx",
        &docx_bytes(&[
            "The qualified individual oversees the information security program.",
            "We encrypt customer information.",
        ]),
    );
    let result = pipeline(&bank_config()).process(harness.context("u-102", &path));

    assert!(result.success, "stages: {:?}", result.stages);
    // Only CC6.1 remains unaddressed: medium risk, five points.
    assert_eq!(result.summary.total_gaps, 1);
    assert_eq!(result.summary.critical_gaps, 0);
    assert_eq!(result.summary.compliance_score, 95);
}

#[test]
fn test_docx_with_split_runs_matches_keywords() {
    let harness = TestHarness::new();
    let path = harness.upload(
        "edited.docx",
        &docx_with_runs(&[
            &[
                "The qualified ",
                "individual oversees the information security ",
                "program.",
            ],
            &[
                "We encrypt customer information &amp; enforce least ",
                "privilege through access ",
                "control reviews.",
            ],
        ]),
    );
    let result = pipeline(&bank_config()).process(harness.context("u-106", &path));

    assert!(result.success, "stages: {:?}", result.stages);
    assert_eq!(result.summary.total_gaps, 0);
    assert_eq!(result.summary.compliance_score, 100);
}

#[test]
fn test_institution_type_selects_frameworks() {
    let harness = TestHarness::new();
    let path = harness.upload_fixture("security-policy.txt");
    let ctx = harness
        .context("u-103", &path)
        .with_institution_type("university");

    let result = pipeline(&bank_config()).process(ctx);

    // GLBA does not apply to universities; only the SOC2 gap remains.
    assert!(result.success);
    assert_eq!(result.summary.total_gaps, 1);
    assert_eq!(result.summary.compliance_score, 95);
}

#[test]
fn test_default_config_has_no_catalog() {
    let harness = TestHarness::new();
    let path = harness.upload("memo.txt", b"Quarterly staff memo.");
    let result = pipeline(&Config::default()).process(harness.context("u-104", &path));

    assert!(result.success);
    assert_eq!(result.summary.compliance_score, 100);
    // Default artifact kinds: gap report and redline summary.
    assert_eq!(result.artifact_ids.len(), 2);
}

#[test]
fn test_repeat_processing_is_identical() {
    let harness = TestHarness::new();
    let path = harness.upload_fixture("security-policy.txt");
    let ctx = harness.context("u-105", &path);
    let pipeline = pipeline(&bank_config());

    let first = pipeline.process(ctx.clone());
    let second = pipeline.process(ctx);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// ── failure path ──

#[test]
fn test_eicar_upload_is_rejected() {
    let harness = TestHarness::new();
    let path = harness.upload("invoice.txt", EICAR_TEST_SIGNATURE.as_bytes());
    let result = pipeline(&bank_config()).process(harness.context("u-200", &path));

    assert!(!result.success);
    assert_eq!(result.stages.len(), 1);
    let scan = result.stage(Stage::MalwareScan).unwrap();
    assert_eq!(scan.status, StageState::Failed);
    assert_eq!(scan.error.as_deref(), Some("virus detected"));
    assert!(result.artifact_ids.is_empty());
    assert_eq!(result.summary, ProcessingSummary::default());

    let status = UploadStatus::from_result(&result);
    assert_eq!(status.state, UploadState::Failed);
    assert_eq!(status.current_stage, Some(Stage::MalwareScan));
    assert_eq!(status.error_message.as_deref(), Some("virus detected"));
}

#[test]
fn test_missing_file_fails_first_stage() {
    let harness = TestHarness::new();
    let path = harness.upload_dir.join("never-uploaded.pdf");
    let result = pipeline(&bank_config()).process(harness.context("u-201", &path));

    assert!(!result.success);
    let (stage, message) = result.failure().unwrap();
    assert_eq!(stage, Stage::MalwareScan);
    assert!(message.contains("Failed to read document"));
}

#[test]
fn test_oversized_document_rejected() {
    let harness = TestHarness::new();
    let path = harness.upload("large.txt", &vec![b'a'; 2048]);
    let mut config = bank_config();
    config.pipeline.max_document_bytes = 1024;

    let result = pipeline(&config).process(harness.context("u-202", &path));

    let (stage, message) = result.failure().unwrap();
    assert_eq!(stage, Stage::MalwareScan);
    assert_eq!(message, "Document is 2048 bytes, limit is 1024");
}

#[test]
fn test_unsupported_format_fails_extraction() {
    let harness = TestHarness::new();
    let path = harness.upload("scan.tiff", &[0x49, 0x49, 0x2a, 0x00, 0xff, 0xfe]);
    let result = pipeline(&bank_config()).process(harness.context("u-203", &path));

    assert!(!result.success);
    assert!(result.is_completed(Stage::MalwareScan));
    let (stage, message) = result.failure().unwrap();
    assert_eq!(stage, Stage::TextExtraction);
    assert!(message.starts_with("Unsupported document format"));
    assert!(result.stage(Stage::PiiDetection).is_none());
}

#[test]
fn test_corrupt_pdf_fails_extraction() {
    let harness = TestHarness::new();
    let path = harness.upload("broken.pdf", b"%PDF-1.4 this is not really a pdf");
    let result = pipeline(&bank_config()).process(harness.context("u-204", &path));

    let (stage, _) = result.failure().unwrap();
    assert_eq!(stage, Stage::TextExtraction);
    assert_eq!(UploadStatus::from_result(&result).progress, 14);
}

// ── progress ──

#[test]
fn test_progress_broadcast_for_full_run() {
    let harness = TestHarness::new();
    let path = harness.upload_fixture("security-policy.txt");
    let (sender, mut rx) = broadcast::channel(64);
    let progress = BroadcastProgress::new("u-300", Arc::new(sender));

    let result =
        pipeline(&bank_config()).process_with_progress(harness.context("u-300", &path), &progress);
    assert!(result.success);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    // Started and completed per stage, plus the final event.
    assert_eq!(events.len(), Stage::COUNT * 2 + 1);
    assert!(events.iter().all(|e| e.upload_id == "u-300"));
    let clock_time = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
    assert!(events.iter().all(|e| e.timestamp == clock_time));
    let last = events.last().unwrap();
    assert_eq!(last.status, ProgressStatus::Completed);
    assert_eq!(last.progress, 100);
    assert_eq!(last.compliance_score, Some(70));

    let percentages: Vec<u8> = events.iter().map(|e| e.progress).collect();
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]));
}

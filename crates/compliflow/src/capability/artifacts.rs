//! JSON report artifacts.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::capability::{
    ArtifactBundle, ArtifactGenerator, ArtifactKind, GapRecord, GeneratedArtifact,
    GenerationOutput, RedlineRecord, SensitiveMatch,
};
use crate::error::CapabilityError;
use crate::pipeline::ProcessingSummary;

const JSON_MEDIA_TYPE: &str = "application/json";

/// Artifact id for `kind` of `upload_id`. Stable across runs so re-processing
/// the same upload yields the same ids.
pub fn artifact_id(upload_id: &str, kind: ArtifactKind) -> String {
    let name = format!("compliflow:{}:{}", upload_id, kind.as_str());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()).to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GapReport<'a> {
    upload_id: &'a str,
    document_type: &'a str,
    summary: &'a ProcessingSummary,
    controls_evaluated: usize,
    gaps: &'a [GapRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RedlineSummary<'a> {
    upload_id: &'a str,
    document_type: &'a str,
    redlines: &'a [RedlineRecord],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SensitiveDataReport<'a> {
    upload_id: &'a str,
    counts_by_kind: BTreeMap<&'a str, usize>,
    matches: &'a [SensitiveMatch],
}

pub struct ReportGenerator {
    kinds: Vec<ArtifactKind>,
}

impl ReportGenerator {
    pub fn new(kinds: Vec<ArtifactKind>) -> Self {
        Self { kinds }
    }

    fn render(
        &self,
        kind: ArtifactKind,
        bundle: &ArtifactBundle<'_>,
    ) -> Result<Vec<u8>, CapabilityError> {
        let content = match kind {
            ArtifactKind::GapReport => serde_json::to_vec_pretty(&GapReport {
                upload_id: bundle.upload_id,
                document_type: bundle.document_type,
                summary: bundle.summary,
                controls_evaluated: bundle.mappings.len(),
                gaps: bundle.gaps,
            })?,
            ArtifactKind::RedlineSummary => serde_json::to_vec_pretty(&RedlineSummary {
                upload_id: bundle.upload_id,
                document_type: bundle.document_type,
                redlines: bundle.redlines,
            })?,
            ArtifactKind::SensitiveDataReport => {
                serde_json::to_vec_pretty(&SensitiveDataReport {
                    upload_id: bundle.upload_id,
                    counts_by_kind: bundle.detection.counts_by_kind(),
                    matches: &bundle.detection.matches,
                })?
            }
        };
        Ok(content)
    }
}

impl ArtifactGenerator for ReportGenerator {
    fn generate(&self, bundle: &ArtifactBundle<'_>) -> Result<GenerationOutput, CapabilityError> {
        if bundle.upload_id.is_empty() {
            return Err(CapabilityError::Generation(
                "upload id is required to name artifacts".to_string(),
            ));
        }

        let artifacts = self
            .kinds
            .iter()
            .map(|&kind| {
                Ok(GeneratedArtifact {
                    id: artifact_id(bundle.upload_id, kind),
                    kind,
                    name: format!("{}-{}.json", bundle.upload_id, kind.as_str()),
                    media_type: JSON_MEDIA_TYPE.to_string(),
                    content: self.render(kind, bundle)?,
                })
            })
            .collect::<Result<Vec<_>, CapabilityError>>()?;

        Ok(GenerationOutput { artifacts })
    }
}

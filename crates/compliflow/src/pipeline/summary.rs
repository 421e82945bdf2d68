use serde::{Deserialize, Serialize};

use crate::capability::{GapRecord, RiskLevel};

const CRITICAL_GAP_PENALTY: usize = 20;
const OTHER_GAP_PENALTY: usize = 5;

/// Aggregated risk summary of a processed document.
///
/// The default value (all zeros) marks a document that was never scored
/// because gap analysis did not complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSummary {
    pub critical_gaps: usize,
    pub total_gaps: usize,
    pub compliance_score: u8,
}

impl ProcessingSummary {
    pub fn from_gaps(gaps: &[GapRecord]) -> Self {
        let critical_gaps = gaps
            .iter()
            .filter(|g| g.risk_level == RiskLevel::Critical)
            .count();
        let total_gaps = gaps.len();

        Self {
            critical_gaps,
            total_gaps,
            compliance_score: compliance_score(critical_gaps, total_gaps),
        }
    }
}

/// `max(0, 100 - (critical * 20 + (total - critical) * 5))`.
///
/// A fixed linear penalty, not normalized by the number of controls
/// evaluated. Downstream score bands depend on these exact values.
pub fn compliance_score(critical_gaps: usize, total_gaps: usize) -> u8 {
    let other_gaps = total_gaps.saturating_sub(critical_gaps);
    let penalty = critical_gaps
        .saturating_mul(CRITICAL_GAP_PENALTY)
        .saturating_add(other_gaps.saturating_mul(OTHER_GAP_PENALTY));
    100usize.saturating_sub(penalty) as u8
}

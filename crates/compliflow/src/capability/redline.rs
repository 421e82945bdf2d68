use crate::capability::gaps::NOT_ADDRESSED;
use crate::capability::{
    GapSummary, PolicyRedliner, RedlineAction, RedlineDocument, RedlineRecord,
};
use crate::error::CapabilityError;

/// Produces one redline per gap, most severe first.
///
/// Unaddressed requirements become insertions; partially addressed ones
/// become revisions quoting the first document line that mentions the
/// requirement, when one exists.
pub struct TemplateRedliner;

impl TemplateRedliner {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TemplateRedliner {
    fn default() -> Self {
        Self::new()
    }
}

fn find_related_line<'a>(text: &'a str, requirement: &str) -> Option<&'a str> {
    let terms: Vec<String> = requirement
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .collect();

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find(|line| {
            let lower = line.to_lowercase();
            terms.iter().any(|t| lower.contains(t.as_str()))
        })
}

impl PolicyRedliner for TemplateRedliner {
    fn redline(
        &self,
        document: &RedlineDocument<'_>,
        gaps: &[GapSummary],
    ) -> Result<Vec<RedlineRecord>, CapabilityError> {
        let mut ordered: Vec<&GapSummary> = gaps.iter().collect();
        // Stable: equal risk keeps analyzer order.
        ordered.sort_by(|a, b| b.risk_level.cmp(&a.risk_level));

        let records = ordered
            .into_iter()
            .enumerate()
            .map(|(index, gap)| {
                let original_text = if gap.current_state == NOT_ADDRESSED {
                    None
                } else {
                    find_related_line(document.text, &gap.requirement).map(str::to_string)
                };
                let action = if original_text.is_some() {
                    RedlineAction::Revise
                } else {
                    RedlineAction::Insert
                };

                RedlineRecord {
                    section: (index + 1).to_string(),
                    action,
                    original_text,
                    suggested_text: format!("{}: {}", gap.requirement, gap.remediation),
                    rationale: gap.gap.clone(),
                    framework: gap.framework.clone(),
                    risk_level: gap.risk_level,
                }
            })
            .collect();

        Ok(records)
    }
}

//! Keyword-coverage gap analysis.
//!
//! A control is covered when all of its keywords appear in the document.
//! Partial coverage produces a gap one risk level below the control's
//! level; no coverage produces a gap at the control's level. Controls that
//! protect sensitive data are raised one level when the document itself
//! contains sensitive values.

use crate::capability::{ControlMapping, GapAnalyzer, GapRecord, SensitiveMatch};
use crate::error::CapabilityError;

/// `current_state` of a gap whose control has none of its keywords covered.
pub const NOT_ADDRESSED: &str = "not addressed";

pub struct CoverageAnalyzer;

impl CoverageAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(mapping: &ControlMapping, has_sensitive_data: bool) -> Option<GapRecord> {
        let expected: Vec<&String> = mapping
            .keywords
            .iter()
            .filter(|k| !k.trim().is_empty())
            .collect();
        if expected.is_empty() {
            return None;
        }

        let missing: Vec<&str> = expected
            .iter()
            .filter(|k| {
                !mapping
                    .matched_keywords
                    .iter()
                    .any(|m| m.eq_ignore_ascii_case(k))
            })
            .map(|k| k.as_str())
            .collect();

        if missing.is_empty() {
            return None;
        }

        let covered = expected.len() - missing.len();
        let (current_state, mut risk_level) = if covered == 0 {
            (NOT_ADDRESSED.to_string(), mapping.risk_level)
        } else {
            (
                format!("partially addressed ({} of {} elements)", covered, expected.len()),
                mapping.risk_level.lowered(),
            )
        };

        if mapping.protects_sensitive_data && has_sensitive_data {
            risk_level = risk_level.raised();
        }

        Some(GapRecord {
            requirement: mapping.requirement.clone(),
            current_state,
            gap: format!(
                "{} {}: missing {}",
                mapping.framework,
                mapping.control,
                missing.join(", ")
            ),
            risk_level,
            framework: mapping.framework.clone(),
            remediation: mapping.remediation.clone(),
        })
    }
}

impl Default for CoverageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl GapAnalyzer for CoverageAnalyzer {
    fn analyze(
        &self,
        _text: &str,
        mappings: &[ControlMapping],
        entities: &[SensitiveMatch],
    ) -> Result<Vec<GapRecord>, CapabilityError> {
        let has_sensitive_data = !entities.is_empty();
        Ok(mappings
            .iter()
            .filter_map(|m| Self::evaluate(m, has_sensitive_data))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{RiskLevel, TextSpan};

    fn mapping(keywords: &[&str], matched: &[&str], risk: RiskLevel) -> ControlMapping {
        ControlMapping {
            framework: "HIPAA".to_string(),
            control: "164.312".to_string(),
            requirement: "Technical safeguards".to_string(),
            risk_level: risk,
            remediation: "Document access controls".to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            matched_keywords: matched.iter().map(|s| s.to_string()).collect(),
            protects_sensitive_data: false,
        }
    }

    fn entity() -> SensitiveMatch {
        SensitiveMatch {
            kind: "us_ssn".to_string(),
            location: TextSpan { start: 0, end: 11 },
            confidence: 0.9,
        }
    }

    #[test]
    fn test_fully_covered_control_has_no_gap() {
        let m = mapping(&["audit", "access"], &["audit", "access"], RiskLevel::High);
        let gaps = CoverageAnalyzer::new().analyze("", &[m], &[]).unwrap();
        assert!(gaps.is_empty());
    }

    #[test]
    fn test_unaddressed_control_keeps_risk() {
        let m = mapping(&["audit", "access"], &[], RiskLevel::High);
        let gaps = CoverageAnalyzer::new().analyze("", &[m], &[]).unwrap();

        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].risk_level, RiskLevel::High);
        assert_eq!(gaps[0].current_state, NOT_ADDRESSED);
        assert!(gaps[0].gap.contains("audit, access"));
        assert_eq!(gaps[0].framework, "HIPAA");
    }

    #[test]
    fn test_partial_coverage_lowers_risk() {
        let m = mapping(&["audit", "access"], &["Audit"], RiskLevel::High);
        let gaps = CoverageAnalyzer::new().analyze("", &[m], &[]).unwrap();

        assert_eq!(gaps[0].risk_level, RiskLevel::Medium);
        assert_eq!(gaps[0].current_state, "partially addressed (1 of 2 elements)");
        assert!(gaps[0].gap.ends_with("missing access"));
    }

    #[test]
    fn test_sensitive_data_escalates_protecting_controls() {
        let mut m = mapping(&["encryption"], &[], RiskLevel::High);
        m.protects_sensitive_data = true;

        let gaps = CoverageAnalyzer::new()
            .analyze("", &[m.clone()], &[entity()])
            .unwrap();
        assert_eq!(gaps[0].risk_level, RiskLevel::Critical);

        let gaps = CoverageAnalyzer::new().analyze("", &[m], &[]).unwrap();
        assert_eq!(gaps[0].risk_level, RiskLevel::High);
    }

    #[test]
    fn test_zero_mappings_yield_zero_gaps() {
        let gaps = CoverageAnalyzer::new().analyze("text", &[], &[entity()]).unwrap();
        assert!(gaps.is_empty());
    }
}

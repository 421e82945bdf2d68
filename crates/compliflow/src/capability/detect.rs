//! Regex-based sensitive data detection.

use regex::Regex;
use tracing::debug;

use crate::capability::{DetectionReport, SensitiveDataDetector, SensitiveMatch, TextSpan};
use crate::config::SensitivePattern;
use crate::error::{CapabilityError, ConfigError};
use crate::sanitize;

struct CompiledPattern {
    kind: String,
    regex: Regex,
    confidence: f32,
    luhn: bool,
}

pub struct PatternDetector {
    patterns: Vec<CompiledPattern>,
}

impl PatternDetector {
    pub fn new(patterns: &[SensitivePattern]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let regex = Regex::new(&p.pattern).map_err(|e| ConfigError::InvalidPattern {
                    name: p.kind.clone(),
                    reason: e.to_string(),
                })?;
                Ok(CompiledPattern {
                    kind: p.kind.clone(),
                    regex,
                    confidence: p.confidence,
                    luhn: p.luhn,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self { patterns })
    }
}

/// Luhn checksum over the digits of `candidate`, ignoring separators.
pub fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 2 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

impl SensitiveDataDetector for PatternDetector {
    fn scan(&self, text: &str) -> Result<DetectionReport, CapabilityError> {
        let mut matches = Vec::new();

        for pattern in &self.patterns {
            for found in pattern.regex.find_iter(text) {
                if pattern.luhn && !luhn_valid(found.as_str()) {
                    continue;
                }
                debug!(
                    kind = %pattern.kind,
                    value = %sanitize::mask_value(found.as_str()),
                    "Sensitive value detected"
                );
                matches.push(SensitiveMatch {
                    kind: pattern.kind.clone(),
                    location: TextSpan {
                        start: found.start(),
                        end: found.end(),
                    },
                    confidence: pattern.confidence,
                });
            }
        }

        matches.sort_by(|a, b| {
            a.location
                .start
                .cmp(&b.location.start)
                .then_with(|| a.kind.cmp(&b.kind))
        });

        Ok(DetectionReport { matches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectionConfig;

    fn default_detector() -> PatternDetector {
        PatternDetector::new(&DetectionConfig::default().patterns).unwrap()
    }

    #[test]
    fn test_detects_email_and_ssn_in_order() {
        let text = "SSN 123-45-6789 belongs to jane.doe@example.com";
        let report = default_detector().scan(text).unwrap();

        let kinds: Vec<&str> = report.matches.iter().map(|m| m.kind.as_str()).collect();
        assert_eq!(kinds, vec!["us_ssn", "email"]);

        let ssn = &report.matches[0];
        assert_eq!(&text[ssn.location.start..ssn.location.end], "123-45-6789");
        assert!((ssn.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn test_payment_card_requires_luhn() {
        let detector = default_detector();

        let valid = detector.scan("card 4111 1111 1111 1111 on file").unwrap();
        assert!(valid.matches.iter().any(|m| m.kind == "payment_card"));

        let invalid = detector.scan("card 4111 1111 1111 1112 on file").unwrap();
        assert!(!invalid.matches.iter().any(|m| m.kind == "payment_card"));
    }

    #[test]
    fn test_empty_text_has_no_matches() {
        let report = default_detector().scan("").unwrap();
        assert!(report.matches.is_empty());
    }

    #[test]
    fn test_luhn_valid() {
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("4111-1111-1111-1111"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("7"));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = PatternDetector::new(&[SensitivePattern {
            kind: "broken".to_string(),
            pattern: "(".to_string(),
            confidence: 0.5,
            luhn: false,
        }]);
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }
}

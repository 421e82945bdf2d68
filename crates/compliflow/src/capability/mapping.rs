use tracing::debug;

use crate::capability::{ControlMapping, FrameworkMapper};
use crate::config::FrameworkConfig;
use crate::error::CapabilityError;

/// Maps documents onto a configured catalog of frameworks and controls.
///
/// Every control of every framework that applies to the document and
/// institution type is returned; `matched_keywords` records which of the
/// control's keywords occur in the text (case-insensitive).
pub struct CatalogMapper {
    frameworks: Vec<FrameworkConfig>,
}

impl CatalogMapper {
    pub fn new(frameworks: Vec<FrameworkConfig>) -> Self {
        Self { frameworks }
    }
}

impl FrameworkMapper for CatalogMapper {
    fn map(
        &self,
        text: &str,
        document_type: &str,
        institution_type: &str,
    ) -> Result<Vec<ControlMapping>, CapabilityError> {
        let haystack = text.to_lowercase();
        let mut mappings = Vec::new();

        for framework in &self.frameworks {
            if !framework.applies_to(document_type, institution_type) {
                debug!(
                    framework = %framework.name,
                    document_type,
                    institution_type,
                    "Framework not applicable"
                );
                continue;
            }

            for control in &framework.controls {
                let matched_keywords = control
                    .keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .filter(|k| haystack.contains(&k.to_lowercase()))
                    .cloned()
                    .collect();

                mappings.push(ControlMapping {
                    framework: framework.name.clone(),
                    control: control.id.clone(),
                    requirement: control.requirement.clone(),
                    risk_level: control.risk_level,
                    remediation: control.remediation.clone(),
                    keywords: control.keywords.clone(),
                    matched_keywords,
                    protects_sensitive_data: control.protects_sensitive_data,
                });
            }
        }

        Ok(mappings)
    }
}

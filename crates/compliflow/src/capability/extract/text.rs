use std::collections::BTreeMap;

use crate::capability::extract::{DocumentFormat, FormatExtractor};
use crate::capability::ExtractedText;
use crate::error::CapabilityError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct PlainTextExtractor;

impl FormatExtractor for PlainTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, CapabilityError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        // Invalid sequences are replaced rather than failing the stage.
        let (text, encoding) = match std::str::from_utf8(bytes) {
            Ok(s) => (s.to_string(), "utf-8"),
            Err(_) => (String::from_utf8_lossy(bytes).into_owned(), "utf-8-lossy"),
        };

        let mut metadata = BTreeMap::new();
        metadata.insert("format".to_string(), "text".to_string());
        metadata.insert("encoding".to_string(), encoding.to_string());

        Ok(ExtractedText {
            text,
            page_count: None,
            metadata,
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Text)
    }
}

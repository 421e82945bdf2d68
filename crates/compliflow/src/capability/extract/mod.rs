pub mod docx;
pub mod pdf;
pub mod text;

use std::path::Path;

use tracing::debug;

use crate::capability::{ExtractedText, TextExtractor};
use crate::error::CapabilityError;
use crate::sanitize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "txt" | "text" | "md" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/pdf" => Some(Self::Pdf),
            DOCX_MIME => Some(Self::Docx),
            m if m.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }

    /// Guess the format from magic bytes when the path gives no hint.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"PK\x03\x04") {
            Some(Self::Docx)
        } else if std::str::from_utf8(bytes).is_ok() {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Resolution order: extension, guessed MIME type, content sniffing.
    pub fn detect(path: &Path, bytes: &[u8]) -> Option<Self> {
        let extension = path.extension().and_then(|e| e.to_str());

        if let Some(format) = extension.and_then(Self::from_extension) {
            return Some(format);
        }

        if let Some(mime) = mime_guess::from_path(path).first() {
            if let Some(format) = Self::from_mime(mime.essence_str()) {
                return Some(format);
            }
        }

        if extension.is_none() {
            return Self::sniff(bytes);
        }

        None
    }
}

pub trait FormatExtractor: Send + Sync {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, CapabilityError>;
    fn supports(&self, format: DocumentFormat) -> bool;
}

/// Routes a document to the extractor for its format.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn FormatExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: vec![
                Box::new(text::PlainTextExtractor),
                Box::new(pdf::PdfExtractor),
                Box::new(docx::DocxExtractor),
            ],
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor for ExtractorRegistry {
    fn extract(&self, path: &Path, bytes: &[u8]) -> Result<ExtractedText, CapabilityError> {
        let format = DocumentFormat::detect(path, bytes).ok_or_else(|| {
            CapabilityError::UnsupportedFormat(
                path.extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            )
        })?;

        debug!(
            file = %sanitize::redact_path(path),
            format = ?format,
            "Routing document to extractor"
        );

        for extractor in &self.extractors {
            if extractor.supports(format) {
                return extractor.extract(bytes);
            }
        }

        Err(CapabilityError::UnsupportedFormat(format!("{:?}", format)))
    }
}

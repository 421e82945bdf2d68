use std::collections::BTreeMap;

use crate::capability::extract::{DocumentFormat, FormatExtractor};
use crate::capability::ExtractedText;
use crate::error::CapabilityError;

pub struct PdfExtractor;

impl FormatExtractor for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, CapabilityError> {
        let _span = tracing::info_span!("extract.pdf").entered();

        let doc = lopdf::Document::load_mem(bytes)
            .map_err(|e| CapabilityError::Extraction(format!("Failed to load PDF: {}", e)))?;

        let pages = doc.get_pages();
        let mut text = String::new();
        let mut unreadable_pages = 0usize;

        for page_num in pages.keys() {
            match doc.extract_text(&[*page_num]) {
                Ok(page_text) => {
                    text.push_str(&page_text);
                    text.push('\n');
                }
                Err(e) => {
                    unreadable_pages += 1;
                    tracing::warn!(page = page_num, "Failed to extract PDF page text: {}", e);
                }
            }
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("format".to_string(), "pdf".to_string());
        metadata.insert("pdf_version".to_string(), doc.version.clone());
        if unreadable_pages > 0 {
            metadata.insert("unreadable_pages".to_string(), unreadable_pages.to_string());
        }

        Ok(ExtractedText {
            text,
            page_count: Some(pages.len() as u32),
            metadata,
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a one-page PDF showing `line` in Courier.
    pub(crate) fn single_page_pdf(line: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT\n/F1 12 Tf\n72 720 Td\n({}) Tj\nET\n", line);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_extracts_page_text() {
        let bytes = single_page_pdf("Records retention policy");
        let extracted = PdfExtractor.extract(&bytes).unwrap();

        assert_eq!(extracted.page_count, Some(1));
        assert!(extracted.text.contains("Records retention policy"));
        assert_eq!(extracted.metadata.get("format").map(String::as_str), Some("pdf"));
    }

    #[test]
    fn test_invalid_pdf_fails() {
        let result = PdfExtractor.extract(b"%PDF-1.5 not really a pdf");
        assert!(matches!(result, Err(CapabilityError::Extraction(_))));
    }
}

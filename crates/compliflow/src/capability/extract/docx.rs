use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::capability::extract::{DocumentFormat, FormatExtractor};
use crate::capability::ExtractedText;
use crate::error::CapabilityError;

pub struct DocxExtractor;

impl FormatExtractor for DocxExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<ExtractedText, CapabilityError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| CapabilityError::Extraction(format!("Failed to open DOCX: {}", e)))?;

        let text = extract_docx_text(&mut archive)?;

        let mut metadata = BTreeMap::new();
        metadata.insert("format".to_string(), "docx".to_string());

        Ok(ExtractedText {
            text,
            page_count: None,
            metadata,
        })
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Docx)
    }
}

fn extract_docx_text<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, CapabilityError> {
    let mut document_xml = archive.by_name("word/document.xml").map_err(|e| {
        CapabilityError::Extraction(format!("Failed to find document.xml: {}", e))
    })?;

    let mut xml_content = String::new();
    document_xml.read_to_string(&mut xml_content).map_err(|e| {
        CapabilityError::Extraction(format!("Failed to read document.xml: {}", e))
    })?;

    parse_docx_xml(&xml_content)
}

/// Collects `w:t` runs, one line per `w:p` paragraph.
///
/// Run text is kept verbatim: Word splits sentences across runs and the
/// separating spaces live at the run edges.
fn parse_docx_xml(xml: &str) -> Result<String, CapabilityError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_run = false;
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"r" => in_run = true,
                b"t" => in_text_element = true,
                _ => {}
            },
            // `w:tab` also defines tab stops in paragraph properties.
            Ok(Event::Empty(ref e)) if in_run => match e.local_name().as_ref() {
                b"tab" => text.push('\t'),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"r" => in_run = false,
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text_element {
                    let name = String::from_utf8_lossy(&e);
                    match resolve_reference(&name) {
                        Some(c) => text.push(c),
                        None => {
                            return Err(CapabilityError::Extraction(format!(
                                "Unknown entity reference '&{};'",
                                name
                            )));
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CapabilityError::Extraction(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Resolves a predefined XML entity or a numeric character reference,
/// given the name between `&` and `;`.
fn resolve_reference(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("word/document.xml", options).unwrap();
            zip.write_all(document_xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_parse_paragraphs() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:body>
                <w:p><w:r><w:t>Data retention</w:t></w:r></w:p>
                <w:p><w:r><w:t>Access control</w:t></w:r></w:p>
            </w:body>
        </w:document>"#;

        let text = parse_docx_xml(xml).unwrap();
        assert_eq!(text, "Data retention\nAccess control\n");
    }

    #[test]
    fn test_split_runs_and_entities_preserved() {
        let xml = concat!(
            "<w:p><w:r><w:t>R&amp;D data</w:t></w:r></w:p>",
            "<w:p><w:r><w:t xml:space=\"preserve\">Quarterly access </w:t></w:r>",
            "<w:r><w:t>review</w:t></w:r></w:p>",
        );

        let text = parse_docx_xml(xml).unwrap();
        assert_eq!(text, "R&D data\nQuarterly access review\n");
    }

    #[test]
    fn test_character_references_and_tabs() {
        let xml = concat!(
            "<w:p><w:pPr><w:tabs><w:tab w:val=\"left\" w:pos=\"720\"/></w:tabs></w:pPr>",
            "<w:r><w:t>&lt;Section&gt;</w:t><w:tab/><w:t>caf&#233; &#x41;</w:t></w:r></w:p>",
        );
        let text = parse_docx_xml(xml).unwrap();
        assert_eq!(text, "<Section>\tcaf\u{e9} A\n");
    }

    #[test]
    fn test_whitespace_between_elements_ignored() {
        let xml = "<w:body>\n  <w:p>\n    <w:r> <w:t>Encryption</w:t> </w:r>\n  </w:p>\n</w:body>";
        let text = parse_docx_xml(xml).unwrap();
        assert_eq!(text, "Encryption\n");
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(resolve_reference("amp"), Some('&'));
        assert_eq!(resolve_reference("apos"), Some('\''));
        assert_eq!(resolve_reference("#169"), Some('\u{a9}'));
        assert_eq!(resolve_reference("#xA9"), Some('\u{a9}'));
        assert_eq!(resolve_reference("nbsp"), None);
        assert_eq!(resolve_reference("#xD800"), None);
    }

    #[test]
    fn test_extracts_from_archive() {
        let xml = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>Incident response</w:t></w:r></w:p></w:body></w:document>"#;
        let extracted = DocxExtractor.extract(&docx_bytes(xml)).unwrap();
        assert!(extracted.text.contains("Incident response"));
        assert_eq!(extracted.metadata.get("format").map(String::as_str), Some("docx"));
    }

    #[test]
    fn test_archive_without_document_xml() {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buffer);
            zip.start_file("other.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"<x/>").unwrap();
            zip.finish().unwrap();
        }

        let result = DocxExtractor.extract(&buffer.into_inner());
        assert!(matches!(result, Err(CapabilityError::Extraction(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let result = DocxExtractor.extract(b"PK\x03\x04 truncated");
        assert!(matches!(result, Err(CapabilityError::Extraction(_))));
    }
}

//! Test harness for isolated pipeline runs.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use compliflow::config::{load_config, Config};
use compliflow::ProcessingContext;

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

/// The bank policy catalog used by most end-to-end tests.
pub fn bank_config() -> Config {
    load_config(fixture_path("configs/bank-policy.yaml")).expect("bank-policy.yaml should load")
}

/// A `word/document.xml`-only DOCX archive with one paragraph per entry.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let runs: Vec<Vec<&str>> = paragraphs.iter().map(|p| vec![*p]).collect();
    let runs: Vec<&[&str]> = runs.iter().map(Vec::as_slice).collect();
    docx_with_runs(&runs)
}

/// Like [`docx_bytes`], but each paragraph is split into the given runs,
/// the way Word stores edited text. Run text is inserted as raw XML.
pub fn docx_with_runs(paragraphs: &[&[&str]]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|runs| {
            let runs: String = runs
                .iter()
                .map(|r| format!(r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#, r))
                .collect();
            format!("<w:p>{}</w:p>", runs)
        })
        .collect();
    let xml = format!(
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// Isolated upload directory for one test.
pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");
        Self {
            temp_dir,
            upload_dir,
        }
    }

    /// Writes `contents` as an uploaded file and returns its path.
    pub fn upload(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.upload_dir.join(name);
        std::fs::write(&path, contents).expect("Failed to write upload");
        path
    }

    /// Copies a file from `tests/fixtures/inputs` into the upload directory.
    pub fn upload_fixture(&self, name: &str) -> PathBuf {
        let contents = std::fs::read(fixture_path(&format!("inputs/{}", name)))
            .expect("Fixture should exist");
        self.upload(name, &contents)
    }

    pub fn context(&self, upload_id: &str, path: &Path) -> ProcessingContext {
        ProcessingContext::new(upload_id, path, "user-1", "inst-1", "policy")
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

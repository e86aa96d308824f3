// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests

#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test fixture helper for creating temporary directories with response dumps
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self {
            temp_dir,
            root_path,
        }
    }

    /// Write a response dump with given raw content
    pub fn create_response_file<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }
}

/// Wire-format `file_citation` annotation located at the first occurrence of `marker`
pub fn citation_json(text: &str, marker: &str, file_id: &str) -> Value {
    let start = text.find(marker).expect("marker present in text");
    json!({
        "type": "file_citation",
        "text": marker,
        "start_index": start,
        "end_index": start + marker.len(),
        "file_citation": { "file_id": file_id, "quote": format!("quote from {file_id}") }
    })
}

/// Wire-format response object
pub fn response_json(text: &str, annotations: Vec<Value>) -> String {
    json!({ "text": text, "annotations": annotations }).to_string()
}

/// Sample text with two correctly annotated markers
pub fn two_source_response() -> String {
    let text = "A 【source:x.pdf】 B 【source:y.pdf】 C";
    response_json(
        text,
        vec![
            citation_json(text, "【source:x.pdf】", "x.pdf"),
            citation_json(text, "【source:y.pdf】", "y.pdf"),
        ],
    )
}

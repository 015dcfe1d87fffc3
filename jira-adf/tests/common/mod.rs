//! Shared helpers for the integration tests

use jira_adf::{to_document, to_markdown, Document};
use serde_json::Value;
use std::path::PathBuf;

/// Read a file from tests/fixtures.
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
}

/// Markdown → ADF, as the JSON value that goes over the wire.
pub fn md_to_json(markdown: &str) -> Value {
    let doc = to_document(markdown).expect("markdown should always convert");
    serde_json::to_value(&doc).expect("document should serialize")
}

/// ADF JSON value → Markdown.
pub fn json_to_md(json: Value) -> String {
    let bytes = serde_json::to_vec(&json).expect("value should serialize");
    to_markdown(&bytes).expect("document should render")
}

/// Markdown → ADF → JSON bytes → Markdown.
pub fn round_trip(markdown: &str) -> String {
    let doc = to_document(markdown).expect("markdown should always convert");
    let bytes = serde_json::to_vec(&doc).expect("document should serialize");
    to_markdown(&bytes).expect("document should render")
}

/// Wrap block nodes in a document root.
pub fn doc(content: Vec<Value>) -> Value {
    serde_json::json!({ "version": 1, "type": "doc", "content": content })
}

/// Parse the JSON form back into the tree, for structural assertions.
pub fn parse_json(json: Value) -> Document {
    serde_json::from_value(json).expect("value should be a document")
}

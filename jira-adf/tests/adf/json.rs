//! ADF JSON decoding and encoding through the registry

use crate::common::{doc, parse_json};
use jira_adf::{FormatError, FormatRegistry, NodeKind};
use serde_json::json;
use std::collections::HashMap;

#[test]
fn test_registry_converts_markdown_to_compact_adf() {
    let registry = FormatRegistry::default();
    let doc = registry.parse("Hi *there*", "markdown").unwrap();
    let out = registry.serialize(&doc, "adf").unwrap();
    assert_eq!(
        out,
        r#"{"version":1,"type":"doc","content":[{"type":"paragraph","content":[{"type":"text","text":"Hi "},{"type":"text","text":"there","marks":[{"type":"em"}]}]}]}"#
    );
}

#[test]
fn test_registry_pretty_option() {
    let registry = FormatRegistry::default();
    let doc = registry.parse("x", "markdown").unwrap();

    let mut options = HashMap::new();
    options.insert("pretty".to_string(), "true".to_string());
    let out = registry.serialize_with_options(&doc, "adf", &options).unwrap();
    assert!(out.starts_with("{\n  \"version\": 1,\n  \"type\": \"doc\""));
}

#[test]
fn test_registry_converts_adf_to_markdown() {
    let registry = FormatRegistry::default();
    let source = doc(vec![json!({
        "type": "paragraph",
        "content": [{ "type": "text", "text": "from jira", "marks": [{ "type": "strong" }] }]
    })])
    .to_string();
    let doc = registry.parse(&source, "adf").unwrap();
    assert_eq!(registry.serialize(&doc, "markdown").unwrap(), "**from jira**\n");
}

#[test]
fn test_invalid_json_is_reported_with_position() {
    let registry = FormatRegistry::default();
    let err = registry.parse("{\"type\": \"doc\", \"content\": [", "adf").unwrap_err();
    match err {
        FormatError::InvalidJson { line, column, .. } => {
            assert_eq!(line, 1);
            assert!(column > 0);
        }
        other => panic!("expected InvalidJson, got {other:?}"),
    }
}

#[test]
fn test_wrong_shape_is_invalid_json() {
    let registry = FormatRegistry::default();
    let err = registry.parse(r#"{"type":"doc","content":"nope"}"#, "adf").unwrap_err();
    assert!(matches!(err, FormatError::InvalidJson { .. }));
}

#[test]
fn test_unknown_attributes_and_nodes_are_preserved() {
    let source = doc(vec![json!({
        "type": "panel",
        "attrs": { "panelType": "info" },
        "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "note" }] }]
    })]);
    let parsed = parse_json(source.clone());
    assert_eq!(parsed.content[0].kind(), NodeKind::Panel);
    assert_eq!(parsed.content[0].attr_str("panelType"), Some("info"));
    assert_eq!(serde_json::to_value(&parsed).unwrap(), source);
}

#[test]
fn test_unknown_format_name() {
    let registry = FormatRegistry::default();
    assert_eq!(
        registry.parse("x", "wiki").unwrap_err(),
        FormatError::FormatNotFound("wiki".to_string())
    );
}

//! ADF JSON format
//!
//! The wire encoding of the document tree, as sent to and received from the
//! Jira REST API. Parsing is lenient about node types (unknown ones survive as
//! [`NodeKind::Unknown`](crate::adf::NodeKind)) but strict about JSON syntax.
//!
//! A `null` document decodes to an empty document. A root whose `type` is not
//! `doc` is accepted with a warning, since the API occasionally returns bare
//! fragments.

use crate::adf::Document;
use crate::error::FormatError;
use crate::format::Format;
use crate::rules::ConversionRules;
use std::collections::HashMap;

/// Decode ADF JSON bytes into a document.
pub fn decode(bytes: &[u8], rules: &ConversionRules) -> Result<Document, FormatError> {
    rules.check_input_size(bytes.len())?;

    let doc = match serde_json::from_slice::<Option<Document>>(bytes)? {
        Some(doc) => doc,
        None => {
            tracing::debug!("null document decoded as empty");
            return Ok(Document::default());
        }
    };

    if doc.doc_type != "doc" {
        tracing::warn!(root = %doc.doc_type, "document root is not `doc`, rendering its content anyway");
    }
    Ok(doc)
}

/// Encode a document as ADF JSON.
pub fn encode(doc: &Document, pretty: bool) -> Result<String, FormatError> {
    let encoded = if pretty {
        serde_json::to_string_pretty(doc)
    } else {
        serde_json::to_string(doc)
    };
    encoded.map_err(|e| FormatError::SerializationError(e.to_string()))
}

/// Format implementation for ADF JSON
#[derive(Debug, Clone, Default)]
pub struct AdfFormat {
    rules: ConversionRules,
}

impl AdfFormat {
    pub fn new(rules: ConversionRules) -> Self {
        AdfFormat { rules }
    }
}

impl Format for AdfFormat {
    fn name(&self) -> &str {
        "adf"
    }

    fn description(&self) -> &str {
        "Atlassian Document Format (JSON)"
    }

    fn file_extensions(&self) -> &[&str] {
        &["json", "adf"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        decode(source.as_bytes(), &self.rules)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        encode(doc, self.rules.pretty_json)
    }

    /// Accepts `pretty=true|false`, overriding the configured output style.
    fn serialize_with_options(
        &self,
        doc: &Document,
        options: &HashMap<String, String>,
    ) -> Result<String, FormatError> {
        let mut pretty = self.rules.pretty_json;
        for (key, value) in options {
            match (key.as_str(), value.as_str()) {
                ("pretty", "true") => pretty = true,
                ("pretty", "false") => pretty = false,
                _ => {
                    return Err(FormatError::NotSupported(format!(
                        "Unknown adf parameter '{key}={value}'"
                    )))
                }
            }
        }
        encode(doc, pretty)
    }
}

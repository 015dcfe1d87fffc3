//! Markdown ⇄ Atlassian Document Format conversion
//!
//!     Jira stores rich text (issue descriptions, comments) as ADF, a JSON tree of typed nodes
//!     with marks on text runs. People write Markdown. This crate converts between the two so a
//!     command line client can take Markdown in and hand ADF to the API, and render what comes
//!     back as Markdown.
//!
//!     This is a pure lib: it powers the jira cli but is shell agnostic. No code here prints,
//!     reads env vars or touches the filesystem.
//!
//!     The file structure :
//!     .
//!     ├── error.rs                # FormatError
//!     ├── rules.rs                # ConversionRules, the knobs both directions share
//!     ├── format.rs               # Format trait definition
//!     ├── registry.rs             # FormatRegistry for discovery and selection
//!     ├── adf
//!     │   ├── nodes.rs            # Document / Node / Mark and their kind enums
//!     │   └── marks.rs            # mark sanitizing, equality and text run merging
//!     ├── formats
//!     │   ├── adf                 # JSON wire encoding
//!     │   └── markdown
//!     │       ├── parser.rs       # Markdown → ADF (comrak)
//!     │       ├── serializer.rs   # ADF → Markdown
//!     │       └── escape.rs       # Markdown escaping
//!     └── lib.rs
//!
//! Testing
//!     tests
//!     ├── lib.rs
//!     ├── adf
//!     └── markdown
//!
//!     Rust does not discover tests in subdirectories by default, so they are included as
//!     modules from tests/lib.rs.
//!
//! Core Algorithms
//!
//!     Import walks the comrak tree once. Emphasis and link nodes push a mark onto a stack and
//!     every text leaf under them becomes a `text` run carrying a copy of that stack. Adjacent
//!     runs with equal marks are merged afterwards.
//!
//!     Export renders inline runs through a writer that tracks which marks are open. A mark that
//!     the next run shares stays open, so `**bold *both* bold**` comes out as one strong span
//!     instead of three. Whitespace at the edge of a run is moved outside the delimiters, since
//!     `** bold**` is not emphasis in CommonMark.
//!
//!     Both directions share the mark rules in adf/marks.rs: `code` only combines with `link`,
//!     and a mark type appears at most once per run.
//!
//! Entry points
//!
//!     [`to_document`] and [`to_markdown`] cover the common case with default rules. The
//!     `_with_rules` variants take a [`ConversionRules`], and [`FormatRegistry`] exposes both
//!     formats behind the [`Format`] trait for callers that pick formats by name.

pub mod adf;
pub mod error;
pub mod format;
pub mod formats;
pub mod registry;
pub mod rules;

pub use adf::{Document, Mark, MarkKind, Node, NodeKind};
pub use error::FormatError;
pub use format::Format;
pub use registry::FormatRegistry;
pub use rules::{ConversionRules, MarkEquality};

/// Convert Markdown into an ADF document using the default rules.
pub fn to_document(markdown: &str) -> Result<Document, FormatError> {
    to_document_with_rules(markdown, &ConversionRules::default())
}

/// Convert Markdown into an ADF document.
pub fn to_document_with_rules(
    markdown: &str,
    rules: &ConversionRules,
) -> Result<Document, FormatError> {
    formats::markdown::parser::parse_from_markdown(markdown, rules)
}

/// Render ADF JSON bytes as Markdown using the default rules.
///
/// `null` renders as the empty string. Malformed JSON is an error.
pub fn to_markdown(json: &[u8]) -> Result<String, FormatError> {
    to_markdown_with_rules(json, &ConversionRules::default())
}

/// Render ADF JSON bytes as Markdown.
pub fn to_markdown_with_rules(json: &[u8], rules: &ConversionRules) -> Result<String, FormatError> {
    let doc = formats::adf::decode(json, rules)?;
    Ok(formats::markdown::serializer::render_document(&doc, rules))
}

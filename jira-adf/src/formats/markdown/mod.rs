//! Markdown format implementation
//!
//! Bidirectional conversion between GitHub-flavored Markdown and the ADF tree.
//!
//! # Library Choice
//!
//! Parsing goes through `comrak` with the GFM table, strikethrough, autolink
//! and task list extensions enabled. Serialization is hand-written: comrak's
//! own formatter escapes too eagerly for text that goes back into Jira, and
//! ADF needs several renderings Markdown has no syntax for.
//!
//! # Element Mapping Table
//!
//! | ADF node            | Markdown                 | Export Notes                          | Import Notes                          |
//! |---------------------|--------------------------|---------------------------------------|---------------------------------------|
//! | paragraph           | Paragraph                | Direct                                | Empty paragraphs dropped              |
//! | heading             | `#` … `######`           | Level clamped to 1-6                  | Setext and ATX both accepted          |
//! | bulletList          | `- item`                 | Marker from rules (`-`, `*`, `+`)     | Direct                                |
//! | orderedList         | `1. item`                | Numbers from `attrs.order`            | `attrs.order` set when start ≠ 1      |
//! | taskList / taskItem | `- [ ]` / `- [x]`        | Nested task lists indented            | Any checkbox makes the list a task list |
//! | codeBlock           | Fenced block             | Fence longer than any backtick run    | First info word → `attrs.language`    |
//! | blockquote          | `> `                     | Direct                                | Contents conformed to ADF rules       |
//! | table               | GFM pipe table           | First row is the header               | Header row → tableHeader cells        |
//! | rule                | `---`                    | Direct                                | Direct                                |
//! | hardBreak           | `\` + newline            | Space inside headings and cells       | Hard line breaks                      |
//! | Marks:              |                          |                                       |                                       |
//! |   strong / em       | `**x**` / `*x*`          | Shared marks stay open across runs    | Both delimiter styles                 |
//! |   strike            | `~~x~~`                  | Direct                                | Direct                                |
//! |   code              | `` `x` ``                | Only combined with link               | Other marks dropped                   |
//! |   link              | `[x](href "title")`      | Destination bracketed when needed     | Autolinks too                         |
//!
//! # Lossy Conversions
//!
//! - mention, emoji, date and status render as their text; inline cards as links
//! - media, panels and expands: media is dropped, containers render their content
//! - images and raw HTML in Markdown are dropped on import
//! - table cell content is flattened onto one line
//! - blocks a task item cannot hold are dropped on import

pub mod escape;
pub mod parser;
pub mod serializer;

use crate::adf::Document;
use crate::error::FormatError;
use crate::format::Format;
use crate::rules::ConversionRules;

/// Format implementation for Markdown
#[derive(Debug, Clone, Default)]
pub struct MarkdownFormat {
    rules: ConversionRules,
}

impl MarkdownFormat {
    pub fn new(rules: ConversionRules) -> Self {
        MarkdownFormat { rules }
    }
}

impl Format for MarkdownFormat {
    fn name(&self) -> &str {
        "markdown"
    }

    fn description(&self) -> &str {
        "GitHub-flavored Markdown"
    }

    fn file_extensions(&self) -> &[&str] {
        &["md", "markdown"]
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn supports_serialization(&self) -> bool {
        true
    }

    fn parse(&self, source: &str) -> Result<Document, FormatError> {
        parser::parse_from_markdown(source, &self.rules)
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        serializer::serialize_to_markdown(doc, &self.rules)
    }
}

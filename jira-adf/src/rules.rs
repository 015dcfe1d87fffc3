use serde::{Deserialize, Serialize};

use crate::error::FormatError;

/// How two mark sequences are compared when deciding whether adjacent text
/// runs can be merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkEquality {
    /// Marks are a set: `[strong, em]` equals `[em, strong]`.
    Set,
    /// Marks must match element-wise in order.
    Positional,
}

/// Knobs for both conversion directions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRules {
    /// Inputs longer than this many bytes are rejected
    pub max_input_bytes: usize,

    /// Comparison used when merging adjacent text runs
    pub mark_equality: MarkEquality,

    /// The character to use for bullet list markers (`-`, `*` or `+`)
    pub bullet_marker: char,

    /// Whether Markdown soft line breaks become `hardBreak` nodes instead of spaces
    pub soft_breaks_as_hard: bool,

    /// Whether the ADF JSON output is pretty-printed
    pub pretty_json: bool,
}

impl ConversionRules {
    pub fn check_input_size(&self, size: usize) -> Result<(), FormatError> {
        if size > self.max_input_bytes {
            return Err(FormatError::InputTooLarge {
                size,
                limit: self.max_input_bytes,
            });
        }
        Ok(())
    }

    /// Bullet marker, falling back to `-` for anything Markdown would not
    /// read as a list marker.
    pub fn bullet(&self) -> char {
        match self.bullet_marker {
            '-' | '*' | '+' => self.bullet_marker,
            _ => '-',
        }
    }
}

impl Default for ConversionRules {
    fn default() -> Self {
        Self {
            max_input_bytes: 5 * 1024 * 1024,
            mark_equality: MarkEquality::Set,
            bullet_marker: '-',
            soft_breaks_as_hard: false,
            pretty_json: false,
        }
    }
}

//! Mark rules shared by both conversion directions.
//!
//! - `code` only combines with `link`. Any other mark on a code run is dropped
//!   and the code mark is kept.
//! - A mark type appears at most once per run.
//! - Adjacent text runs whose marks compare equal are merged into one run, so a
//!   word split across several text nodes renders (and escapes) as one word.

use super::nodes::{Mark, MarkKind, Node, NodeKind};
use crate::rules::MarkEquality;
use serde_json::Value;

/// Normalize a mark sequence: drop unknown and duplicate marks, and enforce the
/// code/link compatibility rule. Order of the surviving marks is preserved.
pub fn sanitize_marks(marks: &[Mark]) -> Vec<Mark> {
    let mut kept: Vec<Mark> = Vec::with_capacity(marks.len());
    for mark in marks {
        let kind = mark.kind();
        if kind == MarkKind::Unknown {
            tracing::debug!(mark = %mark.mark_type, "dropping unsupported mark");
            continue;
        }
        if kept.iter().any(|m| m.kind() == kind) {
            continue;
        }
        kept.push(mark.clone());
    }

    if kept.iter().any(|m| m.kind() == MarkKind::Code) {
        kept.retain(|m| {
            let compatible = matches!(m.kind(), MarkKind::Code | MarkKind::Link);
            if !compatible {
                tracing::debug!(mark = %m.mark_type, "dropping mark incompatible with code");
            }
            compatible
        });
    }
    kept
}

/// Whether two mark sequences are equal under the given comparison.
///
/// Both modes compare attributes as well as types, so two links to different
/// targets are never equal.
pub fn marks_equal(a: &[Mark], b: &[Mark], mode: MarkEquality) -> bool {
    if a.len() != b.len() {
        return false;
    }
    match mode {
        MarkEquality::Positional => a == b,
        MarkEquality::Set => {
            let mut left: Vec<(&str, String)> = a.iter().map(mark_key).collect();
            let mut right: Vec<(&str, String)> = b.iter().map(mark_key).collect();
            left.sort();
            right.sort();
            left == right
        }
    }
}

fn mark_key(mark: &Mark) -> (&str, String) {
    let attrs = mark
        .attrs
        .as_ref()
        .map(|attrs| Value::Object(attrs.clone()).to_string())
        .unwrap_or_default();
    (mark.mark_type.as_str(), attrs)
}

/// Merge runs of adjacent `text` nodes with equal marks. Empty text nodes are
/// dropped. Non-text nodes pass through untouched.
pub fn merge_adjacent_text(nodes: Vec<Node>, mode: MarkEquality) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if node.kind() == NodeKind::Text {
            if node.text_str().is_empty() {
                continue;
            }
            if let Some(last) = merged.last_mut() {
                if last.kind() == NodeKind::Text && marks_equal(&last.marks, &node.marks, mode) {
                    let mut text = last.text.take().unwrap_or_default();
                    text.push_str(node.text_str());
                    last.text = Some(text);
                    continue;
                }
            }
        }
        merged.push(node);
    }
    merged
}

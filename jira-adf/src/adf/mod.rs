//! The Atlassian Document Format (ADF) tree shared by both conversion
//! directions.
//!
//! This is the hub every format converts to and from: Markdown is parsed into
//! it and rendered out of it, and the `adf` format is its JSON encoding.

pub mod marks;
pub mod nodes;

pub use nodes::{Document, Mark, MarkKind, Node, NodeKind, TaskState, ADF_VERSION};

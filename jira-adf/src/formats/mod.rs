//! Format implementations
//!
//! Each format converts between a text representation and the ADF tree.

pub mod adf;
pub mod markdown;

pub use adf::AdfFormat;
pub use markdown::MarkdownFormat;

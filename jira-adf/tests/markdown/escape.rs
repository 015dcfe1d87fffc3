//! Property tests for escaping and parser totality

use jira_adf::formats::markdown::escape::{escape_text, EscapeContext};
use jira_adf::{to_document, to_markdown, Document, Mark, MarkKind, Node};
use proptest::prelude::*;

const HREF: &str = "https://x.io";

/// Marks a generated run can carry. Emphasis kinds appear at most once per run.
fn run_marks() -> impl Strategy<Value = Vec<Mark>> {
    prop_oneof![
        Just(vec![]),
        Just(vec![Mark::new(MarkKind::Strong)]),
        Just(vec![Mark::new(MarkKind::Em)]),
        Just(vec![Mark::new(MarkKind::Strike)]),
        Just(vec![Mark::new(MarkKind::Code)]),
        Just(vec![Mark::link(HREF, None)]),
        Just(vec![Mark::link(HREF, None), Mark::new(MarkKind::Strong)]),
        Just(vec![Mark::link(HREF, None), Mark::new(MarkKind::Em)]),
    ]
}

fn runs() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(
        ("[(.,!?]?[a-v]{1,5}[).,!?]?", any::<bool>(), run_marks()),
        1..6,
    )
    .prop_map(|runs| {
        runs.into_iter()
            .map(|(word, spaced, marks)| {
                // Code keeps its spaces inside the backticks
                let is_code = marks.iter().any(|m| m.kind() == MarkKind::Code);
                let text = if spaced && !is_code { format!("{word} ") } else { word };
                Node::text(text, marks)
            })
            .collect()
    })
}

/// Each visible character paired with the sorted names of the marks on it.
fn marked_chars(nodes: &[Node]) -> Vec<(char, Vec<String>)> {
    let mut out = Vec::new();
    for node in nodes {
        let mut names: Vec<String> = node.marks.iter().map(|m| m.mark_type.clone()).collect();
        names.sort();
        for c in node.text_str().chars().filter(|c| !c.is_whitespace()) {
            out.push((c, names.clone()));
        }
    }
    out
}

fn contexts() -> impl Strategy<Value = EscapeContext> {
    (any::<bool>(), any::<bool>()).prop_map(|(in_table, at_line_start)| EscapeContext {
        in_table,
        at_line_start,
    })
}

proptest! {
    #[test]
    fn escaping_is_idempotent(text in "[ -~\n]{0,64}", ctx in contexts()) {
        let once = escape_text(&text, ctx);
        prop_assert_eq!(escape_text(&once, ctx), once);
    }

    #[test]
    fn markdown_import_never_fails(source in "[ -~\n]{0,200}") {
        prop_assert!(to_document(&source).is_ok());
    }

    #[test]
    fn imported_markdown_always_renders(source in "[ -~\n]{0,200}") {
        let doc = to_document(&source).unwrap();
        let json = serde_json::to_vec(&doc).unwrap();
        prop_assert!(to_markdown(&json).is_ok());
    }

    /// Plain text survives a trip through Markdown, whatever punctuation it holds.
    #[test]
    fn paragraph_text_survives_markdown(text in "[a-zA-Z0-9 _*#>+.!|&<~()=:;,?'\"/-]{1,40}") {
        let trimmed = text.trim();
        prop_assume!(!trimmed.is_empty());

        let doc = Document::new(vec![Node::paragraph(vec![Node::text(text.clone(), vec![])])]);
        let json = serde_json::to_vec(&doc).unwrap();
        let markdown = to_markdown(&json).unwrap();

        let back = to_document(&markdown).unwrap();
        let plain: String = back.content.iter().map(Node::plain_text).collect();
        prop_assert_eq!(plain, trimmed, "markdown was {:?}", markdown);
    }

    /// Marked runs keep both their text and the marks on every character.
    #[test]
    fn marked_runs_survive_markdown(content in runs()) {
        let expected_plain: String = content.iter().map(Node::text_str).collect();
        let expected_marks = marked_chars(&content);

        let doc = Document::new(vec![Node::paragraph(content)]);
        let json = serde_json::to_vec(&doc).unwrap();
        let markdown = to_markdown(&json).unwrap();

        let back = to_document(&markdown).unwrap();
        prop_assert_eq!(back.content.len(), 1, "markdown was {:?}", markdown);
        let para = &back.content[0];
        prop_assert_eq!(para.plain_text(), expected_plain.trim(), "markdown was {:?}", markdown);
        prop_assert_eq!(marked_chars(&para.content), expected_marks, "markdown was {:?}", markdown);
    }
}

//! Round trips through the ADF tree and its JSON encoding

use crate::common::{fixture, parse_json, round_trip};
use jira_adf::{to_document, to_markdown, Document, Mark, MarkKind, Node, NodeKind};

#[test]
fn test_kitchensink_is_stable() {
    let md = fixture("kitchensink.md");
    assert_eq!(round_trip(&md), md);
}

#[test]
fn test_kitchensink_document_shape() {
    let doc = to_document(&fixture("kitchensink.md")).unwrap();
    let kinds: Vec<NodeKind> = doc.content.iter().map(|n| n.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Heading,
            NodeKind::Paragraph,
            NodeKind::Paragraph,
            NodeKind::Heading,
            NodeKind::BulletList,
            NodeKind::OrderedList,
            NodeKind::TaskList,
            NodeKind::Blockquote,
            NodeKind::CodeBlock,
            NodeKind::Table,
            NodeKind::Rule,
            NodeKind::Paragraph,
        ]
    );
}

#[test]
fn test_rendered_markdown_is_a_fixed_point() {
    let md = fixture("kitchensink.md");
    let once = round_trip(&md);
    assert_eq!(round_trip(&once), once);
}

#[test]
fn test_json_survives_decode_and_encode() {
    let doc = to_document(&fixture("kitchensink.md")).unwrap();
    let json = serde_json::to_value(&doc).unwrap();
    assert_eq!(parse_json(json), doc);
}

#[test]
fn test_adjacent_lists_stay_apart() {
    let md = "- a\n\n<!-- end list -->\n\n- [ ] b\n";
    let doc = to_document(md).unwrap();
    assert_eq!(doc.content.len(), 2);
    assert_eq!(round_trip(md), md);
}

#[test]
fn test_empty_code_block_round_trip() {
    assert_eq!(round_trip("```\n```\n"), "```\n```\n");
}

#[test]
fn test_escaped_text_round_trip() {
    let md = "\\*literal\\* my_var 2 * 3 \\[x\\]\n";
    assert_eq!(round_trip(md), md);
}

#[test]
fn test_task_list_with_multiple_paragraphs() {
    let md = "- [ ] first\n\n  second\n";
    assert_eq!(round_trip(md), "- [ ] first\\\n  second\n");
}

#[test]
fn test_jira_document_round_trip_reaches_fixed_point() {
    let md = to_markdown(fixture("issue_description.json").as_bytes()).unwrap();
    assert_eq!(round_trip(&md), md);
}

/// ADF → Markdown → ADF for a single paragraph.
fn paragraph_round_trip(content: Vec<Node>) -> (String, Document) {
    let doc = Document::new(vec![Node::paragraph(content)]);
    let json = serde_json::to_vec(&doc).unwrap();
    let markdown = to_markdown(&json).unwrap();
    let back = to_document(&markdown).unwrap();
    (markdown, back)
}

#[test]
fn test_bang_before_link_stays_a_link() {
    let content = vec![
        Node::text("Wow!", vec![]),
        Node::text("here", vec![Mark::link("https://x.io", None)]),
    ];
    let (markdown, back) = paragraph_round_trip(content.clone());
    assert_eq!(back, Document::new(vec![Node::paragraph(content)]), "{markdown}");
}

#[test]
fn test_emphasis_against_words_round_trips() {
    let cases = vec![
        vec![
            Node::text("foo.", vec![Mark::new(MarkKind::Strong)]),
            Node::text("bar", vec![]),
        ],
        vec![
            Node::text("call", vec![]),
            Node::text("(x)", vec![Mark::new(MarkKind::Em)]),
        ],
        vec![
            Node::text("x.", vec![Mark::new(MarkKind::Strike)]),
            Node::text("y", vec![]),
        ],
    ];
    for content in cases {
        let (markdown, back) = paragraph_round_trip(content.clone());
        assert_eq!(back, Document::new(vec![Node::paragraph(content)]), "{markdown}");
    }
}

#[test]
fn test_bare_url_gains_link_on_import() {
    let (markdown, back) =
        paragraph_round_trip(vec![Node::text("see https://x.io now", vec![])]);
    assert_eq!(markdown, "see https://x.io now\n");

    let para = &back.content[0];
    assert_eq!(para.plain_text(), "see https://x.io now");
    let linked: Vec<&Node> = para
        .content
        .iter()
        .filter(|n| n.marks.iter().any(|m| m.kind() == MarkKind::Link))
        .collect();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].text_str(), "https://x.io");
    assert_eq!(linked[0].marks[0].attr_str("href"), Some("https://x.io"));
}

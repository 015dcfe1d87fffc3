//! Export tests for Markdown format (ADF → Markdown)

use crate::common::{doc, fixture, json_to_md};
use insta::assert_snapshot;
use jira_adf::{to_markdown, to_markdown_with_rules, ConversionRules, MarkEquality};
use serde_json::{json, Value};

fn para(content: Vec<Value>) -> Value {
    json!({ "type": "paragraph", "content": content })
}

fn text(t: &str) -> Value {
    json!({ "type": "text", "text": t })
}

fn marked(t: &str, marks: &[&str]) -> Value {
    let marks: Vec<Value> = marks.iter().map(|m| json!({ "type": m })).collect();
    json!({ "type": "text", "text": t, "marks": marks })
}

#[test]
fn test_empty_document() {
    assert_eq!(json_to_md(doc(vec![])), "");
    assert_eq!(to_markdown(b"null").unwrap(), "");
}

#[test]
fn test_output_ends_with_single_newline() {
    let md = json_to_md(doc(vec![para(vec![text("one")]), para(vec![text("two")])]));
    assert_eq!(md, "one\n\ntwo\n");
}

#[test]
fn test_code_mark_wins_over_strong() {
    let md = json_to_md(doc(vec![para(vec![marked("x", &["strong", "code"])])]));
    assert_eq!(md, "`x`\n");
}

#[test]
fn test_split_runs_are_merged_before_escaping() {
    let md = json_to_md(doc(vec![para(vec![
        marked("my_", &["em"]),
        marked("var", &["em"]),
    ])]));
    assert_eq!(md, "*my_var*\n");
}

#[test]
fn test_set_equality_merges_reordered_marks() {
    let nodes = doc(vec![para(vec![
        marked("a", &["strong", "em"]),
        marked("b", &["em", "strong"]),
    ])]);
    let bytes = serde_json::to_vec(&nodes).unwrap();

    let set = to_markdown(&bytes).unwrap();
    assert_eq!(set, "***ab***\n");

    let positional = ConversionRules {
        mark_equality: MarkEquality::Positional,
        ..ConversionRules::default()
    };
    // Runs stay separate, but the shared marks still render as one span.
    assert_eq!(to_markdown_with_rules(&bytes, &positional).unwrap(), set);
}

#[test]
fn test_links_with_different_targets_stay_separate() {
    let md = json_to_md(doc(vec![para(vec![
        json!({ "type": "text", "text": "a", "marks": [{ "type": "link", "attrs": { "href": "https://a.example" } }] }),
        json!({ "type": "text", "text": "b", "marks": [{ "type": "link", "attrs": { "href": "https://b.example" } }] }),
    ])]));
    assert_eq!(md, "[a](https://a.example)[b](https://b.example)\n");
}

#[test]
fn test_link_title_and_awkward_destination() {
    let md = json_to_md(doc(vec![para(vec![json!({
        "type": "text",
        "text": "notes",
        "marks": [{ "type": "link", "attrs": { "href": "docs/my notes.md", "title": "The notes" } }]
    })])]));
    assert_eq!(md, "[notes](<docs/my notes.md> \"The notes\")\n");
}

#[test]
fn test_unknown_marks_are_dropped() {
    let md = json_to_md(doc(vec![para(vec![marked("under", &["underline"])])]));
    assert_eq!(md, "under\n");
}

#[test]
fn test_heading_levels_are_clamped() {
    let md = json_to_md(doc(vec![
        json!({ "type": "heading", "attrs": { "level": 9 }, "content": [text("deep")] }),
        json!({ "type": "heading", "content": [text("no level")] }),
    ]));
    assert_eq!(md, "###### deep\n\n# no level\n");
}

#[test]
fn test_hard_break_in_heading_is_a_space() {
    let md = json_to_md(doc(vec![json!({
        "type": "heading",
        "attrs": { "level": 2 },
        "content": [text("one"), { "type": "hardBreak" }, text("two")]
    })]));
    assert_eq!(md, "## one two\n");
}

#[test]
fn test_text_that_looks_like_markdown_is_escaped() {
    let md = json_to_md(doc(vec![para(vec![text("*not bold* and [not a link] but 2 * 3")])]));
    assert_eq!(md, "\\*not bold\\* and \\[not a link\\] but 2 * 3\n");

    let md = json_to_md(doc(vec![para(vec![text("# not a heading")])]));
    assert_eq!(md, "\\# not a heading\n");
}

#[test]
fn test_ordered_list_order_attribute() {
    let item = |t: &str| json!({ "type": "listItem", "content": [para(vec![text(t)])] });
    let md = json_to_md(doc(vec![json!({
        "type": "orderedList",
        "attrs": { "order": 5 },
        "content": [item("five"), item("six")]
    })]));
    assert_eq!(md, "5. five\n6. six\n");
}

#[test]
fn test_list_item_with_several_blocks() {
    let md = json_to_md(doc(vec![json!({
        "type": "bulletList",
        "content": [{
            "type": "listItem",
            "content": [
                para(vec![text("first")]),
                para(vec![text("second")]),
                { "type": "codeBlock", "content": [text("code")] }
            ]
        }]
    })]));
    assert_eq!(md, "- first\n\n  second\n\n  ```\n  code\n  ```\n");
}

#[test]
fn test_nested_lists_indent_by_marker_width() {
    let md = json_to_md(doc(vec![json!({
        "type": "orderedList",
        "content": [{
            "type": "listItem",
            "content": [
                para(vec![text("outer")]),
                {
                    "type": "bulletList",
                    "content": [{ "type": "listItem", "content": [para(vec![text("inner")])] }]
                }
            ]
        }]
    })]));
    assert_eq!(md, "1. outer\n   - inner\n");
}

#[test]
fn test_task_list() {
    let md = json_to_md(doc(vec![json!({
        "type": "taskList",
        "attrs": { "localId": "t1" },
        "content": [
            { "type": "taskItem", "attrs": { "localId": "a", "state": "DONE" }, "content": [text("done")] },
            { "type": "taskItem", "attrs": { "localId": "b", "state": "TODO" }, "content": [text("open")] },
            {
                "type": "taskList",
                "attrs": { "localId": "t2" },
                "content": [
                    { "type": "taskItem", "attrs": { "localId": "c", "state": "TODO" }, "content": [text("nested")] }
                ]
            }
        ]
    })]));
    assert_snapshot!(md.trim_end(), @r"
    - [x] done
    - [ ] open
      - [ ] nested
    ");
}

#[test]
fn test_code_block_with_backticks_uses_longer_fence() {
    let md = json_to_md(doc(vec![json!({
        "type": "codeBlock",
        "attrs": { "language": "markdown" },
        "content": [text("```\ninner\n```")]
    })]));
    assert_eq!(md, "````markdown\n```\ninner\n```\n````\n");
}

#[test]
fn test_blockquote_with_several_paragraphs() {
    let md = json_to_md(doc(vec![json!({
        "type": "blockquote",
        "content": [para(vec![text("one")]), para(vec![text("two")])]
    })]));
    assert_eq!(md, "> one\n>\n> two\n");
}

#[test]
fn test_rule() {
    let md = json_to_md(doc(vec![para(vec![text("a")]), json!({ "type": "rule" }), para(vec![text("b")])]));
    assert_eq!(md, "a\n\n---\n\nb\n");
}

#[test]
fn test_inline_nodes_at_block_level_form_a_paragraph() {
    let md = json_to_md(doc(vec![text("loose "), marked("text", &["strong"])]));
    assert_eq!(md, "loose **text**\n");
}

#[test]
fn test_unknown_block_renders_its_content() {
    let md = json_to_md(doc(vec![json!({
        "type": "decisionList",
        "content": [{ "type": "decisionItem", "content": [para(vec![text("decided")])] }]
    })]));
    assert_eq!(md, "decided\n");
}

#[test]
fn test_jira_issue_description() {
    let bytes = fixture("issue_description.json");
    let md = to_markdown(bytes.as_bytes()).unwrap();
    assert_eq!(
        md,
        "## Steps to reproduce\n\n\
         1. Open `settings.toml`\n\
         2. Ask @Dana to check\n\n\
         ⚠️ Only on STAGING\n\n\
         See [https://example.atlassian.net/browse/PROJ-1](https://example.atlassian.net/browse/PROJ-1) and this_file\n"
    );
}

#[test]
fn test_date_renders_timestamp() {
    let md = json_to_md(doc(vec![para(vec![
        text("due "),
        json!({ "type": "date", "attrs": { "timestamp": "1767225600000" } }),
    ])]));
    assert_eq!(md, "due 1767225600000\n");
}

#[test]
fn test_bullet_marker_rule() {
    let rules = ConversionRules {
        bullet_marker: '+',
        ..ConversionRules::default()
    };
    let list = doc(vec![json!({
        "type": "bulletList",
        "content": [{ "type": "listItem", "content": [para(vec![text("item")])] }]
    })]);
    let bytes = serde_json::to_vec(&list).unwrap();
    assert_eq!(to_markdown_with_rules(&bytes, &rules).unwrap(), "+ item\n");
}

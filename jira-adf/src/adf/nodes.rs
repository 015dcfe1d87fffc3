//! Core data structures for the Atlassian Document Format (ADF) tree.
//!
//! Nodes keep their `type` as a plain string so that documents coming back from
//! the API with node types we do not know about still deserialize. Dispatch goes
//! through [`NodeKind`] / [`MarkKind`], which are closed enums: adding a variant
//! forces every `match` over them to be revisited.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// ADF schema version emitted on every document root.
pub const ADF_VERSION: u32 = 1;

/// The document root: `{"version": 1, "type": "doc", "content": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(rename = "type", default = "default_doc_type")]
    pub doc_type: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: Vec<Node>,
}

fn default_version() -> u32 {
    ADF_VERSION
}

/// Some producers write `null` for an empty `content` or `marks` array.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_doc_type() -> String {
    NodeKind::Doc.as_str().to_string()
}

impl Document {
    /// Create a document holding the given block nodes.
    pub fn new(content: Vec<Node>) -> Self {
        Document {
            version: ADF_VERSION,
            doc_type: default_doc_type(),
            content,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new(Vec::new())
    }
}

/// A node of the document tree.
///
/// `text` is only ever set on `text` nodes, and `content` is never set on them.
/// Empty fields are omitted from the serialized JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub marks: Vec<Mark>,
}

impl Node {
    /// Create a container node of the given kind.
    pub fn new(kind: NodeKind, content: Vec<Node>) -> Self {
        Node {
            node_type: kind.as_str().to_string(),
            attrs: None,
            content,
            text: None,
            marks: Vec::new(),
        }
    }

    /// Create a `text` leaf carrying the given marks.
    pub fn text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node {
            node_type: NodeKind::Text.as_str().to_string(),
            attrs: None,
            content: Vec::new(),
            text: Some(text.into()),
            marks,
        }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::new(NodeKind::Paragraph, content)
    }

    pub fn hard_break() -> Self {
        Node::new(NodeKind::HardBreak, Vec::new())
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> NodeKind {
        NodeKind::from_type(&self.node_type)
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.as_ref().and_then(|attrs| attrs.get(key))
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(Value::as_str)
    }

    /// Integer attribute, accepting numbers and numeric strings.
    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        match self.attr(key)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text of a `text` node, empty for everything else.
    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_plain_text(self, &mut out);
        out
    }
}

fn collect_plain_text(node: &Node, out: &mut String) {
    if let Some(text) = &node.text {
        out.push_str(text);
    }
    for child in &node.content {
        collect_plain_text(child, out);
    }
}

/// A formatting mark on a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

impl Mark {
    pub fn new(kind: MarkKind) -> Self {
        Mark {
            mark_type: kind.as_str().to_string(),
            attrs: None,
        }
    }

    /// A `link` mark pointing at `href`, with an optional title.
    pub fn link(href: impl Into<String>, title: Option<String>) -> Self {
        let mut attrs = Map::new();
        attrs.insert("href".to_string(), Value::String(href.into()));
        if let Some(title) = title.filter(|t| !t.is_empty()) {
            attrs.insert("title".to_string(), Value::String(title));
        }
        Mark {
            mark_type: MarkKind::Link.as_str().to_string(),
            attrs: Some(attrs),
        }
    }

    pub fn kind(&self) -> MarkKind {
        MarkKind::from_type(&self.mark_type)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs
            .as_ref()
            .and_then(|attrs| attrs.get(key))
            .and_then(Value::as_str)
    }
}

/// The node types the converter knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    TaskList,
    TaskItem,
    CodeBlock,
    Blockquote,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Rule,
    Text,
    HardBreak,
    Mention,
    Emoji,
    InlineCard,
    Date,
    Status,
    MediaSingle,
    MediaGroup,
    Media,
    Panel,
    Expand,
    NestedExpand,
    Unknown,
}

impl NodeKind {
    pub fn from_type(node_type: &str) -> Self {
        match node_type {
            "doc" => NodeKind::Doc,
            "paragraph" => NodeKind::Paragraph,
            "heading" => NodeKind::Heading,
            "bulletList" => NodeKind::BulletList,
            "orderedList" => NodeKind::OrderedList,
            "listItem" => NodeKind::ListItem,
            "taskList" => NodeKind::TaskList,
            "taskItem" => NodeKind::TaskItem,
            "codeBlock" => NodeKind::CodeBlock,
            "blockquote" => NodeKind::Blockquote,
            "table" => NodeKind::Table,
            "tableRow" => NodeKind::TableRow,
            "tableCell" => NodeKind::TableCell,
            "tableHeader" => NodeKind::TableHeader,
            "rule" => NodeKind::Rule,
            "text" => NodeKind::Text,
            "hardBreak" => NodeKind::HardBreak,
            "mention" => NodeKind::Mention,
            "emoji" => NodeKind::Emoji,
            "inlineCard" => NodeKind::InlineCard,
            "date" => NodeKind::Date,
            "status" => NodeKind::Status,
            "mediaSingle" => NodeKind::MediaSingle,
            "mediaGroup" => NodeKind::MediaGroup,
            "media" => NodeKind::Media,
            "panel" => NodeKind::Panel,
            "expand" => NodeKind::Expand,
            "nestedExpand" => NodeKind::NestedExpand,
            _ => NodeKind::Unknown,
        }
    }

    /// Wire name of the node type. `Unknown` has none and maps to `""`.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::TaskList => "taskList",
            NodeKind::TaskItem => "taskItem",
            NodeKind::CodeBlock => "codeBlock",
            NodeKind::Blockquote => "blockquote",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell => "tableCell",
            NodeKind::TableHeader => "tableHeader",
            NodeKind::Rule => "rule",
            NodeKind::Text => "text",
            NodeKind::HardBreak => "hardBreak",
            NodeKind::Mention => "mention",
            NodeKind::Emoji => "emoji",
            NodeKind::InlineCard => "inlineCard",
            NodeKind::Date => "date",
            NodeKind::Status => "status",
            NodeKind::MediaSingle => "mediaSingle",
            NodeKind::MediaGroup => "mediaGroup",
            NodeKind::Media => "media",
            NodeKind::Panel => "panel",
            NodeKind::Expand => "expand",
            NodeKind::NestedExpand => "nestedExpand",
            NodeKind::Unknown => "",
        }
    }

    /// Inline nodes live inside paragraphs, headings, task items and cells.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::HardBreak
                | NodeKind::Mention
                | NodeKind::Emoji
                | NodeKind::InlineCard
                | NodeKind::Date
                | NodeKind::Status
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            NodeKind::BulletList | NodeKind::OrderedList | NodeKind::TaskList
        )
    }

    /// Node types a blockquote may hold directly.
    pub fn allowed_in_blockquote(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::BulletList
                | NodeKind::OrderedList
                | NodeKind::CodeBlock
                | NodeKind::MediaSingle
                | NodeKind::MediaGroup
        )
    }

    /// Node types a list item may hold directly.
    pub fn allowed_in_list_item(&self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::BulletList
                | NodeKind::OrderedList
                | NodeKind::TaskList
                | NodeKind::CodeBlock
                | NodeKind::MediaSingle
        )
    }
}

/// The mark types the converter renders. Anything else is `Unknown` and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkKind {
    Link,
    Strong,
    Em,
    Strike,
    Code,
    Unknown,
}

impl MarkKind {
    pub fn from_type(mark_type: &str) -> Self {
        match mark_type {
            "link" => MarkKind::Link,
            "strong" => MarkKind::Strong,
            "em" => MarkKind::Em,
            "strike" => MarkKind::Strike,
            "code" => MarkKind::Code,
            _ => MarkKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkKind::Link => "link",
            MarkKind::Strong => "strong",
            MarkKind::Em => "em",
            MarkKind::Strike => "strike",
            MarkKind::Code => "code",
            MarkKind::Unknown => "",
        }
    }
}

/// Task item checkbox state, serialized as `TODO` / `DONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Todo,
    Done,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Todo => "TODO",
            TaskState::Done => "DONE",
        }
    }

    /// Anything other than `DONE` reads as an open task.
    pub fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("DONE") => TaskState::Done,
            _ => TaskState::Todo,
        }
    }
}

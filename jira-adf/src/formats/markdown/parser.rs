//! Markdown parsing (Markdown → ADF import)
//!
//! Pipeline: Markdown string → Comrak AST → ADF tree
//!
//! The Comrak tree is walked once. Block nodes map onto ADF blocks, inline
//! nodes are flattened into `text` runs carrying the marks of their enclosing
//! emphasis/link nodes. Constructs ADF cannot hold in a given position are
//! conformed (headings in quotes become paragraphs, nested quotes unwrap) or
//! dropped with a debug log.
//!
//! Containers nested deeper than [`MAX_NESTING`] are flattened: their leaf
//! blocks (or, inline, their text) are kept and the nesting is dropped. The
//! deep part of the tree is walked with an explicit stack so hostile input
//! cannot exhaust the call stack.

use crate::adf::marks::{merge_adjacent_text, sanitize_marks};
use crate::adf::{Document, Mark, MarkKind, Node, NodeKind, TaskState};
use crate::error::FormatError;
use crate::rules::ConversionRules;
use comrak::nodes::{AstNode, ListType, NodeCodeBlock, NodeList, NodeValue};
use comrak::{parse_document, Arena, ComrakOptions};

/// Deepest container nesting kept in the output. Past this, blockquotes and
/// lists unwrap into their parent and inline emphasis collapses onto the marks
/// already in effect. Low enough that the resulting JSON stays within
/// `serde_json`'s recursion limit when read back.
pub const MAX_NESTING: usize = 24;

/// Parse a Markdown string into an ADF document
pub fn parse_from_markdown(source: &str, rules: &ConversionRules) -> Result<Document, FormatError> {
    rules.check_input_size(source.len())?;

    let arena = Arena::new();
    let options = default_comrak_options();
    let root = parse_document(&arena, source, &options);

    let mut lowering = Lowering::new(rules);
    let content = lowering.lower_children(root);
    tracing::trace!(blocks = content.len(), "lowered markdown to adf");
    Ok(Document::new(content))
}

fn default_comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
}

/// Walks the Comrak tree. Holds the counters used for task `localId`s so that
/// the same input always produces the same ids.
struct Lowering<'r> {
    rules: &'r ConversionRules,
    task_lists: usize,
    task_items: usize,
    depth: usize,
}

impl<'r> Lowering<'r> {
    fn new(rules: &'r ConversionRules) -> Self {
        Lowering {
            rules,
            task_lists: 0,
            task_items: 0,
            depth: 0,
        }
    }

    fn lower_children<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        if self.depth >= MAX_NESTING {
            return self.lower_flattened(node);
        }

        self.depth += 1;
        let mut out = Vec::new();
        for child in node.children() {
            self.lower_block(child, &mut out);
        }
        self.depth -= 1;
        out
    }

    /// Lower the leaf blocks under `node`, dropping every container in
    /// between. Iterative, whatever the depth of the subtree.
    fn lower_flattened<'a>(&mut self, node: &'a AstNode<'a>) -> Vec<Node> {
        tracing::debug!(depth = self.depth, "flattening deeply nested markdown");
        let mut out = Vec::new();
        let mut pending: Vec<&'a AstNode<'a>> = node.children().collect();
        pending.reverse();

        while let Some(next) = pending.pop() {
            let container = matches!(
                next.data.borrow().value,
                NodeValue::BlockQuote | NodeValue::List(_) | NodeValue::Item(_) | NodeValue::TaskItem(_)
            );
            if container {
                let children: Vec<&'a AstNode<'a>> = next.children().collect();
                pending.extend(children.into_iter().rev());
            } else {
                self.lower_block(next, &mut out);
            }
        }
        out
    }

    fn lower_block<'a>(&mut self, node: &'a AstNode<'a>, out: &mut Vec<Node>) {
        match &node.data.borrow().value {
            NodeValue::Document => out.extend(self.lower_children(node)),
            NodeValue::Paragraph => {
                let inline = self.lower_inline_children(node);
                if !inline.is_empty() {
                    out.push(Node::paragraph(inline));
                }
            }
            NodeValue::Heading(heading) => {
                let level = heading.level.clamp(1, 6);
                let inline = self.lower_inline_children(node);
                out.push(Node::new(NodeKind::Heading, inline).with_attr("level", level));
            }
            NodeValue::List(list) => out.push(self.lower_list(node, list)),
            NodeValue::Item(_) | NodeValue::TaskItem(_) => out.extend(self.lower_children(node)),
            NodeValue::CodeBlock(code) => out.push(lower_code_block(code)),
            NodeValue::BlockQuote => {
                let children = self.lower_children(node);
                let content = self.conform(children, NodeKind::allowed_in_blockquote);
                if !content.is_empty() {
                    out.push(Node::new(NodeKind::Blockquote, content));
                }
            }
            NodeValue::Table(_) => out.push(self.lower_table(node)),
            NodeValue::ThematicBreak => out.push(Node::new(NodeKind::Rule, Vec::new())),
            NodeValue::HtmlBlock(_) => tracing::debug!("skipping raw html block"),
            other => {
                tracing::debug!(node = ?other, "skipping unsupported markdown block");
            }
        }
    }

    fn lower_list<'a>(&mut self, node: &'a AstNode<'a>, list: &NodeList) -> Node {
        let is_task_list = node
            .children()
            .any(|item| matches!(item.data.borrow().value, NodeValue::TaskItem(_)));
        if is_task_list {
            return self.lower_task_list(node);
        }

        let kind = match list.list_type {
            ListType::Bullet => NodeKind::BulletList,
            ListType::Ordered => NodeKind::OrderedList,
        };

        let mut items = Vec::new();
        for item in node.children() {
            let children = self.lower_children(item);
            let mut content = self.conform(children, NodeKind::allowed_in_list_item);
            if content.is_empty() {
                content.push(Node::paragraph(Vec::new()));
            }
            items.push(Node::new(NodeKind::ListItem, content));
        }

        let list_node = Node::new(kind, items);
        if kind == NodeKind::OrderedList && list.start != 1 {
            list_node.with_attr("order", list.start as u64)
        } else {
            list_node
        }
    }

    /// Any checkbox in a list turns the whole list into a `taskList`. Items
    /// without a checkbox become open tasks.
    fn lower_task_list<'a>(&mut self, node: &'a AstNode<'a>) -> Node {
        let list_id = self.next_list_id();
        let mut content = Vec::new();

        for item in node.children() {
            let state = match &item.data.borrow().value {
                NodeValue::TaskItem(Some(c)) if !c.is_whitespace() => TaskState::Done,
                _ => TaskState::Todo,
            };
            let children = self.lower_children(item);
            let (inline, nested) = self.split_task_content(children);
            content.push(self.task_item(inline, state));
            content.extend(nested);
        }

        Node::new(NodeKind::TaskList, content).with_attr("localId", list_id)
    }

    /// Task items only hold inline content. Paragraphs are joined with hard
    /// breaks, nested lists become task lists hoisted after the item, and any
    /// other block is dropped.
    fn split_task_content(&mut self, blocks: Vec<Node>) -> (Vec<Node>, Vec<Node>) {
        let mut inline = Vec::new();
        let mut nested = Vec::new();

        for block in blocks {
            match block.kind() {
                NodeKind::Paragraph | NodeKind::Heading => {
                    if !inline.is_empty() {
                        inline.push(Node::hard_break());
                    }
                    inline.extend(block.content);
                }
                NodeKind::TaskList => nested.push(block),
                NodeKind::BulletList | NodeKind::OrderedList => {
                    nested.push(self.list_to_task_list(block));
                }
                _ => {
                    tracing::debug!(node = %block.node_type, "dropping block inside task item");
                }
            }
        }

        (merge_adjacent_text(inline, self.rules.mark_equality), nested)
    }

    fn list_to_task_list(&mut self, list: Node) -> Node {
        let list_id = self.next_list_id();
        let mut content = Vec::new();
        for item in list.content {
            let (inline, nested) = self.split_task_content(item.content);
            content.push(self.task_item(inline, TaskState::Todo));
            content.extend(nested);
        }
        Node::new(NodeKind::TaskList, content).with_attr("localId", list_id)
    }

    fn task_item(&mut self, inline: Vec<Node>, state: TaskState) -> Node {
        self.task_items += 1;
        Node::new(NodeKind::TaskItem, inline)
            .with_attr("localId", format!("task-item-{}", self.task_items))
            .with_attr("state", state.as_str())
    }

    fn next_list_id(&mut self) -> String {
        self.task_lists += 1;
        format!("task-list-{}", self.task_lists)
    }

    /// Make `blocks` legal children for a container that only admits the
    /// kinds accepted by `allowed`.
    fn conform(&mut self, blocks: Vec<Node>, allowed: fn(&NodeKind) -> bool) -> Vec<Node> {
        let mut out = Vec::with_capacity(blocks.len());
        for block in blocks {
            let kind = block.kind();
            if allowed(&kind) {
                out.push(block);
                continue;
            }
            match kind {
                NodeKind::Heading => out.push(Node::paragraph(block.content)),
                NodeKind::Blockquote => out.extend(self.conform(block.content, allowed)),
                NodeKind::TaskList => out.push(task_list_to_bullets(block)),
                _ => {
                    tracing::debug!(node = %block.node_type, "dropping block not allowed here");
                }
            }
        }
        out
    }

    fn lower_table<'a>(&self, node: &'a AstNode<'a>) -> Node {
        let mut rows = Vec::new();
        for row in node.children() {
            let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
            let cell_kind = if header {
                NodeKind::TableHeader
            } else {
                NodeKind::TableCell
            };
            let cells = row
                .children()
                .map(|cell| {
                    let paragraph = Node::paragraph(self.lower_inline_children(cell));
                    Node::new(cell_kind, vec![paragraph])
                })
                .collect();
            rows.push(Node::new(NodeKind::TableRow, cells));
        }
        Node::new(NodeKind::Table, rows)
    }

    fn lower_inline_children<'a>(&self, node: &'a AstNode<'a>) -> Vec<Node> {
        let mut out = Vec::new();
        let mut marks = Vec::new();
        for child in node.children() {
            self.lower_inline(child, &mut marks, &mut out, 0);
        }
        merge_adjacent_text(out, self.rules.mark_equality)
    }

    fn lower_inline<'a>(
        &self,
        node: &'a AstNode<'a>,
        marks: &mut Vec<Mark>,
        out: &mut Vec<Node>,
        depth: usize,
    ) {
        if depth >= MAX_NESTING {
            self.lower_inline_flattened(node, marks, out);
            return;
        }

        match &node.data.borrow().value {
            NodeValue::Text(text) => out.push(Node::text(text.clone(), sanitize_marks(marks))),
            NodeValue::Code(code) => {
                let mut code_marks = marks.clone();
                code_marks.push(Mark::new(MarkKind::Code));
                out.push(Node::text(code.literal.clone(), sanitize_marks(&code_marks)));
            }
            NodeValue::SoftBreak => {
                if self.rules.soft_breaks_as_hard {
                    out.push(Node::hard_break());
                } else {
                    out.push(Node::text(" ", sanitize_marks(marks)));
                }
            }
            NodeValue::LineBreak => out.push(Node::hard_break()),
            NodeValue::Emph => {
                self.lower_marked(node, Mark::new(MarkKind::Em), marks, out, depth)
            }
            NodeValue::Strong => {
                self.lower_marked(node, Mark::new(MarkKind::Strong), marks, out, depth)
            }
            NodeValue::Strikethrough => {
                self.lower_marked(node, Mark::new(MarkKind::Strike), marks, out, depth)
            }
            NodeValue::Link(link) => {
                let mark = Mark::link(link.url.clone(), Some(link.title.clone()));
                self.lower_marked(node, mark, marks, out, depth);
            }
            NodeValue::Image(_) => tracing::debug!("dropping image"),
            NodeValue::HtmlInline(_) => tracing::debug!("dropping inline html"),
            _ => {
                for child in node.children() {
                    self.lower_inline(child, marks, out, depth + 1);
                }
            }
        }
    }

    /// Keep the text under `node` with the marks already in effect, ignoring
    /// any further emphasis or links.
    fn lower_inline_flattened<'a>(
        &self,
        node: &'a AstNode<'a>,
        marks: &[Mark],
        out: &mut Vec<Node>,
    ) {
        let mut pending = vec![node];
        while let Some(next) = pending.pop() {
            match &next.data.borrow().value {
                NodeValue::Text(text) => out.push(Node::text(text.clone(), sanitize_marks(marks))),
                NodeValue::Code(code) => {
                    out.push(Node::text(code.literal.clone(), sanitize_marks(marks)))
                }
                NodeValue::SoftBreak => out.push(Node::text(" ", sanitize_marks(marks))),
                NodeValue::LineBreak => out.push(Node::hard_break()),
                NodeValue::Image(_) | NodeValue::HtmlInline(_) => {}
                _ => {
                    let children: Vec<&'a AstNode<'a>> = next.children().collect();
                    pending.extend(children.into_iter().rev());
                }
            }
        }
    }

    /// Lower the children of an emphasis or link node with `mark` applied.
    /// A mark type already in effect is not applied twice.
    fn lower_marked<'a>(
        &self,
        node: &'a AstNode<'a>,
        mark: Mark,
        marks: &mut Vec<Mark>,
        out: &mut Vec<Node>,
        depth: usize,
    ) {
        let applied = !marks.iter().any(|m| m.kind() == mark.kind());
        if applied {
            marks.push(mark);
        }
        for child in node.children() {
            self.lower_inline(child, marks, out, depth + 1);
        }
        if applied {
            marks.pop();
        }
    }
}

/// `language` is the first word of the info string. One trailing newline is
/// dropped, and an empty block keeps a single space so it is not empty text.
fn lower_code_block(code: &NodeCodeBlock) -> Node {
    let language = code.info.split_whitespace().next().unwrap_or("");
    let literal = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
    let text = if literal.is_empty() { " " } else { literal };

    let node = Node::new(NodeKind::CodeBlock, vec![Node::text(text, Vec::new())]);
    if language.is_empty() {
        node
    } else {
        node.with_attr("language", language)
    }
}

/// Blockquotes cannot hold task lists: turn one into a bullet list, keeping
/// nested task lists nested under the preceding item.
fn task_list_to_bullets(list: Node) -> Node {
    let mut items: Vec<Node> = Vec::new();
    for child in list.content {
        match child.kind() {
            NodeKind::TaskList => {
                let nested = task_list_to_bullets(child);
                match items.last_mut() {
                    Some(last) => last.content.push(nested),
                    None => items.push(Node::new(NodeKind::ListItem, vec![nested])),
                }
            }
            _ => items.push(Node::new(
                NodeKind::ListItem,
                vec![Node::paragraph(child.content)],
            )),
        }
    }
    Node::new(NodeKind::BulletList, items)
}

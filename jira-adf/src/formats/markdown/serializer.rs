//! Markdown serialization (ADF → Markdown)
//!
//! Pipeline: ADF tree → rendered blocks → Markdown string
//!
//! Block nodes render to a list of [`Block`]s which are joined with blank lines.
//! Inline content goes through [`InlineWriter`], which keeps a stack of open
//! marks so that a mark shared by consecutive runs is opened once, and which
//! hands every piece of raw text to [`escape_text`].

use super::escape::{
    char_reference, code_fence, code_span, escape_text, flanking, link_destination, link_title,
    EscapeContext,
};
use crate::adf::marks::{merge_adjacent_text, sanitize_marks};
use crate::adf::{Document, Mark, MarkKind, Node, NodeKind, TaskState};
use crate::error::FormatError;
use crate::rules::ConversionRules;

/// Separator that keeps two adjacent lists of the same family from being read
/// back as a single list.
const LIST_SEPARATOR: &str = "<!-- end list -->";

/// Serialize a document to Markdown
pub fn serialize_to_markdown(doc: &Document, rules: &ConversionRules) -> Result<String, FormatError> {
    Ok(render_document(doc, rules))
}

/// Render a document to Markdown. Empty documents render to `""`, anything
/// else ends with a single newline.
pub fn render_document(doc: &Document, rules: &ConversionRules) -> String {
    let renderer = Renderer { rules };
    let body = join_blocks(&renderer.render_blocks(&doc.content));
    if body.is_empty() {
        body
    } else {
        format!("{body}\n")
    }
}

/// A rendered block together with what it was rendered from.
#[derive(Debug)]
struct Block {
    kind: NodeKind,
    text: String,
    /// Whether the block may follow a paragraph in a list item without a blank
    /// line in between (lists that are allowed to interrupt a paragraph).
    tight: bool,
}

impl Block {
    fn new(kind: NodeKind, text: String) -> Self {
        Block {
            kind,
            text,
            tight: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct InlineContext {
    in_table: bool,
    /// Headings and table cells must stay on one line.
    single_line: bool,
}

struct Renderer<'r> {
    rules: &'r ConversionRules,
}

impl Renderer<'_> {
    fn render_blocks(&self, nodes: &[Node]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut loose_inline: Vec<Node> = Vec::new();

        for node in nodes {
            if node.kind().is_inline() {
                loose_inline.push(node.clone());
                continue;
            }
            self.flush_inline(&mut loose_inline, &mut blocks);
            self.render_block(node, &mut blocks);
        }
        self.flush_inline(&mut loose_inline, &mut blocks);

        blocks.retain(|block| !block.text.is_empty());
        blocks
    }

    /// Inline nodes found at block level are rendered as a paragraph.
    fn flush_inline(&self, pending: &mut Vec<Node>, blocks: &mut Vec<Block>) {
        if pending.is_empty() {
            return;
        }
        let text = self.render_inline(pending, InlineContext::default());
        blocks.push(Block::new(NodeKind::Paragraph, text));
        pending.clear();
    }

    fn render_block(&self, node: &Node, blocks: &mut Vec<Block>) {
        let kind = node.kind();
        match kind {
            NodeKind::Doc => blocks.extend(self.render_blocks(&node.content)),
            NodeKind::Paragraph => {
                let text = self.render_inline(&node.content, InlineContext::default());
                blocks.push(Block::new(kind, text));
            }
            NodeKind::Heading => blocks.push(Block::new(kind, self.render_heading(node))),
            NodeKind::BulletList | NodeKind::OrderedList => {
                let start = list_start(node);
                blocks.push(Block {
                    kind,
                    text: self.render_list(node),
                    tight: start == 1,
                });
            }
            NodeKind::TaskList => blocks.push(Block {
                kind,
                text: self.render_task_list(node),
                tight: true,
            }),
            NodeKind::ListItem => {
                let marker = format!("{} ", self.rules.bullet());
                blocks.push(Block::new(
                    NodeKind::BulletList,
                    self.render_list_item(&node.content, &marker),
                ));
            }
            NodeKind::TaskItem => {
                blocks.push(Block::new(NodeKind::TaskList, self.render_task_item(node)))
            }
            NodeKind::CodeBlock => blocks.push(Block::new(kind, render_code_block(node))),
            NodeKind::Blockquote => {
                let inner = join_blocks(&self.render_blocks(&node.content));
                blocks.push(Block::new(kind, prefix_lines(&inner, "> ", ">")));
            }
            NodeKind::Table => blocks.push(Block::new(kind, self.render_table(node))),
            NodeKind::Rule => blocks.push(Block::new(kind, "---".to_string())),
            NodeKind::TableRow | NodeKind::TableCell | NodeKind::TableHeader => {
                blocks.extend(self.render_blocks(&node.content))
            }
            NodeKind::Text
            | NodeKind::HardBreak
            | NodeKind::Mention
            | NodeKind::Emoji
            | NodeKind::InlineCard
            | NodeKind::Date
            | NodeKind::Status => {
                let text = self.render_inline(std::slice::from_ref(node), InlineContext::default());
                blocks.push(Block::new(NodeKind::Paragraph, text));
            }
            NodeKind::MediaSingle | NodeKind::MediaGroup | NodeKind::Media => {
                tracing::debug!(node = %node.node_type, "skipping media node");
            }
            NodeKind::Panel | NodeKind::Expand | NodeKind::NestedExpand | NodeKind::Unknown => {
                tracing::debug!(node = %node.node_type, "rendering content of unsupported node");
                blocks.extend(self.render_blocks(&node.content));
            }
        }
    }

    fn render_heading(&self, node: &Node) -> String {
        let level = node.attr_i64("level").unwrap_or(1).clamp(1, 6) as usize;
        let ctx = InlineContext {
            single_line: true,
            ..InlineContext::default()
        };
        let text = self.render_inline(&node.content, ctx);
        format!("{} {text}", "#".repeat(level)).trim_end().to_string()
    }

    fn render_list(&self, node: &Node) -> String {
        let ordered = node.kind() == NodeKind::OrderedList;
        let mut number = list_start(node);
        let mut items = Vec::with_capacity(node.content.len());

        for item in &node.content {
            let marker = if ordered {
                format!("{number}. ")
            } else {
                format!("{} ", self.rules.bullet())
            };
            number += 1;

            let content = match item.kind() {
                NodeKind::ListItem => item.content.as_slice(),
                _ => std::slice::from_ref(item),
            };
            items.push(self.render_list_item(content, &marker));
        }
        items.join("\n")
    }

    fn render_list_item(&self, content: &[Node], marker: &str) -> String {
        let blocks = self.render_blocks(content);
        if blocks.is_empty() {
            return marker.trim_end().to_string();
        }

        let mut body = String::new();
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                let tight = block.tight && blocks[i - 1].kind == NodeKind::Paragraph;
                body.push_str(if tight { "\n" } else { "\n\n" });
            }
            body.push_str(&block.text);
        }

        let indent = " ".repeat(marker.len());
        format!("{marker}{}", indent_continuation(&body, &indent))
    }

    fn render_task_list(&self, node: &Node) -> String {
        let mut lines = Vec::new();
        for child in &node.content {
            match child.kind() {
                NodeKind::TaskItem => lines.push(self.render_task_item(child)),
                NodeKind::TaskList => {
                    let nested = self.render_task_list(child);
                    if !nested.is_empty() {
                        lines.push(prefix_lines(&nested, "  ", ""));
                    }
                }
                _ => {
                    let nested = join_blocks(&self.render_blocks(std::slice::from_ref(child)));
                    if !nested.is_empty() {
                        lines.push(prefix_lines(&nested, "  ", ""));
                    }
                }
            }
        }
        lines.join("\n")
    }

    fn render_task_item(&self, node: &Node) -> String {
        let checkbox = match TaskState::from_attr(node.attr_str("state")) {
            TaskState::Done => "[x]",
            TaskState::Todo => "[ ]",
        };
        let marker = format!("{} {checkbox} ", self.rules.bullet());

        let body = if node.content.iter().all(|n| n.kind().is_inline()) {
            self.render_inline(&node.content, InlineContext::default())
        } else {
            join_blocks(&self.render_blocks(&node.content))
        };
        format!("{marker}{}", indent_continuation(&body, "  "))
    }

    fn render_table(&self, node: &Node) -> String {
        let rows: Vec<Vec<String>> = node
            .content
            .iter()
            .filter(|row| row.kind() == NodeKind::TableRow)
            .map(|row| row.content.iter().map(|cell| self.render_cell(cell)).collect())
            .collect();

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }

        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (i, row) in rows.iter().enumerate() {
            lines.push(format_row(row, columns));
            if i == 0 {
                lines.push(format_row(&vec!["---".to_string(); columns], columns));
            }
        }
        lines.join("\n")
    }

    /// Table cells hold blocks, but a GFM cell is a single line of inline
    /// content: nested blocks are flattened and separated by spaces.
    fn render_cell(&self, cell: &Node) -> String {
        let mut inline = Vec::new();
        flatten_inline(&cell.content, &mut inline);
        let ctx = InlineContext {
            in_table: true,
            single_line: true,
        };
        self.render_inline(&inline, ctx)
    }

    fn render_inline(&self, nodes: &[Node], ctx: InlineContext) -> String {
        let mut normalized = Vec::with_capacity(nodes.len());
        for node in nodes {
            normalize_inline(node, &mut normalized);
        }
        let merged = merge_adjacent_text(normalized, self.rules.mark_equality);

        let mut writer = InlineWriter::new(ctx);
        for node in &merged {
            match node.kind() {
                NodeKind::Text => writer.text(node),
                NodeKind::HardBreak => writer.hard_break(),
                _ => {}
            }
        }
        writer.finish()
    }
}

/// Reduce inline content to `text` and `hardBreak` nodes with sanitized marks.
///
/// Mentions, emoji, dates and status lozenges degrade to their text; inline
/// cards become links. Block nodes are flattened to their inline content.
fn normalize_inline(node: &Node, out: &mut Vec<Node>) {
    let fallback = |attr: &str| node.attr_str(attr).map(|t| Node::text(t, Vec::new()));

    match node.kind() {
        NodeKind::Text => {
            let mut text = node.clone();
            text.marks = sanitize_marks(&node.marks);
            out.push(text);
        }
        NodeKind::HardBreak => out.push(Node::hard_break()),
        NodeKind::Mention => out.extend(fallback("text")),
        NodeKind::Emoji => out.extend(fallback("text").or_else(|| fallback("shortName"))),
        NodeKind::Date => out.extend(fallback("timestamp")),
        NodeKind::Status => out.extend(fallback("text")),
        NodeKind::InlineCard => {
            if let Some(url) = node.attr_str("url") {
                out.push(Node::text(url, vec![Mark::link(url, None)]));
            }
        }
        _ => {
            let mut inline = Vec::new();
            flatten_inline(std::slice::from_ref(node), &mut inline);
            for child in &inline {
                normalize_inline(child, out);
            }
        }
    }
}

/// Collect the inline content of a block subtree, separating blocks with a space.
fn flatten_inline(nodes: &[Node], out: &mut Vec<Node>) {
    for node in nodes {
        let kind = node.kind();
        if kind.is_inline() {
            out.push(node.clone());
            continue;
        }
        let separated = match out.last() {
            Some(last) => last.kind() == NodeKind::Text && last.text_str().ends_with(' '),
            None => true,
        };
        if !separated {
            out.push(Node::text(" ", Vec::new()));
        }
        match kind {
            NodeKind::CodeBlock => {
                let code = node.plain_text();
                if !code.trim().is_empty() {
                    out.push(Node::text(code, vec![Mark::new(MarkKind::Code)]));
                }
            }
            NodeKind::MediaSingle | NodeKind::MediaGroup | NodeKind::Media => {}
            _ => flatten_inline(&node.content, out),
        }
    }
}

fn list_start(node: &Node) -> i64 {
    match node.kind() {
        NodeKind::OrderedList => node.attr_i64("order").filter(|n| *n >= 0).unwrap_or(1),
        _ => 1,
    }
}

fn render_code_block(node: &Node) -> String {
    let mut code = node.plain_text();
    // A lone space is the placeholder for an empty code block.
    if code == " " {
        code.clear();
    }
    let language = node.attr_str("language").unwrap_or("").trim();
    let fence = code_fence(&code);

    if code.is_empty() {
        format!("{fence}{language}\n{fence}")
    } else if code.ends_with('\n') {
        format!("{fence}{language}\n{code}{fence}")
    } else {
        format!("{fence}{language}\n{code}\n{fence}")
    }
}

fn format_row(cells: &[String], columns: usize) -> String {
    let mut line = String::from("|");
    for i in 0..columns {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        line.push(' ');
        line.push_str(cell);
        line.push_str(" |");
    }
    line
}

fn join_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
            if same_list_family(blocks[i - 1].kind, block.kind) {
                out.push_str(LIST_SEPARATOR);
                out.push_str("\n\n");
            }
        }
        out.push_str(&block.text);
    }
    out
}

/// Bullet and task lists share a marker, so Markdown would merge them.
fn same_list_family(a: NodeKind, b: NodeKind) -> bool {
    a.is_list() && b.is_list() && (a == NodeKind::OrderedList) == (b == NodeKind::OrderedList)
}

/// Indent every line after the first. Blank lines stay empty.
fn indent_continuation(text: &str, indent: &str) -> String {
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or("").to_string();
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
    }
    out
}

/// Prefix every line, using `empty_prefix` for blank lines.
fn prefix_lines(text: &str, prefix: &str, empty_prefix: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                empty_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes a run of inline nodes, keeping the stack of currently open marks.
struct InlineWriter {
    ctx: InlineContext,
    out: String,
    open: Vec<Mark>,
    /// Whitespace held back so it can land outside closing delimiters.
    pending_ws: String,
    /// The text written last, kept so its final character can still be
    /// rewritten once the delimiters that follow it are known.
    last_text: Option<WrittenText>,
}

struct WrittenText {
    start: usize,
    raw: String,
    escape: EscapeContext,
    first_as_reference: bool,
}

impl InlineWriter {
    fn new(ctx: InlineContext) -> Self {
        InlineWriter {
            ctx,
            out: String::new(),
            open: Vec::new(),
            pending_ws: String::new(),
            last_text: None,
        }
    }

    fn text(&mut self, node: &Node) {
        let raw = if self.ctx.single_line {
            node.text_str().replace('\n', " ")
        } else {
            node.text_str().to_string()
        };
        let is_code = node.marks.iter().any(|m| m.kind() == MarkKind::Code);

        if !is_code && raw.trim().is_empty() {
            self.pending_ws.push_str(&raw);
            return;
        }

        let mut wanted: Vec<Mark> = node
            .marks
            .iter()
            .filter(|m| m.kind() != MarkKind::Code)
            .cloned()
            .collect();
        wanted.sort_by_key(Mark::kind);

        let keep = self
            .open
            .iter()
            .take_while(|open| wanted.contains(open))
            .count();

        let (lead, core, trail) = if is_code {
            ("", raw.as_str(), "")
        } else {
            split_whitespace(&raw)
        };

        let tight = self.pending_ws.is_empty()
            && lead.is_empty()
            && !self.out.is_empty()
            && !self.out.ends_with('\n');
        let mut first_as_reference = false;
        if tight {
            let delimiters: Vec<Delimiter> = self.open[keep..]
                .iter()
                .rev()
                .map(Delimiter::closing)
                .chain(
                    wanted
                        .iter()
                        .filter(|mark| !self.open[..keep].contains(mark))
                        .map(Delimiter::opening),
                )
                .collect();
            let before = self.out.chars().next_back();
            let after = if is_code { Some('`') } else { core.chars().next() };
            if !delimiters_hold(before, &delimiters, after) {
                self.last_char_as_reference();
                first_as_reference = !is_code && after.is_some_and(|c| !c.is_ascii_punctuation());
            }
        }

        self.close_to(keep);
        self.out.push_str(&std::mem::take(&mut self.pending_ws));
        self.out.push_str(lead);
        for mark in wanted {
            if !self.open.contains(&mark) {
                if mark.kind() == MarkKind::Link {
                    self.escape_trailing_bang();
                }
                self.out.push_str(opening_delimiter(&mark));
                self.open.push(mark);
            }
        }

        if is_code {
            self.out.push_str(&code_span(core, self.ctx.in_table));
            self.last_text = None;
        } else {
            let escape = EscapeContext {
                in_table: self.ctx.in_table,
                at_line_start: self.at_line_start(),
            };
            let start = self.out.len();
            self.out
                .push_str(&render_text(core, escape, first_as_reference, false));
            self.last_text = Some(WrittenText {
                start,
                raw: core.to_string(),
                escape,
                first_as_reference,
            });
        }
        self.pending_ws.push_str(trail);
    }

    /// Rewrite the final character of the text written last as a character
    /// reference, unless it already is punctuation.
    fn last_char_as_reference(&mut self) {
        let Some(last) = &self.last_text else {
            return;
        };
        if last.raw.chars().last().map_or(true, |c| c.is_ascii_punctuation()) {
            return;
        }
        let rendered = render_text(&last.raw, last.escape, last.first_as_reference, true);
        self.out.truncate(last.start);
        self.out.push_str(&rendered);
    }

    /// `![` would open an image.
    fn escape_trailing_bang(&mut self) {
        let Some(body) = self.out.strip_suffix('!') else {
            return;
        };
        let backslashes = body.chars().rev().take_while(|c| *c == '\\').count();
        if backslashes % 2 == 0 {
            let at = self.out.len() - 1;
            self.out.insert(at, '\\');
        }
    }

    fn hard_break(&mut self) {
        self.last_text = None;
        if self.ctx.single_line {
            self.pending_ws.push(' ');
            return;
        }
        if self.out.trim().is_empty() {
            return;
        }
        self.close_to(0);
        self.pending_ws.clear();
        self.out.push_str("\\\n");
    }

    fn close_to(&mut self, keep: usize) {
        while self.open.len() > keep {
            if let Some(mark) = self.open.pop() {
                self.out.push_str(&closing_delimiter(&mark));
            }
        }
    }

    fn at_line_start(&self) -> bool {
        let trimmed = self.out.trim_end_matches([' ', '\t']);
        trimmed.is_empty() || trimmed.ends_with('\n')
    }

    fn finish(mut self) -> String {
        self.close_to(0);
        let mut out = self.out.as_str();
        // A trailing hard break would leave a literal backslash behind.
        while let Some(stripped) = out.strip_suffix("\\\n") {
            out = stripped;
        }
        out.trim().to_string()
    }
}

/// Escaped text, with its first and/or last character optionally written as a
/// character reference.
fn render_text(raw: &str, escape: EscapeContext, first_ref: bool, last_ref: bool) -> String {
    let mut chars = raw.chars();
    let first = if first_ref { chars.next() } else { None };
    let last = if last_ref { chars.next_back() } else { None };

    // Escaping treats the cut edges as non-word and non-blank, so `_` and `*`
    // next to a reference come out escaped.
    let escaped = escape_text(
        chars.as_str(),
        EscapeContext {
            at_line_start: escape.at_line_start && first.is_none(),
            ..escape
        },
    );

    let mut out = String::with_capacity(escaped.len() + 16);
    if let Some(c) = first {
        out.push_str(&char_reference(c));
    }
    out.push_str(&escaped);
    if let Some(c) = last {
        out.push_str(&char_reference(c));
    }
    out
}

/// One mark delimiter emitted at a boundary between two runs of text.
struct Delimiter {
    text: String,
    emphasis: bool,
    opens: bool,
}

impl Delimiter {
    fn opening(mark: &Mark) -> Self {
        Delimiter {
            text: opening_delimiter(mark).to_string(),
            emphasis: is_emphasis(mark),
            opens: true,
        }
    }

    fn closing(mark: &Mark) -> Self {
        Delimiter {
            text: closing_delimiter(mark),
            emphasis: is_emphasis(mark),
            opens: false,
        }
    }
}

fn is_emphasis(mark: &Mark) -> bool {
    matches!(mark.kind(), MarkKind::Strong | MarkKind::Em | MarkKind::Strike)
}

/// Whether every emphasis run among `delimiters`, written between `before`
/// and `after` with no space, reads back with the role it was written for.
/// Adjacent delimiters of the same character form one run, which then has to
/// both open and close when it mixes the two.
fn delimiters_hold(before: Option<char>, delimiters: &[Delimiter], after: Option<char>) -> bool {
    let uncertain = |c: Option<char>| {
        c.is_some_and(|c| !c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace())
    };

    let mut i = 0;
    while i < delimiters.len() {
        let Some(run_char) = delimiters[i].text.chars().next().filter(|_| delimiters[i].emphasis)
        else {
            i += 1;
            continue;
        };

        let mut j = i;
        let (mut opens, mut closes) = (false, false);
        while j < delimiters.len()
            && delimiters[j].emphasis
            && delimiters[j].text.starts_with(run_char)
        {
            opens |= delimiters[j].opens;
            closes |= !delimiters[j].opens;
            j += 1;
        }

        let left_of = if i == 0 {
            before
        } else {
            delimiters[i - 1].text.chars().last()
        };
        let right_of = match delimiters.get(j) {
            Some(next) => next.text.chars().next(),
            None => after,
        };
        if uncertain(left_of) || uncertain(right_of) {
            return false;
        }

        let (left, right) = flanking(left_of, right_of);
        if (opens && !left) || (closes && !right) {
            return false;
        }
        i = j;
    }
    true
}

fn split_whitespace(text: &str) -> (&str, &str, &str) {
    let core_start = text.len() - text.trim_start().len();
    let core_end = text.trim_end().len();
    (
        &text[..core_start],
        &text[core_start..core_end],
        &text[core_end..],
    )
}

fn opening_delimiter(mark: &Mark) -> &'static str {
    match mark.kind() {
        MarkKind::Strong => "**",
        MarkKind::Em => "*",
        MarkKind::Strike => "~~",
        MarkKind::Link => "[",
        MarkKind::Code | MarkKind::Unknown => "",
    }
}

fn closing_delimiter(mark: &Mark) -> String {
    match mark.kind() {
        MarkKind::Strong => "**".to_string(),
        MarkKind::Em => "*".to_string(),
        MarkKind::Strike => "~~".to_string(),
        MarkKind::Link => {
            let href = link_destination(mark.attr_str("href").unwrap_or(""));
            match mark.attr_str("title") {
                Some(title) if !title.is_empty() => format!("]({href} {})", link_title(title)),
                _ => format!("]({href})"),
            }
        }
        MarkKind::Code | MarkKind::Unknown => String::new(),
    }
}

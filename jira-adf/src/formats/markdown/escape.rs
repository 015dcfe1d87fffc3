//! Markdown escaping for text coming out of the document tree.
//!
//! Metacharacters are escaped only where CommonMark/GFM would otherwise read them
//! as syntax:
//!
//! | Character        | Escaped when                                                  |
//! |------------------|---------------------------------------------------------------|
//! | `\`              | not already the start of an escape (`\` + ASCII punctuation)  |
//! | `` ` `` `[` `]`  | always                                                        |
//! | `*` `~`          | unless it stands between two spaces (`2 * 3`)                 |
//! | `_`              | unless it sits between two alphanumerics (`my_var`)           |
//! | `\|`             | inside table cells                                            |
//! | `<`              | before a letter, `/`, `!` or `?` (would read as HTML)         |
//! | `&`              | when it starts something shaped like an entity (`&amp;`)      |
//! | `#` `>` `-` `+` `*` `=` `N.` | at the start of a line, where they open a block   |
//!
//! An existing escape sequence is copied through untouched, which makes
//! [`escape_text`] idempotent: `escape_text(escape_text(s)) == escape_text(s)`.

/// Where the text being escaped will land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscapeContext {
    /// Text is inside a GFM table cell, so `|` splits cells.
    pub in_table: bool,
    /// The first character of the text starts a Markdown line.
    pub at_line_start: bool,
}

/// Escape Markdown metacharacters in plain text.
pub fn escape_text(text: &str, ctx: EscapeContext) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut line_start = ctx.at_line_start;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let prev = if i == 0 { None } else { Some(chars[i - 1]) };
        let next = chars.get(i + 1).copied();

        if c == '\\' {
            match next {
                Some(n) if n.is_ascii_punctuation() => {
                    out.push('\\');
                    out.push(n);
                    i += 2;
                }
                _ => {
                    out.push_str("\\\\");
                    i += 1;
                }
            }
            line_start = false;
            continue;
        }

        if c == '\n' {
            out.push(c);
            line_start = true;
            i += 1;
            continue;
        }

        if line_start {
            if c == ' ' || c == '\t' {
                out.push(c);
                i += 1;
                continue;
            }
            line_start = false;

            if let Some(digits) = ordered_marker_digits(&chars[i..]) {
                out.extend(&chars[i..i + digits]);
                out.push('\\');
                out.push(chars[i + digits]);
                i += digits + 1;
                continue;
            }
            if opens_block(c, next) {
                out.push('\\');
                out.push(c);
                i += 1;
                continue;
            }
        }

        if needs_escape(c, prev, next, &chars[i..], ctx.in_table) {
            out.push('\\');
        }
        out.push(c);
        i += 1;
    }

    out
}

fn needs_escape(c: char, prev: Option<char>, next: Option<char>, rest: &[char], in_table: bool) -> bool {
    match c {
        '`' | '[' | ']' => true,
        '*' | '~' => !(is_blank(prev) && is_blank(next)),
        '_' => !(is_word(prev) && is_word(next)),
        '|' => in_table,
        '<' => next.is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')),
        '&' => looks_like_entity(rest),
        _ => false,
    }
}

/// Characters that open a block construct when they start a line.
fn opens_block(c: char, next: Option<char>) -> bool {
    let ends_marker = matches!(next, None | Some(' ') | Some('\t') | Some('\n'));
    match c {
        '#' | '>' => true,
        '-' | '+' | '*' | '=' => ends_marker || next == Some(c),
        _ => false,
    }
}

/// Length of the digit run of an ordered list marker (`12. ` or `3)`) at the
/// start of `chars`, if there is one.
fn ordered_marker_digits(chars: &[char]) -> Option<usize> {
    let digits = chars.iter().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 || digits > 9 {
        return None;
    }
    match chars.get(digits) {
        Some('.') | Some(')') => {}
        _ => return None,
    }
    match chars.get(digits + 1) {
        None | Some(' ') | Some('\t') | Some('\n') => Some(digits),
        _ => None,
    }
}

fn looks_like_entity(chars: &[char]) -> bool {
    let body: Vec<char> = chars
        .iter()
        .skip(1)
        .take_while(|c| c.is_ascii_alphanumeric() || **c == '#')
        .copied()
        .collect();
    !body.is_empty() && chars.get(body.len() + 1) == Some(&';')
}

fn is_blank(c: Option<char>) -> bool {
    matches!(c, Some(' ') | Some('\t'))
}

fn is_word(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

/// Numeric character reference for `c`. It reads back as `c`, but counts as
/// punctuation when CommonMark decides whether a delimiter run next to it can
/// open or close emphasis.
pub fn char_reference(c: char) -> String {
    format!("&#{};", c as u32)
}

/// Left- and right-flanking of a `*` or `~` delimiter run sitting between
/// `before` and `after`. `None` is a line edge, which counts as whitespace.
pub fn flanking(before: Option<char>, after: Option<char>) -> (bool, bool) {
    let space = |c: Option<char>| c.map_or(true, char::is_whitespace);
    let punct = |c: Option<char>| c.is_some_and(|c| !c.is_whitespace() && !c.is_alphanumeric());

    let left = !space(after) && (!punct(after) || space(before) || punct(before));
    let right = !space(before) && (!punct(before) || space(after) || punct(after));
    (left, right)
}

/// Render `code` as an inline code span.
///
/// The backtick fence is one longer than the longest backtick run in the code,
/// and the content is padded with spaces when CommonMark would otherwise strip
/// or misread its edges.
pub fn code_span(code: &str, in_table: bool) -> String {
    let mut literal = code.replace('\n', " ");
    if in_table {
        literal = literal.replace('|', "\\|");
    }

    let fence = "`".repeat(longest_run(&literal, '`') + 1);
    let pad = literal.starts_with('`')
        || literal.ends_with('`')
        || (literal.starts_with(' ') && literal.ends_with(' ') && !literal.trim().is_empty());

    if pad {
        format!("{fence} {literal} {fence}")
    } else {
        format!("{fence}{literal}{fence}")
    }
}

/// Fence for a fenced code block: at least three backticks, and longer than any
/// backtick run inside the code.
pub fn code_fence(code: &str) -> String {
    "`".repeat((longest_run(code, '`') + 1).max(3))
}

fn longest_run(text: &str, needle: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == needle {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Link destination, wrapped in angle brackets when it contains characters that
/// would end a bare destination.
pub fn link_destination(href: &str) -> String {
    let needs_brackets = href.is_empty()
        || href.chars().any(|c| c.is_whitespace() || c == '(' || c == ')');
    if needs_brackets {
        let inner = href
            .replace('\\', "\\\\")
            .replace('<', "\\<")
            .replace('>', "\\>");
        format!("<{inner}>")
    } else {
        href.to_string()
    }
}

/// Link title, quoted.
pub fn link_title(title: &str) -> String {
    format!("\"{}\"", title.replace('\\', "\\\\").replace('"', "\\\""))
}

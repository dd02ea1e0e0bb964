//! Inline tokenizer: turns one line of text into styled spans.
//!
//! Markers are tried in a fixed order at every position: bold (`**`, `__`),
//! italic (`*`, `_`), inline code, then links. A marker without a matching
//! close is emitted as plain text and scanning resumes right after it.

use super::escape::{escape_html, safe_href};

/// Nesting limit for styled spans. Content deeper than this is kept as text.
pub const MAX_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Strong(Vec<Span>),
    Emphasis(Vec<Span>),
    Code(String),
    /// `href` is already checked against the allowed schemes.
    Link { label: Vec<Span>, href: String },
}

pub fn tokenize(line: &str) -> Vec<Span> {
    tokenize_at(line, 0)
}

/// Tokenize and render a line to an HTML fragment.
pub fn render_inline(line: &str) -> String {
    render_spans(&tokenize(line))
}

pub fn render_spans(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        write_span(&mut out, span);
    }
    out
}

fn write_span(out: &mut String, span: &Span) {
    match span {
        Span::Text(text) => out.push_str(&escape_html(text)),
        Span::Strong(inner) => {
            out.push_str("<strong>");
            out.push_str(&render_spans(inner));
            out.push_str("</strong>");
        }
        Span::Emphasis(inner) => {
            out.push_str("<em>");
            out.push_str(&render_spans(inner));
            out.push_str("</em>");
        }
        Span::Code(code) => {
            out.push_str("<code>");
            out.push_str(&escape_html(code));
            out.push_str("</code>");
        }
        Span::Link { label, href } => {
            out.push_str("<a href=\"");
            out.push_str(&escape_html(href));
            out.push_str("\" target=\"_blank\" rel=\"noopener noreferrer\">");
            out.push_str(&render_spans(label));
            out.push_str("</a>");
        }
    }
}

fn tokenize_at(text: &str, depth: usize) -> Vec<Span> {
    if text.is_empty() {
        return Vec::new();
    }
    if depth >= MAX_DEPTH {
        return vec![Span::Text(text.to_string())];
    }

    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        match match_at(text, pos, depth) {
            Some((span, consumed)) => {
                if plain_start < pos {
                    spans.push(Span::Text(text[plain_start..pos].to_string()));
                }
                spans.push(span);
                pos += consumed;
                plain_start = pos;
            }
            None => {
                pos += text[pos..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if plain_start < text.len() {
        spans.push(Span::Text(text[plain_start..].to_string()));
    }
    spans
}

/// Try every marker at `pos`, returning the span and the bytes it consumed.
fn match_at(text: &str, pos: usize, depth: usize) -> Option<(Span, usize)> {
    let rest = &text[pos..];
    let first = *rest.as_bytes().first()?;
    if !matches!(first, b'*' | b'_' | b'`' | b'[') {
        return None;
    }

    for delim in ["**", "__"] {
        if let Some((inner, consumed)) = match_delimited(text, pos, delim) {
            return Some((Span::Strong(tokenize_at(inner, depth + 1)), consumed));
        }
    }
    for delim in ["*", "_"] {
        if let Some((inner, consumed)) = match_delimited(text, pos, delim) {
            return Some((Span::Emphasis(tokenize_at(inner, depth + 1)), consumed));
        }
    }
    if let Some((code, consumed)) = match_code(rest) {
        return Some((Span::Code(code.to_string()), consumed));
    }
    if let Some((label, href, consumed)) = match_link(rest) {
        return Some((
            Span::Link {
                label: tokenize_at(label, depth + 1),
                href: safe_href(href).to_string(),
            },
            consumed,
        ));
    }
    None
}

fn match_delimited<'a>(text: &'a str, pos: usize, delim: &str) -> Option<(&'a str, usize)> {
    let rest = &text[pos..];
    if !rest.starts_with(delim) {
        return None;
    }
    let marker = delim.as_bytes()[0];
    let body = &rest[delim.len()..];

    // A single marker directly followed by another is the start of a longer run.
    if delim.len() == 1 && body.as_bytes().first() == Some(&marker) {
        return None;
    }
    if body.chars().next().is_none_or(char::is_whitespace) {
        return None;
    }
    if marker == b'_' && text[..pos].chars().next_back().is_some_and(char::is_alphanumeric) {
        return None;
    }

    let close = find_closing(body, delim)?;
    Some((&body[..close], delim.len() + close + delim.len()))
}

fn find_closing(body: &str, delim: &str) -> Option<usize> {
    let marker = delim.as_bytes()[0];
    let single = delim.len() == 1;
    let bytes = body.as_bytes();
    let mut from = body.chars().next()?.len_utf8();

    while let Some(rel) = body[from..].find(delim) {
        let at = from + rel;
        let end = at + delim.len();
        let after_space = body[..at].chars().next_back().is_some_and(char::is_whitespace);
        let in_run = bytes.get(end) == Some(&marker) || (single && bytes[at - 1] == marker);
        let mid_word =
            marker == b'_' && body[end..].chars().next().is_some_and(char::is_alphanumeric);
        if !after_space && !in_run && !mid_word {
            return Some(at);
        }
        from = at + 1;
    }
    None
}

fn match_code(rest: &str) -> Option<(&str, usize)> {
    let ticks = rest.bytes().take_while(|b| *b == b'`').count();
    if ticks == 0 {
        return None;
    }
    let fence = &rest[..ticks];
    let body = &rest[ticks..];
    let close = body.find(fence)?;
    if close == 0 {
        return None;
    }
    Some((&body[..close], ticks + close + ticks))
}

fn match_link(rest: &str) -> Option<(&str, &str, usize)> {
    let body = rest.strip_prefix('[')?;
    let label_end = body.find(']')?;
    if label_end == 0 {
        return None;
    }
    let target = body[label_end + 1..].strip_prefix('(')?;
    let href_end = target.find(')')?;
    let consumed = 1 + label_end + 2 + href_end + 1;
    Some((&body[..label_end], &target[..href_end], consumed))
}

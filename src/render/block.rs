//! Line-oriented block parser.
//!
//! One block is open at a time. Every line either extends the open block,
//! or closes it and opens (or immediately emits) another one.

use std::sync::LazyLock;

use regex::Regex;

use super::escape::escape_html;
use super::inline::render_inline;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(`{3,})\s*([^`]*)$").expect("fence pattern"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("heading pattern"));
static UNORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*+]\s+(.*)$").expect("unordered item pattern"));
static ORDERED_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("ordered item pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

/// A finished block. Text content is already rendered to HTML, except code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(String),
    Heading { level: usize, html: String },
    List { kind: ListKind, start: u64, items: Vec<String> },
    Blockquote(Vec<String>),
    CodeFence { language: Option<String>, code: String },
    Rule,
}

impl Block {
    pub fn to_html(&self) -> String {
        match self {
            Block::Paragraph(html) => format!("<p>{html}</p>"),
            Block::Heading { level, html } => format!("<h{level}>{html}</h{level}>"),
            Block::List { kind, start, items } => {
                let open = match kind {
                    ListKind::Unordered => "<ul>".to_string(),
                    ListKind::Ordered if *start != 1 => format!("<ol start=\"{start}\">"),
                    ListKind::Ordered => "<ol>".to_string(),
                };
                let close = match kind {
                    ListKind::Unordered => "</ul>",
                    ListKind::Ordered => "</ol>",
                };
                let body: String = items.iter().map(|item| format!("<li>{item}</li>")).collect();
                format!("{open}{body}{close}")
            }
            Block::Blockquote(paragraphs) => {
                let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
                format!("<blockquote>{body}</blockquote>")
            }
            Block::CodeFence { language, code } => match language {
                Some(lang) => format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    escape_html(lang),
                    escape_html(code)
                ),
                None => format!("<pre><code>{}</code></pre>", escape_html(code)),
            },
            Block::Rule => "<hr>".to_string(),
        }
    }
}

#[derive(Debug, Default)]
enum OpenBlock {
    #[default]
    None,
    Paragraph(Vec<String>),
    List {
        kind: ListKind,
        start: u64,
        items: Vec<String>,
    },
    Blockquote(Vec<String>),
    CodeFence {
        delimiter: String,
        language: Option<String>,
        lines: Vec<String>,
    },
}

#[derive(Debug, Default)]
struct BlockParser {
    open: OpenBlock,
    blocks: Vec<Block>,
}

impl BlockParser {
    fn feed(&mut self, raw: &str) {
        let line = raw.trim_end();

        if let OpenBlock::CodeFence {
            delimiter, lines, ..
        } = &mut self.open
        {
            if line.trim() == delimiter.as_str() {
                self.close();
            } else {
                lines.push(line.to_string());
            }
            return;
        }

        let trimmed = line.trim_start();

        if let Some(caps) = FENCE.captures(trimmed) {
            self.close();
            self.open = OpenBlock::CodeFence {
                delimiter: caps[1].to_string(),
                language: fence_language(&caps[2]),
                lines: Vec::new(),
            };
            return;
        }

        if trimmed.is_empty() {
            self.close();
            return;
        }

        if let Some(quoted) = trimmed.strip_prefix('>') {
            if !matches!(self.open, OpenBlock::Blockquote(_)) {
                self.close();
                self.open = OpenBlock::Blockquote(Vec::new());
            }
            let quoted = quoted.trim_start();
            if let OpenBlock::Blockquote(paragraphs) = &mut self.open {
                if !quoted.is_empty() {
                    paragraphs.push(render_inline(quoted));
                }
            }
            return;
        }

        if let Some(caps) = HEADING.captures(trimmed) {
            self.close();
            self.blocks.push(Block::Heading {
                level: caps[1].len(),
                html: render_inline(caps[2].trim()),
            });
            return;
        }

        if is_rule(trimmed) {
            self.close();
            self.blocks.push(Block::Rule);
            return;
        }

        if let Some(caps) = UNORDERED_ITEM.captures(trimmed) {
            self.push_item(ListKind::Unordered, 1, &caps[1]);
            return;
        }

        if let Some(caps) = ORDERED_ITEM.captures(trimmed) {
            let start = caps[1].parse::<u64>().unwrap_or(1);
            self.push_item(ListKind::Ordered, start, &caps[2]);
            return;
        }

        if !matches!(self.open, OpenBlock::Paragraph(_)) {
            self.close();
            self.open = OpenBlock::Paragraph(Vec::new());
        }
        if let OpenBlock::Paragraph(lines) = &mut self.open {
            lines.push(trimmed.to_string());
        }
    }

    fn push_item(&mut self, kind: ListKind, start: u64, text: &str) {
        let same_kind = matches!(&self.open, OpenBlock::List { kind: open_kind, .. } if *open_kind == kind);
        if !same_kind {
            self.close();
            self.open = OpenBlock::List {
                kind,
                start,
                items: Vec::new(),
            };
        }
        if let OpenBlock::List { items, .. } = &mut self.open {
            items.push(render_inline(text.trim()));
        }
    }

    /// Close the open block, emitting it when it has content.
    fn close(&mut self) {
        match std::mem::take(&mut self.open) {
            OpenBlock::None => {}
            OpenBlock::Paragraph(lines) => {
                self.blocks.push(Block::Paragraph(render_inline(&lines.join(" "))));
            }
            OpenBlock::List { kind, start, items } => {
                self.blocks.push(Block::List { kind, start, items });
            }
            OpenBlock::Blockquote(paragraphs) => {
                if !paragraphs.is_empty() {
                    self.blocks.push(Block::Blockquote(paragraphs));
                }
            }
            OpenBlock::CodeFence {
                language, lines, ..
            } => {
                self.blocks.push(Block::CodeFence {
                    language,
                    code: lines.join("\n"),
                });
            }
        }
    }

    fn finish(mut self) -> Vec<Block> {
        if let OpenBlock::CodeFence { lines, .. } = &self.open {
            // An unterminated fence with nothing inside produces no block.
            if lines.is_empty() {
                self.open = OpenBlock::None;
            }
        }
        self.close();
        self.blocks
    }
}

fn fence_language(info: &str) -> Option<String> {
    let word = info.split_whitespace().next()?;
    let clean: String = word
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '#' | '.'))
        .collect();
    (!clean.is_empty()).then_some(clean)
}

fn is_rule(trimmed: &str) -> bool {
    let mut chars = trimmed.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    matches!(first, '-' | '_' | '*') && trimmed.len() >= 3 && chars.all(|c| c == first)
}

pub fn parse_blocks(source: &str) -> Vec<Block> {
    let mut parser = BlockParser::default();
    for line in source.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Render a document to HTML. Never returns an empty string.
pub fn render_blocks(source: &str) -> String {
    let blocks = parse_blocks(source);
    if blocks.is_empty() {
        return format!("<p>{}</p>", escape_html(source));
    }
    blocks
        .iter()
        .map(Block::to_html)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraph_lines_join_with_single_space() {
        assert_eq!(
            render_blocks("first line  \nsecond **line**\n\nnext"),
            "<p>first line second <strong>line</strong></p>\n<p>next</p>"
        );
    }

    #[test]
    fn emphasis_can_span_paragraph_lines() {
        assert_eq!(render_blocks("a *b\nc* d"), "<p>a <em>b c</em> d</p>");
    }

    #[test]
    fn headings_are_emitted_immediately() {
        assert_eq!(
            render_blocks("intro\n## Title *x*\nbody"),
            "<p>intro</p>\n<h2>Title <em>x</em></h2>\n<p>body</p>"
        );
        assert_eq!(render_blocks("####### seven"), "<p>####### seven</p>");
        assert_eq!(render_blocks("#tag"), "<p>#tag</p>");
    }

    #[test]
    fn fenced_code_is_verbatim() {
        assert_eq!(
            render_blocks("```\n**x** [a](b) <y>\n  indented\n```"),
            "<pre><code>**x** [a](b) &lt;y&gt;\n  indented</code></pre>"
        );
    }

    #[test]
    fn fence_language_is_sanitised() {
        assert_eq!(
            render_blocks("```rust\nfn main() {}\n```"),
            "<pre><code class=\"language-rust\">fn main() {}</code></pre>"
        );
        assert_eq!(
            render_blocks("```\"><script>\nx\n```"),
            "<pre><code class=\"language-script\">x</code></pre>"
        );
    }

    #[test]
    fn fence_closes_only_on_its_own_delimiter() {
        assert_eq!(
            render_blocks("````\n```\ninside\n````\nafter"),
            "<pre><code>```\ninside</code></pre>\n<p>after</p>"
        );
    }

    #[test]
    fn fence_closes_open_paragraph() {
        assert_eq!(
            render_blocks("text\n```\ncode"),
            "<p>text</p>\n<pre><code>code</code></pre>"
        );
    }

    #[test]
    fn unterminated_empty_fence_falls_back_to_source() {
        assert_eq!(render_blocks("```"), "<p>```</p>");
    }

    #[test]
    fn empty_and_blank_input_fall_back() {
        assert_eq!(render_blocks(""), "<p></p>");
        assert_eq!(render_blocks("  \n \n"), "<p>  \n \n</p>");
    }

    #[test]
    fn list_kind_change_starts_new_list() {
        assert_eq!(
            render_blocks("- a\n* **b**\n1. c\n2. d\n+ e"),
            "<ul><li>a</li><li><strong>b</strong></li></ul>\n<ol><li>c</li><li>d</li></ol>\n<ul><li>e</li></ul>"
        );
    }

    #[test]
    fn ordered_list_keeps_start_number() {
        assert_eq!(
            render_blocks("3. three\n4. four"),
            "<ol start=\"3\"><li>three</li><li>four</li></ol>"
        );
    }

    #[test]
    fn paragraph_after_list_closes_it() {
        assert_eq!(
            render_blocks("- a\nplain"),
            "<ul><li>a</li></ul>\n<p>plain</p>"
        );
    }

    #[test]
    fn blank_line_separates_lists_and_quotes() {
        assert_eq!(
            render_blocks("- a\n\n- b"),
            "<ul><li>a</li></ul>\n<ul><li>b</li></ul>"
        );
        assert_eq!(
            render_blocks("> a\n\n> b"),
            "<blockquote><p>a</p></blockquote>\n<blockquote><p>b</p></blockquote>"
        );
        assert_eq!(
            render_blocks("1. a\n\n2. b"),
            "<ol><li>a</li></ol>\n<ol start=\"2\"><li>b</li></ol>"
        );
    }

    #[test]
    fn heading_and_rule_close_lists_and_quotes() {
        assert_eq!(
            render_blocks("- a\n# h\n- b"),
            "<ul><li>a</li></ul>\n<h1>h</h1>\n<ul><li>b</li></ul>"
        );
        assert_eq!(
            render_blocks("> a\n## h\n> b"),
            "<blockquote><p>a</p></blockquote>\n<h2>h</h2>\n<blockquote><p>b</p></blockquote>"
        );
        assert_eq!(
            render_blocks("- a\n---\n- b"),
            "<ul><li>a</li></ul>\n<hr>\n<ul><li>b</li></ul>"
        );
        assert_eq!(
            render_blocks("> a\n***\n> b"),
            "<blockquote><p>a</p></blockquote>\n<hr>\n<blockquote><p>b</p></blockquote>"
        );
    }

    #[test]
    fn blockquote_renders_each_line() {
        assert_eq!(
            render_blocks("> one\n>two\n>\nafter"),
            "<blockquote><p>one</p><p>two</p></blockquote>\n<p>after</p>"
        );
    }

    #[test]
    fn rules_need_three_identical_markers() {
        assert_eq!(render_blocks("a\n---\nb"), "<p>a</p>\n<hr>\n<p>b</p>");
        assert_eq!(render_blocks("***"), "<hr>");
        assert_eq!(render_blocks("___"), "<hr>");
        assert_eq!(render_blocks("-_-"), "<p>-_-</p>");
    }

    #[test]
    fn parse_exposes_block_structure() {
        let blocks = parse_blocks("# T\n- a\n```py\nx\n```\n---");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    html: "T".to_string()
                },
                Block::List {
                    kind: ListKind::Unordered,
                    start: 1,
                    items: vec!["a".to_string()]
                },
                Block::CodeFence {
                    language: Some("py".to_string()),
                    code: "x".to_string()
                },
                Block::Rule,
            ]
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let doc = "# Hi\n\n- *a*\n- [b](http://x)\n\n> q\n\n```\ncode\n```";
        assert_eq!(render_blocks(doc), render_blocks(doc));
    }
}

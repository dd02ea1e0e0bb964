//! Model reply rendering: Markdown subset to safe HTML.

pub mod block;
pub mod escape;
pub mod inline;

use tracing::debug;

pub const DEFAULT_MAX_CHARS: usize = 6000;

pub const TRUNCATION_NOTICE: &str = "<p class=\"truncated\"><em>[Response truncated]</em></p>";

/// Render raw model text, cutting it to `max_chars` characters first.
pub fn render(raw: &str, max_chars: usize) -> String {
    if max_chars == 0 || raw.is_empty() {
        return String::new();
    }

    let (source, truncated) = truncate_chars(raw, max_chars);
    let mut html = block::render_blocks(source);
    if truncated {
        debug!(max_chars, "reply truncated before rendering");
        html.push('\n');
        html.push_str(TRUNCATION_NOTICE);
    }
    html
}

/// Whether `render` would cut `raw` and append the notice.
pub fn is_truncated(raw: &str, max_chars: usize) -> bool {
    max_chars > 0 && raw.chars().nth(max_chars).is_some()
}

fn truncate_chars(raw: &str, max_chars: usize) -> (&str, bool) {
    match raw.char_indices().nth(max_chars) {
        Some((cut, _)) => (raw[..cut].trim_end(), true),
        None => (raw, false),
    }
}

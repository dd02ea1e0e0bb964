/// Escape the five HTML-significant characters.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub const PLACEHOLDER_HREF: &str = "#";

const ALLOWED_SCHEMES: [&str; 3] = ["http:", "https:", "mailto:"];

/// Returns the href unchanged when its scheme is allowed, otherwise the placeholder.
pub fn safe_href(href: &str) -> &str {
    let trimmed = href.trim();
    let allowed = ALLOWED_SCHEMES.iter().any(|scheme| {
        trimmed
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    });
    if allowed { trimmed } else { PLACEHOLDER_HREF }
}

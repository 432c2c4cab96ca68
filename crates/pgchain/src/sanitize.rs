//! Text sanitization applied to identifiers and bound values.
//!
//! Markup tags (and HTML comments) are stripped, then the HTML-special characters
//! `& < > " '` are escaped. An `&` that already starts a character entity is left
//! alone, which makes [`sanitize`] idempotent:
//!
//! ```ignore
//! let once = pgchain::sanitize("<b>Tom & Jerry</b>");
//! assert_eq!(once, "Tom &amp; Jerry");
//! assert_eq!(pgchain::sanitize(&once), once);
//! ```

use std::borrow::Cow;
use std::sync::OnceLock;

fn tag_regex() -> &'static regex::Regex {
    static TAG_RE: OnceLock<regex::Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        regex::Regex::new(r"(?s)<!--.*?-->|<[^<>]*>").expect("invalid built-in tag regex")
    })
}

/// Strip markup and escape HTML-special characters.
pub fn sanitize(input: &str) -> String {
    let stripped = strip_tags(input);
    escape_html(&stripped).into_owned()
}

/// Remove `<...>` tags and `<!-- -->` comments.
pub fn strip_tags(input: &str) -> Cow<'_, str> {
    if !input.contains('<') {
        return Cow::Borrowed(input);
    }
    tag_regex().replace_all(input, "")
}

/// Escape `& < > " '` without double-encoding existing entities.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 16);
    for (i, ch) in input.char_indices() {
        match ch {
            '&' if starts_entity(&input[i + 1..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Whether `rest` (the text right after an `&`) is the body of a character entity:
/// `name;`, `#123;` or `#x1F;`.
fn starts_entity(rest: &str) -> bool {
    let Some(end) = rest.find(';') else {
        return false;
    };
    let body = &rest[..end];
    if let Some(num) = body.strip_prefix('#') {
        if let Some(hex) = num.strip_prefix(['x', 'X']) {
            return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
        }
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }
    let mut chars = body.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

//! Input sanitization
//!
//! Defense-in-depth cleaning of user-supplied strings. Escaping is the
//! right tool for HTML output contexts; the stripping functions are a last
//! line of defense for stored input and are not a substitute for
//! parameterized queries or output encoding.

use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_ELEMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script[^>]*>(.*?</script>)?").expect("valid pattern")
});

static IFRAME_ELEMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<iframe[^>]*>(.*?</iframe>)?").expect("valid pattern")
});

static EVENT_HANDLERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bon\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid pattern")
});

static JAVASCRIPT_URIS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)javascript\s*:").expect("valid pattern"));

static STYLE_ATTRIBUTES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bstyle\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#).expect("valid pattern")
});

static SQL_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(union|select|insert|update|delete|drop|exec|execute)\b")
        .expect("valid pattern")
});

/// Escape a string for safe embedding in HTML.
///
/// Replaces `&`, `<`, `>`, `"`, and `'` with their entities; everything
/// else passes through unchanged. Safe for both element text and quoted
/// attribute values.
pub fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).to_string()
}

/// Strip active HTML content from user input.
///
/// Removes `<script>` and `<iframe>` elements (including their bodies),
/// inline event handler attributes, `javascript:` URI schemes, and inline
/// `style` attributes. The result is plain-ish text, not guaranteed-safe
/// HTML; escape at output time regardless.
pub fn sanitize_user_input(input: &str) -> String {
    let cleaned = SCRIPT_ELEMENTS.replace_all(input, "");
    let cleaned = IFRAME_ELEMENTS.replace_all(&cleaned, "");
    let cleaned = EVENT_HANDLERS.replace_all(&cleaned, "");
    let cleaned = JAVASCRIPT_URIS.replace_all(&cleaned, "");
    let cleaned = STYLE_ATTRIBUTES.replace_all(&cleaned, "");
    cleaned.to_string()
}

/// Strip characters and keywords commonly used in SQL injection.
///
/// Removes quotes, backticks, statement separators, comment markers, and
/// a fixed keyword list. Parameterized queries remain the actual defense.
pub fn sanitize_sql_input(input: &str) -> String {
    let cleaned = input.replace(&['\'', '"', '`', ';'][..], "");
    let cleaned = cleaned.replace("--", "");
    SQL_KEYWORDS.replace_all(&cleaned, "").to_string()
}

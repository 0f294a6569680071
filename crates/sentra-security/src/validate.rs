//! Format validators
//!
//! Strict boolean predicates for untrusted input. Malformed input is
//! reported as `false`, never as an error; callers decide how to surface
//! rejection.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$",
    )
    .expect("valid pattern")
});

/// Validate an email address.
///
/// Requires exactly one `@`, a local part of at most 64 characters that
/// starts and ends alphanumeric, and a domain of at most 255 characters
/// with an alphabetic top-level domain of at least two characters.
pub fn validate_email(input: &str) -> bool {
    let (local, domain) = match input.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    if local.len() > 64 || domain.len() > 255 {
        return false;
    }

    EMAIL_PATTERN.is_match(input)
}

/// Validate an absolute http(s) URL.
///
/// The input must parse as a URL, use the `http` or `https` scheme, and
/// carry a host. Other schemes (`javascript:`, `data:`, `ftp:`) are
/// rejected outright.
pub fn validate_url(input: &str) -> bool {
    match Url::parse(input) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}

/// Validate a bare file name for safe storage.
///
/// Rejects empty names, traversal sequences, path separators, control
/// characters, characters unsafe on common filesystems, names longer than
/// 255 bytes, and names with leading/trailing spaces or a trailing dot.
pub fn validate_file_name(input: &str) -> bool {
    if input.is_empty() || input.len() > 255 {
        return false;
    }

    if input == "." || input.contains("..") {
        return false;
    }

    if input.contains('/') || input.contains('\\') {
        return false;
    }

    if input.chars().any(|c| c.is_control()) {
        return false;
    }

    const FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*'];
    if input.contains(FORBIDDEN) {
        return false;
    }

    if input.starts_with(' ') || input.ends_with(' ') || input.ends_with('.') {
        return false;
    }

    true
}

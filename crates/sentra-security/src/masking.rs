//! Display-only data masking
//!
//! Irreversible partial redaction of personal data for lists, logs, and
//! back-office screens. Every function is pure and deterministic, and
//! malformed input degrades to full masking rather than leaking content.

fn mask_all(input: &str) -> String {
    "*".repeat(input.chars().count())
}

/// Mask an email address, keeping at most the first two characters of the
/// local part and the whole domain: `ab***@example.com`. Input without an
/// `@` is fully masked.
pub fn mask_email(input: &str) -> String {
    let (local, domain) = match input.split_once('@') {
        Some(parts) => parts,
        None => return mask_all(input),
    };
    let visible: String = local.chars().take(2).collect();
    format!("{}***@{}", visible, domain)
}

/// Mask a phone number, keeping the first three and last two characters:
/// `138******78`. Numbers of three characters or fewer are fully masked.
pub fn mask_phone(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= 3 {
        return mask_all(input);
    }
    // Between four and five characters the head and tail windows would
    // overlap; keep the head only
    if chars.len() <= 5 {
        let head: String = chars[..3].iter().collect();
        return format!("{}{}", head, "*".repeat(chars.len() - 3));
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 5), tail)
}

/// Mask a national id number, keeping the first and last four characters.
/// Input of eight characters or fewer is fully masked.
pub fn mask_id_card(input: &str) -> String {
    mask_fixed_windows(input, 4, 4)
}

/// Mask a bank card number, keeping the first and last four digits.
/// Input of eight characters or fewer is fully masked.
pub fn mask_bank_card(input: &str) -> String {
    mask_fixed_windows(input, 4, 4)
}

fn mask_fixed_windows(input: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= head + tail {
        return mask_all(input);
    }
    let head_str: String = chars[..head].iter().collect();
    let tail_str: String = chars[chars.len() - tail..].iter().collect();
    format!(
        "{}{}{}",
        head_str,
        "*".repeat(chars.len() - head - tail),
        tail_str
    )
}

/// Mask an IP address. IPv4 keeps the first two octets (`192.168.*.*`),
/// IPv6 keeps the first two groups. Anything unparseable is fully masked.
pub fn mask_ip(input: &str) -> String {
    if input.parse::<std::net::Ipv4Addr>().is_ok() {
        let octets: Vec<&str> = input.split('.').collect();
        return format!("{}.{}.*.*", octets[0], octets[1]);
    }

    if input.parse::<std::net::Ipv6Addr>().is_ok() {
        let groups: Vec<&str> = input.split(':').collect();
        if groups.len() >= 2 && !groups[0].is_empty() {
            return format!("{}:{}:****", groups[0], groups[1]);
        }
    }

    mask_all(input)
}

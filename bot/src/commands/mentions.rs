//! Extraction of ids from platform mention syntax.

fn digits(s: &str) -> Option<&str> {
    (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())).then_some(s)
}

fn unwrap_mention<'a>(raw: &'a str, open: &str) -> Option<&'a str> {
    raw.strip_prefix(open)?.strip_suffix('>')
}

/// `<#123>` -> `123`. Channels must be given as a mention.
pub fn parse_channel(raw: &str) -> Option<&str> {
    digits(unwrap_mention(raw.trim(), "<#")?)
}

/// `<@123>`, `<@!123>` or bare `123`.
pub fn parse_user(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    match unwrap_mention(raw, "<@") {
        Some(inner) => digits(inner.strip_prefix('!').unwrap_or(inner)),
        None => digits(raw),
    }
}

/// `<@&123>` or bare `123`.
pub fn parse_role(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    match unwrap_mention(raw, "<@") {
        Some(inner) => digits(inner.strip_prefix('&').unwrap_or(inner)),
        None => digits(raw),
    }
}

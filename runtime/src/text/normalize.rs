//! Visible-text normalization and the boilerplate filter.
//!
//! Both entry points are pure and idempotent: feeding their output back in
//! returns it unchanged.

use crate::config::ContentRules;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn invisible_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\u{00AD}\u{180E}\u{200B}-\u{200F}\u{2060}-\u{2064}\u{FEFF}]")
            .expect("invisible-char regex is valid")
    })
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[ \t\x0B\x0C\u{00A0}\u{1680}\u{2000}-\u{200A}\u{202F}\u{205F}\u{3000}]+")
            .expect("whitespace regex is valid")
    })
}

fn blank_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("blank-line regex is valid"))
}

/// Strip invisible characters and collapse whitespace.
///
/// Horizontal runs become one space, lines are trimmed, and three or more
/// consecutive newlines collapse to a single blank line.
pub fn normalize_visible(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = invisible_re().replace_all(&text, "");
    let text = horizontal_ws_re().replace_all(&text, " ");
    let trimmed: Vec<&str> = text.split('\n').map(str::trim).collect();
    let joined = trimmed.join("\n");
    blank_run_re()
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Full cleanup for ranking: normalize, drop short and boilerplate lines,
/// and keep only the first case-insensitive occurrence of each line.
pub fn clean_text(text: &str, rules: &ContentRules) -> String {
    let visible = normalize_visible(text);

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<&str> = Vec::new();
    for line in visible.lines() {
        let line = line.trim();
        if line.chars().count() <= 2 {
            continue;
        }
        let key = line.to_lowercase();
        if is_boilerplate(&key, rules) {
            continue;
        }
        if seen.insert(key) {
            kept.push(line);
        }
    }

    normalize_visible(&kept.join("\n"))
}

fn is_boilerplate(lower_line: &str, rules: &ContentRules) -> bool {
    rules
        .boilerplate_lines
        .iter()
        .any(|needle| lower_line.contains(needle.as_str()))
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

//! Repair URLs mangled by copy/paste.
//!
//! Pasted text often arrives with a `URL:` label, spaces injected by line-wrapping,
//! or query strings and tracking parameters split onto their own lines. `normalize`
//! reconstructs one well-formed URL per surviving line. It is a heuristic, not a URL
//! parser: any line containing `=` is treated as a continuation of the previous URL.

use serde::{Deserialize, Serialize};

/// First characters that mark a line as the tail of the previous URL.
const FRAGMENT_LEADS: [char; 7] = ['/', '?', '&', '=', '#', '_', '%'];

/// Tracking-parameter names that commonly end up on their own line.
const FRAGMENT_PREFIXES: [&str; 4] = ["utm", "gad", "gclid", "wbraid"];

/// Bullet/markdown debris left at the end of a pasted URL.
const TRAILING_GARBAGE: [char; 3] = ['#', '\u{2022}', '*'];

pub fn normalize(raw: &str) -> String {
    let mut accepted: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let mut line = strip_url_label(trimmed).to_string();
        if has_http_scheme(&line) {
            line = strip_whitespace(&line);
        }

        let fragment = is_continuation_fragment(&line);
        if fragment {
            line = strip_whitespace(&line);
        }

        match accepted.last_mut() {
            Some(prev) if fragment => prev.push_str(&line),
            _ if !line.contains(char::is_whitespace) && line.contains('.') => accepted.push(line),
            _ => {}
        }
    }

    accepted
        .iter()
        .map(|candidate| polish(candidate))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The URL a request should target: the first line of [`normalize`], if any.
pub fn first_url(raw: &str) -> Option<String> {
    normalize(raw)
        .lines()
        .next()
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizeReport {
    pub cleaned: String,
    /// True when cleaning produced something and it differs from the input.
    pub changed: bool,
}

pub fn normalize_report(raw: &str) -> NormalizeReport {
    let cleaned = normalize(raw);
    let changed = !cleaned.is_empty() && cleaned != raw;
    NormalizeReport { cleaned, changed }
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn has_http_scheme(s: &str) -> bool {
    starts_with_ignore_case(s, "http://") || starts_with_ignore_case(s, "https://")
}

fn strip_url_label(line: &str) -> &str {
    if starts_with_ignore_case(line, "url:") {
        line[4..].trim_start()
    } else {
        line
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_continuation_fragment(line: &str) -> bool {
    line.starts_with(FRAGMENT_LEADS)
        || FRAGMENT_PREFIXES
            .iter()
            .any(|p| starts_with_ignore_case(line, p))
        || line.contains('=')
}

fn polish(candidate: &str) -> String {
    let clean = candidate.trim_end_matches(|c| TRAILING_GARBAGE.contains(&c));
    if has_http_scheme(clean) {
        clean.to_string()
    } else {
        format!("https://{clean}")
    }
}

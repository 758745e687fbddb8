//! Text patterns used to read titles and evidence headings.
//!
//! Grammars:
//!
//! - milestone token: `\b(M\d+(?:\.\d+)?)\b`, e.g. `M4`, `M5.1`
//! - evidence heading: `^##\s+(.+)$`, the captured text is the heading

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Marker that opens an evidence heading line.
pub const HEADING_MARKER: &str = "##";

static MILESTONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(M\d+(?:\.\d+)?)\b").expect("milestone pattern compiles"));

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^##\s+(.+)$").expect("heading pattern compiles"));

/// Every milestone token in `title`, deduplicated and sorted as strings.
///
/// String order puts `M10` before `M2`; consumers rely on that order.
pub fn milestone_tokens(title: &str) -> Vec<String> {
    MILESTONE_RE
        .captures_iter(title)
        .map(|c| c[1].to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Major component of a milestone token (`M5.1` -> `M5`).
pub fn milestone_major(token: &str) -> &str {
    token.split('.').next().unwrap_or(token)
}

/// Heading text of a single line, if the line is an evidence heading.
pub fn parse_heading(line: &str) -> Option<&str> {
    HEADING_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// The literal needle that proves a record has its own heading.
pub fn exact_heading_needle(id: &str) -> String {
    format!("{} {} ", HEADING_MARKER, id)
}

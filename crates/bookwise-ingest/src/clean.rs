//! Deep text cleaning ahead of chunking.
//!
//! An ordered pipeline of pure regex substitutions. Order matters: each
//! step's pattern assumes the normalization performed by the steps before it
//! (tag stripping before entity stripping, whitespace collapse last).

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(p|div|article|section|h[1-6])\s*>").unwrap());
static BR_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static HTML_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static HTML_ENTITIES: Lazy<Regex> = Lazy::new(|| Regex::new(r"&[a-zA-Z0-9]+;").unwrap());
static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]").unwrap());
static LONG_DIGIT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{10,}\b").unwrap());
static LONG_UPPERCASE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{5,}\b").unwrap());
static MULTIPLE_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").unwrap());
static PAGE_NUMBERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(page|trang)\s*\d+").unwrap());
static SENTENCE_PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])\s+([A-ZÁĐÊÔƠƯ])").unwrap());
static SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n").unwrap());
static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Convert block-level structural tags into paragraph break markers.
fn break_block_tags(text: &str) -> String {
    BLOCK_TAGS.replace_all(text, "\n\n").into_owned()
}

/// Convert line-break tags into single newlines.
fn break_br_tags(text: &str) -> String {
    BR_TAGS.replace_all(text, "\n").into_owned()
}

/// Strip any remaining HTML tags.
fn strip_tags(text: &str) -> String {
    HTML_TAGS.replace_all(text, " ").into_owned()
}

/// Strip HTML entities.
fn strip_entities(text: &str) -> String {
    HTML_ENTITIES.replace_all(text, " ").into_owned()
}

/// Replace control characters (except tab/newline) with spaces.
fn strip_control_chars(text: &str) -> String {
    CONTROL_CHARS.replace_all(text, " ").into_owned()
}

/// Drop 10+ digit runs (ISBNs and barcodes, not prose).
fn strip_long_digit_runs(text: &str) -> String {
    LONG_DIGIT_RUNS.replace_all(text, "").into_owned()
}

/// Drop 5+ letter uppercase runs (running headers and scan artifacts).
fn strip_long_uppercase_runs(text: &str) -> String {
    LONG_UPPERCASE_RUNS.replace_all(text, "").into_owned()
}

/// Collapse 3+ periods to a canonical ellipsis.
fn collapse_ellipses(text: &str) -> String {
    MULTIPLE_DOTS.replace_all(text, "...").into_owned()
}

/// Drop "page N" / "trang N" artifacts.
fn strip_page_numbers(text: &str) -> String {
    PAGE_NUMBERS.replace_all(text, "").into_owned()
}

/// Re-insert a paragraph break after sentence-ending punctuation followed by
/// an uppercase letter (Latin or Vietnamese). Recovers paragraph structure
/// lost to whitespace collapsing upstream.
fn reparagraph_sentences(text: &str) -> String {
    SENTENCE_PARAGRAPH
        .replace_all(text, "${1}\n\n${2}")
        .into_owned()
}

/// Collapse runs of spaces/tabs to one space.
fn collapse_spaces(text: &str) -> String {
    SPACE_RUNS.replace_all(text, " ").into_owned()
}

/// Normalize blank lines to clean paragraph separators.
fn collapse_blank_lines(text: &str) -> String {
    BLANK_LINES.replace_all(text, "\n\n").into_owned()
}

/// Cap newline runs at two.
fn collapse_newline_runs(text: &str) -> String {
    NEWLINE_RUNS.replace_all(text, "\n\n").into_owned()
}

/// Deep-clean raw text: strip markup noise, low-value tokens, and normalize
/// whitespace into double-newline paragraph separators.
///
/// Returns `None` for empty input; never fails otherwise.
pub fn clean(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let mut text = break_block_tags(raw);
    text = break_br_tags(&text);
    text = strip_tags(&text);
    text = strip_entities(&text);
    text = strip_control_chars(&text);
    text = strip_long_digit_runs(&text);
    text = strip_long_uppercase_runs(&text);
    text = collapse_ellipses(&text);
    text = strip_page_numbers(&text);
    text = reparagraph_sentences(&text);
    text = collapse_spaces(&text);
    text = collapse_blank_lines(&text);
    text = collapse_newline_runs(&text);

    Some(text.trim().to_string())
}

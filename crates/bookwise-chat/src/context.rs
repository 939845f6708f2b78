//! Prompt context assembly from retrieved chunks.
//!
//! Adjacent chunks deliberately overlap, so independently retrieved chunks
//! from the same source repeat sentences. Grouping by source and
//! sentence-level dedup keep that repetition out of the prompt.

use std::collections::{HashMap, HashSet};

use bookwise_ingest::html::{UNKNOWN_AUTHOR, UNKNOWN_TITLE};
use bookwise_store::VectorRecord;

/// Rendered when retrieval comes back empty.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant information found.";

/// Normalized sentences at or below this length are dropped as noise.
const MIN_SENTENCE_CHARS: usize = 20;

/// Render retrieved chunks into a single prompt-ready context block.
pub fn build_context(records: &[VectorRecord]) -> String {
    if records.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }

    // Group by (title, author) in first-seen order so chunks retrieved
    // independently from the same source merge into one block.
    let mut order: Vec<(String, String)> = Vec::new();
    let mut groups: HashMap<(String, String), Vec<&VectorRecord>> = HashMap::new();
    for record in records {
        let key = (
            record.metadata_str("title").to_string(),
            record.metadata_str("author").to_string(),
        );
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(record);
    }

    order
        .iter()
        .map(|key| format_source_group(key, &groups[key]))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

fn format_source_group((title, author): &(String, String), records: &[&VectorRecord]) -> String {
    let combined = records
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let content = dedup_sentences(&combined);

    let mut block = String::new();
    if !title.is_empty() && title != UNKNOWN_TITLE {
        block.push_str(title);
        if !author.is_empty() && author != UNKNOWN_AUTHOR {
            block.push_str(" - ");
            block.push_str(author);
        }
        block.push('\n');
    }
    block.push_str(&content);
    block
}

/// Keep sentences in first-seen order, comparing on the trimmed, case-folded
/// form. Short fragments are noise and dropped outright.
fn dedup_sentences(content: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();
    let mut retained: Vec<&str> = Vec::new();

    for sentence in content.split(". ") {
        let trimmed = sentence.trim();
        let normalized = trimmed.to_lowercase();
        if normalized.chars().count() > MIN_SENTENCE_CHARS && seen.insert(normalized) {
            retained.push(trimmed);
        }
    }

    retained.join(". ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, title: &str, author: &str) -> VectorRecord {
        VectorRecord {
            text: text.to_string(),
            metadata: serde_json::json!({
                "title": title,
                "author": author,
                "chunkId": 1,
                "chunkIndex": 0,
                "sourceId": "book.html",
            }),
        }
    }

    #[test]
    fn empty_retrieval_renders_the_sentinel() {
        assert_eq!(build_context(&[]), NO_CONTEXT_SENTINEL);
    }

    #[test]
    fn overlapping_chunks_from_one_source_dedup_to_one_sentence() {
        // Overlap carries the tail sentence of one chunk into the head of the
        // next; after grouping, that sentence must appear once.
        let shared = "Khi đọc sách chúng ta học được nhiều điều mới";
        let records = vec![
            record(
                &format!("Mở đầu chương nói về thói quen đọc. {}. ", shared),
                "Sách A",
                "Tác Giả B",
            ),
            record(
                &format!("{}. Chương sau bàn về cách ghi nhớ nội dung", shared),
                "Sách A",
                "Tác Giả B",
            ),
        ];
        let context = build_context(&records);
        assert_eq!(context.matches(shared).count(), 1);
        assert!(context.starts_with("Sách A - Tác Giả B\n"));
        assert!(context.contains("Chương sau bàn về cách ghi nhớ nội dung"));
    }

    #[test]
    fn dedup_comparison_is_case_insensitive_keeping_first_seen() {
        let records = vec![record(
            "This exact sentence repeats verbatim here. THIS EXACT SENTENCE REPEATS VERBATIM HERE. done",
            "T",
            "A",
        )];
        let context = build_context(&records);
        assert!(context.contains("This exact sentence repeats verbatim here"));
        assert!(!context.contains("THIS EXACT SENTENCE"));
    }

    #[test]
    fn short_fragments_are_dropped_as_noise() {
        let records = vec![record(
            "ok. A sentence long enough to be kept in the context. end",
            "T",
            "A",
        )];
        let context = build_context(&records);
        assert!(context.contains("A sentence long enough to be kept in the context"));
        assert!(!context.contains("ok"));
        assert!(!context.contains("end"));
    }

    #[test]
    fn unknown_sentinels_never_render() {
        let records = vec![record(
            "Content from an anonymous source with plenty of length.",
            UNKNOWN_TITLE,
            UNKNOWN_AUTHOR,
        )];
        let context = build_context(&records);
        assert!(!context.contains(UNKNOWN_TITLE));
        assert!(!context.contains(UNKNOWN_AUTHOR));
        assert!(context.starts_with("Content from an anonymous source"));
    }

    #[test]
    fn known_title_with_unknown_author_renders_title_only() {
        let records = vec![record(
            "Some content that is definitely long enough to keep.",
            "Named Book",
            UNKNOWN_AUTHOR,
        )];
        let context = build_context(&records);
        assert!(context.starts_with("Named Book\n"));
        assert!(!context.contains(UNKNOWN_AUTHOR));
    }

    #[test]
    fn distinct_sources_are_separated_in_first_seen_order() {
        let records = vec![
            record("First source sentence with enough characters.", "Book One", "A1"),
            record("Second source sentence with enough characters.", "Book Two", "A2"),
            record("Another first-source sentence with enough characters.", "Book One", "A1"),
        ];
        let context = build_context(&records);
        let blocks: Vec<&str> = context.split("\n---\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("Book One - A1"));
        assert!(blocks[0].contains("Another first-source sentence"));
        assert!(blocks[1].starts_with("Book Two - A2"));
    }
}

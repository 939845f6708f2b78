//! Paragraph-based chunking with overlap and size bounds.
//!
//! Paragraphs are accumulated greedily until the next one would push the
//! buffer past the configured maximum; the buffer is then closed as a chunk
//! and the next buffer is seeded with the tail of the one just closed.
//! Lengths are counted in characters, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use bookwise_core::ChunkingConfig;
use bookwise_store::BookDocument;

use crate::clean::clean;

static PARAGRAPH_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());
static NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n+").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A bounded slice of a document's cleaned text, ready for the vector index.
///
/// Content is pure body text; title/author/source live alongside it so the
/// embedding input is never polluted by metadata.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub content: String,
    pub title: String,
    pub author: String,
    pub doc_id: i64,
    pub chunk_index: usize,
    pub source_key: String,
}

/// Splits cleaned text into chunks along paragraph boundaries.
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk a document's raw text. Cleans first; a document whose cleaned
    /// text falls below the minimum chunk size yields nothing at all.
    pub fn chunk(&self, doc: &BookDocument, raw_text: &str) -> Vec<DocumentChunk> {
        let Some(clean_text) = clean(raw_text) else {
            return Vec::new();
        };
        if clean_text.trim().chars().count() < self.config.min_chunk_size {
            debug!(
                "Document {} too short after cleaning, skipping",
                doc.source_key
            );
            return Vec::new();
        }
        self.accumulate_paragraphs(doc, &clean_text)
    }

    fn accumulate_paragraphs(&self, doc: &BookDocument, clean_text: &str) -> Vec<DocumentChunk> {
        let paragraphs: Vec<&str> = PARAGRAPH_SPLIT
            .split(clean_text)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        debug!("Total paragraphs found: {}", paragraphs.len());

        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_chars = 0usize;
        let mut chunk_index = 0usize;

        for paragraph in paragraphs {
            let paragraph_chars = paragraph.chars().count();

            // Close the buffer before this paragraph would overflow it. The
            // check never fires mid-paragraph, so a single oversized
            // paragraph still becomes one whole chunk.
            let prospective = buffer_chars + paragraph_chars + 1;
            if prospective > self.config.max_chunk_size && buffer_chars > self.config.min_chunk_size
            {
                let closed = buffer.trim().to_string();
                if !closed.is_empty() {
                    chunks.push(self.build_chunk(doc, &closed, chunk_index));
                    chunk_index += 1;
                }

                buffer.clear();
                buffer_chars = 0;
                if self.config.overlap_size > 0 {
                    let overlap = overlap_tail(&closed, self.config.overlap_size);
                    buffer.push_str(overlap);
                    buffer.push(' ');
                    buffer_chars = overlap.chars().count() + 1;
                }
            }

            buffer.push_str(paragraph);
            buffer.push('\n');
            buffer_chars += paragraph_chars + 1;
        }

        let last = buffer.trim();
        if last.chars().count() >= self.config.min_chunk_size {
            chunks.push(self.build_chunk(doc, last, chunk_index));
        }

        chunks
    }

    /// Emit a chunk with single-line-normalized content.
    fn build_chunk(&self, doc: &BookDocument, content: &str, index: usize) -> DocumentChunk {
        let flattened = NEWLINE_RUNS.replace_all(content, " ");
        let flattened = WHITESPACE_RUNS.replace_all(&flattened, " ");

        DocumentChunk {
            content: flattened.trim().to_string(),
            title: doc.title.clone(),
            author: doc.author.clone(),
            doc_id: doc.id,
            chunk_index: index,
            source_key: doc.source_key.clone(),
        }
    }
}

/// Trailing `max_chars` of `text`, pulled forward to the nearest sentence
/// start inside the window, else the nearest word start, else taken verbatim.
fn overlap_tail(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }

    let start = text
        .char_indices()
        .nth(total - max_chars)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let window = &text[start..];

    if let Some(pos) = window.find(". ") {
        if pos > 0 {
            return &window[pos + 2..];
        }
    }
    if let Some(pos) = window.find(' ') {
        if pos > 0 {
            return &window[pos + 1..];
        }
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_doc() -> BookDocument {
        let mut doc = BookDocument::new(
            "book.html",
            "A Title",
            "An Author",
            "",
            "<html></html>",
        );
        doc.id = 7;
        doc
    }

    fn config(max: usize, overlap: usize, min: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chunk_size: max,
            overlap_size: overlap,
            min_chunk_size: min,
        }
    }

    #[test]
    fn short_document_yields_no_chunks() {
        let chunker = Chunker::new(config(500, 50, 100));
        let text = "x".repeat(50);
        assert!(chunker.chunk(&test_doc(), &text).is_empty());
    }

    #[test]
    fn single_paragraph_document_is_one_chunk() {
        let chunker = Chunker::new(config(500, 50, 100));
        let text = "a".repeat(200);
        let chunks = chunker.chunk(&test_doc(), &text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].doc_id, 7);
        assert_eq!(chunks[0].source_key, "book.html");
    }

    #[test]
    fn oversized_paragraph_is_never_split() {
        let chunker = Chunker::new(config(500, 50, 100));
        let text = "b".repeat(2000);
        let chunks = chunker.chunk(&test_doc(), &text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content.chars().count(), 2000);
    }

    #[test]
    fn three_even_paragraphs_close_after_two() {
        // The size check fires between paragraphs only, and a buffer holding
        // a single 300-char paragraph is still under the 350-char minimum, so
        // the first close happens before the third paragraph.
        let chunker = Chunker::new(config(500, 50, 350));
        let p1 = "a".repeat(300);
        let p2 = "b".repeat(300);
        let p3 = "c".repeat(300);
        let text = format!("{}\n\n{}\n\n{}", p1, p2, p3);

        let chunks = chunker.chunk(&test_doc(), &text);
        assert_eq!(chunks.len(), 2);

        // First chunk carries both leading paragraphs, flattened to one line.
        assert_eq!(chunks[0].content, format!("{} {}", p1, p2));

        // Second chunk opens with the 50-char tail of the first, then p3.
        let expected_overlap = "b".repeat(50);
        assert_eq!(chunks[1].content, format!("{} {}", expected_overlap, p3));
    }

    #[test]
    fn chunk_indices_are_sequential_from_zero() {
        let chunker = Chunker::new(config(300, 0, 50));
        let text = (0..8)
            .map(|i| format!("{}", char::from(b'a' + i)).repeat(200))
            .collect::<Vec<_>>()
            .join("\n\n");
        let chunks = chunker.chunk(&test_doc(), &text);
        assert!(chunks.len() > 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
        }
    }

    #[test]
    fn chunk_content_is_single_line() {
        let chunker = Chunker::new(config(1000, 0, 50));
        let text = format!("{}\n\n{}", "a".repeat(200), "b".repeat(200));
        let chunks = chunker.chunk(&test_doc(), &text);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].content.contains('\n'));
        assert!(!chunks[0].content.contains("  "));
    }

    #[test]
    fn overlap_is_drawn_from_previous_chunk_tail() {
        let chunker = Chunker::new(config(400, 80, 100));
        let p1 = format!("{} middle. {}", "a".repeat(150), "b".repeat(150));
        let p2 = "c".repeat(300);
        let text = format!("{}\n\n{}", p1, p2);

        let chunks = chunker.chunk(&test_doc(), &text);
        assert_eq!(chunks.len(), 2);

        // Whatever the boundary adjustment chose, the seed must be a suffix
        // of the first chunk's content.
        let seed = chunks[1]
            .content
            .split(&p2)
            .next()
            .unwrap()
            .trim();
        assert!(!seed.is_empty());
        assert!(chunks[0].content.ends_with(seed));
        assert!(seed.chars().count() <= 80);
    }

    #[test]
    fn overlap_window_prefers_sentence_boundary() {
        // Window of 20 over "...xxxx. yyyyyyyy" starts mid-x; the first
        // ". " inside it pulls the seed forward to the y-run.
        let text = format!("{}. {}", "x".repeat(30), "y".repeat(10));
        let tail = overlap_tail(&text, 20);
        assert_eq!(tail, "y".repeat(10));
    }

    #[test]
    fn overlap_window_falls_back_to_word_boundary() {
        let text = format!("{} {}", "x".repeat(30), "y".repeat(10));
        let tail = overlap_tail(&text, 20);
        assert_eq!(tail, "y".repeat(10));
    }

    #[test]
    fn overlap_window_verbatim_when_unbroken() {
        let text = "z".repeat(40);
        let tail = overlap_tail(&text, 15);
        assert_eq!(tail, "z".repeat(15));
    }

    #[test]
    fn overlap_respects_multibyte_boundaries() {
        let text = "câu văn dài ".repeat(10);
        let tail = overlap_tail(text.trim(), 25);
        assert!(tail.chars().count() <= 25);
        assert!(text.contains(tail));
    }

    #[test]
    fn trailing_buffer_below_minimum_is_dropped() {
        let chunker = Chunker::new(config(300, 0, 100));
        // Second paragraph alone is below the minimum once the first chunk
        // closes, so only one chunk is emitted.
        let text = format!("{}\n\n{}", "a".repeat(250), "b".repeat(60));
        let chunks = chunker.chunk(&test_doc(), &text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "a".repeat(250));
    }
}

//! Document ingestion pipeline: html → metadata → clean text → chunks →
//! vector index.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use bookwise_core::{ChunkingConfig, Result};
use bookwise_store::{BookDocument, BookStore, VectorIndex, VectorRecord};

use crate::chunking::{Chunker, DocumentChunk};
use crate::html::{HtmlExtractor, ImageTextExtractor};

/// Upstream request-size limit: never more records than this per call.
const MAX_BATCH_SIZE: usize = 100;
/// Records above this rendered size blow the embedding token budget and are
/// dropped rather than retried.
const MAX_RECORD_CHARS: usize = 15_000;
const SUBMIT_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 500;

/// Coordinates extraction, cleaning, chunking, and vector submission for one
/// document at a time.
pub struct Ingester {
    store: Arc<BookStore>,
    index: Arc<dyn VectorIndex>,
    extractor: HtmlExtractor,
    chunker: Chunker,
}

impl Ingester {
    pub fn new(
        store: Arc<BookStore>,
        index: Arc<dyn VectorIndex>,
        ocr: Arc<dyn ImageTextExtractor>,
        chunking: ChunkingConfig,
    ) -> Self {
        Self {
            store,
            index,
            extractor: HtmlExtractor::new(ocr),
            chunker: Chunker::new(chunking),
        }
    }

    /// Ingest one document. Fire-and-forget: every failure is logged here and
    /// swallowed so a malformed document can never abort a batch upload loop.
    pub async fn ingest(&self, html: &str, source_key: &str) {
        if let Err(e) = self.ingest_document(html, source_key).await {
            error!("Failed to ingest {}: {}", source_key, e);
        }
    }

    async fn ingest_document(&self, html: &str, source_key: &str) -> Result<()> {
        info!("Starting ingestion for document: {}", source_key);

        let parsed = HtmlExtractor::parse_metadata(html, source_key);

        let doc = match self.store.find_by_source_key(source_key)? {
            Some(mut existing) => {
                info!("Document already exists, updating: {}", source_key);
                existing.title = parsed.title;
                existing.author = parsed.author;
                existing.outline = parsed.outline;
                existing.html_content = html.to_string();
                let saved = self.store.save(&existing)?;

                // Clear the previous chunk set so re-ingestion replaces
                // vectors instead of accumulating stale ones.
                if let Err(e) = self.index.delete_by_source(source_key).await {
                    warn!("Could not clear previous vectors for {}: {}", source_key, e);
                }
                saved
            }
            None => {
                let saved = self.store.save(&parsed)?;
                info!("Saved document {} with id {}", source_key, saved.id);
                saved
            }
        };

        self.submit_chunks(&doc, html).await;
        info!("Successfully ingested document: {} by {}", source_key, doc.author);
        Ok(())
    }

    /// Extract, chunk, and push everything to the vector index in bounded
    /// batches. Submission failures cost at most one batch each.
    async fn submit_chunks(&self, doc: &BookDocument, html: &str) {
        let clean_text = self.extractor.extract_clean_text(html).await;
        info!(
            "Extracted clean text length: {} characters",
            clean_text.chars().count()
        );

        let chunks = self.chunker.chunk(doc, &clean_text);
        info!("Created {} chunks for document id {}", chunks.len(), doc.id);
        if chunks.is_empty() {
            return;
        }

        for batch in chunks.chunks(MAX_BATCH_SIZE) {
            let records: Vec<VectorRecord> = batch
                .iter()
                .filter(|chunk| chunk.content.chars().count() < MAX_RECORD_CHARS)
                .map(chunk_to_record)
                .collect();
            if records.is_empty() {
                continue;
            }

            match self.submit_batch(&records).await {
                Ok(()) => {
                    info!(
                        "{} added {} records to the vector index",
                        doc.source_key,
                        records.len()
                    );
                }
                Err(e) => {
                    error!(
                        "Dropping batch of {} records for {}: {}",
                        records.len(),
                        doc.source_key,
                        e
                    );
                }
            }
        }
    }

    async fn submit_batch(&self, records: &[VectorRecord]) -> Result<()> {
        let mut attempt = 1u32;
        loop {
            match self.index.add_batch(records).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < SUBMIT_ATTEMPTS => {
                    warn!("Batch submission attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64))
                        .await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn chunk_to_record(chunk: &DocumentChunk) -> VectorRecord {
    VectorRecord {
        text: chunk.content.clone(),
        metadata: serde_json::json!({
            "title": chunk.title,
            "author": chunk.author,
            "chunkId": chunk.doc_id,
            "chunkIndex": chunk.chunk_index,
            "sourceId": chunk.source_key,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::html::NoopImageTextExtractor;
    use bookwise_core::Error;

    /// In-memory index that records operation order and can fail on demand.
    #[derive(Default)]
    struct FakeIndex {
        ops: Mutex<Vec<String>>,
        batches: Mutex<Vec<Vec<VectorRecord>>>,
        fail_adds: Mutex<u32>,
    }

    #[async_trait]
    impl VectorIndex for FakeIndex {
        async fn add_batch(&self, records: &[VectorRecord]) -> bookwise_core::Result<()> {
            {
                let mut remaining = self.fail_adds.lock();
                if *remaining > 0 {
                    *remaining -= 1;
                    self.ops.lock().push("add_failed".into());
                    return Err(Error::VectorIndex("injected".into()));
                }
            }
            self.ops.lock().push("add".into());
            self.batches.lock().push(records.to_vec());
            Ok(())
        }

        async fn search(&self, _query: &str) -> bookwise_core::Result<Vec<VectorRecord>> {
            Ok(Vec::new())
        }

        async fn delete_by_source(&self, source_key: &str) -> bookwise_core::Result<()> {
            self.ops.lock().push(format!("delete:{}", source_key));
            Ok(())
        }
    }

    fn build_ingester(dir: &std::path::Path, index: Arc<FakeIndex>) -> Ingester {
        let store = Arc::new(BookStore::open(dir).unwrap());
        Ingester::new(
            store,
            index,
            Arc::new(NoopImageTextExtractor),
            ChunkingConfig {
                max_chunk_size: 500,
                overlap_size: 50,
                min_chunk_size: 40,
            },
        )
    }

    fn book_html(body: &str) -> String {
        format!(
            "<html><body><h1>Thinking Fast</h1>\
             <div class=\"author\">By: Daniel K</div><p>{}</p></body></html>",
            body
        )
    }

    #[tokio::test]
    async fn first_ingestion_creates_document_and_submits_records() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(FakeIndex::default());
        let ingester = build_ingester(dir.path(), index.clone());

        let body = "An idea worth keeping around for testing purposes. ".repeat(5);
        ingester.ingest(&book_html(&body), "fast.html").await;

        let store = BookStore::open(dir.path()).unwrap();
        let doc = store.find_by_source_key("fast.html").unwrap().unwrap();
        assert_eq!(doc.title, "Thinking Fast");
        assert_eq!(doc.author, "Daniel K");

        let batches = index.batches.lock();
        assert_eq!(batches.len(), 1);
        let record = &batches[0][0];
        assert_eq!(record.metadata_str("title"), "Thinking Fast");
        assert_eq!(record.metadata_str("author"), "Daniel K");
        assert_eq!(record.metadata_str("sourceId"), "fast.html");
        assert_eq!(record.metadata["chunkId"], serde_json::json!(doc.id));
        assert_eq!(record.metadata["chunkIndex"], serde_json::json!(0));
    }

    #[tokio::test]
    async fn reingestion_clears_old_vectors_before_adding() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(FakeIndex::default());
        let ingester = build_ingester(dir.path(), index.clone());

        let body = "Some repeated sentence for volume in this document. ".repeat(5);
        ingester.ingest(&book_html(&body), "fast.html").await;
        ingester.ingest(&book_html(&body), "fast.html").await;

        let ops = index.ops.lock();
        assert_eq!(
            *ops,
            vec![
                "add".to_string(),
                "delete:fast.html".to_string(),
                "add".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn undersized_document_is_a_clean_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(FakeIndex::default());
        let ingester = build_ingester(dir.path(), index.clone());

        ingester.ingest(&book_html("tiny"), "tiny.html").await;

        // Document row exists, but nothing reached the index.
        let store = BookStore::open(dir.path()).unwrap();
        assert!(store.find_by_source_key("tiny.html").unwrap().is_some());
        assert!(index.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn oversized_records_are_dropped_before_submission() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(FakeIndex::default());
        let ingester = build_ingester(dir.path(), index.clone());

        // One paragraph far beyond the record ceiling becomes a single
        // oversized chunk, which must be filtered out, not submitted.
        let body = "w".repeat(16_000);
        ingester.ingest(&book_html(&body), "huge.html").await;

        assert!(index.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn transient_index_failures_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(FakeIndex::default());
        *index.fail_adds.lock() = 2;
        let ingester = build_ingester(dir.path(), index.clone());

        let body = "Retryable content with enough length to clear minimums. ".repeat(3);
        ingester.ingest(&book_html(&body), "retry.html").await;

        let ops = index.ops.lock();
        assert_eq!(
            *ops,
            vec![
                "add_failed".to_string(),
                "add_failed".to_string(),
                "add".to_string(),
            ]
        );
        assert_eq!(index.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn malformed_html_never_panics_or_errors_out() {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(FakeIndex::default());
        let ingester = build_ingester(dir.path(), index.clone());

        ingester.ingest("<<<<not really html &&& <p", "junk.html").await;

        let store = BookStore::open(dir.path()).unwrap();
        let doc = store.find_by_source_key("junk.html").unwrap().unwrap();
        assert_eq!(doc.title, crate::html::UNKNOWN_TITLE);
        assert_eq!(doc.author, crate::html::UNKNOWN_AUTHOR);
    }
}

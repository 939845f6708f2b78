//! Shared application state.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use bookwise_chat::{ChatEngine, LLMConfig};
use bookwise_core::AppConfig;
use bookwise_ingest::{ImageTextExtractor, Ingester};
use bookwise_store::{BookStore, VectorIndex};

/// One queued ingestion job. The HTTP response never waits on these.
pub struct IngestRequest {
    pub job_id: String,
    pub source_key: String,
    pub html: String,
}

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<BookStore>,
    pub ingester: Arc<Ingester>,
    pub chat_engine: ChatEngine,
    pub ingest_tx: mpsc::UnboundedSender<IngestRequest>,
    ingest_rx: Mutex<Option<mpsc::UnboundedReceiver<IngestRequest>>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<BookStore>,
        index: Arc<dyn VectorIndex>,
        ocr: Arc<dyn ImageTextExtractor>,
        llm: LLMConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();

        let ingester = Arc::new(Ingester::new(
            store.clone(),
            index.clone(),
            ocr,
            config.chunking,
        ));
        let chat_engine = ChatEngine::new(index, llm);

        Self {
            config,
            store,
            ingester,
            chat_engine,
            ingest_tx: tx,
            ingest_rx: Mutex::new(Some(rx)),
        }
    }

    /// Take the ingestion receiver (can only be called once, by the worker).
    pub fn take_ingest_rx(&self) -> Option<mpsc::UnboundedReceiver<IngestRequest>> {
        self.ingest_rx.lock().take()
    }
}

//! Bookwise — HTML book ingestion and grounded question answering server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;
mod worker;

use state::AppState;

use bookwise_chat::{LLMConfig, VisionOcr};
use bookwise_core::AppConfig;
use bookwise_ingest::{ImageTextExtractor, NoopImageTextExtractor};
use bookwise_store::{BookStore, HttpVectorIndex, VectorIndex};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let data_dir = std::env::var("BOOKWISE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"));
    info!("Data directory: {}", data_dir.display());

    let config = AppConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = Arc::new(BookStore::open(&config.data_dir)?);
    let index: Arc<dyn VectorIndex> =
        Arc::new(HttpVectorIndex::new(config.vector_index_url.clone()));

    let llm = LLMConfig::from_env();

    // Image text extraction rides on an OpenAI vision model; without a key it
    // quietly reads nothing.
    let ocr: Arc<dyn ImageTextExtractor> = match llm.openai_api_key.clone() {
        Some(key) => Arc::new(VisionOcr::new(key, llm.ocr_model.clone())),
        None => Arc::new(NoopImageTextExtractor),
    };

    let state = Arc::new(AppState::new(config, store, index, ocr, llm));

    worker::start_ingest_worker(state.clone());

    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Bookwise server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

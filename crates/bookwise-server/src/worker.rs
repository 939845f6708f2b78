//! Background ingestion worker — drains the upload queue one document at a
//! time so request handlers stay fire-and-forget.

use std::sync::Arc;

use tracing::{error, info};

use crate::state::AppState;

/// Start the background ingestion worker task.
pub fn start_ingest_worker(state: Arc<AppState>) {
    let mut rx = match state.take_ingest_rx() {
        Some(rx) => rx,
        None => {
            error!("Ingestion worker already started");
            return;
        }
    };

    tokio::spawn(async move {
        info!("Background ingestion worker started");
        while let Some(request) = rx.recv().await {
            info!(
                "Processing ingestion job {}: {}",
                request.job_id, request.source_key
            );
            // Ingestion logs and swallows its own failures; one bad document
            // never stops the queue.
            state
                .ingester
                .ingest(&request.html, &request.source_key)
                .await;
        }
    });
}

//! Ingestion routes — raw text and file/zip upload.
//!
//! Both endpoints only validate and enqueue; the actual pipeline runs on the
//! background worker and its failures never reach these handlers.

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::state::{AppState, IngestRequest};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ingest/text", post(ingest_text))
        .route("/ingest/file", post(ingest_file))
}

/// POST /ingest/text — ingest one HTML document passed as JSON.
#[derive(Debug, Deserialize)]
pub struct IngestTextRequest {
    pub content: String,
    pub name: String,
}

async fn ingest_text(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestTextRequest>,
) -> impl IntoResponse {
    let start = Instant::now();

    if request.content.trim().is_empty() || request.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "content and name are required" })),
        );
    }

    enqueue(&state, request.content, request.name);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Ingestion accepted",
            "queued": 1,
            "processingTimeMs": start.elapsed().as_millis() as u64,
        })),
    )
}

/// POST /ingest/file — multipart upload of .html/.htm files or a .zip of
/// them. Every qualifying document is queued independently.
async fn ingest_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let start = Instant::now();
    let mut queued = 0usize;
    let mut skipped = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read upload field {}: {}", filename, e);
                skipped.push(filename);
                continue;
            }
        };

        if filename.ends_with(".html") || filename.ends_with(".htm") {
            let html = String::from_utf8_lossy(&bytes).to_string();
            enqueue(&state, html, flatten_file_name(&filename));
            queued += 1;
        } else if filename.ends_with(".zip") {
            queued += enqueue_zip_entries(&state, &bytes);
        } else {
            skipped.push(filename);
        }
    }

    if queued == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "Expected .html, .htm, or .zip files",
                "skipped": skipped,
            })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Ingestion accepted",
            "queued": queued,
            "skipped": skipped,
            "processingTimeMs": start.elapsed().as_millis() as u64,
        })),
    )
}

/// Queue every `.html` entry of a zip archive as its own document.
fn enqueue_zip_entries(state: &AppState, bytes: &[u8]) -> usize {
    let reader = std::io::Cursor::new(bytes.to_vec());
    let mut archive = match zip::ZipArchive::new(reader) {
        Ok(archive) => archive,
        Err(e) => {
            error!("Rejecting unreadable zip upload: {}", e);
            return 0;
        }
    };

    let mut queued = 0usize;
    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping zip entry {}: {}", i, e);
                continue;
            }
        };
        if entry.is_dir() || !entry.name().ends_with(".html") {
            continue;
        }

        let mut html = String::new();
        if entry.read_to_string(&mut html).is_err() {
            warn!("Skipping unreadable zip entry {}", entry.name());
            continue;
        }

        let source_key = flatten_file_name(entry.name());
        enqueue(state, html, source_key);
        queued += 1;
    }
    queued
}

fn enqueue(state: &AppState, html: String, source_key: String) {
    let job_id = uuid::Uuid::new_v4().to_string();
    let request = IngestRequest {
        job_id: job_id.clone(),
        source_key: source_key.clone(),
        html,
    };
    if state.ingest_tx.send(request).is_err() {
        error!("Ingestion queue closed, dropping {}", source_key);
    } else {
        info!("Queued ingestion job {} for {}", job_id, source_key);
    }
}

/// Reduce an upload or archive-entry path to a flat stable source key.
pub fn flatten_file_name(path: &str) -> String {
    let name = std::path::Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    name.replace(['/', '\\'], "_")
}

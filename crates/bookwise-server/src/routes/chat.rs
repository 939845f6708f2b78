//! Chat route — grounded question answering.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use bookwise_chat::ChatRequest;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

/// POST /chat — answer a question against the ingested books.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    if request.question.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "question must not be empty" })),
        )
            .into_response();
    }

    let response = state.chat_engine.chat(&request.question).await;
    (StatusCode::OK, Json(response)).into_response()
}

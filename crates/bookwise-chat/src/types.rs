//! Chat types for the question-answering surface.

use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    OpenAI,
    Anthropic,
    Groq,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// A single prompt message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Incoming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

/// Chat response payload.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub question: String,
    pub response: String,
    #[serde(rename = "processingTimeMs")]
    pub processing_time_ms: u64,
}

//! Bookwise Chat — retrieval-context assembly and LLM provider calls.

pub mod config;
pub mod context;
pub mod engine;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use context::{build_context, NO_CONTEXT_SENTINEL};
pub use engine::ChatEngine;
pub use providers::VisionOcr;
pub use types::{ChatMessage, ChatRequest, ChatResponse, LLMProvider};

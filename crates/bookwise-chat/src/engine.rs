//! RAG chat engine: retrieve, assemble context, prompt, answer.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use bookwise_core::{Error, Result};
use bookwise_store::VectorIndex;

use crate::config::LLMConfig;
use crate::context::build_context;
use crate::providers;
use crate::types::{ChatMessage, ChatResponse};

const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are an assistant answering questions from the contents of a book library.

Guidelines:
- Use the provided context to answer accurately and helpfully
- Say clearly when the context is not enough for a complete answer
- Cite book title and author when possible
- When several sources apply, synthesize them coherently

Context from the books:
{context}

User question: {question}

Answer:";

/// Returned when the provider call fails; the caller never sees an error.
pub const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while answering your question. Please try again later.";

/// Answers questions against the vector index.
pub struct ChatEngine {
    index: Arc<dyn VectorIndex>,
    llm: LLMConfig,
    client: reqwest::Client,
}

impl ChatEngine {
    pub fn new(index: Arc<dyn VectorIndex>, llm: LLMConfig) -> Self {
        Self {
            index,
            llm,
            client: reqwest::Client::new(),
        }
    }

    /// Answer a question, timing the full retrieval + completion round trip.
    pub async fn chat(&self, question: &str) -> ChatResponse {
        let start = Instant::now();
        let response = self.answer(question).await;
        ChatResponse {
            question: question.to_string(),
            response,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Answer a question. Provider failures degrade to a fixed apology rather
    /// than surfacing an error.
    pub async fn answer(&self, question: &str) -> String {
        match self.try_answer(question).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error answering question: {}", e);
                FALLBACK_ANSWER.to_string()
            }
        }
    }

    async fn try_answer(&self, question: &str) -> Result<String> {
        info!("Processing question: {}", question);

        let hits = self.index.search(question).await?;
        info!("Found {} relevant chunks", hits.len());

        let context = build_context(&hits);
        let prompt = SYSTEM_PROMPT_TEMPLATE
            .replace("{context}", &context)
            .replace("{question}", question);

        let (provider, model, api_key) = self
            .llm
            .resolve_provider()
            .ok_or_else(|| Error::Llm("No LLM provider configured".to_string()))?;

        let messages = vec![ChatMessage {
            role: "user".into(),
            content: prompt,
        }];
        let answer =
            providers::complete(&self.client, provider, messages, &model, &api_key, 0.7, 2048)
                .await?;

        info!("Generated answer length: {} characters", answer.chars().count());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use bookwise_store::VectorRecord;

    struct EmptyIndex;

    #[async_trait]
    impl VectorIndex for EmptyIndex {
        async fn add_batch(&self, _records: &[VectorRecord]) -> bookwise_core::Result<()> {
            Ok(())
        }
        async fn search(&self, _query: &str) -> bookwise_core::Result<Vec<VectorRecord>> {
            Ok(Vec::new())
        }
        async fn delete_by_source(&self, _source_key: &str) -> bookwise_core::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_provider_degrades_to_fallback_answer() {
        let engine = ChatEngine::new(Arc::new(EmptyIndex), LLMConfig::default());
        let response = engine.chat("what is this book about?").await;
        assert_eq!(response.response, FALLBACK_ANSWER);
        assert_eq!(response.question, "what is this book about?");
    }
}

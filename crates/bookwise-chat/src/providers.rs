//! External LLM provider calls.
//!
//! OpenAI and Groq share the chat-completions format; Anthropic uses its
//! Messages API. All calls here are plain request/response.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error};

use bookwise_core::{Error, Result};
use bookwise_ingest::html::ImageTextExtractor;

use crate::types::{ChatMessage, LLMProvider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Request a completion from the given provider.
pub async fn complete(
    client: &Client,
    provider: LLMProvider,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    temperature: f64,
    max_tokens: usize,
) -> Result<String> {
    match provider {
        LLMProvider::OpenAI => {
            complete_openai_compat(client, OPENAI_URL, messages, model, api_key, temperature, max_tokens)
                .await
        }
        LLMProvider::Groq => {
            complete_openai_compat(client, GROQ_URL, messages, model, api_key, temperature, max_tokens)
                .await
        }
        LLMProvider::Anthropic => {
            complete_anthropic(client, messages, model, api_key, temperature, max_tokens).await
        }
    }
}

async fn complete_openai_compat(
    client: &Client,
    url: &str,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    temperature: f64,
    max_tokens: usize,
) -> Result<String> {
    let msgs: Vec<serde_json::Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let body = json!({
        "model": model,
        "messages": msgs,
        "temperature": temperature,
        "max_tokens": max_tokens,
    });

    debug!("Completion request to {} with model {}", url, model);

    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Llm(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Llm(format!("API error {}: {}", status, body)));
    }

    let parsed: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::Llm(format!("Malformed response: {}", e)))?;

    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Llm("Response carried no message content".to_string()))
}

async fn complete_anthropic(
    client: &Client,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    temperature: f64,
    max_tokens: usize,
) -> Result<String> {
    // Separate the system message from the conversation.
    let system_msg: Option<String> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.clone());

    let conv_msgs: Vec<serde_json::Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": conv_msgs,
        "temperature": temperature,
        "max_tokens": max_tokens,
    });
    if let Some(sys) = system_msg {
        body["system"] = json!(sys);
    }

    debug!("Completion request to Anthropic with model {}", model);

    let response = client
        .post(ANTHROPIC_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Llm(format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Llm(format!("API error {}: {}", status, body)));
    }

    let parsed: serde_json::Value = response
        .json()
        .await
        .map_err(|e| Error::Llm(format!("Malformed response: {}", e)))?;

    parsed["content"][0]["text"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| Error::Llm("Response carried no text content".to_string()))
}

/// Image text extraction backed by an OpenAI-compatible vision model.
///
/// Failures of any kind degrade to an empty string; extraction is strictly
/// best-effort and must never abort document ingestion.
pub struct VisionOcr {
    client: Client,
    api_key: String,
    model: String,
}

impl VisionOcr {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    async fn request_text(&self, image_url: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    {
                        "type": "text",
                        "text": "Extract all readable text from this image. Return plain text only.",
                    },
                    {
                        "type": "image_url",
                        "image_url": { "url": image_url },
                    },
                ],
            }],
            "max_tokens": 1024,
        });

        let response = self
            .client
            .post(OPENAI_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!("API error {}: {}", status, body)));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Malformed response: {}", e)))?;

        Ok(parsed["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string())
    }
}

#[async_trait]
impl ImageTextExtractor for VisionOcr {
    async fn extract_text(&self, image_url: &str) -> String {
        match self.request_text(image_url).await {
            Ok(text) => text,
            Err(e) => {
                error!("Image text extraction failed for {}: {}", image_url, e);
                String::new()
            }
        }
    }
}

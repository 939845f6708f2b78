//! LLM provider selection from environment configuration.

use serde::{Deserialize, Serialize};

use crate::types::LLMProvider;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
/// Vision model used for image text extraction.
pub const DEFAULT_OCR_MODEL: &str = "gpt-4o";

/// Stored LLM configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    pub preferred_provider: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_model: String,
    pub anthropic_model: String,
    pub groq_model: String,
    pub ocr_model: String,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            preferred_provider: "auto".into(),
            openai_api_key: None,
            anthropic_api_key: None,
            groq_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.into(),
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.into(),
            groq_model: DEFAULT_GROQ_MODEL.into(),
            ocr_model: DEFAULT_OCR_MODEL.into(),
        }
    }
}

impl LLMConfig {
    /// Build from environment variables, with defaults for models.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(p) = std::env::var("BOOKWISE_LLM_PROVIDER") {
            config.preferred_provider = p;
        }
        config.openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        config.anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        config.groq_api_key = std::env::var("GROQ_API_KEY").ok();
        if let Ok(m) = std::env::var("BOOKWISE_OPENAI_MODEL") {
            config.openai_model = m;
        }
        if let Ok(m) = std::env::var("BOOKWISE_ANTHROPIC_MODEL") {
            config.anthropic_model = m;
        }
        if let Ok(m) = std::env::var("BOOKWISE_GROQ_MODEL") {
            config.groq_model = m;
        }
        if let Ok(m) = std::env::var("BOOKWISE_OCR_MODEL") {
            config.ocr_model = m;
        }
        config
    }

    /// Resolve which provider, model, and key to use.
    pub fn resolve_provider(&self) -> Option<(LLMProvider, String, String)> {
        if self.preferred_provider != "auto" {
            return match self.preferred_provider.as_str() {
                "openai" => self
                    .openai_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::OpenAI, self.openai_model.clone(), k.clone())),
                "anthropic" => self
                    .anthropic_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::Anthropic, self.anthropic_model.clone(), k.clone())),
                "groq" => self
                    .groq_api_key
                    .as_ref()
                    .map(|k| (LLMProvider::Groq, self.groq_model.clone(), k.clone())),
                _ => None,
            };
        }

        // Auto mode: Anthropic > Groq > OpenAI
        if let Some(k) = &self.anthropic_api_key {
            return Some((LLMProvider::Anthropic, self.anthropic_model.clone(), k.clone()));
        }
        if let Some(k) = &self.groq_api_key {
            return Some((LLMProvider::Groq, self.groq_model.clone(), k.clone()));
        }
        if let Some(k) = &self.openai_api_key {
            return Some((LLMProvider::OpenAI, self.openai_model.clone(), k.clone()));
        }

        None
    }
}

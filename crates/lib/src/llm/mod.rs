//! Remote generation backend: the hosted `generate-copy` function that proxies to the
//! language model.
//!
//! The chat core only sees the [`Generator`] trait; [`GenerateCopyClient`] is the HTTP
//! implementation used in production.

mod generate_copy;

pub use generate_copy::GenerateCopyClient;

use crate::conversation::Role;
use crate::templates::TemplateId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Token budget sent when nothing else is configured.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// One history entry as sent upstream (role + content only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Request body for `POST /functions/v1/generate-copy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub prompt: String,
    #[serde(rename = "gptType")]
    pub template: TemplateId,
    pub max_tokens: u32,
    pub conversation_history: Vec<ChatMessage>,
    /// Client whose reference files the backend should search.
    #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Which upstream API answered (e.g. "responses" or "chat-completions-fallback").
    #[serde(rename = "api", default, skip_serializing_if = "Option::is_none")]
    pub api_variant: Option<String>,
}

impl GenerateResponse {
    /// Convenience constructor for a successful reply.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
            usage: None,
            api_variant: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("generate-copy request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("generate-copy api error: {0}")]
    Api(String),
    #[error("generate-copy not configured: {0}")]
    NotConfigured(&'static str),
}

/// Anything that can turn a [`GenerateRequest`] into generated text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

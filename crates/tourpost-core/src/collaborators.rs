//! Narrow interfaces to the hosted services the generators depend on.
//!
//! Implementations that talk to real endpoints live in the server crate;
//! everything in this crate only sees these traits, so the resolver and the
//! pipelines run without network access.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub content: String,
    /// Model that answered, as reported by the endpoint.
    pub model: String,
}

/// Generate text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion>;

    /// Configured model; reported when a completion does not name one.
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub url: String,
}

/// Generate an image from a prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// Search the web for a query.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}

/// Render hits as the `snippet: ..., title: ..., link: ...` text blocks the
/// link-extraction prompt reads.
pub fn render_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|h| {
            format!(
                "[snippet: {}, title: {}, link: {}]",
                h.snippet.trim(),
                h.title.trim(),
                h.url.trim()
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

//! reqwest-backed implementations of the core collaborator traits.

mod chat;
mod image;
mod search;

pub use chat::OpenAiChat;
pub use image::ReplicateImage;
pub use search::DuckDuckGoSearch;

use crate::config::TourpostConfig;
use std::sync::Arc;
use std::time::Duration;
use tourpost_core::{ImageGenerator, TextGenerator, WebSearch};

/// The hosted services the pipelines talk to.
#[derive(Clone)]
pub struct Backends {
    pub text: Arc<dyn TextGenerator>,
    pub images: Arc<dyn ImageGenerator>,
    pub search: Arc<dyn WebSearch>,
}

impl Backends {
    pub fn from_config(config: &TourpostConfig) -> anyhow::Result<Self> {
        Ok(Self {
            text: Arc::new(OpenAiChat::new(&config.chat)?),
            images: Arc::new(ReplicateImage::new(&config.image)?),
            search: Arc::new(DuckDuckGoSearch::new(&config.search)?),
        })
    }
}

pub(crate) fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("tourpost/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// First `limit` characters of an error body, for log and error messages.
pub(crate) fn excerpt(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        assert_eq!(excerpt("  short  ", 10), "short");
        assert_eq!(excerpt("ééééé", 3), "ééé…");
    }
}

use super::{excerpt, http_client};
use crate::config::ImageConfig;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tourpost_core::{GeneratedImage, ImageGenerator, Result, TourpostError};
use tracing::debug;

const SERVICE: &str = "image";
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Replicate predictions API. Asks the server to hold the request open until
/// the prediction finishes (`Prefer: wait`) and polls if it has not.
pub struct ReplicateImage {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_token: Option<String>,
    max_polls: u64,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }

    /// Models return either a single URL or a list of them.
    fn first_url(&self) -> Option<String> {
        match &self.output {
            Value::String(url) => Some(url.clone()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str().map(str::to_string)),
            _ => None,
        }
    }

    fn into_image(self) -> Result<GeneratedImage> {
        if self.status != "succeeded" {
            let reason = match &self.error {
                Some(Value::String(e)) => e.clone(),
                Some(other) => other.to_string(),
                None => format!("prediction {}", self.status),
            };
            return Err(TourpostError::upstream(SERVICE, reason));
        }
        self.first_url()
            .map(|url| GeneratedImage { url })
            .ok_or_else(|| TourpostError::upstream(SERVICE, "prediction succeeded without an output URL"))
    }
}

impl ReplicateImage {
    pub fn new(config: &ImageConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_token: config.api_token.clone(),
            max_polls: config.timeout_secs.max(1),
        })
    }

    async fn read(&self, req: reqwest::RequestBuilder) -> Result<Prediction> {
        let resp = req
            .send()
            .await
            .map_err(|e| TourpostError::upstream(SERVICE, e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TourpostError::upstream(
                SERVICE,
                format!("{} {}", status, excerpt(&text, 300)),
            ));
        }
        resp.json()
            .await
            .map_err(|e| TourpostError::upstream(SERVICE, format!("unreadable prediction: {}", e)))
    }
}

#[async_trait]
impl ImageGenerator for ReplicateImage {
    async fn generate(&self, prompt: &str) -> Result<GeneratedImage> {
        let Some(token) = &self.api_token else {
            return Err(TourpostError::upstream(
                SERVICE,
                "image API token is not configured (REPLICATE_API_TOKEN)",
            ));
        };

        let url = format!("{}/models/{}/predictions", self.api_base, self.model);
        let mut prediction = self
            .read(
                self.client
                    .post(&url)
                    .bearer_auth(token)
                    .header("Prefer", "wait")
                    .json(&json!({ "input": { "prompt": prompt } })),
            )
            .await?;

        let mut polls = 0;
        while !prediction.is_terminal() {
            let Some(poll_url) = prediction.urls.as_ref().and_then(|u| u.get.clone()) else {
                return Err(TourpostError::upstream(
                    SERVICE,
                    format!("prediction {} with no status URL", prediction.status),
                ));
            };
            if polls >= self.max_polls {
                return Err(TourpostError::upstream(SERVICE, "prediction timed out"));
            }
            polls += 1;
            debug!(status = %prediction.status, polls, "waiting for image prediction");
            tokio::time::sleep(POLL_INTERVAL).await;
            prediction = self.read(self.client.get(&poll_url).bearer_auth(token)).await?;
        }

        prediction.into_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Prediction {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn succeeded_prediction_yields_first_url() {
        let p = parse(r#"{ "status": "succeeded", "output": ["https://r.test/a.webp", "https://r.test/b.webp"] }"#);
        assert_eq!(p.into_image().unwrap().url, "https://r.test/a.webp");

        let p = parse(r#"{ "status": "succeeded", "output": "https://r.test/one.png" }"#);
        assert_eq!(p.into_image().unwrap().url, "https://r.test/one.png");
    }

    #[test]
    fn failed_prediction_is_upstream_error() {
        let p = parse(r#"{ "status": "failed", "error": "NSFW content detected" }"#);
        let err = p.into_image().unwrap_err();
        assert!(err.is_upstream_error());
        assert!(err.to_string().contains("NSFW"));

        let p = parse(r#"{ "status": "succeeded", "output": null }"#);
        assert!(p.into_image().is_err());
    }

    #[test]
    fn pending_prediction_is_not_terminal() {
        let p = parse(r#"{ "status": "processing", "urls": { "get": "https://api.replicate.com/v1/predictions/abc" } }"#);
        assert!(!p.is_terminal());
        assert!(p.urls.unwrap().get.is_some());
    }
}

use super::{excerpt, http_client};
use crate::config::ChatConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tourpost_core::{ChatCompletion, ChatMessage, ChatRequest, Result, TextGenerator, TourpostError};
use tracing::{debug, warn};

const SERVICE: &str = "chat";

/// OpenAI-compatible `/chat/completions` client. Hosted serving endpoints
/// expose this shape, so one client covers both.
pub struct OpenAiChat {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChat {
    pub fn new(config: &ChatConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
        })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }

    async fn send_once(&self, body: &CompletionBody<'_>) -> std::result::Result<ChatCompletion, Attempt> {
        let mut req = self.client.post(self.url()).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| {
            let retry = e.is_timeout() || e.is_connect();
            Attempt::failed(retry, e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Attempt::failed(
                retryable(status),
                format!("{} {}", status, excerpt(&text, 300)),
            ));
        }

        let reply: CompletionReply = resp
            .json()
            .await
            .map_err(|e| Attempt::failed(false, format!("unreadable completion: {}", e)))?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Attempt::failed(false, "completion has no message content".into()))?;

        Ok(ChatCompletion {
            content,
            model: reply.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

struct Attempt {
    retry: bool,
    reason: String,
}

impl Attempt {
    fn failed(retry: bool, reason: String) -> Self {
        Self { retry, reason }
    }
}

fn retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// 500ms, 1s, 2s, ... capped at 8s.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500u64.saturating_mul(1 << attempt.min(4)))
}

#[async_trait]
impl TextGenerator for OpenAiChat {
    async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion> {
        if self.api_base.is_empty() || self.model.is_empty() {
            return Err(TourpostError::upstream(
                SERVICE,
                "chat endpoint is not configured (API_BASE, ENDPOINT_NAME)",
            ));
        }

        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut attempt = 0;
        loop {
            match self.send_once(&body).await {
                Ok(completion) => {
                    debug!(model = %completion.model, attempt, "chat completion received");
                    return Ok(completion);
                }
                Err(failure) if failure.retry && attempt < self.max_retries => {
                    let wait = backoff(attempt);
                    warn!(
                        "Chat request failed ({}), retrying in {:?} (attempt {}/{})",
                        failure.reason,
                        wait,
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(failure) => return Err(TourpostError::upstream(SERVICE, failure.reason)),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy() {
        assert!(retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(retryable(StatusCode::BAD_GATEWAY));
        assert!(!retryable(StatusCode::UNAUTHORIZED));
        assert_eq!(backoff(0), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(30), Duration::from_secs(8));
    }

    #[test]
    fn request_body_is_openai_shaped() {
        let messages = vec![ChatMessage::system("s"), ChatMessage::user("u")];
        let body = CompletionBody {
            model: "dbrx",
            messages: &messages,
            max_tokens: 2000,
            temperature: 0.7042,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "dbrx");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["max_tokens"], 2000);
    }

    #[test]
    fn reply_parsing_tolerates_missing_model() {
        let reply: CompletionReply =
            serde_json::from_str(r#"{ "choices": [{ "message": { "role": "assistant", "content": "Post: hi" } }] }"#)
                .unwrap();
        assert!(reply.model.is_none());
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("Post: hi"));
    }

    #[tokio::test]
    async fn unconfigured_endpoint_is_upstream_error() {
        let chat = OpenAiChat::new(&ChatConfig::default()).unwrap();
        let err = chat
            .complete(ChatRequest {
                messages: vec![ChatMessage::user("hi")],
                max_tokens: 10,
                temperature: 0.7,
            })
            .await
            .unwrap_err();
        assert!(err.is_upstream_error());
    }
}

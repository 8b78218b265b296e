//! Anthropic Messages API client for image annotation.
//!
//! Rate limiting:
//! - Set VISION_DELAY_MS to configure a delay before each request (default: 0)
//! - Automatically retries on 429/529 with exponential backoff
//! - Respects Retry-After header from API

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::VisionConfig;
use super::rate_limit::{backoff_delay, get_delay_from_env, parse_retry_after};
use super::{ReplyBudget, ServiceError, VisionService};

/// HTTP status the API uses when it is overloaded.
const STATUS_OVERLOADED: u16 = 529;

/// Vision client backed by the Anthropic Messages API.
pub struct AnthropicVisionClient {
    config: VisionConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock<'a> {
    Image { source: ImageSource<'a> },
    Text { text: &'a str },
}

#[derive(Debug, Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl AnthropicVisionClient {
    /// Create a new client. Fails if no API key is configured.
    pub fn new(config: VisionConfig) -> Result<Self, ServiceError> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(ServiceError::NotConfigured(
                "ANTHROPIC_API_KEY not set. Get an API key from https://console.anthropic.com/"
                    .to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn build_request<'a>(
        &'a self,
        image: &[u8],
        media_type: &'a str,
        prompt: &'a str,
        budget: ReplyBudget,
    ) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens_for(budget),
            messages: vec![Message {
                role: "user",
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type,
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        },
                    },
                    ContentBlock::Text { text: prompt },
                ],
            }],
        }
    }

    fn map_transport_error(&self, e: reqwest::Error) -> ServiceError {
        if e.is_timeout() {
            ServiceError::Timeout(self.config.timeout_secs)
        } else {
            ServiceError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl VisionService for AnthropicVisionClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn describe(
        &self,
        image: &[u8],
        media_type: &str,
        prompt: &str,
        budget: ReplyBudget,
    ) -> Result<String, ServiceError> {
        // Checked in new(), kept non-optional here for the header
        let api_key = self.config.api_key.as_deref().unwrap_or_default();
        let url = self.config.messages_url();
        let request = self.build_request(image, media_type, prompt, budget);

        let delay = get_delay_from_env("VISION_DELAY_MS", 0);
        if delay > Duration::ZERO {
            debug!("Vision: waiting {:?} before request", delay);
            tokio::time::sleep(delay).await;
        }

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .header("x-api-key", api_key)
                .header("anthropic-version", &self.config.api_version)
                .json(&request)
                .send()
                .await
                .map_err(|e| self.map_transport_error(e))?;

            let status = response.status();
            if status.as_u16() == 429 || status.as_u16() == STATUS_OVERLOADED {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);

                if attempt >= self.config.max_retries {
                    return Err(ServiceError::RateLimited {
                        retry_after_secs: retry_after.and_then(|s| s.trim().parse().ok()),
                    });
                }

                let wait = parse_retry_after(retry_after.as_deref())
                    .unwrap_or_else(|| backoff_delay(attempt, 1000));
                warn!(
                    "Vision service busy ({}, attempt {}), waiting {:?}",
                    status,
                    attempt + 1,
                    wait
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            let body = response
                .text()
                .await
                .map_err(|e| self.map_transport_error(e))?;

            if !status.is_success() {
                return Err(ServiceError::Api {
                    status: status.as_u16(),
                    body: api_error_message(&body),
                });
            }

            return parse_reply(&body);
        }
    }
}

/// Extract the first text block from a Messages API response body.
fn parse_reply(body: &str) -> Result<String, ServiceError> {
    let response: MessagesResponse = serde_json::from_str(body)
        .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    response
        .content
        .into_iter()
        .find(|block| block.kind == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| ServiceError::InvalidResponse("response has no text content".to_string()))
}

/// Prefer the API's own error message over the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> AnthropicVisionClient {
        AnthropicVisionClient::new(VisionConfig::default().with_api_key("test-key")).unwrap()
    }

    #[test]
    fn test_new_requires_api_key() {
        let result = AnthropicVisionClient::new(VisionConfig::default());
        assert!(matches!(result, Err(ServiceError::NotConfigured(_))));

        let result = AnthropicVisionClient::new(VisionConfig::default().with_api_key(""));
        assert!(matches!(result, Err(ServiceError::NotConfigured(_))));
    }

    #[test]
    fn test_build_request_shape() {
        let client = client();
        let request = client.build_request(b"\x89PNG", "image/png", "Describe", ReplyBudget::Full);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["max_tokens"], 2000);
        let content = &json["messages"][0]["content"];
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[0]["source"]["data"], "iVBORw==");
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], "Describe");
    }

    #[test]
    fn test_brief_requests_use_classification_budget() {
        let client = client();
        let request = client.build_request(b"img", "image/png", "Classify", ReplyBudget::Brief);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 1000);
    }

    #[test]
    fn test_parse_reply_first_text_block() {
        let body = r#"{"id":"msg_1","content":[{"type":"text","text":"IS_MALDI: YES"}],"stop_reason":"end_turn"}"#;
        assert_eq!(parse_reply(body).unwrap(), "IS_MALDI: YES");
    }

    #[test]
    fn test_parse_reply_without_text() {
        let body = r#"{"content":[]}"#;
        assert!(matches!(
            parse_reply(body),
            Err(ServiceError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_reply("not json"),
            Err(ServiceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"image too large"}}"#;
        assert_eq!(api_error_message(body), "image too large");
        assert_eq!(api_error_message("Bad Gateway"), "Bad Gateway");
    }
}

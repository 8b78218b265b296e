//! Vision service configuration.

use serde::{Deserialize, Serialize};

use super::ReplyBudget;

/// Configuration for the vision annotation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionConfig {
    /// API endpoint (without the `/v1/messages` path)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key; usually supplied through ANTHROPIC_API_KEY instead of the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model to query
    #[serde(default = "default_model")]
    pub model: String,
    /// Maximum tokens in an extraction response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Maximum tokens in a classification response
    #[serde(default = "default_classify_max_tokens")]
    pub classify_max_tokens: u32,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries on HTTP 429/529 before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// API version header value
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_classify_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_retries() -> u32 {
    5
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            classify_max_tokens: default_classify_max_tokens(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            api_version: default_api_version(),
        }
    }
}

impl VisionConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `VISION_API_KEY` or `ANTHROPIC_API_KEY`: API key (`VISION_API_KEY` wins)
    /// - `VISION_ENDPOINT`: API endpoint
    /// - `VISION_MODEL`: Model name
    /// - `VISION_MAX_TOKENS`: Maximum tokens in an extraction response
    /// - `VISION_CLASSIFY_MAX_TOKENS`: Maximum tokens in a classification response
    /// - `VISION_TIMEOUT_SECS`: Per-request timeout
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("VISION_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        }
        if let Ok(val) = std::env::var("VISION_ENDPOINT") {
            self.endpoint = val;
        }
        if let Ok(val) = std::env::var("VISION_MODEL") {
            self.model = val;
        }
        if let Ok(val) = std::env::var("VISION_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                self.max_tokens = n;
            }
        }
        if let Ok(val) = std::env::var("VISION_CLASSIFY_MAX_TOKENS") {
            if let Ok(n) = val.parse() {
                self.classify_max_tokens = n;
            }
        }
        if let Ok(val) = std::env::var("VISION_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.timeout_secs = n;
            }
        }
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Token limit for a reply of the given size.
    pub fn max_tokens_for(&self, budget: ReplyBudget) -> u32 {
        match budget {
            ReplyBudget::Brief => self.classify_max_tokens,
            ReplyBudget::Full => self.max_tokens,
        }
    }

    /// Full URL of the messages endpoint.
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
    }
}

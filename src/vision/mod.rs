//! Vision annotation service.
//!
//! The pipeline talks to the service through the [`VisionService`] trait: one
//! image plus one instruction prompt in, one free-text reply out. The concrete
//! backend is the Anthropic Messages API ([`AnthropicVisionClient`]).

mod client;
mod config;
pub mod prompts;
mod rate_limit;

use async_trait::async_trait;
use thiserror::Error;

pub use client::AnthropicVisionClient;
pub use config::VisionConfig;
pub use rate_limit::{backoff_delay, get_delay_from_env, parse_retry_after};

/// Errors from a vision service call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Vision service not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// How long a reply the caller expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyBudget {
    /// A few marker lines, e.g. a classification verdict.
    Brief,
    /// A full transcription, e.g. every annotation on a figure.
    Full,
}

/// A vision-capable model that answers a prompt about one image.
#[async_trait]
pub trait VisionService: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Send `image` (encoded as `media_type`) with `prompt` and return the
    /// reply text. `budget` bounds the reply length.
    async fn describe(
        &self,
        image: &[u8],
        media_type: &str,
        prompt: &str,
        budget: ReplyBudget,
    ) -> Result<String, ServiceError>;
}

/// MIME type for an image format or file extension.
/// Unrecognized formats are sent as JPEG.
pub fn media_type_for(format: &str) -> &'static str {
    match format.trim_start_matches('.').to_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("png"), "image/png");
        assert_eq!(media_type_for(".PNG"), "image/png");
        assert_eq!(media_type_for("jpeg"), "image/jpeg");
        assert_eq!(media_type_for("gif"), "image/gif");
        assert_eq!(media_type_for("webp"), "image/webp");
        assert_eq!(media_type_for("tif"), "image/jpeg");
        assert_eq!(media_type_for(""), "image/jpeg");
    }
}

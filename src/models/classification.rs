//! Figure classification result.

/// Confidence reported when the service reply carries no usable score.
pub const DEFAULT_CONFIDENCE: f64 = 50.0;

/// Reason reported when the service reply carries no `REASON:` marker.
pub const DEFAULT_REASON: &str = "Unable to parse reason";

/// Verdict on whether an image is a MALDI imaging figure.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Whether the service said the image is the target figure type.
    pub is_target: bool,
    /// Confidence score in `[0, 100]`.
    pub confidence: f64,
    /// Short explanation from the service.
    pub reason: String,
}

impl ClassificationResult {
    /// Whether the image should be passed on to extraction.
    pub fn is_accepted(&self, threshold: f64) -> bool {
        self.is_target && self.confidence >= threshold
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self {
            is_target: false,
            confidence: DEFAULT_CONFIDENCE,
            reason: DEFAULT_REASON.to_string(),
        }
    }
}

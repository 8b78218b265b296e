//! MALDI figure classifier.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::models::{ClassificationResult, DEFAULT_CONFIDENCE, DEFAULT_REASON};
use crate::vision::prompts::CLASSIFY_PROMPT;
use crate::vision::{media_type_for, ReplyBudget, ServiceError, VisionService};

/// Default minimum confidence for accepting a figure.
pub const DEFAULT_THRESHOLD: f64 = 70.0;

const TARGET_MARKER: &str = "IS_MALDI:";
const CONFIDENCE_MARKER: &str = "CONFIDENCE:";
const REASON_MARKER: &str = "REASON:";

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());

/// Asks the vision service whether an image is a MALDI imaging figure.
#[derive(Clone)]
pub struct Classifier {
    service: Arc<dyn VisionService>,
}

impl Classifier {
    pub fn new(service: Arc<dyn VisionService>) -> Self {
        Self { service }
    }

    /// Classify one image. A failed service call is returned as an error,
    /// never folded into a low-confidence result.
    pub async fn classify(
        &self,
        image: &[u8],
        format: &str,
    ) -> Result<ClassificationResult, ServiceError> {
        let reply = self
            .service
            .describe(image, media_type_for(format), CLASSIFY_PROMPT, ReplyBudget::Brief)
            .await?;
        let result = parse_classification(&reply);
        debug!(
            "Classified {} image: is_target={} confidence={:.1}",
            format, result.is_target, result.confidence
        );
        Ok(result)
    }
}

/// Parse a classification reply.
///
/// Each marker is read from its first occurrence only. Missing or malformed
/// fields fall back to `is_target = false`, [`DEFAULT_CONFIDENCE`] and
/// [`DEFAULT_REASON`].
pub fn parse_classification(reply: &str) -> ClassificationResult {
    let is_target = marker_line(reply, TARGET_MARKER)
        .map(|line| line.to_uppercase().contains("YES"))
        .unwrap_or(false);

    let confidence = marker_line(reply, CONFIDENCE_MARKER)
        .and_then(first_number)
        .map(|c| c.clamp(0.0, 100.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let reason = reply
        .split_once(REASON_MARKER)
        .map(|(_, rest)| rest.trim().to_string())
        .unwrap_or_else(|| DEFAULT_REASON.to_string());

    ClassificationResult {
        is_target,
        confidence,
        reason,
    }
}

/// Text after the first `marker`, up to the next line break.
fn marker_line<'a>(reply: &'a str, marker: &str) -> Option<&'a str> {
    let (_, rest) = reply.split_once(marker)?;
    Some(rest.lines().next().unwrap_or(""))
}

/// First run of ASCII digits in `text`.
fn first_number(text: &str) -> Option<f64> {
    DIGIT_RUN.find(text)?.as_str().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_reply() {
        let result = parse_classification(
            "IS_MALDI: YES\nCONFIDENCE: 92\nREASON: Ion intensity maps labelled with m/z values",
        );
        assert!(result.is_target);
        assert_eq!(result.confidence, 92.0);
        assert_eq!(result.reason, "Ion intensity maps labelled with m/z values");
        assert!(result.is_accepted(DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_parse_negative_reply() {
        let result =
            parse_classification("IS_MALDI: NO\nCONFIDENCE: 95\nREASON: Western blot");
        assert!(!result.is_target);
        assert_eq!(result.confidence, 95.0);
        assert!(!result.is_accepted(DEFAULT_THRESHOLD));
    }

    #[test]
    fn test_yes_is_case_insensitive() {
        assert!(parse_classification("IS_MALDI: yes\n").is_target);
        assert!(parse_classification("IS_MALDI: [Yes]").is_target);
    }

    #[test]
    fn test_yes_on_later_line_does_not_count() {
        let result = parse_classification("IS_MALDI:\nYES\nCONFIDENCE: 80");
        assert!(!result.is_target);
    }

    #[test]
    fn test_missing_markers_use_defaults() {
        let result = parse_classification("I think this is a MALDI figure.");
        assert!(!result.is_target);
        assert_eq!(result.confidence, 50.0);
        assert_eq!(result.reason, "Unable to parse reason");
    }

    #[test]
    fn test_confidence_without_digits_defaults() {
        let result = parse_classification("IS_MALDI: YES\nCONFIDENCE: high\nREASON: x");
        assert_eq!(result.confidence, 50.0);
        let result = parse_classification("IS_MALDI: YES\nCONFIDENCE:\n85\nREASON: x");
        assert_eq!(result.confidence, 50.0);
    }

    #[test]
    fn test_confidence_takes_first_digit_run() {
        let result = parse_classification("CONFIDENCE: about 85% (or 90)\n");
        assert_eq!(result.confidence, 85.0);
        let result = parse_classification("CONFIDENCE: 85.5\n");
        assert_eq!(result.confidence, 85.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let result = parse_classification("CONFIDENCE: 150\n");
        assert_eq!(result.confidence, 100.0);
    }

    #[test]
    fn test_first_marker_wins() {
        let result = parse_classification(
            "IS_MALDI: NO\nCONFIDENCE: 10\nREASON: none\nIS_MALDI: YES\nCONFIDENCE: 99",
        );
        assert!(!result.is_target);
        assert_eq!(result.confidence, 10.0);
    }

    #[test]
    fn test_reason_runs_to_end_of_reply() {
        let result = parse_classification("IS_MALDI: YES\nREASON: Shows\ntissue maps  ");
        assert_eq!(result.reason, "Shows\ntissue maps");
    }

    struct VerdictService {
        budgets: std::sync::Mutex<Vec<(ReplyBudget, String)>>,
    }

    #[async_trait::async_trait]
    impl VisionService for VerdictService {
        fn name(&self) -> &str {
            "verdict"
        }

        async fn describe(
            &self,
            _image: &[u8],
            _media_type: &str,
            prompt: &str,
            budget: ReplyBudget,
        ) -> Result<String, ServiceError> {
            self.budgets
                .lock()
                .unwrap()
                .push((budget, prompt.to_string()));
            Ok("IS_MALDI: YES\nCONFIDENCE: 81\nREASON: ion map".to_string())
        }
    }

    #[tokio::test]
    async fn test_classify_asks_for_brief_reply() {
        let service = Arc::new(VerdictService {
            budgets: std::sync::Mutex::new(Vec::new()),
        });
        let classifier = Classifier::new(service.clone());

        let result = classifier.classify(b"img", "png").await.unwrap();
        assert!(result.is_target);
        assert_eq!(result.confidence, 81.0);

        let budgets = service.budgets.lock().unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].0, ReplyBudget::Brief);
        assert_eq!(budgets[0].1, CLASSIFY_PROMPT);
    }
}

//! Annotation transcription.

use std::sync::Arc;

use tracing::debug;

use crate::vision::prompts::EXTRACT_PROMPT;
use crate::vision::{media_type_for, ReplyBudget, ServiceError, VisionService};

/// Asks the vision service to list every annotation on an accepted figure.
/// The reply is returned untouched.
#[derive(Clone)]
pub struct Extractor {
    service: Arc<dyn VisionService>,
}

impl Extractor {
    pub fn new(service: Arc<dyn VisionService>) -> Self {
        Self { service }
    }

    pub async fn extract(&self, image: &[u8], format: &str) -> Result<String, ServiceError> {
        let reply = self
            .service
            .describe(image, media_type_for(format), EXTRACT_PROMPT, ReplyBudget::Full)
            .await?;
        debug!(
            "Extraction reply from {}: {} lines",
            self.service.name(),
            reply.lines().count()
        );
        Ok(reply)
    }
}

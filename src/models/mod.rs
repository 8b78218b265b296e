//! Data models for mzatlas.

mod classification;
mod record;

pub use classification::{ClassificationResult, DEFAULT_CONFIDENCE, DEFAULT_REASON};
pub use record::{AnnotationRecord, RecordField};

//! Figure annotation: classification, extraction and reply parsing.
//!
//! Classification and extraction each make one vision service call per
//! image. Parsing is a pure function over the extraction reply so that
//! format drift in the service's output can be diagnosed offline.

mod classifier;
mod extractor;
mod parser;

pub use classifier::{parse_classification, Classifier, DEFAULT_THRESHOLD};
pub use extractor::Extractor;
pub use parser::{parse_response, parse_response_with_warnings, ParseOutcome, ParseWarning};

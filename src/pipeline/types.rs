//! Pipeline inputs, events and reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::harvest::DocumentError;
use crate::models::AnnotationRecord;
use crate::vision::ServiceError;

/// Errors that fail a single input item.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Harvest task failed: {0}")]
    Task(String),
}

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputItem {
    /// A figure image, sent straight to extraction.
    Image(PathBuf),
    /// A publication, harvested and classified first.
    Pdf(PathBuf),
}

impl InputItem {
    /// Classify a path by extension: `.pdf` is a publication, anything else an image.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_pdf = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            Self::Pdf(path)
        } else {
            Self::Image(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Image(p) | Self::Pdf(p) => p,
        }
    }
}

impl std::fmt::Display for InputItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Events emitted during a batch run.
/// Fields are populated when events are created, even if consumers don't read all of them.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum PipelineEvent {
    /// Run started
    Started { total_items: usize },
    /// Item processing started
    ItemStarted { item: String },
    /// A candidate figure was classified
    FigureClassified {
        item: String,
        figure: String,
        accepted: bool,
        confidence: f64,
    },
    /// Item finished; `records` may be zero
    ItemCompleted { item: String, records: usize },
    /// Item failed at some stage
    ItemFailed { item: String, error: String },
    /// Store saved mid-run
    Checkpoint { total_records: usize },
    /// Run complete
    Complete {
        attempted: usize,
        failed: usize,
        records_added: usize,
    },
}

/// An item that failed, with the error that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedItem {
    pub item: String,
    pub error: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub items_attempted: usize,
    /// Items that produced at least one record.
    pub items_with_records: usize,
    pub records_added: usize,
    /// Candidate figures classified (PDF inputs only).
    pub figures_examined: usize,
    /// Candidate figures that passed classification.
    pub figures_accepted: usize,
    pub failed: Vec<FailedItem>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            items_attempted: 0,
            items_with_records: 0,
            records_added: 0,
            figures_examined: 0,
            figures_accepted: 0,
            failed: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub(super) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

/// What a successfully processed item produced.
#[derive(Debug, Default)]
pub(super) struct ItemOutcome {
    pub records: Vec<AnnotationRecord>,
    pub figures_examined: usize,
    pub figures_accepted: usize,
}

//! Batch pipeline over images and PDFs.

mod figures;
mod inputs;
mod orchestrator;
mod types;

pub use figures::{ExtractedFigures, FigureExtractor, DEFAULT_FIGURE_DIR};
pub use inputs::{collect_images, expand_inputs, IMAGE_EXTENSIONS};
pub use orchestrator::{BatchOptions, BatchOrchestrator};
pub use types::{FailedItem, InputItem, ItemError, PipelineEvent, RunReport};

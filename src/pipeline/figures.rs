//! Figure extraction from PDFs: harvest, classify, save accepted figures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::annotate::Classifier;
use crate::harvest::{pdf_stem, FigureSource, HarvestedImage};

use super::types::{ItemError, PipelineEvent};

/// Default folder for saved figures.
pub const DEFAULT_FIGURE_DIR: &str = "extracted_maldi_figures";

/// Figures saved from one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedFigures {
    pub pdf: PathBuf,
    pub saved: Vec<PathBuf>,
    /// Set when the PDF failed; `saved` is then empty.
    pub error: Option<String>,
}

/// Classifies every candidate figure in a PDF and saves the accepted ones.
pub struct FigureExtractor {
    classifier: Classifier,
    source: Arc<dyn FigureSource>,
    threshold: f64,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl FigureExtractor {
    pub fn new(classifier: Classifier, source: Arc<dyn FigureSource>, threshold: f64) -> Self {
        Self {
            classifier,
            source,
            threshold,
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Extract MALDI figures from one PDF into `out_dir`, returning the saved paths.
    pub async fn extract_from_pdf(
        &self,
        pdf: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ItemError> {
        info!("Processing: {}", pdf.display());
        let stem = pdf_stem(pdf);
        tokio::fs::create_dir_all(out_dir).await?;

        let images = harvest_blocking(self.source.clone(), pdf).await?;
        let mut saved = Vec::new();

        for image in images {
            let name = image.figure_name(&stem);
            let result = self.classifier.classify(&image.bytes, &image.format).await?;
            let accepted = result.is_accepted(self.threshold);
            self.emit(PipelineEvent::FigureClassified {
                item: pdf.display().to_string(),
                figure: name.clone(),
                accepted,
                confidence: result.confidence,
            })
            .await;

            if accepted {
                let path = save_figure(out_dir, &name, &image).await?;
                info!(
                    "MALDI detected (confidence: {:.1}%) - saved {}: {}",
                    result.confidence, name, result.reason
                );
                saved.push(path);
            }
        }

        info!(
            "Extracted {} MALDI figures from {}",
            saved.len(),
            pdf.display()
        );
        Ok(saved)
    }

    /// Extract figures from many PDFs. A failing PDF is logged and reported
    /// with no saved figures; the others are unaffected.
    pub async fn batch_extract(&self, pdfs: &[PathBuf], out_dir: &Path) -> Vec<ExtractedFigures> {
        self.emit(PipelineEvent::Started {
            total_items: pdfs.len(),
        })
        .await;

        let mut results = Vec::with_capacity(pdfs.len());
        for pdf in pdfs {
            let item = pdf.display().to_string();
            self.emit(PipelineEvent::ItemStarted { item: item.clone() })
                .await;

            match self.extract_from_pdf(pdf, out_dir).await {
                Ok(saved) => {
                    self.emit(PipelineEvent::ItemCompleted {
                        item,
                        records: saved.len(),
                    })
                    .await;
                    results.push(ExtractedFigures {
                        pdf: pdf.clone(),
                        saved,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("Error processing {}: {}", pdf.display(), e);
                    self.emit(PipelineEvent::ItemFailed {
                        item,
                        error: e.to_string(),
                    })
                    .await;
                    results.push(ExtractedFigures {
                        pdf: pdf.clone(),
                        saved: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let total: usize = results.iter().map(|r| r.saved.len()).sum();
        let failed = results.iter().filter(|r| r.error.is_some()).count();
        info!(
            "Batch extraction complete: {} PDFs, {} MALDI figures",
            pdfs.len(),
            total
        );
        self.emit(PipelineEvent::Complete {
            attempted: pdfs.len(),
            failed,
            records_added: total,
        })
        .await;

        results
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}

/// Run a blocking harvest off the async runtime.
pub(super) async fn harvest_blocking(
    source: Arc<dyn FigureSource>,
    pdf: &Path,
) -> Result<Vec<HarvestedImage>, ItemError> {
    let pdf = pdf.to_path_buf();
    let images = tokio::task::spawn_blocking(move || source.harvest(&pdf))
        .await
        .map_err(|e| ItemError::Task(e.to_string()))??;
    Ok(images)
}

/// Write a figure under `dir` with its canonical name.
pub(super) async fn save_figure(
    dir: &Path,
    name: &str,
    image: &HarvestedImage,
) -> Result<PathBuf, ItemError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(name);
    tokio::fs::write(&path, &image.bytes).await?;
    Ok(path)
}

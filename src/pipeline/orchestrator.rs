//! Batch orchestration with per-item failure isolation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::annotate::{parse_response, Classifier, Extractor, DEFAULT_THRESHOLD};
use crate::harvest::{pdf_stem, FigureSource};
use crate::store::AnnotationStore;

use super::figures::{harvest_blocking, save_figure};
use super::types::{FailedItem, InputItem, ItemError, ItemOutcome, PipelineEvent, RunReport};

/// Knobs for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Minimum classifier confidence for a PDF figure to be extracted.
    pub confidence_threshold: f64,
    /// Items processed at once. Results are still applied in input order.
    pub max_concurrency: usize,
    /// Save the store after this many items (0 disables checkpoints).
    pub checkpoint_every: usize,
    /// Where to write accepted PDF figures, if anywhere.
    pub save_figures_to: Option<PathBuf>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_THRESHOLD,
            max_concurrency: 1,
            checkpoint_every: 0,
            save_figures_to: None,
        }
    }
}

/// Drives harvest → classify → extract → parse → append over many items.
///
/// A failure anywhere in one item is logged, recorded in the [`RunReport`]
/// and never affects the other items. Only the loop in [`run`](Self::run)
/// touches the store, so appends stay in input order whatever the
/// concurrency.
pub struct BatchOrchestrator {
    classifier: Classifier,
    extractor: Extractor,
    source: Arc<dyn FigureSource>,
    options: BatchOptions,
    events: Option<mpsc::Sender<PipelineEvent>>,
}

impl BatchOrchestrator {
    pub fn new(
        classifier: Classifier,
        extractor: Extractor,
        source: Arc<dyn FigureSource>,
        options: BatchOptions,
    ) -> Self {
        Self {
            classifier,
            extractor,
            source,
            options,
            events: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<PipelineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Process `items`, appending their records to `store`.
    ///
    /// The store is saved only at checkpoints; the caller owns the final save.
    pub async fn run(
        &self,
        store: &mut AnnotationStore,
        items: &[InputItem],
        literature_source: &str,
    ) -> RunReport {
        let mut report = RunReport::new();
        self.emit(PipelineEvent::Started {
            total_items: items.len(),
        })
        .await;

        let concurrency = self.options.max_concurrency.max(1);
        let mut results = stream::iter(items)
            .map(|item| async move {
                self.emit(PipelineEvent::ItemStarted {
                    item: item.to_string(),
                })
                .await;
                (item, self.process_item(item, literature_source).await)
            })
            .buffered(concurrency);

        while let Some((item, result)) = results.next().await {
            report.items_attempted += 1;

            match result {
                Ok(outcome) => {
                    let count = outcome.records.len();
                    report.figures_examined += outcome.figures_examined;
                    report.figures_accepted += outcome.figures_accepted;
                    report.records_added += count;
                    if count > 0 {
                        report.items_with_records += 1;
                        info!("Added {} records from {}", count, item);
                    } else {
                        warn!("No valid records extracted from {}", item);
                    }
                    store.append(outcome.records);
                    self.emit(PipelineEvent::ItemCompleted {
                        item: item.to_string(),
                        records: count,
                    })
                    .await;
                }
                Err(e) => {
                    warn!("Error processing {}: {}", item, e);
                    self.emit(PipelineEvent::ItemFailed {
                        item: item.to_string(),
                        error: e.to_string(),
                    })
                    .await;
                    report.failed.push(FailedItem {
                        item: item.to_string(),
                        error: e.to_string(),
                    });
                }
            }

            if self.options.checkpoint_every > 0
                && report.items_attempted % self.options.checkpoint_every == 0
            {
                self.checkpoint(store).await;
            }
        }

        report.finish();
        info!(
            "Batch processing complete: {} items, {} records added, {} failed. Total entries: {}",
            report.items_attempted,
            report.records_added,
            report.failed.len(),
            store.len()
        );
        self.emit(PipelineEvent::Complete {
            attempted: report.items_attempted,
            failed: report.failed.len(),
            records_added: report.records_added,
        })
        .await;

        report
    }

    async fn checkpoint(&self, store: &AnnotationStore) {
        match store.save() {
            Ok(()) => {
                debug!("Checkpoint saved ({} records)", store.len());
                self.emit(PipelineEvent::Checkpoint {
                    total_records: store.len(),
                })
                .await;
            }
            Err(e) => warn!("Checkpoint save to {} failed: {}", store.path().display(), e),
        }
    }

    async fn process_item(
        &self,
        item: &InputItem,
        literature_source: &str,
    ) -> Result<ItemOutcome, ItemError> {
        match item {
            InputItem::Image(path) => self.process_image(path, literature_source).await,
            InputItem::Pdf(path) => self.process_pdf(path, literature_source).await,
        }
    }

    /// Direct image input: no classification, straight to extraction.
    async fn process_image(
        &self,
        path: &Path,
        literature_source: &str,
    ) -> Result<ItemOutcome, ItemError> {
        let bytes = tokio::fs::read(path).await?;
        let format = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let reply = self.extractor.extract(&bytes, &format).await?;
        debug!("Extraction reply for {}:\n{}", filename, reply);

        Ok(ItemOutcome {
            records: parse_response(&reply, &filename, literature_source),
            ..Default::default()
        })
    }

    /// PDF input: harvest, classify each candidate, extract the accepted ones.
    async fn process_pdf(
        &self,
        path: &Path,
        literature_source: &str,
    ) -> Result<ItemOutcome, ItemError> {
        let stem = pdf_stem(path);
        let images = harvest_blocking(self.source.clone(), path).await?;
        debug!("Harvested {} candidate figures from {}", images.len(), path.display());

        let mut outcome = ItemOutcome::default();
        for image in images {
            let name = image.figure_name(&stem);
            outcome.figures_examined += 1;

            let result = self.classifier.classify(&image.bytes, &image.format).await?;
            let accepted = result.is_accepted(self.options.confidence_threshold);
            self.emit(PipelineEvent::FigureClassified {
                item: path.display().to_string(),
                figure: name.clone(),
                accepted,
                confidence: result.confidence,
            })
            .await;

            if !accepted {
                debug!(
                    "Not MALDI: {} (confidence: {:.1}%)",
                    name, result.confidence
                );
                continue;
            }
            outcome.figures_accepted += 1;
            info!(
                "MALDI detected: {} (confidence: {:.1}%) - {}",
                name, result.confidence, result.reason
            );

            if let Some(ref dir) = self.options.save_figures_to {
                save_figure(dir, &name, &image).await?;
            }

            let reply = self.extractor.extract(&image.bytes, &image.format).await?;
            outcome
                .records
                .extend(parse_response(&reply, &name, literature_source));
        }

        Ok(outcome)
    }

    async fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}

//! Figure extraction command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::harvest::{FigureSource, PopplerHarvester};
use crate::pipeline::FigureExtractor;

use crate::cli::helpers::{build_annotators, spawn_progress};

/// Find MALDI figures in each PDF and save them under `output`.
pub async fn cmd_extract_figures(
    config: &Config,
    pdfs: &[PathBuf],
    output: &Path,
    threshold: Option<f64>,
    dpi: Option<u32>,
) -> anyhow::Result<()> {
    let (classifier, _) = build_annotators(config)?;
    let threshold = threshold.unwrap_or(config.harvest.confidence_threshold);
    let harvester = PopplerHarvester::new().with_dpi(dpi.unwrap_or(config.harvest.dpi));

    println!(
        "{} Scanning {} PDF(s) for MALDI figures (threshold {:.0}%, {} dpi)",
        style("→").cyan(),
        pdfs.len(),
        threshold,
        harvester.dpi()
    );
    for pdf in pdfs {
        match harvester.page_count(pdf) {
            Ok(pages) => println!("  {} {} ({} pages)", style("→").dim(), pdf.display(), pages),
            Err(e) => println!("  {} {}", style("!").yellow(), e),
        }
    }

    let source: Arc<dyn FigureSource> = Arc::new(harvester);

    let (tx, rx) = mpsc::channel(100);
    let progress = spawn_progress(rx);
    let extractor = FigureExtractor::new(classifier, source, threshold).with_events(tx);

    let results = extractor.batch_extract(pdfs, output).await;
    drop(extractor);
    let _ = progress.await;

    let total: usize = results.iter().map(|r| r.saved.len()).sum();
    for result in results.iter().filter(|r| r.error.is_some()) {
        println!(
            "{} {}: {}",
            style("✗").red(),
            result.pdf.display(),
            result.error.as_deref().unwrap_or_default()
        );
    }

    println!(
        "{} Extracted {} MALDI figures from {} PDF(s) into {}",
        style("✓").green(),
        total,
        pdfs.len(),
        output.display()
    );
    Ok(())
}

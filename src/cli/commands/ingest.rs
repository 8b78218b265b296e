//! Batch ingestion command.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::harvest::{FigureSource, PopplerHarvester};
use crate::pipeline::{expand_inputs, BatchOrchestrator, RunReport};

use crate::cli::helpers::{build_annotators, open_store, spawn_progress};

/// Per-run values given on the command line.
#[derive(Debug, Default)]
pub struct IngestOverrides {
    pub jobs: Option<usize>,
    pub checkpoint_every: Option<usize>,
    pub save_figures: Option<PathBuf>,
    pub threshold: Option<f64>,
    pub dpi: Option<u32>,
}

/// Run the extraction pipeline over images, PDFs and image folders.
pub async fn cmd_ingest(
    config: &Config,
    paths: &[PathBuf],
    literature_source: &str,
    save: bool,
    overrides: IngestOverrides,
) -> anyhow::Result<()> {
    let items = expand_inputs(paths)?;
    if items.is_empty() {
        println!("{} No images or PDFs found", style("!").yellow());
        return Ok(());
    }

    let (classifier, extractor) = build_annotators(config)?;
    let mut store = open_store(config)?;
    let existing = store.len();

    let mut options = config.batch_options();
    if let Some(jobs) = overrides.jobs {
        options.max_concurrency = jobs.max(1);
    }
    if let Some(every) = overrides.checkpoint_every {
        options.checkpoint_every = every;
    }
    if let Some(threshold) = overrides.threshold {
        options.confidence_threshold = threshold;
    }
    options.save_figures_to = overrides.save_figures;
    if !save {
        options.checkpoint_every = 0;
    }

    let harvester = PopplerHarvester::new().with_dpi(overrides.dpi.unwrap_or(config.harvest.dpi));
    let source: Arc<dyn FigureSource> = Arc::new(harvester);

    println!(
        "{} Processing {} item(s) into {} ({} existing entries)",
        style("→").cyan(),
        items.len(),
        store.path().display(),
        existing
    );

    let (tx, rx) = mpsc::channel(100);
    let progress = spawn_progress(rx);
    let orchestrator =
        BatchOrchestrator::new(classifier, extractor, source, options).with_events(tx);

    let report = orchestrator.run(&mut store, &items, literature_source).await;
    drop(orchestrator);
    let _ = progress.await;

    if save {
        store.save()?;
        println!(
            "{} Saved {} entries to {}",
            style("✓").green(),
            store.len(),
            store.path().display()
        );
    } else {
        println!("{} Database not saved (--no-save)", style("!").yellow());
    }

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    println!();
    println!(
        "{} {} item(s) attempted, {} with entries, {} entries added",
        style("→").cyan(),
        report.items_attempted,
        report.items_with_records,
        report.records_added
    );
    if report.figures_examined > 0 {
        println!(
            "  {} {} of {} PDF figures classified as MALDI",
            style("→").dim(),
            report.figures_accepted,
            report.figures_examined
        );
    }
    if report.has_failures() {
        println!(
            "{} {} item(s) failed:",
            style("✗").red(),
            report.failed.len()
        );
        for failure in &report.failed {
            println!("  {} {}: {}", style("✗").red(), failure.item, failure.error);
        }
    }
}

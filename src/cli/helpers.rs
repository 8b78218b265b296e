//! Shared helper functions for CLI commands.

use std::path::Path;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::annotate::{Classifier, Extractor};
use crate::config::Config;
use crate::models::AnnotationRecord;
use crate::pipeline::PipelineEvent;
use crate::store::{write_records, AnnotationStore};
use crate::vision::{AnthropicVisionClient, VisionService};

/// Truncate a string for display.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Open the store named by the config, creating an empty one if absent.
pub fn open_store(config: &Config) -> anyhow::Result<AnnotationStore> {
    Ok(AnnotationStore::load_or_create(&config.store.path)?)
}

/// Build the vision client and the classifier/extractor that share it.
pub fn build_annotators(config: &Config) -> anyhow::Result<(Classifier, Extractor)> {
    let client = AnthropicVisionClient::new(config.vision.clone())?;
    let service: Arc<dyn VisionService> = Arc::new(client);
    Ok((Classifier::new(service.clone()), Extractor::new(service)))
}

/// Print matching records as a table, or write them to `output` as CSV.
pub fn print_records(records: &[&AnnotationRecord], output: Option<&Path>) -> anyhow::Result<()> {
    if records.is_empty() {
        println!("{} No matching entries", style("!").yellow());
        return Ok(());
    }

    if let Some(path) = output {
        write_records(records.iter().copied(), path)?;
        println!(
            "{} Wrote {} entries to {}",
            style("✓").green(),
            records.len(),
            path.display()
        );
        return Ok(());
    }

    println!(
        "{:<12} {:<30} {:<16} {:<30}",
        style("m/z").bold(),
        style("Metabolite").bold(),
        style("Tissue").bold(),
        style("Image").bold()
    );
    println!("{}", "-".repeat(91));
    for record in records {
        println!(
            "{:<12} {:<30} {:<16} {:<30}",
            truncate(&record.mz_value, 12),
            truncate(&record.metabolite_name, 30),
            truncate(&record.tissue_type, 16),
            truncate(&record.image_filename, 30)
        );
    }
    println!();
    println!("{} {} entries", style("→").dim(), records.len());
    Ok(())
}

/// Drive a progress bar from pipeline events until the sender side closes.
pub fn spawn_progress(mut rx: mpsc::Receiver<PipelineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress: Option<ProgressBar> = None;

        while let Some(event) = rx.recv().await {
            match event {
                PipelineEvent::Started { total_items } => {
                    let pb = ProgressBar::new(total_items as u64);
                    let bar_style = ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("█▓░");
                    pb.set_style(bar_style);
                    progress = Some(pb);
                }
                PipelineEvent::ItemStarted { item } => {
                    if let Some(pb) = &progress {
                        pb.set_message(truncate(&item, 50));
                    }
                }
                PipelineEvent::FigureClassified {
                    figure,
                    accepted,
                    confidence,
                    ..
                } => {
                    if let Some(pb) = &progress {
                        if accepted {
                            pb.println(format!(
                                "  {} {} ({:.0}%)",
                                style("✓").green(),
                                figure,
                                confidence
                            ));
                        }
                    }
                }
                PipelineEvent::ItemCompleted { item, records } => {
                    if let Some(pb) = &progress {
                        pb.println(format!(
                            "{} {} {}",
                            style("✓").green(),
                            truncate(&item, 60),
                            style(format!("({} entries)", records)).dim()
                        ));
                        pb.inc(1);
                    }
                }
                PipelineEvent::ItemFailed { item, error } => {
                    if let Some(pb) = &progress {
                        pb.println(format!(
                            "{} {}: {}",
                            style("✗").red(),
                            truncate(&item, 60),
                            error
                        ));
                        pb.inc(1);
                    }
                }
                PipelineEvent::Checkpoint { total_records } => {
                    if let Some(pb) = &progress {
                        pb.println(format!(
                            "{} Checkpoint saved ({} entries)",
                            style("↻").cyan(),
                            total_records
                        ));
                    }
                }
                PipelineEvent::Complete { .. } => {
                    if let Some(pb) = progress.take() {
                        pb.finish_and_clear();
                    }
                }
            }
        }

        if let Some(pb) = progress.take() {
            pb.finish_and_clear();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer string", 10), "a much ...");
    }

    #[test]
    fn test_truncate_multibyte() {
        let s = "β-hydroxybutyrate and more";
        let out = truncate(s, 8);
        assert_eq!(out.chars().count(), 8);
        assert!(out.ends_with("..."));
    }
}

//! Database maintenance commands: stats, dedup and export.

use std::path::Path;

use console::style;

use crate::config::Config;
use crate::models::RecordField;

use crate::cli::helpers::open_store;

/// Print database statistics.
pub fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let stats = store.statistics();

    println!("\n{}", style("Database Statistics").bold());
    println!("{}", "-".repeat(40));
    println!("{:<22} {}", "Total entries:", stats.total_entries);
    println!("{:<22} {}", "Unique metabolites:", stats.unique_metabolites);
    println!("{:<22} {}", "Unique images:", stats.unique_images);

    if !stats.tissue_types.is_empty() {
        println!("\n{}", style("Tissue types").bold());
        for (tissue, count) in stats.tissue_types_by_count() {
            println!("  {:<20} {}", tissue, count);
        }
    }
    Ok(())
}

/// Remove duplicate entries and save.
pub fn cmd_dedup(config: &Config) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let removed = store.deduplicate();
    if removed == 0 {
        println!("{} No duplicates found", style("!").yellow());
        return Ok(());
    }
    store.save()?;
    println!(
        "{} Removed {} duplicate entries ({} remain)",
        style("✓").green(),
        removed,
        store.len()
    );
    Ok(())
}

/// Export the distinct values of one column.
pub fn cmd_export(config: &Config, field: &str, output: &Path) -> anyhow::Result<()> {
    let field = RecordField::from_str(field).ok_or_else(|| {
        let known: Vec<&str> = RecordField::ALL.iter().map(|f| f.as_str()).collect();
        anyhow::anyhow!("Unknown field '{}'. Expected one of: {}", field, known.join(", "))
    })?;

    let store = open_store(config)?;
    let count = store.export_distinct_to_file(field, output)?;
    println!(
        "{} Exported {} unique {} values to {}",
        style("✓").green(),
        count,
        field,
        output.display()
    );
    Ok(())
}

//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod extract;
mod ingest;
mod search;
mod store;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::pipeline::DEFAULT_FIGURE_DIR;
use crate::store::DEFAULT_TOLERANCE;

#[derive(Parser)]
#[command(name = "mzatlas")]
#[command(about = "MALDI imaging figure harvesting and m/z annotation database")]
#[command(version)]
pub struct Cli {
    /// Annotation database CSV (overrides config file)
    #[arg(long, short = 's', global = true, env = "MZATLAS_STORE")]
    store: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Find MALDI figures in PDFs and save them as image files
    ExtractFigures {
        /// PDF files to scan
        #[arg(required = true)]
        pdfs: Vec<PathBuf>,
        /// Output directory (created if absent)
        #[arg(short, long, default_value = DEFAULT_FIGURE_DIR)]
        output: PathBuf,
        /// Minimum classifier confidence (0-100)
        #[arg(long)]
        threshold: Option<f64>,
        /// Full-page render resolution
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// Extract annotations from images, PDFs or image folders into the database
    Ingest {
        /// Image files, PDF files or folders of images
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Literature source tag stored with every record (e.g. a DOI)
        #[arg(long, default_value = "")]
        source: String,
        /// Do not save the database at the end of the run
        #[arg(long)]
        no_save: bool,
        /// Items processed concurrently
        #[arg(short, long)]
        jobs: Option<usize>,
        /// Save the database every N items
        #[arg(long)]
        checkpoint_every: Option<usize>,
        /// Also save accepted PDF figures to this directory
        #[arg(long)]
        save_figures: Option<PathBuf>,
        /// Minimum classifier confidence for PDF figures (0-100)
        #[arg(long)]
        threshold: Option<f64>,
        /// Full-page render resolution for PDFs
        #[arg(long)]
        dpi: Option<u32>,
    },

    /// Search the annotation database
    Search {
        #[command(subcommand)]
        command: SearchCommands,
    },

    /// Show database statistics
    Stats,

    /// Remove duplicate (image, m/z, metabolite) entries and save
    Dedup,

    /// Export the distinct values of one column to a text file
    Export {
        /// Column name (image_filename, mz_value, metabolite_name, tissue_type, literature_source, notes)
        #[arg(default_value = "metabolite_name")]
        field: String,
        /// Output file
        #[arg(short, long, default_value = "metabolite_list.txt")]
        output: PathBuf,
    },

    /// Check that the Poppler tools are installed
    Tools,
}

#[derive(Subcommand)]
enum SearchCommands {
    /// Search by m/z value within a tolerance
    Mz {
        /// m/z value (non-numeric values fall back to text matching)
        value: String,
        /// Tolerance in Da
        #[arg(short, long, default_value_t = DEFAULT_TOLERANCE)]
        tolerance: f64,
        /// Write matches to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search by metabolite name (case-insensitive substring)
    Metabolite {
        name: String,
        /// Write matches to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search by literature source (case-insensitive substring)
    Source {
        source: String,
        /// Write matches to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }

    match cli.command {
        Commands::ExtractFigures {
            pdfs,
            output,
            threshold,
            dpi,
        } => extract::cmd_extract_figures(&config, &pdfs, &output, threshold, dpi).await,
        Commands::Ingest {
            paths,
            source,
            no_save,
            jobs,
            checkpoint_every,
            save_figures,
            threshold,
            dpi,
        } => {
            let overrides = ingest::IngestOverrides {
                jobs,
                checkpoint_every,
                save_figures,
                threshold,
                dpi,
            };
            ingest::cmd_ingest(&config, &paths, &source, !no_save, overrides).await
        }
        Commands::Search { command } => match command {
            SearchCommands::Mz {
                value,
                tolerance,
                output,
            } => search::cmd_search_mz(&config, &value, tolerance, output.as_deref()),
            SearchCommands::Metabolite { name, output } => {
                search::cmd_search_metabolite(&config, &name, output.as_deref())
            }
            SearchCommands::Source { source, output } => {
                search::cmd_search_source(&config, &source, output.as_deref())
            }
        },
        Commands::Stats => store::cmd_stats(&config),
        Commands::Dedup => store::cmd_dedup(&config),
        Commands::Export { field, output } => store::cmd_export(&config, &field, &output),
        Commands::Tools => {
            tools::cmd_tools();
            Ok(())
        }
    }
}

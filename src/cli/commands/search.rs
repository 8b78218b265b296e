//! Database search commands.

use std::path::Path;

use crate::config::Config;

use crate::cli::helpers::{open_store, print_records};

pub fn cmd_search_mz(
    config: &Config,
    value: &str,
    tolerance: f64,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let matches = store.search_by_mz(value, tolerance);
    print_records(&matches, output)
}

pub fn cmd_search_metabolite(
    config: &Config,
    name: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let matches = store.search_by_metabolite(name);
    print_records(&matches, output)
}

pub fn cmd_search_source(
    config: &Config,
    source: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let matches = store.search_by_literature(source);
    print_records(&matches, output)
}

//! CSV-backed annotation store.
//!
//! The whole table lives in memory as a vector of [`AnnotationRecord`]s and
//! is written back only on an explicit [`AnnotationStore::save`]. Numeric
//! m/z lookups go through a derived index rebuilt on each search, so the
//! stored text is never rewritten.

mod stats;

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{AnnotationRecord, RecordField};

pub use stats::StoreStatistics;

/// Default store file name.
pub const DEFAULT_STORE_FILENAME: &str = "maldi_database.csv";

/// Default m/z search tolerance in Da.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// Errors from store I/O.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// In-memory annotation table bound to a CSV file.
#[derive(Debug)]
pub struct AnnotationStore {
    path: PathBuf,
    records: Vec<AnnotationRecord>,
}

impl AnnotationStore {
    /// Load the table at `path`, or start an empty one if the file is missing.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            info!("Initialized new database at {}", path.display());
            return Ok(Self {
                path,
                records: Vec::new(),
            });
        }

        let records = read_records(&path)?;
        info!(
            "Loaded existing database with {} entries from {}",
            records.len(),
            path.display()
        );
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append records in order. No validation or dedup happens here.
    pub fn append(&mut self, records: impl IntoIterator<Item = AnnotationRecord>) {
        self.records.extend(records);
    }

    /// Overwrite the backing file with the full table.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_records(&self.records, &self.path)?;
        info!(
            "Database saved to {} ({} total entries)",
            self.path.display(),
            self.records.len()
        );
        Ok(())
    }

    /// Numeric m/z per row; `None` where the text does not parse.
    pub fn mz_index(&self) -> Vec<Option<f64>> {
        self.records.iter().map(|r| r.mz_numeric()).collect()
    }

    /// Search by m/z.
    ///
    /// A numeric `value` matches rows within `[value - tolerance, value + tolerance]`;
    /// rows whose m/z is not numeric never match. A non-numeric `value` falls
    /// back to a case-insensitive substring match on the raw m/z text.
    pub fn search_by_mz(&self, value: &str, tolerance: f64) -> Vec<&AnnotationRecord> {
        match value.trim().parse::<f64>() {
            Ok(target) => {
                let (low, high) = (target - tolerance, target + tolerance);
                self.records
                    .iter()
                    .zip(self.mz_index())
                    .filter(|(_, mz)| mz.is_some_and(|mz| mz >= low && mz <= high))
                    .map(|(record, _)| record)
                    .collect()
            }
            Err(_) => {
                debug!("m/z query {:?} is not numeric, using text match", value);
                self.search_by_field(RecordField::MzValue, value)
            }
        }
    }

    /// Case-insensitive substring search on one column.
    pub fn search_by_field(&self, field: RecordField, needle: &str) -> Vec<&AnnotationRecord> {
        let needle = needle.to_lowercase();
        self.records
            .iter()
            .filter(|r| r.field(field).to_lowercase().contains(&needle))
            .collect()
    }

    pub fn search_by_metabolite(&self, name: &str) -> Vec<&AnnotationRecord> {
        self.search_by_field(RecordField::MetaboliteName, name)
    }

    pub fn search_by_literature(&self, source: &str) -> Vec<&AnnotationRecord> {
        self.search_by_field(RecordField::LiteratureSource, source)
    }

    /// Summary counts over the table.
    pub fn statistics(&self) -> StoreStatistics {
        StoreStatistics::from_records(&self.records)
    }

    /// Drop rows repeating an earlier `(image_filename, mz_value, metabolite_name)`.
    /// Returns the number of rows removed.
    pub fn deduplicate(&mut self) -> usize {
        let original = self.records.len();
        let kept = {
            let mut seen = HashSet::new();
            self.records
                .iter()
                .filter(|r| seen.insert(r.dedup_key()))
                .cloned()
                .collect::<Vec<_>>()
        };
        self.records = kept;

        let removed = original - self.records.len();
        info!("Removed {} duplicate entries", removed);
        removed
    }

    /// Sorted distinct non-empty values of one column.
    pub fn export_distinct(&self, field: RecordField) -> Vec<String> {
        let mut values: Vec<String> = self
            .records
            .iter()
            .map(|r| r.field(field))
            .filter(|v| !v.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        values.sort();
        values
    }

    /// Write distinct values of `field` to a text file, one per line.
    pub fn export_distinct_to_file(
        &self,
        field: RecordField,
        path: impl AsRef<Path>,
    ) -> Result<usize, StoreError> {
        let values = self.export_distinct(field);
        let mut out = BufWriter::new(File::create(path.as_ref())?);
        for value in &values {
            writeln!(out, "{}", value)?;
        }
        out.flush()?;
        info!(
            "Exported {} unique {} values to {}",
            values.len(),
            field,
            path.as_ref().display()
        );
        Ok(values.len())
    }
}

/// Read every row of a store file.
pub fn read_records(path: &Path) -> Result<Vec<AnnotationRecord>, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Write records with the fixed header, even when there are no rows.
pub fn write_records<'a>(
    records: impl IntoIterator<Item = &'a AnnotationRecord>,
    path: &Path,
) -> Result<(), StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;

    writer.write_record(RecordField::ALL.iter().map(|f| f.as_str()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(image: &str, mz: &str, metabolite: &str) -> AnnotationRecord {
        AnnotationRecord {
            image_filename: image.to_string(),
            mz_value: mz.to_string(),
            metabolite_name: metabolite.to_string(),
            ..Default::default()
        }
    }

    fn store_with(records: Vec<AnnotationRecord>) -> (TempDir, AnnotationStore) {
        let dir = TempDir::new().unwrap();
        let mut store = AnnotationStore::load_or_create(dir.path().join("db.csv")).unwrap();
        store.append(records);
        (dir, store)
    }

    #[test]
    fn test_missing_file_creates_empty_table() {
        let dir = TempDir::new().unwrap();
        let store = AnnotationStore::load_or_create(dir.path().join("absent.csv")).unwrap();
        assert!(store.is_empty());
        assert!(!dir.path().join("absent.csv").exists());
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let (dir, mut store) = store_with(vec![
            AnnotationRecord {
                image_filename: "a.png".to_string(),
                mz_value: "885.50".to_string(),
                metabolite_name: "PI, 38:4".to_string(),
                tissue_type: "Brain".to_string(),
                literature_source: "DOI: 10.1/x".to_string(),
                notes: "quoted \"note\"".to_string(),
            },
            record("b.png", "~760", "PC 34:1"),
            record("c.png", "", ""),
        ]);
        store.append(vec![record("a.png", "184.1", "Choline")]);
        store.save().unwrap();

        let loaded = AnnotationStore::load_or_create(dir.path().join("db.csv")).unwrap();
        assert_eq!(loaded.records(), store.records());
        assert_eq!(loaded.records()[0].mz_value, "885.50");
    }

    #[test]
    fn test_saved_header_order() {
        let (dir, store) = store_with(vec![record("a.png", "1", "x")]);
        store.save().unwrap();
        let text = std::fs::read_to_string(dir.path().join("db.csv")).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "image_filename,mz_value,metabolite_name,tissue_type,literature_source,notes"
        );
    }

    #[test]
    fn test_empty_table_save_writes_header() {
        let (dir, store) = store_with(vec![]);
        store.save().unwrap();
        let loaded = AnnotationStore::load_or_create(dir.path().join("db.csv")).unwrap();
        assert!(loaded.is_empty());
        let text = std::fs::read_to_string(dir.path().join("db.csv")).unwrap();
        assert!(text.starts_with("image_filename,"));
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("db.csv");
        let mut store = AnnotationStore::load_or_create(&path).unwrap();
        store.append(vec![record("a.png", "1", "x")]);
        store.save().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_search_by_mz_tolerance_window() {
        let (_dir, store) = store_with(vec![
            record("a", "885.0", "edge low"),
            record("b", "885.5", "center"),
            record("c", "886.0", "edge high"),
            record("d", "886.01", "outside"),
            record("e", "884.99", "outside"),
            record("f", "n/a", "unparseable"),
            record("g", "", "empty"),
        ]);

        let names: Vec<_> = store
            .search_by_mz("885.5", 0.5)
            .iter()
            .map(|r| r.metabolite_name.as_str())
            .collect();
        assert_eq!(names, vec!["edge low", "center", "edge high"]);
    }

    #[test]
    fn test_search_by_mz_text_fallback() {
        let (_dir, store) = store_with(vec![
            record("a", "~885 Da", "PI"),
            record("b", "885.5", "PI"),
            record("c", "760.6", "PC"),
        ]);
        let results = store.search_by_mz("~885", 0.5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].image_filename, "a");

        let results = store.search_by_mz("DA", 0.5);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_mz_index() {
        let (_dir, store) = store_with(vec![record("a", "1.5", "x"), record("b", "x", "y")]);
        assert_eq!(store.mz_index(), vec![Some(1.5), None]);
        assert_eq!(store.records()[1].mz_value, "x");
    }

    #[test]
    fn test_search_by_field_case_insensitive() {
        let mut pc = record("a", "760.6", "Phosphatidylcholine PC 34:1");
        pc.literature_source = "Nature 2021".to_string();
        let (_dir, store) = store_with(vec![pc, record("b", "184.1", "Choline")]);

        assert_eq!(store.search_by_metabolite("pc").len(), 1);
        assert_eq!(store.search_by_metabolite("CHOLINE").len(), 2);
        assert_eq!(store.search_by_literature("nature").len(), 1);
        assert!(store.search_by_literature("science").is_empty());
    }

    #[test]
    fn test_deduplicate_keeps_first_and_is_idempotent() {
        let mut first = record("a", "184.1", "Choline");
        first.notes = "first".to_string();
        let mut dup = record("a", "184.1", "Choline");
        dup.notes = "second".to_string();

        let (_dir, mut store) = store_with(vec![
            first,
            record("b", "885.5", "PI"),
            dup,
            record("a", "184.10", "Choline"),
            record("b", "885.5", "PI"),
        ]);

        assert_eq!(store.deduplicate(), 2);
        let once = store.records().to_vec();
        assert_eq!(once.len(), 3);
        assert_eq!(once[0].notes, "first");
        assert_eq!(once[1].image_filename, "b");
        assert_eq!(once[2].mz_value, "184.10");

        assert_eq!(store.deduplicate(), 0);
        assert_eq!(store.records(), once.as_slice());
    }

    #[test]
    fn test_export_distinct_sorted() {
        let (dir, store) = store_with(vec![
            record("a", "1", "PI"),
            record("b", "2", "Choline"),
            record("c", "3", "PI"),
            record("d", "4", ""),
        ]);
        assert_eq!(
            store.export_distinct(RecordField::MetaboliteName),
            vec!["Choline", "PI"]
        );

        let out = dir.path().join("metabolites.txt");
        let count = store
            .export_distinct_to_file(RecordField::MetaboliteName, &out)
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(std::fs::read_to_string(out).unwrap(), "Choline\nPI\n");
    }

    #[test]
    fn test_load_file_with_missing_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("legacy.csv");
        std::fs::write(
            &path,
            "image_filename,mz_value,metabolite_name\nfig.png,184.1,Choline\n",
        )
        .unwrap();

        let store = AnnotationStore::load_or_create(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].metabolite_name, "Choline");
        assert_eq!(store.records()[0].tissue_type, "");
    }
}

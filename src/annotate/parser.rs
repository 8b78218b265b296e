//! Heuristic parser for extraction replies.
//!
//! The service is asked for lines of the form
//! `m/z: 184.1 | Metabolite: Choline | Tissue: Liver | Notes: confirmed`,
//! but replies drift: extra prose, markdown bullets, bold labels, missing
//! fields. Only lines mentioning `m/z` are considered, and a line becomes a
//! record only when both an m/z value and a metabolite name were found.

use thiserror::Error;
use tracing::debug;

use crate::models::AnnotationRecord;

/// A candidate line that produced no record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {line:?}")]
pub struct ParseWarning {
    pub line: String,
    pub reason: String,
}

/// Records and warnings from one reply.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<AnnotationRecord>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKey {
    Mz,
    Metabolite,
    Tissue,
    Notes,
}

/// Label keywords in match priority order.
const KEYWORDS: [(&str, FieldKey); 4] = [
    ("m/z", FieldKey::Mz),
    ("metabolite", FieldKey::Metabolite),
    ("tissue", FieldKey::Tissue),
    ("notes", FieldKey::Notes),
];

#[derive(Debug, Default)]
struct LineFields {
    mz: String,
    metabolite: String,
    tissue: String,
    notes: String,
}

/// Parse an extraction reply into records, logging skipped lines.
pub fn parse_response(
    text: &str,
    image_filename: &str,
    literature_source: &str,
) -> Vec<AnnotationRecord> {
    let outcome = parse_response_with_warnings(text, image_filename, literature_source);
    for warning in &outcome.warnings {
        debug!("Skipping annotation line from {}: {}", image_filename, warning);
    }
    outcome.records
}

/// Parse an extraction reply, returning skipped lines alongside the records.
///
/// Every candidate line that does not become a record yields one warning.
pub fn parse_response_with_warnings(
    text: &str,
    image_filename: &str,
    literature_source: &str,
) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for line in text.lines().filter(|l| is_candidate(l)) {
        let fields = parse_line(line);
        let record = AnnotationRecord {
            image_filename: image_filename.to_string(),
            mz_value: fields.mz,
            metabolite_name: fields.metabolite,
            tissue_type: fields.tissue,
            literature_source: literature_source.to_string(),
            notes: fields.notes,
        };

        if record.is_valid() {
            outcome.records.push(record);
        } else {
            let reason = if record.mz_value.is_empty() {
                "missing m/z value"
            } else {
                "missing metabolite name"
            };
            outcome.warnings.push(ParseWarning {
                line: line.to_string(),
                reason: reason.to_string(),
            });
        }
    }

    outcome
}

fn is_candidate(line: &str) -> bool {
    line.to_lowercase().contains("m/z")
}

/// Split a line into fields. A field without `:` serves as both label
/// and value.
fn parse_line(line: &str) -> LineFields {
    let mut fields = LineFields::default();
    for part in line.split('|').map(str::trim).filter(|p| !p.is_empty()) {
        let (label, value) = match part.rsplit_once(':') {
            Some((label, value)) => (label.trim(), value.trim()),
            None => (part, part),
        };

        let label = label.to_lowercase();
        let Some(key) = KEYWORDS
            .iter()
            .find(|(keyword, _)| label.contains(keyword))
            .map(|(_, key)| *key)
        else {
            continue;
        };

        let slot = match key {
            FieldKey::Mz => &mut fields.mz,
            FieldKey::Metabolite => &mut fields.metabolite,
            FieldKey::Tissue => &mut fields.tissue,
            FieldKey::Notes => &mut fields.notes,
        };
        *slot = value.to_string();
    }

    fields
}

//! Store summary statistics.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::AnnotationRecord;

/// Summary counts over an annotation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    pub total_entries: usize,
    /// Distinct non-empty metabolite names.
    pub unique_metabolites: usize,
    /// Distinct non-empty image filenames.
    pub unique_images: usize,
    /// Row count per non-empty tissue type.
    pub tissue_types: BTreeMap<String, usize>,
}

impl StoreStatistics {
    pub fn from_records(records: &[AnnotationRecord]) -> Self {
        let distinct = |f: fn(&AnnotationRecord) -> &str| {
            records
                .iter()
                .map(f)
                .filter(|v| !v.is_empty())
                .collect::<HashSet<_>>()
                .len()
        };

        let mut tissue_types = BTreeMap::new();
        for tissue in records
            .iter()
            .map(|r| r.tissue_type.as_str())
            .filter(|t| !t.is_empty())
        {
            *tissue_types.entry(tissue.to_string()).or_insert(0) += 1;
        }

        Self {
            total_entries: records.len(),
            unique_metabolites: distinct(|r| r.metabolite_name.as_str()),
            unique_images: distinct(|r| r.image_filename.as_str()),
            tissue_types,
        }
    }

    /// Tissue types ordered by descending count, then name.
    pub fn tissue_types_by_count(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<_> = self
            .tissue_types
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(image: &str, metabolite: &str, tissue: &str) -> AnnotationRecord {
        AnnotationRecord {
            image_filename: image.to_string(),
            mz_value: "1".to_string(),
            metabolite_name: metabolite.to_string(),
            tissue_type: tissue.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_statistics() {
        let stats = StoreStatistics::from_records(&[
            record("a.png", "Choline", "Liver"),
            record("a.png", "PI", "Liver"),
            record("b.png", "Choline", "Brain"),
            record("c.png", "Heme", ""),
        ]);

        assert_eq!(stats.total_entries, 4);
        assert_eq!(stats.unique_metabolites, 3);
        assert_eq!(stats.unique_images, 3);
        assert_eq!(stats.tissue_types.len(), 2);
        assert_eq!(stats.tissue_types["Liver"], 2);
        assert_eq!(stats.tissue_types["Brain"], 1);
        assert_eq!(
            stats.tissue_types_by_count(),
            vec![("Liver", 2), ("Brain", 1)]
        );
    }

    #[test]
    fn test_empty_statistics() {
        assert_eq!(StoreStatistics::from_records(&[]), StoreStatistics::default());
    }
}

//! Annotation record model.

use serde::{Deserialize, Serialize};

/// One annotated peak read off a MALDI figure.
///
/// Every field is kept as text. `mz_value` in particular is stored exactly as
/// the annotation service wrote it; numeric interpretation happens on demand
/// in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Name of the figure file the annotation came from.
    #[serde(default)]
    pub image_filename: String,
    /// Mass-to-charge ratio as written in the figure.
    #[serde(default)]
    pub mz_value: String,
    /// Metabolite or molecule name.
    #[serde(default)]
    pub metabolite_name: String,
    /// Tissue type, if one was mentioned.
    #[serde(default)]
    pub tissue_type: String,
    /// Provenance tag supplied by the caller (DOI, citation, ...).
    #[serde(default)]
    pub literature_source: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
}

impl AnnotationRecord {
    /// Numeric m/z, if the stored text parses as a float.
    pub fn mz_numeric(&self) -> Option<f64> {
        self.mz_value.trim().parse::<f64>().ok()
    }

    /// Whether the record satisfies the creation invariant.
    pub fn is_valid(&self) -> bool {
        !self.mz_value.trim().is_empty() && !self.metabolite_name.trim().is_empty()
    }

    /// Key used to detect duplicates.
    pub fn dedup_key(&self) -> (&str, &str, &str) {
        (&self.image_filename, &self.mz_value, &self.metabolite_name)
    }

    /// Value of a single column.
    pub fn field(&self, field: RecordField) -> &str {
        match field {
            RecordField::ImageFilename => &self.image_filename,
            RecordField::MzValue => &self.mz_value,
            RecordField::MetaboliteName => &self.metabolite_name,
            RecordField::TissueType => &self.tissue_type,
            RecordField::LiteratureSource => &self.literature_source,
            RecordField::Notes => &self.notes,
        }
    }
}

/// Columns of the annotation table, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    ImageFilename,
    MzValue,
    MetaboliteName,
    TissueType,
    LiteratureSource,
    Notes,
}

impl RecordField {
    /// All columns in the order they appear in the store file.
    pub const ALL: [RecordField; 6] = [
        RecordField::ImageFilename,
        RecordField::MzValue,
        RecordField::MetaboliteName,
        RecordField::TissueType,
        RecordField::LiteratureSource,
        RecordField::Notes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageFilename => "image_filename",
            Self::MzValue => "mz_value",
            Self::MetaboliteName => "metabolite_name",
            Self::TissueType => "tissue_type",
            Self::LiteratureSource => "literature_source",
            Self::Notes => "notes",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image_filename" | "image" | "filename" => Some(Self::ImageFilename),
            "mz_value" | "mz" | "m/z" => Some(Self::MzValue),
            "metabolite_name" | "metabolite" => Some(Self::MetaboliteName),
            "tissue_type" | "tissue" => Some(Self::TissueType),
            "literature_source" | "source" | "literature" => Some(Self::LiteratureSource),
            "notes" => Some(Self::Notes),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

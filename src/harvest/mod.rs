//! Figure harvesting from PDF publications.
//!
//! Candidate figures come from two places:
//! - raster images embedded in the document (`pdfimages`)
//! - full-page renders, which catch figures drawn as vector graphics (`pdftoppm`)
//!
//! Both use the Poppler command-line tools.

mod poppler;
mod tools;

use std::path::Path;

use thiserror::Error;

pub use poppler::{PopplerHarvester, DEFAULT_DPI};
pub use tools::check_binary;

/// Errors that fail a whole document harvest.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Unreadable document {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a harvested image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    /// Raster object embedded in the PDF.
    Embedded,
    /// Rasterization of an entire page.
    FullPage,
}

impl ImageOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedded => "embedded",
            Self::FullPage => "full",
        }
    }
}

/// A candidate figure pulled out of a PDF.
#[derive(Debug, Clone)]
pub struct HarvestedImage {
    /// 1-based page number.
    pub page_number: u32,
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// File extension describing the encoding (e.g. "png", "jpg").
    pub format: String,
    pub origin: ImageOrigin,
}

impl HarvestedImage {
    /// File name used when the figure is saved or recorded:
    /// `{stem}_page{n}_embedded.{ext}` or `{stem}_page{n}_full.png`.
    pub fn figure_name(&self, pdf_stem: &str) -> String {
        match self.origin {
            ImageOrigin::Embedded => format!(
                "{}_page{}_embedded.{}",
                pdf_stem, self.page_number, self.format
            ),
            ImageOrigin::FullPage => format!("{}_page{}_full.png", pdf_stem, self.page_number),
        }
    }
}

/// Source of candidate figures for a PDF.
pub trait FigureSource: Send + Sync {
    /// All raster images embedded in the document, in page order.
    fn extract_embedded(&self, pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError>;

    /// One PNG render per page, in page order.
    fn render_pages(&self, pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError>;

    /// Embedded images followed by page renders.
    fn harvest(&self, pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError> {
        let mut images = self.extract_embedded(pdf)?;
        images.extend(self.render_pages(pdf)?);
        Ok(images)
    }
}

/// Stem of a PDF path, used as the prefix of figure names.
pub fn pdf_stem(pdf: &Path) -> String {
    pdf.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(page: u32, format: &str, origin: ImageOrigin) -> HarvestedImage {
        HarvestedImage {
            page_number: page,
            bytes: vec![1, 2, 3],
            format: format.to_string(),
            origin,
        }
    }

    #[test]
    fn test_figure_name() {
        assert_eq!(
            image(3, "jpg", ImageOrigin::Embedded).figure_name("paper"),
            "paper_page3_embedded.jpg"
        );
        assert_eq!(
            image(12, "png", ImageOrigin::FullPage).figure_name("paper"),
            "paper_page12_full.png"
        );
    }

    #[test]
    fn test_pdf_stem() {
        assert_eq!(pdf_stem(Path::new("/tmp/papers/smith2021.pdf")), "smith2021");
        assert_eq!(pdf_stem(Path::new("notes.v2.pdf")), "notes.v2");
    }

    struct FixedSource;

    impl FigureSource for FixedSource {
        fn extract_embedded(&self, _pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError> {
            Ok(vec![image(1, "jpg", ImageOrigin::Embedded)])
        }

        fn render_pages(&self, _pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError> {
            Ok(vec![
                image(1, "png", ImageOrigin::FullPage),
                image(2, "png", ImageOrigin::FullPage),
            ])
        }
    }

    #[test]
    fn test_harvest_orders_embedded_first() {
        let images = FixedSource.harvest(Path::new("x.pdf")).unwrap();
        let origins: Vec<_> = images.iter().map(|i| i.origin).collect();
        assert_eq!(
            origins,
            vec![
                ImageOrigin::Embedded,
                ImageOrigin::FullPage,
                ImageOrigin::FullPage
            ]
        );
    }
}

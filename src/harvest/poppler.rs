//! Poppler-backed figure harvester.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;

use super::tools::{check_binary, handle_cmd_output};
use super::{DocumentError, FigureSource, HarvestedImage, ImageOrigin};

/// Default render resolution for full-page images.
pub const DEFAULT_DPI: u32 = 300;

/// Prefix handed to pdfimages/pdftoppm inside the scratch directory.
const EMBEDDED_PREFIX: &str = "img";
const PAGE_PREFIX: &str = "page";

/// Formats kept from `pdfimages -png -j`. Anything else it writes (side
/// files, unexpected encodings) cannot be sent to the vision service.
const EMBEDDED_FORMATS: &[&str] = &["png", "jpg", "jpeg"];

/// Harvests figures with `pdfimages` and `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerHarvester {
    dpi: u32,
}

impl Default for PopplerHarvester {
    fn default() -> Self {
        Self { dpi: DEFAULT_DPI }
    }
}

impl PopplerHarvester {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the full-page render resolution.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Get the page count of a PDF.
    pub fn page_count(&self, pdf: &Path) -> Result<u32, DocumentError> {
        ensure_readable(pdf)?;
        let output = Command::new("pdfinfo").arg(pdf).output();
        let stdout = handle_cmd_output(
            output,
            "pdfinfo (install poppler-utils)",
            &pdf.display().to_string(),
        )?;

        stdout
            .lines()
            .find(|line| line.starts_with("Pages:"))
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| DocumentError::Unreadable {
                path: pdf.display().to_string(),
                reason: "pdfinfo reported no page count".to_string(),
            })
    }

    /// Check if required tools are available.
    pub fn check_tools() -> Vec<(String, bool)> {
        ["pdfinfo", "pdfimages", "pdftoppm"]
            .iter()
            .map(|tool| (tool.to_string(), check_binary(tool)))
            .collect()
    }
}

impl FigureSource for PopplerHarvester {
    fn extract_embedded(&self, pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError> {
        ensure_readable(pdf)?;
        let temp_dir = TempDir::new()?;

        let output = Command::new("pdfimages")
            .args(["-png", "-j", "-p"])
            .arg(pdf)
            .arg(temp_dir.path().join(EMBEDDED_PREFIX))
            .output();
        handle_cmd_output(
            output,
            "pdfimages (install poppler-utils)",
            &pdf.display().to_string(),
        )?;

        let found = embedded_candidates(list_files(temp_dir.path())?);

        let mut images = Vec::with_capacity(found.len());
        for (page, _, format, path) in found {
            images.push(HarvestedImage {
                page_number: page,
                bytes: std::fs::read(&path)?,
                format,
                origin: ImageOrigin::Embedded,
            });
        }

        debug!(
            "Extracted {} embedded images from {}",
            images.len(),
            pdf.display()
        );
        Ok(images)
    }

    fn render_pages(&self, pdf: &Path) -> Result<Vec<HarvestedImage>, DocumentError> {
        ensure_readable(pdf)?;
        let temp_dir = TempDir::new()?;

        let dpi = self.dpi.to_string();
        let output = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi])
            .arg(pdf)
            .arg(temp_dir.path().join(PAGE_PREFIX))
            .output();
        handle_cmd_output(
            output,
            "pdftoppm (install poppler-utils)",
            &pdf.display().to_string(),
        )?;

        let mut pages: Vec<(u32, PathBuf)> = list_files(temp_dir.path())?
            .into_iter()
            .filter_map(|path| {
                let page = parse_page_name(path.file_name()?.to_str()?)?;
                Some((page, path))
            })
            .collect();
        pages.sort_by_key(|(page, _)| *page);

        let mut images = Vec::with_capacity(pages.len());
        for (page, path) in pages {
            images.push(HarvestedImage {
                page_number: page,
                bytes: std::fs::read(&path)?,
                format: "png".to_string(),
                origin: ImageOrigin::FullPage,
            });
        }

        debug!(
            "Rendered {} pages of {} at {} dpi",
            images.len(),
            pdf.display(),
            self.dpi
        );
        Ok(images)
    }
}

fn ensure_readable(pdf: &Path) -> Result<(), DocumentError> {
    if pdf.is_file() {
        Ok(())
    } else {
        Err(DocumentError::Unreadable {
            path: pdf.display().to_string(),
            reason: "file not found".to_string(),
        })
    }
}

fn list_files(dir: &Path) -> Result<Vec<PathBuf>, DocumentError> {
    Ok(std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect())
}

/// Embedded image files in a sendable format, ordered by (page, index).
fn embedded_candidates(files: Vec<PathBuf>) -> Vec<(u32, u32, String, PathBuf)> {
    let mut found: Vec<(u32, u32, String, PathBuf)> = files
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            let (page, index, ext) = parse_embedded_name(&name)?;
            if !EMBEDDED_FORMATS.contains(&ext.as_str()) {
                debug!("Skipping embedded image {} (unsupported format)", name);
                return None;
            }
            Some((page, index, ext, path))
        })
        .collect();
    found.sort_by_key(|(page, index, _, _)| (*page, *index));
    found
}

/// Parse `img-PPP-NNN.ext` as written by `pdfimages -p`.
fn parse_embedded_name(name: &str) -> Option<(u32, u32, String)> {
    let rest = name.strip_prefix(EMBEDDED_PREFIX)?.strip_prefix('-')?;
    let (stem, ext) = rest.rsplit_once('.')?;
    let (page, index) = stem.split_once('-')?;
    Some((page.parse().ok()?, index.parse().ok()?, ext.to_lowercase()))
}

/// Parse `page-N.png` as written by `pdftoppm`. The page number is
/// zero-padded to the width of the last page number.
fn parse_page_name(name: &str) -> Option<u32> {
    let rest = name.strip_prefix(PAGE_PREFIX)?.strip_prefix('-')?;
    let page = rest.strip_suffix(".png")?;
    page.parse().ok()
}

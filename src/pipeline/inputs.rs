//! Turning command-line paths into batch items.

use std::path::{Path, PathBuf};

use tracing::info;

use super::types::InputItem;

/// Image extensions picked up from folders.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Images directly inside `folder`, sorted by path.
pub fn collect_images(folder: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && has_image_extension(p))
        .collect();
    images.sort();
    info!("Found {} images in {}", images.len(), folder.display());
    Ok(images)
}

/// Expand folders into their images; every other path becomes one item.
/// Paths that do not exist are kept so the run reports them as failures.
pub fn expand_inputs(paths: &[PathBuf]) -> std::io::Result<Vec<InputItem>> {
    let mut items = Vec::new();
    for path in paths {
        if path.is_dir() {
            items.extend(collect_images(path)?.into_iter().map(InputItem::Image));
        } else {
            items.push(InputItem::from_path(path.clone()));
        }
    }
    Ok(items)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collect_images_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.png", "a.JPG", "c.webp", "notes.txt", "paper.pdf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let images = collect_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.webp"]);
    }

    #[test]
    fn test_expand_inputs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fig.png"), b"x").unwrap();
        let paper = dir.path().join("paper.pdf");
        std::fs::write(&paper, b"%PDF").unwrap();

        let items = expand_inputs(&[
            dir.path().to_path_buf(),
            paper.clone(),
            PathBuf::from("/missing/fig.jpg"),
        ])
        .unwrap();

        assert_eq!(
            items,
            vec![
                InputItem::Image(dir.path().join("fig.png")),
                InputItem::Pdf(paper),
                InputItem::Image(PathBuf::from("/missing/fig.jpg")),
            ]
        );
    }
}

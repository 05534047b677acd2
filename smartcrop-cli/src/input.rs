//! Input collection.

use std::path::{Path, PathBuf};

use anyhow::Result;
use log::debug;
use smartcrop_core::BatchItem;
use walkdir::WalkDir;

use crate::manifest::ManifestDetector;

pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Collect all image paths from a file or directory.
pub fn collect_images(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if !path.is_dir() {
        anyhow::bail!(
            "input path is neither file nor directory: {}",
            path.display()
        );
    }

    let mut images = Vec::new();
    for entry in WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        if let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) {
            let ext_lower = ext.to_ascii_lowercase();
            if IMAGE_EXTENSIONS.contains(&ext_lower.as_str()) {
                images.push(entry.path().to_path_buf());
            } else {
                debug!("Skipping non-image file {}", entry.path().display());
            }
        }
    }
    images.sort();
    Ok(images)
}

/// Batch items for every image under `path`, named from the manifest where it has a name.
pub fn collect_batch_items(path: &Path, manifest: &ManifestDetector) -> Result<Vec<BatchItem>> {
    let images = collect_images(path)?;
    if images.is_empty() {
        anyhow::bail!(
            "no images found at {} (supported extensions: {})",
            path.display(),
            IMAGE_EXTENSIONS.join(", ")
        );
    }
    Ok(images
        .into_iter()
        .map(|image| {
            let csv_name = manifest.name_for(&image).map(str::to_string);
            let item = BatchItem::from_path(image);
            match csv_name {
                Some(name) => item.with_csv_name(name),
                None => item,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn walks_recursively_and_sorts() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("nested")).expect("mkdir");
        for name in ["b.PNG", "a.jpg", "nested/c.webp", "notes.txt", "noext"] {
            fs::write(dir.path().join(name), b"x").expect("write");
        }
        let images = collect_images(dir.path()).expect("collect");
        let names: Vec<_> = images
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .expect("under root")
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.PNG", "nested/c.webp"]);
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(collect_images(Path::new("definitely/not/here")).is_err());
    }

    #[test]
    fn empty_directory_has_no_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manifest = ManifestDetector::default();
        assert!(collect_batch_items(dir.path(), &manifest).is_err());
    }

    #[test]
    fn manifest_names_attach_to_items() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("a.jpg"), b"x").expect("write");
        let manifest =
            ManifestDetector::from_json(r#"{"names": {"a.jpg": "Ada"}}"#).expect("manifest");
        let items = collect_batch_items(dir.path(), &manifest).expect("items");
        assert_eq!(items[0].csv_name.as_deref(), Some("Ada"));
        assert_eq!(items[0].original_name, "a");
    }
}

//! Writing rendered crops to the output directory.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde::Serialize;
use smartcrop_core::CropResult;
use smartcrop_utils::{append_suffix_to_filename, write_output};

/// One file written (or not) for a crop.
#[derive(Debug, Clone, Serialize)]
pub struct WrittenCrop {
    pub source_image_id: String,
    pub face_id: usize,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Write every crop into `output_dir`.
///
/// Names that repeat within the run get `_2`, `_3`, ... before the extension. A failed
/// write is logged and reported without stopping the remaining writes.
pub fn write_crops(output_dir: &Path, crops: &[CropResult]) -> Vec<WrittenCrop> {
    let mut taken = HashSet::new();
    let mut written = Vec::with_capacity(crops.len());
    for crop in crops {
        let name = unique_name(&crop.filename, &mut taken);
        let path = output_dir.join(&name);
        let error = match write_output(&path, &crop.bytes) {
            Ok(()) => None,
            Err(err) => {
                warn!(
                    "Failed to save face {} from {}: {err:#}",
                    crop.face_id, crop.source_image_id
                );
                Some(format!("{err:#}"))
            }
        };
        written.push(WrittenCrop {
            source_image_id: crop.source_image_id.clone(),
            face_id: crop.face_id,
            path,
            error,
        });
    }
    let ok = written.iter().filter(|w| w.error.is_none()).count();
    info!("Saved {ok} crop(s) to {}", output_dir.display());
    written
}

fn unique_name(name: &str, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 2;
    while !taken.insert(candidate.to_ascii_lowercase()) {
        candidate = append_suffix_to_filename(name, &format!("_{n}"));
        n += 1;
    }
    candidate
}

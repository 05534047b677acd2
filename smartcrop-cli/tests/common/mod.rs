/// Common test utilities and macros for CLI integration tests
use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use image::{Rgba, RgbaImage};

/// Synthetic portrait: dark background with a sharp checkerboard "face" at (80, 60, 120x140).
pub fn write_portrait(path: &Path) {
    let mut img = RgbaImage::from_pixel(320, 240, Rgba([20, 24, 28, 255]));
    for y in 60..200 {
        for x in 80..200 {
            let v = if (x / 2 + y / 2) % 2 == 0 { 220 } else { 40 };
            img.put_pixel(x, y, Rgba([v, v.saturating_sub(20), v / 2, 255]));
        }
    }
    img.save(path).expect("write portrait");
}

pub fn write_manifest(path: &Path, json: &str) {
    fs::write(path, json).expect("write manifest");
}

/// Run the binary from `cwd` so no stray default settings file is picked up.
pub fn run_cli(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_smartcrop-cli"))
        .current_dir(cwd)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run smartcrop-cli")
}

#[allow(dead_code)]
pub fn read_report(path: &Path) -> serde_json::Value {
    let text = fs::read_to_string(path).expect("read report");
    serde_json::from_str(&text).expect("report JSON")
}

#[allow(dead_code)]
pub fn output_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read output dir")
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Macro to set up a temp workspace with an input directory, output directory and manifest path.
///
/// Creates:
/// - `temp_dir: TempDir` - temporary directory
/// - `input_dir: PathBuf` - directory for source images
/// - `output_dir: PathBuf` - directory for crops (not created)
/// - `manifest: PathBuf` - path for the detection manifest
#[macro_export]
macro_rules! cli_test_setup {
    () => {{
        let temp_dir = tempfile::TempDir::new().expect("create temp dir");
        let input_dir = temp_dir.path().join("input");
        std::fs::create_dir_all(&input_dir).expect("create input dir");
        let output_dir = temp_dir.path().join("output");
        let manifest = temp_dir.path().join("faces.json");
        (temp_dir, input_dir, output_dir, manifest)
    }};
}

#[allow(dead_code)]
pub fn path_str(path: &PathBuf) -> &str {
    path.to_str().expect("utf-8 path")
}

mod args;
mod config;
mod enhancement;
mod export;
mod input;
mod manifest;

use std::{
    fs::{self, File},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use serde::Serialize;
use smartcrop_core::{
    BatchOptions, BatchOrchestrator, BatchReport, CropRenderer, DetectionRunner,
};
use smartcrop_utils::{configure_telemetry, init_logging, normalize_path};

use crate::{
    args::CropArgs,
    config::{apply_cli_overrides, build_core_crop_settings, load_settings},
    enhancement::build_enhancement_settings,
    export::{WrittenCrop, write_crops},
    input::collect_batch_items,
    manifest::ManifestDetector,
};

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    #[serde(flatten)]
    report: &'a BatchReport,
    outputs: Vec<WrittenCrop>,
}

fn main() -> Result<()> {
    init_logging(log::LevelFilter::Info)?;
    let args = CropArgs::parse();

    let mut settings = load_settings(args.config.as_ref())?;
    apply_cli_overrides(&mut settings, &args);
    configure_telemetry(
        settings.telemetry.enabled,
        settings.telemetry.level_filter(),
    );

    if let Some(path) = args.save_config.as_ref() {
        settings.save_to_path(path)?;
        info!("Saved effective settings to {}", path.display());
    }

    let input_path = normalize_path(&args.input)?;
    let manifest_path = normalize_path(&args.detections)?;
    fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            args.output_dir.display()
        )
    })?;
    let output_dir = normalize_path(&args.output_dir)?;

    let detector = ManifestDetector::load(&manifest_path)?;
    let items = collect_batch_items(&input_path, &detector)?;

    let crop_settings = build_core_crop_settings(&settings.crop);
    info!(
        "Cropping {} image(s) to {}x{} ({}, face {}%)",
        items.len(),
        crop_settings.output_width,
        crop_settings.output_height,
        crop_settings.positioning_mode,
        crop_settings.face_height_pct
    );
    let enhancement = build_enhancement_settings(&settings.enhance);
    if enhancement.is_some() {
        info!("Enhancement enabled (preset: {})", settings.enhance.preset);
    }

    let batch = &settings.batch;
    let runner = DetectionRunner::new(Arc::new(detector))
        .with_timeout(Duration::from_millis(batch.detection_timeout_ms.max(1)))
        .with_retry(
            batch.detection_attempts,
            Duration::from_millis(batch.detection_backoff_ms),
        );
    let orchestrator =
        BatchOrchestrator::new(runner, CropRenderer::new(crop_settings, enhancement))
            .with_quality_filter(settings.quality_rules.to_filter())
            .with_options(BatchOptions::from(batch))
            .with_progress(|progress| {
                debug!(
                    "{:?} {}/{}: {}",
                    progress.stage, progress.completed, progress.total, progress.item_id
                );
            });

    let report = orchestrator.run(&items);
    let outputs = write_crops(&output_dir, &report.crops);

    let summary = RunSummary {
        report: &report,
        outputs,
    };
    if let Some(json_path) = args.json.as_ref() {
        if let Some(dir) = json_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory {}", dir.display()))?;
        }
        let file = File::create(json_path)
            .with_context(|| format!("failed to create {}", json_path.display()))?;
        serde_json::to_writer_pretty(file, &summary)
            .with_context(|| format!("failed to write report JSON to {}", json_path.display()))?;
        info!("Wrote report to {}", json_path.display());
    } else {
        let json = serde_json::to_string_pretty(&summary).context("failed to serialize report")?;
        println!("{json}");
    }

    if report.images_failed > 0 {
        warn!(
            "{} of {} image(s) failed",
            report.images_failed, report.images_total
        );
    }
    if report.images_processed == 0 {
        anyhow::bail!("no image could be processed");
    }
    Ok(())
}

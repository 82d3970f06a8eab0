//! The organize run: list the root, classify each file, move it into its
//! category folder.
//!
//! Strictly sequential. A failure while handling one file is reported and
//! counted, and the loop moves on; only failing to list the root aborts.

use std::time::Instant;

use anyhow::Context;
use drivesort_ai::Cascade;
use drivesort_core::{Category, ClassificationResult, OrganizerConfig};
use drivesort_drive::{DriveFile, FolderResolver, Storage, acquire_text};
use tracing::{info, warn};

use crate::report::RunSummary;

/// Where a classified file goes, and whether it was flagged for review.
pub fn route(result: &ClassificationResult, config: &OrganizerConfig) -> (Category, bool) {
    if result.confidence < config.confidence_threshold {
        (config.taxonomy.fallback().clone(), true)
    } else {
        (result.category.clone(), false)
    }
}

pub async fn organize(
    storage: &dyn Storage,
    cascade: &Cascade,
    config: &OrganizerConfig,
) -> anyhow::Result<RunSummary> {
    let start = Instant::now();

    println!("Fetching files from Google Drive root...");
    let files = storage
        .list_files()
        .await
        .context("listing files in the Drive root")?;
    println!("Found {} files.", files.len());

    let mut folders = FolderResolver::new();
    let mut summary = RunSummary::default();

    for file in &files {
        if file.is_folder() {
            println!("  [Skipping] Folder: {}", file.name);
            summary.skipped += 1;
            continue;
        }
        process_file(storage, cascade, config, &mut folders, &mut summary, file).await;
    }

    summary.elapsed = start.elapsed();
    info!(
        processed = summary.processed,
        moved = summary.moved,
        failed = summary.failed,
        "organize run complete"
    );
    Ok(summary)
}

async fn process_file(
    storage: &dyn Storage,
    cascade: &Cascade,
    config: &OrganizerConfig,
    folders: &mut FolderResolver,
    summary: &mut RunSummary,
    file: &DriveFile,
) {
    println!("\nProcessing: {} ({})", file.name, file.mime_type);
    summary.processed += 1;

    // Free-tier cloud quotas allow roughly 15 requests per minute.
    tokio::time::sleep(config.request_delay).await;

    let text = acquire_text(storage, file).await;

    println!("  Classifying...");
    let result = cascade.classify(&file.name, &text).await;
    println!(
        "  Result: {} (Confidence: {}%) [Method: {}]",
        result.category, result.confidence, result.method
    );
    summary.record_method(&result.method);

    let (target, flagged) = route(&result, config);
    if flagged {
        println!(
            "  Low confidence (<{}). Flagging for review.",
            config.confidence_threshold
        );
    }

    let folder_id = match folders.resolve(storage, &target).await {
        Ok(id) => id,
        Err(e) => {
            warn!(
                file = %file.name,
                category = %target,
                error = %e,
                "cannot resolve target folder"
            );
            println!("  [FAIL] Could not get target folder ID.");
            summary.failed += 1;
            return;
        }
    };

    match storage.move_file(&file.id, &folder_id).await {
        Ok(()) => {
            let verb = if config.dry_run { "Would move" } else { "Moved" };
            println!("  [SUCCESS] {verb} to '{target}'");
            summary.moved += 1;
            if target.is_fallback() {
                summary.flagged += 1;
            }
        }
        Err(e) => {
            warn!(file = %file.name, error = %e, "move failed");
            println!("  [FAIL] Failed to move file.");
            summary.failed += 1;
        }
    }
}

use serde::Serialize;
use crate::archive::SuccessArchive;
use crate::cli::commands::StatusArgs;
use crate::cli::target::resolve_config;
use crate::errors::HarnessError;
use crate::models::RunMode;
use crate::pipeline::load_batch;
use crate::progress::ProgressStore;

#[derive(Debug, Serialize)]
struct ModeStatus {
    mode: RunMode,
    cursor: usize,
    total: usize,
    remaining: usize,
    progress_file: String,
}

#[derive(Debug, Serialize)]
struct ProductStatus {
    base_dir: String,
    exploratory: ModeStatus,
    verification: ModeStatus,
    unique: usize,
}

async fn mode_status(progress: &ProgressStore, mode: RunMode, total: usize) -> ModeStatus {
    let cursor = progress.load(mode).await;
    ModeStatus {
        mode,
        cursor,
        total,
        remaining: total.saturating_sub(cursor),
        progress_file: progress.path(mode).display().to_string(),
    }
}

/// Report both cursors against the current batch sizes. Reads only.
pub async fn handle_status(args: StatusArgs) -> Result<(), HarnessError> {
    let config = resolve_config(&args.target).await?;
    let progress = ProgressStore::for_config(&config);
    let archive = SuccessArchive::new(&config.archive_dir, &config.script_extension);

    let pocs = load_batch(&config.poc_dir, &config.script_extension)?;
    let archived = archive.list()?;
    let unique = load_batch(&config.unique_dir, &config.script_extension)?;

    let exploratory = mode_status(&progress, RunMode::Exploratory, pocs.len()).await;
    let verification = mode_status(&progress, RunMode::Verification, archived.len()).await;

    let status = ProductStatus {
        base_dir: config.base_dir.display().to_string(),
        exploratory,
        verification,
        unique: unique.len(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Product: {}", status.base_dir);
        for m in [&status.exploratory, &status.verification] {
            println!(
                "  {:<12} {}/{} ({} remaining)  {}",
                m.mode.as_str(), m.cursor, m.total, m.remaining, m.progress_file
            );
        }
        println!("  {:<12} {}", "unique", status.unique);
    }
    Ok(())
}

use crate::cli::commands::TargetArgs;
use crate::cli::target::resolve_config;
use crate::errors::HarnessError;
use crate::pipeline::BatchDriver;
use tracing::info;

pub async fn handle_dedup(args: TargetArgs) -> Result<(), HarnessError> {
    let config = resolve_config(&args).await?;
    info!(
        archive = %config.archive_dir.display(),
        unique = %config.unique_dir.display(),
        "Deduplicating archived findings"
    );

    let driver = BatchDriver::from_config(config).await?;
    let report = match driver.dedup().await {
        Ok(report) => report,
        Err(e) => {
            driver.audit().record_error(&e).await;
            return Err(e);
        }
    };

    for copy in &report.copies {
        println!("{} <- {}", copy.dest, copy.source);
    }
    info!(
        scanned = report.scanned,
        unique = report.unique_count(),
        duplicates = report.duplicates,
        unrecognized = report.unrecognized,
        "Dedup complete"
    );
    Ok(())
}

use crate::cli::commands::TargetArgs;
use crate::cli::target::resolve_config;
use crate::errors::HarnessError;
use crate::models::RunMode;
use crate::pipeline::{BatchDriver, BatchReport, HarnessConfig};
use crate::ui;
use tracing::info;

/// What a batch subcommand should do once the driver is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchCommand {
    /// Explore, verify, dedup.
    All,
    Single(RunMode),
}

pub async fn handle_batch(args: TargetArgs, command: BatchCommand, quiet: bool) -> Result<(), HarnessError> {
    let config = resolve_config(&args).await?;
    let alert_on_fault = config.alert_on_fault;

    let result = drive(config, command, quiet).await;
    if let Err(HarnessError::TargetFault { .. }) = &result {
        if alert_on_fault {
            ui::ring_bell();
        }
    }
    result
}

async fn drive(config: HarnessConfig, command: BatchCommand, quiet: bool) -> Result<(), HarnessError> {
    let driver = BatchDriver::from_config(config).await?;
    let (driver, console) = if quiet {
        (driver, None)
    } else {
        let (tx, handle) = ui::spawn_console();
        (driver.with_event_channel(tx), Some(handle))
    };

    let result = match command {
        BatchCommand::All => driver.run_all().await.map(|report| {
            print_batch(&report.exploratory);
            print_batch(&report.verification);
            info!(
                scanned = report.dedup.scanned,
                unique = report.dedup.unique_count(),
                duplicates = report.dedup.duplicates,
                "Dedup complete"
            );
        }),
        BatchCommand::Single(mode) => driver.run_mode(mode).await.map(|report| print_batch(&report)),
    };

    let workflow_log = driver.audit().workflow_log().to_path_buf();
    // Dropping the driver closes the event channel and lets the renderer drain.
    drop(driver);
    if let Some(handle) = console {
        let _ = handle.await;
    }
    info!(workflow_log = %workflow_log.display(), "Audit trail written");
    result
}

fn print_batch(report: &BatchReport) {
    info!(
        mode = %report.mode,
        total = report.total,
        attempted = report.attempted(),
        crashed = report.crashed,
        side_channel = report.side_channel,
        exhausted = report.exhausted,
        unreadable = report.unreadable,
        archived = report.archived.len(),
        next_index = report.next_index,
        "Batch finished"
    );
}

use crate::cli::commands::TargetArgs;
use crate::cli::target::resolve_config;
use crate::errors::HarnessError;
use crate::triage::{HttpOracle, ProbeResult, SideChannelOracle};
use tracing::info;

/// Probe the side-channel resource once and print the result.
pub async fn handle_probe(args: TargetArgs) -> Result<(), HarnessError> {
    let config = resolve_config(&args).await?;
    let settings = config.side_channel.as_ref().ok_or_else(|| HarnessError::Config(
        "No side channel configured: pass --side-channel-url or set side_channel in the config".into()
    ))?;

    let oracle = HttpOracle::from_settings(settings)?;
    info!(resource = oracle.resource(), marker = %settings.marker, "Probing side channel");

    let result = oracle.probe().await;
    match &result {
        ProbeResult::Error(e) => println!("{}: {} ({})", oracle.resource(), result.as_str(), e),
        _ => println!("{}: {}", oracle.resource(), result.as_str()),
    }
    Ok(())
}

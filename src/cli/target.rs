use std::path::{Path, PathBuf};
use crate::cli::commands::TargetArgs;
use crate::config::{self, HarnessFileConfig};
use crate::errors::HarnessError;
use crate::pipeline::{Backoff, HarnessConfig, SideChannelSettings};
use tracing::debug;

/// Resolve defaults, the optional config file, then command-line overrides.
pub async fn resolve_config(args: &TargetArgs) -> Result<HarnessConfig, HarnessError> {
    let file_config = match &args.config {
        Some(path) => config::parse_config(&PathBuf::from(path)).await?,
        None => HarnessFileConfig::default(),
    };
    build_harness_config(args, &file_config)
}

pub fn build_harness_config(args: &TargetArgs, file_config: &HarnessFileConfig) -> Result<HarnessConfig, HarnessError> {
    let base_override = args.base_dir.as_deref().map(Path::new);
    let mut config = HarnessConfig::from_file(file_config, base_override)?;

    if let Some(dir) = &args.poc_dir {
        config.poc_dir = PathBuf::from(dir);
        if args.archive_dir.is_none() {
            config.archive_dir = config.poc_dir.join("success");
            config.unique_dir = config.archive_dir.join("unique");
        }
    }
    if let Some(dir) = &args.archive_dir {
        config.archive_dir = PathBuf::from(dir);
        config.unique_dir = config.archive_dir.join("unique");
    }
    if let Some(interpreter) = &args.interpreter {
        config.execution.interpreter = interpreter.clone();
    }
    if let Some(n) = args.exploratory_attempts {
        config.exploratory_attempts = n;
    }
    if let Some(n) = args.verification_attempts {
        config.verification_attempts = n;
    }

    match (&args.side_channel_url, &args.marker) {
        (Some(url), marker) => {
            let marker = marker
                .clone()
                .or_else(|| config.side_channel.as_ref().map(|sc| sc.marker.clone()))
                .unwrap_or_else(|| config::DEFAULT_SIDE_CHANNEL_MARKER.to_string());
            if marker.is_empty() {
                return Err(HarnessError::Config("--marker must not be empty".into()));
            }
            config.side_channel = Some(SideChannelSettings::new(url, &marker)?);
        }
        (None, Some(marker)) => match config.side_channel.as_mut() {
            Some(sc) if !marker.is_empty() => sc.marker = marker.clone(),
            Some(_) => return Err(HarnessError::Config("--marker must not be empty".into())),
            None => return Err(HarnessError::Config(
                "--marker needs a side channel: pass --side-channel-url or set side_channel in the config".into()
            )),
        },
        (None, None) => {}
    }

    if args.no_warmup {
        config.backoff.warmup = Backoff::none().warmup;
    }

    debug!(
        base_dir = %config.base_dir.display(),
        poc_dir = %config.poc_dir.display(),
        archive_dir = %config.archive_dir.display(),
        side_channel = config.side_channel.is_some(),
        "Resolved harness configuration"
    );
    Ok(config)
}

use std::path::{Path, PathBuf};
use crate::cli::commands::ValidateArgs;
use crate::config;
use crate::errors::HarnessError;
use crate::pipeline::HarnessConfig;

pub async fn handle_validate(args: ValidateArgs) -> Result<(), HarnessError> {
    let path = PathBuf::from(&args.config);
    let file_config = config::parse_config(&path).await?;
    // Resolving also checks the side-channel URL; base_dir may legitimately be absent.
    let base_missing = file_config.target.as_ref().and_then(|t| t.base_dir.as_ref()).is_none();
    let base_override = base_missing.then(|| Path::new("."));
    HarnessConfig::from_file(&file_config, base_override)?;
    println!("Configuration is valid: {}", args.config);
    Ok(())
}

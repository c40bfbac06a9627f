use std::path::Path;
use crate::errors::HarnessError;
use super::types::HarnessFileConfig;
use super::schema::CONFIG_SCHEMA;
use tracing::warn;

pub async fn parse_config(path: &Path) -> Result<HarnessFileConfig, HarnessError> {
    if !path.exists() {
        return Err(HarnessError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > 1_048_576 {
        return Err(HarnessError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    parse_config_str(&content)
}

pub fn parse_config_str(content: &str) -> Result<HarnessFileConfig, HarnessError> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;

    validate_schema(&yaml)?;

    let config: HarnessFileConfig = serde_yaml::from_value(yaml)?;

    validate_semantics(&config)?;

    Ok(config)
}

/// Validate config against the JSON schema for structural correctness.
fn validate_schema(yaml: &serde_yaml::Value) -> Result<(), HarnessError> {
    let json_str = serde_json::to_string(yaml)
        .map_err(|e| HarnessError::Config(format!("Config conversion error: {}", e)))?;
    let json_value: serde_json::Value = serde_json::from_str(&json_str)
        .map_err(|e| HarnessError::Config(format!("Config conversion error: {}", e)))?;

    let compiled = jsonschema::JSONSchema::compile(&CONFIG_SCHEMA)
        .map_err(|e| HarnessError::Config(format!("Schema compilation error: {}", e)))?;

    let result = compiled.validate(&json_value);
    if let Err(errors) = result {
        // Advisory only; typed parsing and semantic checks decide.
        for e in errors {
            warn!(validation_error = %format!("{} at {}", e, e.instance_path), "Config schema warning");
        }
    }

    Ok(())
}

/// Reject values that parse but cannot drive a run.
fn validate_semantics(config: &HarnessFileConfig) -> Result<(), HarnessError> {
    if let Some(budgets) = &config.budgets {
        if budgets.exploratory == Some(0) || budgets.verification == Some(0) {
            return Err(HarnessError::Config("Attempt budgets must be at least 1".into()));
        }
    }

    if let Some(target) = &config.target {
        if target.script_extension.as_deref().map_or(false, |e| e.trim_start_matches('.').is_empty()) {
            return Err(HarnessError::Config("script_extension must not be empty".into()));
        }
    }

    if let Some(sc) = &config.side_channel {
        if sc.marker.is_empty() {
            return Err(HarnessError::Config("side_channel.marker must not be empty".into()));
        }
        if sc.cleanup_find.as_deref() == Some("") {
            return Err(HarnessError::Config("side_channel.cleanup_find must not be empty".into()));
        }
        if sc.trigger.as_deref() == Some("") {
            return Err(HarnessError::Config("side_channel.trigger must not be empty".into()));
        }
    }

    if let Some(dedup) = &config.dedup {
        if dedup.min_filler_run == Some(0) {
            return Err(HarnessError::Config("dedup.min_filler_run must be at least 1".into()));
        }
        if dedup.filler_chars.as_ref().map_or(false, |c| c.is_empty()) {
            warn!("dedup.filler_chars is empty; only side-channel payloads will be recognized");
        }
    }

    Ok(())
}

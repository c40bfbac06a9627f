use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("PoC {script} raised EXCEPTION, batch halted. Output:\n{output}")]
    TargetFault { script: String, output: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cannot read PoC script: {0}")]
    ScriptRead(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

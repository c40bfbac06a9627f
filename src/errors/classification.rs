use super::types::HarnessError;

/// How far a fault reaches when it surfaces inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultScope {
    /// Abort only the script being processed, warn, and advance the cursor.
    Script,
    /// Halt the whole batch.
    Batch,
}

#[derive(Debug, Clone)]
pub struct ErrorClassification {
    pub error_type: &'static str,
    pub scope: FaultScope,
}

impl HarnessError {
    /// Classify this error to determine its type and how much of the run it stops.
    pub fn classify(&self) -> ErrorClassification {
        match self {
            HarnessError::ScriptRead(_) => ErrorClassification {
                error_type: "ScriptReadError",
                scope: FaultScope::Script,
            },

            HarnessError::Config(_) => ErrorClassification {
                error_type: "ConfigError",
                scope: FaultScope::Batch,
            },
            HarnessError::TargetFault { .. } => ErrorClassification {
                error_type: "TargetFault",
                scope: FaultScope::Batch,
            },
            HarnessError::Storage(_) => ErrorClassification {
                error_type: "StorageError",
                scope: FaultScope::Batch,
            },
            HarnessError::Execution(_) => ErrorClassification {
                error_type: "ExecutionError",
                scope: FaultScope::Batch,
            },
            HarnessError::Network(_) => ErrorClassification {
                error_type: "NetworkError",
                scope: FaultScope::Batch,
            },
            HarnessError::Io(_) => ErrorClassification {
                error_type: "IoError",
                scope: FaultScope::Batch,
            },
            HarnessError::Json(_) => ErrorClassification {
                error_type: "JsonError",
                scope: FaultScope::Batch,
            },
            HarnessError::Yaml(_) => ErrorClassification {
                error_type: "YamlError",
                scope: FaultScope::Batch,
            },
            HarnessError::Internal(_) => ErrorClassification {
                error_type: "InternalError",
                scope: FaultScope::Batch,
            },
        }
    }

    /// Process exit code reported by the binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Config(_) | HarnessError::Yaml(_) => 2,
            HarnessError::TargetFault { .. } => 3,
            HarnessError::Storage(_) => 4,
            HarnessError::Execution(_) => 5,
            _ => 1,
        }
    }
}

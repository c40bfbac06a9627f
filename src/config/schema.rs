use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "target": {
                "type": "object",
                "properties": {
                    "base_dir": { "type": "string" },
                    "poc_dir": { "type": "string" },
                    "archive_dir": { "type": "string" },
                    "unique_dir": { "type": "string" },
                    "script_extension": { "type": "string", "minLength": 1 }
                }
            },
            "execution": {
                "type": "object",
                "properties": {
                    "interpreter": { "type": "string" },
                    "args": { "type": "array", "items": { "type": "string" } },
                    "timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "budgets": {
                "type": "object",
                "properties": {
                    "exploratory": { "type": "integer", "minimum": 1 },
                    "verification": { "type": "integer", "minimum": 1 }
                }
            },
            "backoff": {
                "type": "object",
                "properties": {
                    "warmup_ms": { "type": "integer", "minimum": 0 },
                    "timeout_ms": { "type": "integer", "minimum": 0 },
                    "benign_ms": { "type": "integer", "minimum": 0 }
                }
            },
            "side_channel": {
                "type": "object",
                "required": ["url", "marker"],
                "properties": {
                    "url": { "type": "string", "format": "uri" },
                    "marker": { "type": "string", "minLength": 1 },
                    "trigger": { "type": "string" },
                    "cleanup_find": { "type": "string" },
                    "cleanup_replace": { "type": "string" },
                    "probe_timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "dedup": {
                "type": "object",
                "properties": {
                    "filler_chars": {
                        "type": "array",
                        "items": { "type": "string", "minLength": 1, "maxLength": 1 }
                    },
                    "min_filler_run": { "type": "integer", "minimum": 1 }
                }
            },
            "alert_on_fault": { "type": "boolean" }
        }
    })
});

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use regex::Regex;
use serde::Serialize;
use crate::errors::HarnessError;
use crate::pipeline::batch::load_batch;
use crate::pipeline::state::{DedupSettings, HarnessConfig};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct DedupCopy {
    pub source: String,
    pub dest: String,
    pub base: String,
    pub param: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub scanned: usize,
    /// Files with no overflow or injection payload.
    pub unrecognized: usize,
    /// (base, param) pairs already taken by an earlier file.
    pub duplicates: usize,
    pub copies: Vec<DedupCopy>,
}

impl DedupReport {
    pub fn unique_count(&self) -> usize {
        self.copies.len()
    }
}

/// Collapses archived payload variants to one script per (structural base name,
/// fuzzed parameter), keeping the first seen in file-name order.
pub struct Deduplicator {
    extension: String,
    basename_re: Regex,
    payload_re: Regex,
}

impl Deduplicator {
    /// `trigger` is the side-channel resource token; without it only length-overflow
    /// payloads are recognized.
    pub fn new(extension: &str, settings: &DedupSettings, trigger: Option<&str>) -> Result<Self, HarnessError> {
        let basename_re = Regex::new(&format!(r"^(?P<base>.+?)_\d+\.{}$", regex::escape(extension)))
            .map_err(|e| HarnessError::Config(format!("Invalid base-name pattern: {}", e)))?;

        let mut alternatives: Vec<String> = settings
            .filler_chars
            .iter()
            .map(|c| format!("{}{{{},}}", regex::escape(&c.to_string()), settings.min_filler_run))
            .collect();
        if let Some(trigger) = trigger {
            alternatives.push(format!(".*?{}.*?", regex::escape(trigger)));
        }
        if alternatives.is_empty() {
            return Err(HarnessError::Config(
                "Deduplication needs filler characters or a side-channel trigger".into(),
            ));
        }

        let payload_re = Regex::new(&format!(
            r#"["'](?P<param>\w+)["']\s*:\s*["'](?:{})["']"#,
            alternatives.join("|")
        ))
        .map_err(|e| HarnessError::Config(format!("Invalid payload pattern: {}", e)))?;

        Ok(Self {
            extension: extension.to_string(),
            basename_re,
            payload_re,
        })
    }

    pub fn for_config(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let trigger = config.side_channel.as_ref().map(|sc| sc.trigger.as_str());
        Self::new(&config.script_extension, &config.dedup, trigger)
    }

    /// `login_3.py` -> `login`. Names without an ordinal keep their stem.
    pub fn base_name(&self, file_name: &str) -> String {
        if let Some(caps) = self.basename_re.captures(file_name) {
            return caps["base"].to_string();
        }
        let suffix = format!(".{}", self.extension);
        file_name.strip_suffix(&suffix).unwrap_or(file_name).to_string()
    }

    /// Parameter names whose literal value is a filler run or mentions the trigger.
    pub fn extract_params(&self, content: &str) -> BTreeSet<String> {
        self.payload_re
            .captures_iter(content)
            .map(|caps| caps["param"].to_string())
            .collect()
    }

    pub fn unique_name(&self, base: &str, param: &str) -> String {
        format!("{}_{}.{}", base, param, self.extension)
    }

    pub async fn run(&self, src_dir: &Path, dest_dir: &Path) -> Result<DedupReport, HarnessError> {
        tokio::fs::create_dir_all(dest_dir).await.map_err(|e| {
            HarnessError::Storage(format!("Failed to create unique directory {}: {}", dest_dir.display(), e))
        })?;

        let batch = load_batch(src_dir, &self.extension)?;
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut report = DedupReport::default();

        for script in batch.scripts() {
            report.scanned += 1;
            let content = match tokio::fs::read(&script.path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(script = %script.name, error = %e, "Skipping unreadable archived PoC");
                    continue;
                }
            };

            let base = self.base_name(&script.name);
            let params = self.extract_params(&content);
            if params.is_empty() {
                debug!(script = %script.name, "No recognizable payload parameter");
                report.unrecognized += 1;
                continue;
            }

            for param in params {
                if !seen.insert((base.clone(), param.clone())) {
                    report.duplicates += 1;
                    continue;
                }
                let dest: PathBuf = dest_dir.join(self.unique_name(&base, &param));
                tokio::fs::copy(&script.path, &dest).await.map_err(|e| {
                    HarnessError::Storage(format!("Failed to copy {} to {}: {}", script.name, dest.display(), e))
                })?;
                info!(source = %script.name, dest = %dest.display(), "Unique payload kept");
                report.copies.push(DedupCopy {
                    source: script.name.clone(),
                    dest: dest.display().to_string(),
                    base: base.clone(),
                    param,
                });
            }
        }

        info!(
            scanned = report.scanned,
            unique = report.unique_count(),
            duplicates = report.duplicates,
            unrecognized = report.unrecognized,
            dest = %dest_dir.display(),
            "Deduplication complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dedup(trigger: Option<&str>) -> Deduplicator {
        Deduplicator::new("py", &DedupSettings::default(), trigger).unwrap()
    }

    #[test]
    fn test_base_name_strips_ordinal() {
        let d = dedup(None);
        assert_eq!(d.base_name("goform_setparam_12.py"), "goform_setparam");
        assert_eq!(d.base_name("setparam_1.py"), "setparam");
        assert_eq!(d.base_name("login.py"), "login");
        assert_eq!(d.base_name("login_v2.py"), "login_v2");
    }

    #[test]
    fn test_overflow_param_extracted() {
        let d = dedup(None);
        let content = format!("data = {{\n    \"user\": \"admin\",\n    \"pwd\": \"{}\"\n}}", "A".repeat(2000));
        assert_eq!(d.extract_params(&content), BTreeSet::from(["pwd".to_string()]));
    }

    #[test]
    fn test_short_filler_run_ignored() {
        let d = dedup(None);
        let content = format!("{{'pwd': '{}'}}", "A".repeat(99));
        assert!(d.extract_params(&content).is_empty());
    }

    #[test]
    fn test_injection_param_needs_trigger() {
        let content = r#"{"cmd": "1;echo hacker > /webroot/123.txt"}"#;
        assert!(dedup(None).extract_params(content).is_empty());
        assert_eq!(
            dedup(Some("123.txt")).extract_params(content),
            BTreeSet::from(["cmd".to_string()])
        );
    }

    #[test]
    fn test_trigger_is_matched_literally() {
        let d = dedup(Some("123.txt"));
        assert!(d.extract_params(r#"{"cmd": "123xtxt"}"#).is_empty());
    }

    #[test]
    fn test_empty_alternatives_rejected() {
        let settings = DedupSettings { filler_chars: Vec::new(), min_filler_run: 100 };
        assert!(Deduplicator::new("py", &settings, None).is_err());
    }

    #[tokio::test]
    async fn test_same_key_keeps_first_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path();
        let body = format!("data = {{\"pwd\": \"{}\"}}\n", "a".repeat(100));
        std::fs::write(src.join("setparam_2.py"), format!("# second\n{}", body)).unwrap();
        std::fs::write(src.join("setparam_1.py"), format!("# first\n{}", body)).unwrap();

        let unique = src.join("unique");
        let report = dedup(None).run(src, &unique).await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.unique_count(), 1);
        assert_eq!(report.duplicates, 1);
        let kept = std::fs::read_to_string(unique.join("setparam_pwd.py")).unwrap();
        assert!(kept.starts_with("# first"));
        assert_eq!(std::fs::read_dir(&unique).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_files_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("login_1.py"), "data = {\"user\": \"admin\"}").unwrap();
        let unique = dir.path().join("unique");
        let report = dedup(None).run(dir.path(), &unique).await.unwrap();
        assert_eq!(report.unrecognized, 1);
        assert_eq!(report.unique_count(), 0);
    }

    #[tokio::test]
    async fn test_one_file_can_yield_several_keys() {
        let dir = TempDir::new().unwrap();
        let content = format!(
            "data = {{\"ssid\": \"{}\", \"cmd\": \";echo hacker > 123.txt\"}}",
            "A".repeat(150)
        );
        std::fs::write(dir.path().join("wifi_3.py"), content).unwrap();
        let unique = dir.path().join("unique");
        let report = dedup(Some("123.txt")).run(dir.path(), &unique).await.unwrap();
        assert_eq!(report.unique_count(), 2);
        assert!(unique.join("wifi_cmd.py").is_file());
        assert!(unique.join("wifi_ssid.py").is_file());
    }
}

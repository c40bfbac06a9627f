use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use poc_harness::errors::HarnessError;
use poc_harness::executor::{CapturedOutput, ScriptExecutor};
use poc_harness::models::{RunMode, ScriptOutcome};
use poc_harness::pipeline::{Backoff, BatchDriver, HarnessConfig, HarnessEvent, SideChannelSettings};
use poc_harness::progress::ProgressStore;
use poc_harness::triage::{ProbeResult, SideChannelOracle};
use tempfile::TempDir;

/// Replays queued outputs per script name and records what it was asked to run.
#[derive(Default)]
struct ScriptedExecutor {
    outputs: Mutex<HashMap<String, VecDeque<String>>>,
    runs: Mutex<Vec<(String, String)>>,
}

impl ScriptedExecutor {
    fn with(outputs: &[(&str, &[&str])]) -> Self {
        let map = outputs
            .iter()
            .map(|(name, outs)| (name.to_string(), outs.iter().map(|o| o.to_string()).collect()))
            .collect();
        Self { outputs: Mutex::new(map), runs: Mutex::new(Vec::new()) }
    }

    fn runs(&self) -> Vec<(String, String)> {
        self.runs.lock().unwrap().clone()
    }

    fn run_names(&self) -> Vec<String> {
        self.runs().into_iter().map(|(name, _)| name).collect()
    }
}

#[async_trait]
impl ScriptExecutor for ScriptedExecutor {
    async fn run(&self, script: &Path) -> Result<CapturedOutput, HarnessError> {
        let name = script.file_name().unwrap().to_string_lossy().into_owned();
        let content = tokio::fs::read_to_string(script).await?;
        self.runs.lock().unwrap().push((name.clone(), content));
        let text = self
            .outputs
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| "Connection refused".to_string());
        Ok(CapturedOutput::text(text))
    }
}

/// Returns queued probe results, then `Unconfirmed` forever.
#[derive(Default)]
struct QueuedOracle {
    results: Mutex<VecDeque<ProbeResult>>,
    probes: AtomicUsize,
}

impl QueuedOracle {
    fn with(results: Vec<ProbeResult>) -> Self {
        Self { results: Mutex::new(results.into()), probes: AtomicUsize::new(0) }
    }

    fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SideChannelOracle for QueuedOracle {
    async fn probe(&self) -> ProbeResult {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.results.lock().unwrap().pop_front().unwrap_or(ProbeResult::Unconfirmed)
    }

    fn resource(&self) -> &str {
        "http://192.168.153.2/123.txt"
    }
}

fn product(scripts: &[(&str, &str)]) -> (TempDir, HarnessConfig) {
    let tmp = TempDir::new().unwrap();
    let mut config = HarnessConfig::for_base_dir(tmp.path());
    config.backoff = Backoff::none();
    fs::create_dir_all(&config.poc_dir).unwrap();
    for (name, body) in scripts {
        fs::write(config.poc_dir.join(name), body).unwrap();
    }
    (tmp, config)
}

fn archived(config: &HarnessConfig) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(&config.archive_dir)
        .map(|rd| {
            rd.filter_map(|e| e.ok())
                .filter(|e| e.path().is_file())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".py"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_exception_halts_batch_after_archiving() {
    let (_tmp, config) = product(&[
        ("login_1.py", "print('login')"),
        ("update_2.py", "print('update')"),
    ]);
    let executor = Arc::new(ScriptedExecutor::with(&[
        ("login_1.py", &["HTTP/1.1 200 OK", "HTTP/1.1 500 Internal Server Error"]),
        ("update_2.py", &["EXCEPTION: boom"]),
    ]));
    let driver = BatchDriver::new(config.clone(), executor.clone(), None).await.unwrap();

    let err = driver.run_mode(RunMode::Exploratory).await.unwrap_err();
    match &err {
        HarnessError::TargetFault { script, output } => {
            assert_eq!(script, "update_2.py");
            assert!(output.contains("boom"));
        }
        other => panic!("expected target fault, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 3);

    assert_eq!(archived(&config), vec!["login_1.py", "update_2.py"]);
    assert_eq!(driver.progress().load(RunMode::Exploratory).await, 2);
    assert_eq!(executor.run_names(), vec!["login_1.py", "login_1.py", "update_2.py"]);
    // The other mode's cursor is untouched.
    assert!(!ProgressStore::for_config(&config).path(RunMode::Verification).exists());
}

#[tokio::test]
async fn test_restart_resumes_past_persisted_cursor() {
    let (_tmp, config) = product(&[
        ("a_1.py", "print(1)"),
        ("b_1.py", "print(2)"),
        ("c_1.py", "print(3)"),
    ]);
    ProgressStore::for_config(&config).save(RunMode::Exploratory, 2).await.unwrap();

    let executor = Arc::new(ScriptedExecutor::with(&[("c_1.py", &["500"])]));
    let driver = BatchDriver::new(config.clone(), executor.clone(), None).await.unwrap();
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();

    assert_eq!(executor.run_names(), vec!["c_1.py"]);
    assert_eq!(report.start_index, 2);
    assert_eq!(report.attempted(), 1);
    assert_eq!(report.crashed, 1);
    assert_eq!(archived(&config), vec!["c_1.py"]);
    assert_eq!(driver.progress().load(RunMode::Exploratory).await, 3);

    // A second run finds the batch exhausted and executes nothing.
    let again = driver.run_mode(RunMode::Exploratory).await.unwrap();
    assert_eq!(again.attempted(), 0);
    assert_eq!(executor.run_names().len(), 1);
}

#[tokio::test]
async fn test_exhausted_budget_advances_without_archiving() {
    let (_tmp, mut config) = product(&[("probe_1.py", "print(1)")]);
    config.exploratory_attempts = 3;
    let executor = Arc::new(ScriptedExecutor::with(&[("probe_1.py", &["TIMEOUT", "HTTP/1.1 200 OK"])]));
    let driver = BatchDriver::new(config.clone(), executor.clone(), None).await.unwrap();

    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();
    assert_eq!(report.exhausted, 1);
    assert_eq!(executor.run_names().len(), 3);
    assert!(archived(&config).is_empty());
    assert_eq!(driver.progress().load(RunMode::Exploratory).await, 1);
}

#[tokio::test]
async fn test_cursor_past_end_is_not_rewound() {
    let (_tmp, config) = product(&[("a_1.py", "print(1)"), ("b_1.py", "print(2)")]);
    let store = ProgressStore::for_config(&config);
    store.save(RunMode::Exploratory, 10).await.unwrap();

    let executor = Arc::new(ScriptedExecutor::default());
    let driver = BatchDriver::new(config, executor.clone(), None).await.unwrap();
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();

    assert_eq!(report.attempted(), 0);
    assert!(executor.run_names().is_empty());
    assert_eq!(store.load(RunMode::Exploratory).await, 10);
}

#[tokio::test]
async fn test_verification_uses_own_cursor_and_never_copies() {
    let (_tmp, mut config) = product(&[]);
    config.verification_attempts = 4;
    fs::create_dir_all(&config.archive_dir).unwrap();
    fs::write(config.archive_dir.join("login_1.py"), "print('login')").unwrap();
    fs::write(config.archive_dir.join("reboot_3.py"), "print('reboot')").unwrap();

    let executor = Arc::new(ScriptedExecutor::with(&[("login_1.py", &["Connection reset", "500"])]));
    let driver = BatchDriver::new(config.clone(), executor.clone(), None).await.unwrap();
    let report = driver.run_mode(RunMode::Verification).await.unwrap();

    assert_eq!(report.crashed, 1);
    assert_eq!(report.exhausted, 1);
    assert!(report.archived.is_empty());
    assert_eq!(executor.run_names().iter().filter(|n| *n == "reboot_3.py").count(), 4);
    assert_eq!(archived(&config), vec!["login_1.py", "reboot_3.py"]);
    assert_eq!(driver.progress().load(RunMode::Verification).await, 2);
    assert_eq!(driver.progress().load(RunMode::Exploratory).await, 0);
}

#[tokio::test]
async fn test_side_channel_confirmation_runs_cleanup_variant() {
    let source = r#"data = {"cmd": "x;echo hacker > /webroot/123.txt"}"#;
    let (_tmp, mut config) = product(&[("formPing_1.py", source), ("plain_1.py", "print(1)")]);
    config.exploratory_attempts = 5;
    config.side_channel = Some(SideChannelSettings::new("http://192.168.153.2/123.txt", "hacker").unwrap());

    let executor = Arc::new(ScriptedExecutor::default());
    let oracle = Arc::new(QueuedOracle::with(vec![
        ProbeResult::Unconfirmed,
        ProbeResult::Confirmed,
        ProbeResult::Unconfirmed,
    ]));
    let driver = BatchDriver::new(config.clone(), executor.clone(), Some(oracle.clone())).await.unwrap();
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();

    assert_eq!(report.side_channel, 1);
    assert_eq!(report.archived, vec!["formPing_1.py"]);
    // Two attempts plus the cleanup run; plain_1.py never references the resource.
    assert_eq!(oracle.probes(), 3);

    let runs = executor.runs();
    let injected: Vec<&(String, String)> = runs.iter().filter(|(n, _)| n == "formPing_1.py").collect();
    assert_eq!(injected.len(), 3);
    assert!(injected[0].1.contains(";echo hacker >"));
    assert!(injected[2].1.contains(r#"x;rm /webroot/123.txt"#));
    assert_eq!(runs.iter().filter(|(n, _)| n == "plain_1.py").count(), 5);

    let kept = fs::read_to_string(config.archive_dir.join("formPing_1.py")).unwrap();
    assert_eq!(kept, source);
}

#[tokio::test]
async fn test_probe_errors_never_confirm() {
    let (_tmp, mut config) = product(&[("formPing_1.py", "x;echo hacker > /webroot/123.txt")]);
    config.exploratory_attempts = 2;
    config.side_channel = Some(SideChannelSettings::new("http://192.168.153.2/123.txt", "hacker").unwrap());

    let executor = Arc::new(ScriptedExecutor::default());
    let oracle = Arc::new(QueuedOracle::with(vec![
        ProbeResult::Error("connection refused".into()),
        ProbeResult::Error("connection refused".into()),
    ]));
    let driver = BatchDriver::new(config.clone(), executor, Some(oracle.clone())).await.unwrap();
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();

    assert_eq!(report.exhausted, 1);
    assert_eq!(oracle.probes(), 2);
    assert!(archived(&config).is_empty());
}

#[tokio::test]
async fn test_events_report_abort() {
    let (_tmp, config) = product(&[("update_2.py", "print(1)")]);
    let executor = Arc::new(ScriptedExecutor::with(&[("update_2.py", &["EXCEPTION"])]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let driver = BatchDriver::new(config, executor, None).await.unwrap().with_event_channel(tx);

    assert!(driver.run_mode(RunMode::Exploratory).await.is_err());
    drop(driver);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(HarnessEvent::BatchStarted { total: 1, start_index: 0, .. })));
    assert!(events.iter().any(|e| matches!(e, HarnessEvent::ProgressSaved { next_index: 1, .. })));
    assert!(matches!(events.last(), Some(HarnessEvent::BatchAborted { script, .. }) if script == "update_2.py"));
}

#[tokio::test]
async fn test_full_run_dedups_archive() {
    let payload = "a".repeat(100);
    let first = format!(r#"data = {{"pwd": "{payload}"}}"#);
    let (_tmp, mut config) = product(&[
        ("setparam_1.py", first.as_str()),
        ("setparam_2.py", first.as_str()),
        ("status_1.py", "print('status')"),
    ]);
    config.verification_attempts = 1;
    let executor = Arc::new(ScriptedExecutor::with(&[
        ("setparam_1.py", &["500", "500"]),
        ("setparam_2.py", &["500"]),
    ]));
    let driver = BatchDriver::new(config.clone(), executor, None).await.unwrap();
    let report = driver.run_all().await.unwrap();

    assert_eq!(report.exploratory.crashed, 2);
    assert_eq!(report.exploratory.exhausted, 1);
    assert_eq!(report.verification.total, 2);
    assert_eq!(report.verification.crashed, 1);
    assert_eq!(report.dedup.unique_count(), 1);
    assert_eq!(report.dedup.duplicates, 1);
    assert!(config.unique_dir.join("setparam_pwd.py").is_file());
    assert!(!config.unique_dir.join("setparam_1.py").exists());

    let summary = fs::read_to_string(config.audit_dir().join("last_run.json")).unwrap();
    let summary: serde_json::Value = serde_json::from_str(&summary).unwrap();
    assert!(summary.is_object());
}

#[tokio::test]
async fn test_outcome_for_crash_records_attempt_count() {
    let (_tmp, config) = product(&[("login_1.py", "print(1)")]);
    let executor = Arc::new(ScriptedExecutor::with(&[("login_1.py", &["nothing", "nothing", "500"])]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let driver = BatchDriver::new(config, executor, None).await.unwrap().with_event_channel(tx);
    driver.run_mode(RunMode::Exploratory).await.unwrap();
    drop(driver);

    let mut outcome = None;
    while let Some(event) = rx.recv().await {
        if let HarnessEvent::ScriptFinished { outcome: o, archived, .. } = event {
            assert!(archived);
            outcome = Some(o);
        }
    }
    assert_eq!(outcome, Some(ScriptOutcome::Crashed { attempts: 3, cleanup_verified: None }));
}

#[tokio::test]
async fn test_artifact_left_by_crashing_script_is_cleaned_by_that_script() {
    let source = r#"data = {"cmd": "x;echo hacker > /webroot/123.txt"}"#;
    let (_tmp, mut config) = product(&[("formPing_1.py", source), ("formPing_2.py", source)]);
    config.exploratory_attempts = 2;
    config.side_channel = Some(SideChannelSettings::new("http://192.168.153.2/123.txt", "hacker").unwrap());

    let executor = Arc::new(ScriptedExecutor::with(&[("formPing_1.py", &["500"])]));
    let oracle = Arc::new(QueuedOracle::with(vec![ProbeResult::Confirmed, ProbeResult::Unconfirmed]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let driver = BatchDriver::new(config.clone(), executor.clone(), Some(oracle.clone()))
        .await
        .unwrap()
        .with_event_channel(tx);
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();
    drop(driver);

    assert_eq!(report.crashed, 1);
    assert_eq!(report.side_channel, 0);
    assert_eq!(report.exhausted, 1);
    assert_eq!(report.archived, vec!["formPing_1.py"]);

    // formPing_1: the crashing attempt, then its own cleanup variant.
    let runs = executor.runs();
    let first: Vec<&(String, String)> = runs.iter().filter(|(n, _)| n == "formPing_1.py").collect();
    assert_eq!(first.len(), 2);
    assert!(first[1].1.contains("x;rm /webroot/123.txt"));
    assert_eq!(runs.iter().filter(|(n, _)| n == "formPing_2.py").count(), 2);
    // Stop probe + cleanup check for formPing_1, one per attempt for formPing_2.
    assert_eq!(oracle.probes(), 4);

    let mut outcomes = Vec::new();
    while let Some(event) = rx.recv().await {
        if let HarnessEvent::ScriptFinished { script, outcome, .. } = event {
            outcomes.push((script, outcome));
        }
    }
    assert_eq!(outcomes[0], (
        "formPing_1.py".to_string(),
        ScriptOutcome::Crashed { attempts: 1, cleanup_verified: Some(true) },
    ));
    assert_eq!(outcomes[1].1, ScriptOutcome::Exhausted { attempts: 2 });
}

#[tokio::test]
async fn test_crash_without_artifact_skips_cleanup() {
    let source = "x;echo hacker > /webroot/123.txt";
    let (_tmp, mut config) = product(&[("formPing_1.py", source)]);
    config.side_channel = Some(SideChannelSettings::new("http://192.168.153.2/123.txt", "hacker").unwrap());

    let executor = Arc::new(ScriptedExecutor::with(&[("formPing_1.py", &["500"])]));
    let oracle = Arc::new(QueuedOracle::default());
    let driver = BatchDriver::new(config, executor.clone(), Some(oracle.clone())).await.unwrap();
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();

    assert_eq!(report.crashed, 1);
    assert_eq!(oracle.probes(), 1);
    assert_eq!(executor.run_names(), vec!["formPing_1.py"]);
}

/// Deletes `doomed` the first time `when` runs, then behaves like `ScriptedExecutor`.
struct DeletingExecutor {
    inner: ScriptedExecutor,
    when: String,
    doomed: std::path::PathBuf,
}

#[async_trait]
impl ScriptExecutor for DeletingExecutor {
    async fn run(&self, script: &Path) -> Result<CapturedOutput, HarnessError> {
        if script.file_name().map_or(false, |n| n == self.when.as_str()) && self.doomed.exists() {
            fs::remove_file(&self.doomed).unwrap();
        }
        self.inner.run(script).await
    }
}

#[tokio::test]
async fn test_unreadable_script_is_skipped_not_fatal() {
    let (_tmp, mut config) = product(&[
        ("a_1.py", "print(1)"),
        ("b_1.py", "print(2)"),
        ("c_1.py", "print(3)"),
    ]);
    config.exploratory_attempts = 1;
    let executor = Arc::new(DeletingExecutor {
        inner: ScriptedExecutor::with(&[("c_1.py", &["500"])]),
        when: "a_1.py".to_string(),
        doomed: config.poc_dir.join("b_1.py"),
    });
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let driver = BatchDriver::new(config.clone(), executor.clone(), None)
        .await
        .unwrap()
        .with_event_channel(tx);
    let report = driver.run_mode(RunMode::Exploratory).await.unwrap();

    assert_eq!(report.unreadable, 1);
    assert_eq!(report.exhausted, 1);
    assert_eq!(report.crashed, 1);
    assert_eq!(executor.inner.run_names(), vec!["a_1.py", "c_1.py"]);
    assert_eq!(driver.progress().load(RunMode::Exploratory).await, 3);
    drop(driver);

    let mut b_outcome = None;
    while let Some(event) = rx.recv().await {
        if let HarnessEvent::ScriptFinished { script, outcome, .. } = event {
            if script == "b_1.py" {
                b_outcome = Some(outcome);
            }
        }
    }
    assert!(matches!(b_outcome, Some(ScriptOutcome::Unreadable { .. })));
}

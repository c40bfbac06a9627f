use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::pipeline::HarnessEvent;
use crate::utils::format_duration;
use super::renderer::render_event;

/// One progress bar per batch run, with styled event lines printed above it.
pub struct BatchProgress {
    bar: Option<ProgressBar>,
    findings: usize,
    started: Instant,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            bar: None,
            findings: 0,
            started: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: &HarnessEvent) {
        match event {
            HarnessEvent::BatchStarted { mode, total, start_index } => {
                self.finish_bar();
                let bar = ProgressBar::new(*total as u64);
                let style = ProgressStyle::default_bar()
                    .template("  {bar:30.cyan/dark_gray} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▓░");
                bar.set_style(style);
                bar.set_position(*start_index as u64);
                bar.set_message(format!("{} batch", mode));
                bar.enable_steady_tick(Duration::from_millis(200));
                self.bar = Some(bar);
                self.findings = 0;
                self.started = Instant::now();
            }
            HarnessEvent::ScriptStarted { script, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_message(script.clone());
                }
            }
            HarnessEvent::ProgressSaved { next_index, .. } => {
                if let Some(bar) = &self.bar {
                    bar.set_position(*next_index as u64);
                }
            }
            HarnessEvent::ScriptFinished { outcome, .. } if outcome.is_finding() => {
                self.findings += 1;
            }
            HarnessEvent::BatchCompleted { .. } => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_with_message(format!(
                        "{} findings in {}",
                        self.findings,
                        format_duration(self.started.elapsed().as_millis() as u64),
                    ));
                }
            }
            HarnessEvent::BatchAborted { script, .. } => {
                if let Some(bar) = self.bar.take() {
                    bar.abandon_with_message(format!("halted at {}", script));
                }
            }
            _ => {}
        }

        if let Some(line) = render_event(event) {
            self.println(&line);
        }
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => eprintln!("{}", line),
        }
    }

    fn finish_bar(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchProgress {
    fn drop(&mut self) {
        self.finish_bar();
    }
}

/// Spawn a task that renders events until every sender is dropped.
pub fn spawn_console() -> (mpsc::UnboundedSender<HarnessEvent>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let mut progress = BatchProgress::new();
        while let Some(event) = rx.recv().await {
            progress.handle_event(&event);
        }
    });
    (tx, handle)
}

use console::style;

use crate::models::{ScriptOutcome, Verdict};
use crate::pipeline::HarnessEvent;

/// Render a harness event as a styled line. Events the progress bar already
/// conveys return `None`.
pub fn render_event(event: &HarnessEvent) -> Option<String> {
    match event {
        HarnessEvent::BatchStarted { mode, total, start_index } => Some(format!(
            "\n{} {} batch: {} scripts, resuming at index {}",
            style("▶").green().bold(),
            style(mode).cyan().bold(),
            total,
            start_index,
        )),
        HarnessEvent::AttemptClassified { script, attempt, max_attempts, verdict, excerpt } => {
            let tag = match verdict {
                Verdict::ExceptionStop => style(verdict.as_str()).red().bold(),
                Verdict::SuccessStop | Verdict::SideChannelConfirmed => style(verdict.as_str()).green().bold(),
                Verdict::TimeoutRetry => style(verdict.as_str()).yellow(),
                Verdict::Continue => style(verdict.as_str()).dim(),
            };
            Some(format!(
                "    {} [{}/{}] {} {}",
                style(script).white(),
                attempt,
                max_attempts,
                tag,
                style(excerpt).dim(),
            ))
        }
        HarnessEvent::SideChannelProbed { script, result } => Some(format!(
            "    {} side channel probed for {}: {}",
            style("?").cyan(),
            script,
            result,
        )),
        HarnessEvent::ScriptFinished { script, outcome, archived } => {
            let marker = match outcome {
                ScriptOutcome::Crashed { .. } | ScriptOutcome::SideChannelConfirmed { .. } => style("✓").green().bold(),
                ScriptOutcome::Faulted { .. } => style("✗").red().bold(),
                ScriptOutcome::Unreadable { .. } => style("⚠").yellow(),
                ScriptOutcome::Exhausted { .. } => style("·").dim(),
            };
            Some(format!(
                "  {} {} {}{}",
                marker,
                script,
                outcome.label(),
                if *archived { " (archived)" } else { "" },
            ))
        }
        HarnessEvent::BatchCompleted { mode, attempted, findings } => Some(format!(
            "{} {} batch complete: {} attempted, {} findings",
            style("✓").green().bold(),
            mode,
            attempted,
            findings,
        )),
        HarnessEvent::BatchAborted { mode, script } => Some(format!(
            "{} {} batch halted: {} raised EXCEPTION",
            style("✗").red().bold(),
            mode,
            style(script).red().bold(),
        )),
        HarnessEvent::ScriptStarted { .. } | HarnessEvent::ProgressSaved { .. } => None,
    }
}

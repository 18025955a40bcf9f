//! Terminal step of a run: log a structured report.

use serde_json::json;

use super::metrics::ProcessingSummary;

/// Characters of the agent's answer kept in the report.
pub const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportOutcome {
    pub notifications_sent: usize,
    pub report_generated: bool,
}

/// First [`EXCERPT_CHARS`] characters, with an ellipsis when cut.
pub fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Log the run report. Never fails; zero counts mean nothing was sent.
pub fn notify(summary: &ProcessingSummary) -> ReportOutcome {
    let report = json!({
        "tasksProcessed": summary.tasks_processed,
        "completedTasks": summary.completed_tasks,
        "errors": summary.errors,
        "excerpt": excerpt(&summary.summary),
    });

    let rendered = match serde_json::to_string_pretty(&report) {
        Ok(rendered) => rendered,
        Err(e) => {
            tracing::warn!(error = %e, "Could not render workflow report");
            return ReportOutcome::default();
        }
    };

    if summary.errors.is_empty() {
        tracing::info!(
            tasks_processed = summary.tasks_processed,
            pull_requests = summary.completed_tasks.len(),
            "Workflow report:\n{}",
            rendered
        );
    } else {
        tracing::warn!(
            tasks_processed = summary.tasks_processed,
            errors = summary.errors.len(),
            "Workflow report:\n{}",
            rendered
        );
    }

    ReportOutcome {
        notifications_sent: 1,
        report_generated: true,
    }
}

//! RunReport → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): one line per failing object, then the verdict
//! - **JSON** (`--json`): `serde_json::to_string_pretty` of the full report

use stalefh_core::{FailureReason, OutcomeRecord, Verdict};
use stalefh_harness::{run_hint, EvictionStatus, HarnessError, RunReport};

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Format a completed run.
pub fn format_report(report: &RunReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => report
            .to_json()
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => format_human(report),
    }
}

/// Format an error that prevented a report.
pub fn format_error(err: &HarnessError, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "verdict": Verdict::Fail,
            "error": format!("{}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn format_human(report: &RunReport) -> String {
    let mut lines = Vec::new();
    for record in report.failures() {
        if let Some(reason) = record.failure() {
            lines.push(format_failure(record, reason));
        }
    }
    if let Some(hint) = run_hint(&report.outcomes) {
        lines.push(format!("hint: {}", hint));
    }
    if let EvictionStatus::Failed { message } = &report.eviction {
        lines.push(format!("warning: cache eviction failed: {}", message));
    }

    let total = report.outcomes.len();
    let failed = report.failure_count();
    lines.push(match report.verdict() {
        Verdict::Pass => format!(
            "PASS: {} of {} deleted files rejected their handles ({})",
            total,
            total,
            report.target.display()
        ),
        Verdict::Fail => format!(
            "FAIL: {} of {} deleted files misbehaved on reopen ({})",
            failed,
            total,
            report.target.display()
        ),
    });
    lines.join("\n")
}

fn format_failure(record: &OutcomeRecord, reason: &FailureReason) -> String {
    match reason {
        FailureReason::UnexpectedOpen => {
            format!("open_by_handle({}) opened an unlinked file!", record.index)
        }
        other => format!("open_by_handle({}) {}", record.index, other),
    }
}

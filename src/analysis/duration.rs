use chrono::DateTime;

use crate::providers::github::{Job, Step, WorkflowRun};

/// Whole seconds elapsed between two RFC 3339 timestamps.
///
/// Returns `None` when either timestamp is missing or unparseable, or when
/// `end` precedes `start`. A bad timestamp is an expected input here, not an
/// error.
pub fn duration_between(start: Option<&str>, end: Option<&str>) -> Option<u64> {
    let start = DateTime::parse_from_rfc3339(start?).ok()?;
    let end = DateTime::parse_from_rfc3339(end?).ok()?;

    u64::try_from(end.signed_duration_since(start).num_seconds()).ok()
}

/// Wall-clock duration of a workflow run.
///
/// Measured from `run_started_at` (or `created_at` when the run never
/// reported a start) to `updated_at`.
pub fn run_duration(run: &WorkflowRun) -> Option<u64> {
    let started_at = run.run_started_at.as_deref().unwrap_or(&run.created_at);
    duration_between(Some(started_at), Some(&run.updated_at))
}

pub fn job_duration(job: &Job) -> Option<u64> {
    duration_between(job.started_at.as_deref(), job.completed_at.as_deref())
}

pub fn step_duration(step: &Step) -> Option<u64> {
    duration_between(step.started_at.as_deref(), step.completed_at.as_deref())
}

/// Renders seconds as `1h 30m 45s`, dropping leading zero units.
///
/// An unavailable duration renders as `N/A`.
pub fn format_duration(seconds: Option<u64>) -> String {
    let Some(seconds) = seconds else {
        return "N/A".to_string();
    };

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {secs}s")
    } else if minutes > 0 {
        format!("{minutes}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

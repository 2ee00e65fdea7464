use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{GhaMetricsError, Result};
use crate::providers::github::WorkflowRun;

/// How reruns (attempt > 1) are treated when selecting runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RerunHandling {
    /// Keep original runs and reruns
    #[default]
    Include,
    /// Keep only original runs
    Exclude,
    /// Keep only reruns
    OnlyReruns,
}

impl RerunHandling {
    /// Resolves the `--exclude-reruns` / `--only-reruns` flag pair.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when both flags are set.
    pub fn from_flags(exclude_reruns: bool, only_reruns: bool) -> Result<Self> {
        match (exclude_reruns, only_reruns) {
            (true, true) => Err(GhaMetricsError::Config(
                "cannot use both --exclude-reruns and --only-reruns".to_string(),
            )),
            (true, false) => Ok(Self::Exclude),
            (false, true) => Ok(Self::OnlyReruns),
            (false, false) => Ok(Self::Include),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
    pub only_success: bool,
    pub rerun_handling: RerunHandling,
}

/// Returns the runs matching every active criterion, in their original order.
///
/// Date bounds are inclusive and compare the calendar date of `created_at`.
/// A run whose `created_at` cannot be parsed is kept.
pub fn filter_runs(runs: &[WorkflowRun], criteria: &FilterCriteria) -> Vec<WorkflowRun> {
    runs.iter()
        .filter(|run| matches(run, criteria))
        .cloned()
        .collect()
}

fn matches(run: &WorkflowRun, criteria: &FilterCriteria) -> bool {
    let rerun_ok = match criteria.rerun_handling {
        RerunHandling::Include => true,
        RerunHandling::Exclude => !run.is_rerun(),
        RerunHandling::OnlyReruns => run.is_rerun(),
    };
    if !rerun_ok {
        return false;
    }

    if criteria.only_success && run.conclusion.as_deref() != Some("success") {
        return false;
    }

    let Some(run_date) = created_date(run) else {
        return true;
    };

    criteria.from_date.map_or(true, |from| run_date >= from)
        && criteria.to_date.map_or(true, |to| run_date <= to)
}

fn created_date(run: &WorkflowRun) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(&run.created_at)
        .ok()
        .map(|created| created.date_naive())
}

/// Human-readable list of the active criteria: rerun mode, success flag,
/// then date range.
pub fn describe_criteria(criteria: &FilterCriteria) -> Vec<String> {
    let mut descriptions = Vec::new();

    match criteria.rerun_handling {
        RerunHandling::Exclude => {
            descriptions.push("Excluding reruns (only original runs)".to_string());
        }
        RerunHandling::OnlyReruns => descriptions.push("Only reruns".to_string()),
        RerunHandling::Include => {}
    }

    if criteria.only_success {
        descriptions.push("Only successful workflows".to_string());
    }

    let range = match (criteria.from_date, criteria.to_date) {
        (Some(from), Some(to)) => Some(format!("{from} to {to}")),
        (Some(from), None) => Some(format!("from {from}")),
        (None, Some(to)) => Some(format!("to {to}")),
        (None, None) => None,
    };
    if let Some(range) = range {
        descriptions.push(format!("Date range: {range}"));
    }

    descriptions
}

/// Parses a `YYYY-MM-DD` command-line date.
///
/// # Errors
///
/// Returns `InvalidDate` naming `param` when the value is not a calendar date.
pub fn parse_date(value: &str, param: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| GhaMetricsError::InvalidDate {
        param: param.to_string(),
        value: value.to_string(),
    })
}

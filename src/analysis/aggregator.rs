use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::info;
use serde::Serialize;

use super::collector::CollectedMetrics;
use crate::error::Result;
use crate::output::exports::{self, ExportReport};

/// Durations and outcome tally of one step name within a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepMetrics {
    pub durations: Vec<u64>,
    pub success_count: usize,
    pub total_count: usize,
}

impl StepMetrics {
    /// Share of executions that concluded successfully, in percent.
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        (self.success_count as f64 / self.total_count.max(1) as f64) * 100.0
    }
}

/// Per-job view over the collected durations.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobMetrics {
    pub job_name: String,
    pub job_durations: Vec<u64>,
    /// Durations of every step of this job, across step names
    pub step_durations: Vec<u64>,
    pub steps: BTreeMap<String, StepMetrics>,
}

/// Reshapes flat keyed durations into one `JobMetrics` per job name.
///
/// A job appears when it has job durations, step durations, or any step
/// outcome. Step keys are split on their first `:`; a step with an outcome
/// but no durations is kept with an empty duration list, and a step with
/// durations but no outcome gets a `(0, 0)` tally.
pub fn aggregate_job_metrics(collected: &CollectedMetrics) -> BTreeMap<String, JobMetrics> {
    let mut steps_by_job: BTreeMap<&str, BTreeMap<String, StepMetrics>> = BTreeMap::new();

    let step_keys: BTreeSet<&String> = collected
        .step_durations_by_key
        .keys()
        .chain(collected.step_outcomes.keys())
        .collect();

    for key in step_keys {
        let Some((job_name, step_name)) = key.split_once(':') else {
            continue;
        };
        let outcome = collected
            .step_outcomes
            .get(key.as_str())
            .copied()
            .unwrap_or_default();

        steps_by_job.entry(job_name).or_default().insert(
            step_name.to_string(),
            StepMetrics {
                durations: collected
                    .step_durations_by_key
                    .get(key.as_str())
                    .cloned()
                    .unwrap_or_default(),
                success_count: outcome.success,
                total_count: outcome.total,
            },
        );
    }

    let job_names: BTreeSet<&str> = collected
        .job_durations_by_name
        .keys()
        .chain(collected.step_durations_by_job.keys())
        .map(String::as_str)
        .chain(steps_by_job.keys().copied())
        .collect();

    job_names
        .into_iter()
        .map(|job_name| {
            let metrics = JobMetrics {
                job_name: job_name.to_string(),
                job_durations: collected
                    .job_durations_by_name
                    .get(job_name)
                    .cloned()
                    .unwrap_or_default(),
                step_durations: collected
                    .step_durations_by_job
                    .get(job_name)
                    .cloned()
                    .unwrap_or_default(),
                steps: steps_by_job.remove(job_name).unwrap_or_default(),
            };
            (job_name.to_string(), metrics)
        })
        .collect()
}

/// Writes every CSV export for a batch into `output_dir`.
///
/// # Errors
///
/// Returns an error if any file cannot be written.
pub fn export_all(
    collected: &CollectedMetrics,
    jobs: &BTreeMap<String, JobMetrics>,
    output_dir: &Path,
) -> Result<ExportReport> {
    let report = ExportReport {
        workflow_summary: exports::export_workflow_summary(collected, output_dir)?,
        job_files: jobs
            .values()
            .map(|job| exports::export_job_metrics(job, output_dir))
            .collect::<Result<_>>()?,
        jobs_summary: exports::export_jobs_summary(jobs, output_dir)?,
        steps_summary: exports::export_steps_summary(jobs, output_dir)?,
        detailed: exports::export_detailed_metrics(collected, output_dir)?,
    };

    info!(
        "Exported {} job files to {}",
        report.job_files.len(),
        output_dir.display()
    );

    Ok(report)
}

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use serde::Serialize;
use tokio::sync::Semaphore;

use super::duration::{job_duration, run_duration, step_duration};
use crate::providers::github::{Job, WorkflowRun};

/// Source of job/step detail for a single run.
///
/// Implementations must not fail: a run whose jobs cannot be retrieved
/// yields an empty list, exactly like a run that had no jobs.
pub trait JobSource {
    fn fetch_jobs(&self, run: &WorkflowRun) -> impl Future<Output = Vec<Job>>;
}

/// Success/total tally of a step across runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub success: usize,
    pub total: usize,
}

/// Durations collected from a batch of workflow runs.
///
/// Step keys have the form `job:step`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectedMetrics {
    pub workflow_durations: Vec<u64>,
    pub job_durations: Vec<u64>,
    pub step_durations: Vec<u64>,
    pub job_durations_by_name: BTreeMap<String, Vec<u64>>,
    pub step_durations_by_job: BTreeMap<String, Vec<u64>>,
    pub step_durations_by_key: BTreeMap<String, Vec<u64>>,
    pub step_outcomes: BTreeMap<String, StepOutcome>,
    pub rerun_count: usize,
    pub original_run_count: usize,
}

pub fn step_key(job_name: &str, step_name: &str) -> String {
    format!("{job_name}:{step_name}")
}

struct StepSample {
    key: String,
    job_name: String,
    duration: Option<u64>,
    succeeded: bool,
}

/// Everything one run contributes to the job and step maps.
#[derive(Default)]
struct RunContribution {
    jobs: Vec<(String, u64)>,
    steps: Vec<StepSample>,
}

impl RunContribution {
    fn from_jobs(jobs: &[Job]) -> Self {
        let mut contribution = Self::default();

        for job in jobs {
            if let Some(duration) = job_duration(job) {
                contribution.jobs.push((job.name.clone(), duration));
            }

            for step in job.steps.iter().flatten() {
                contribution.steps.push(StepSample {
                    key: step_key(&job.name, &step.name),
                    job_name: job.name.clone(),
                    duration: step_duration(step),
                    succeeded: step.succeeded(),
                });
            }
        }

        contribution
    }
}

impl CollectedMetrics {
    fn record_run(&mut self, run: &WorkflowRun) {
        if run.is_rerun() {
            self.rerun_count += 1;
        } else {
            self.original_run_count += 1;
        }

        if let Some(duration) = run_duration(run) {
            self.workflow_durations.push(duration);
        }
    }

    /// Folds one run's contribution in. Appends and increments only, so the
    /// result does not depend on the order contributions are absorbed.
    fn absorb(&mut self, contribution: RunContribution) {
        for (job_name, duration) in contribution.jobs {
            self.job_durations.push(duration);
            self.job_durations_by_name
                .entry(job_name)
                .or_default()
                .push(duration);
        }

        for sample in contribution.steps {
            let outcome = self.step_outcomes.entry(sample.key.clone()).or_default();
            outcome.total += 1;
            if sample.succeeded {
                outcome.success += 1;
            }

            if let Some(duration) = sample.duration {
                self.step_durations.push(duration);
                self.step_durations_by_job
                    .entry(sample.job_name)
                    .or_default()
                    .push(duration);
                self.step_durations_by_key
                    .entry(sample.key)
                    .or_default()
                    .push(duration);
            }
        }
    }

    pub fn runs_processed(&self) -> usize {
        self.rerun_count + self.original_run_count
    }
}

/// Collects workflow, job and step durations for `runs`.
///
/// Run-level counters and workflow durations are recorded up front. Job
/// detail is then fetched for every run at once, with at most
/// `max_concurrency` fetches in flight (a limit of 0 is treated as 1).
/// `progress` receives `(completed, total)` after each fetch finishes.
///
/// Contributions are merged after every fetch has completed, so the result
/// is the same whatever order the fetches finish in.
pub async fn collect_metrics<S, P>(
    runs: &[WorkflowRun],
    source: &S,
    max_concurrency: usize,
    progress: P,
) -> CollectedMetrics
where
    S: JobSource,
    P: Fn(usize, usize) + Sync,
{
    let mut metrics = CollectedMetrics::default();

    for run in runs {
        metrics.record_run(run);
    }

    let total = runs.len();
    let semaphore = Semaphore::new(max_concurrency.max(1));
    let completed = AtomicUsize::new(0);

    info!(
        "Fetching jobs for {total} workflow runs ({} concurrent)...",
        max_concurrency.max(1)
    );

    let fetches = runs.iter().map(|run| {
        let semaphore = &semaphore;
        let completed = &completed;
        let progress = &progress;
        async move {
            let jobs = {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                source.fetch_jobs(run).await
            };
            debug!("Run {} returned {} jobs", run.id, jobs.len());

            let contribution = RunContribution::from_jobs(&jobs);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress(done, total);
            contribution
        }
    });

    let contributions = futures::future::join_all(fetches).await;

    for contribution in contributions {
        metrics.absorb(contribution);
    }

    info!(
        "Collected {} workflow, {} job and {} step durations",
        metrics.workflow_durations.len(),
        metrics.job_durations.len(),
        metrics.step_durations.len()
    );

    metrics
}

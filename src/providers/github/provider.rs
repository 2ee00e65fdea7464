use std::collections::BTreeMap;

use log::{info, warn};

use crate::analysis::{
    aggregate_job_metrics, collect_metrics, describe_criteria, filter_runs, CollectedMetrics,
    FilterCriteria, JobMetrics,
};
use crate::auth::Token;
use crate::error::{GhaMetricsError, Result};
use crate::output::PhaseProgress;

use super::client::{GitHubClient, RunQuery};
use super::types::WorkflowRun;

/// What to analyze for one workflow.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub workflow_id: String,
    pub branch: Option<String>,
    pub max_builds: usize,
    pub concurrent_calls: usize,
    pub criteria: FilterCriteria,
}

/// Result of analyzing one workflow.
#[derive(Debug)]
pub struct WorkflowAnalysis {
    /// Runs GitHub reported for the query, before local filtering
    pub total_found: usize,
    pub runs: Vec<WorkflowRun>,
    pub filter_descriptions: Vec<String>,
    pub collected: CollectedMetrics,
    pub jobs: BTreeMap<String, JobMetrics>,
}

/// Collects workflow duration metrics from GitHub Actions.
pub struct GitHubProvider {
    client: GitHubClient,
    owner: String,
    repo: String,
}

impl GitHubProvider {
    /// Creates a provider for `owner/repo`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if owner or repo is empty or the
    /// client cannot be built.
    pub fn new(base_url: &str, owner: &str, repo: &str, token: Option<Token>) -> Result<Self> {
        if owner.is_empty() || repo.is_empty() {
            return Err(GhaMetricsError::Config(
                "owner and repo must not be empty".to_string(),
            ));
        }

        let client = GitHubClient::new(base_url, owner.to_string(), repo.to_string(), token)?;

        Ok(Self {
            client,
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Fetches, filters and collects metrics for the requested workflow.
    ///
    /// Progress is displayed in three phases:
    /// 1. Fetching workflow runs
    /// 2. Fetching jobs for each run, `concurrent_calls` at a time
    /// 3. Aggregating per-job metrics
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow run list cannot be fetched. Job
    /// fetch failures for individual runs are logged and skipped.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<WorkflowAnalysis> {
        if request.concurrent_calls == 0 {
            return Err(GhaMetricsError::Config(
                "concurrent calls must be at least 1".to_string(),
            ));
        }

        info!(
            "Starting metrics collection for {}/{} workflow {}",
            self.owner, self.repo, request.workflow_id
        );

        let progress = PhaseProgress::start_phase_1();

        let query = RunQuery {
            workflow_id: &request.workflow_id,
            branch: request.branch.as_deref(),
            max_builds: request.max_builds,
            created_from: request.criteria.from_date,
            created_to: request.criteria.to_date,
        };
        let page = self.client.fetch_workflow_runs(&query).await?;

        let runs = filter_runs(&page.runs, &request.criteria);
        let filter_descriptions = describe_criteria(&request.criteria);
        if runs.is_empty() {
            warn!("No workflow runs matched the filters");
        }
        info!(
            "{} of {} fetched runs match the filters",
            runs.len(),
            page.runs.len()
        );

        let progress = progress.finish_phase_1_start_phase_2(runs.len());

        let collected = collect_metrics(&runs, &self.client, request.concurrent_calls, |done, total| {
            progress.update(done, total);
        })
        .await;

        let progress = progress.finish_phase_2_start_phase_3();

        let jobs = aggregate_job_metrics(&collected);

        progress.finish_phase_3();

        Ok(WorkflowAnalysis {
            total_found: page.total_count,
            runs,
            filter_descriptions,
            collected,
            jobs,
        })
    }
}

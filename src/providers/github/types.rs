use serde::{Deserialize, Serialize};

/// GitHub Actions workflow run.
///
/// Timestamps are kept as the raw strings returned by the API. Parsing
/// happens where they are consumed, since a malformed value is handled
/// differently by filtering and by duration derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Unique identifier for the workflow run
    pub id: u64,
    /// Name of the workflow
    #[serde(default)]
    pub name: Option<String>,
    /// Status of the run (queued, in_progress, completed)
    #[serde(default)]
    pub status: String,
    /// Conclusion of the run (success, failure, etc.)
    #[serde(default)]
    pub conclusion: Option<String>,
    /// When the run was created
    #[serde(default)]
    pub created_at: String,
    /// When the run was last updated
    #[serde(default)]
    pub updated_at: String,
    /// When the current attempt started
    #[serde(default)]
    pub run_started_at: Option<String>,
    /// Head branch or tag name
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub workflow_id: u64,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub run_number: u64,
    /// 1 for the original run, 2+ for reruns
    #[serde(default = "default_run_attempt")]
    pub run_attempt: u32,
}

fn default_run_attempt() -> u32 {
    1
}

impl WorkflowRun {
    pub fn is_rerun(&self) -> bool {
        self.run_attempt > 1
    }
}

/// Job within a GitHub Actions workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Steps in this job, absent for jobs that never ran
    #[serde(default)]
    pub steps: Option<Vec<Step>>,
}

/// Step within a GitHub Actions job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

impl Step {
    pub fn succeeded(&self) -> bool {
        self.conclusion.as_deref() == Some("success")
    }
}

/// Response from GitHub API for workflow runs.
#[derive(Debug, Deserialize)]
pub struct WorkflowRunsResponse {
    pub total_count: usize,
    pub workflow_runs: Vec<WorkflowRun>,
}

/// Response from GitHub API for workflow jobs.
#[derive(Debug, Deserialize)]
pub struct JobsResponse {
    pub total_count: usize,
    pub jobs: Vec<Job>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn run(id: u64, created_at: &str, updated_at: &str, run_attempt: u32) -> WorkflowRun {
        WorkflowRun {
            id,
            name: Some("CI".to_string()),
            status: "completed".to_string(),
            conclusion: Some("success".to_string()),
            created_at: created_at.to_string(),
            updated_at: updated_at.to_string(),
            run_started_at: Some(created_at.to_string()),
            head_branch: Some("main".to_string()),
            workflow_id: 1,
            html_url: format!("https://github.com/owner/repo/actions/runs/{id}"),
            run_number: id,
            run_attempt,
        }
    }

    pub fn job(name: &str, started_at: &str, completed_at: &str, steps: Vec<Step>) -> Job {
        Job {
            id: 1,
            name: name.to_string(),
            status: "completed".to_string(),
            conclusion: Some("success".to_string()),
            started_at: Some(started_at.to_string()),
            completed_at: Some(completed_at.to_string()),
            steps: Some(steps),
        }
    }

    pub fn step(name: &str, started_at: &str, completed_at: &str, conclusion: &str) -> Step {
        Step {
            name: name.to_string(),
            status: "completed".to_string(),
            conclusion: Some(conclusion.to_string()),
            number: 1,
            started_at: Some(started_at.to_string()),
            completed_at: Some(completed_at.to_string()),
        }
    }
}

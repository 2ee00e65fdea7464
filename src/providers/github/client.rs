use chrono::NaiveDate;
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use url::Url;

use crate::analysis::JobSource;
use crate::auth::Token;
use crate::error::{GhaMetricsError, Result};

use super::types::{Job, JobsResponse, WorkflowRun, WorkflowRunsResponse};

/// GitHub caps `per_page` at 100.
const MAX_PAGE_SIZE: usize = 100;

/// Workflow runs fetched for one query, plus the total GitHub reports.
#[derive(Debug)]
pub struct WorkflowRunsPage {
    pub total_count: usize,
    pub runs: Vec<WorkflowRun>,
}

/// Query parameters for listing a workflow's runs.
#[derive(Debug, Clone, Default)]
pub struct RunQuery<'a> {
    pub workflow_id: &'a str,
    pub branch: Option<&'a str>,
    pub max_builds: usize,
    pub created_from: Option<NaiveDate>,
    pub created_to: Option<NaiveDate>,
}

impl RunQuery<'_> {
    /// GitHub search syntax for the `created` parameter.
    fn created_range(&self) -> Option<String> {
        match (self.created_from, self.created_to) {
            (Some(from), Some(to)) => Some(format!("{from}..{to}")),
            (Some(from), None) => Some(format!(">={from}")),
            (None, Some(to)) => Some(format!("<={to}")),
            (None, None) => None,
        }
    }
}

/// GitHub REST API client for workflow data.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    api_url: Url,
    owner: String,
    repo: String,
    token: Option<Token>,
}

impl GitHubClient {
    /// Creates a client for `owner/repo` against `base_url`
    /// (e.g., <https://api.github.com>).
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built or
    /// the base URL is invalid.
    pub fn new(base_url: &str, owner: String, repo: String, token: Option<Token>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        let client = Client::builder()
            .user_agent(concat!("gha-metrics/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| GhaMetricsError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut api_url = Url::parse(base_url)
            .map_err(|e| GhaMetricsError::Config(format!("Invalid base URL: {e}")))?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        Ok(Self {
            client,
            api_url,
            owner,
            repo,
            token,
        })
    }

    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    fn repo_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(&format!("repos/{}/{}/{path}", self.owner, self.repo))
            .map_err(|e| GhaMetricsError::Config(format!("Invalid repository URL: {e}")))
    }

    async fn get<T>(&self, url: Url, query: &[(&str, String)]) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        debug!("GET {url} {query:?}");
        let response = self
            .auth_request(self.client.get(url).query(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(GhaMetricsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Lists up to `query.max_builds` runs of a workflow, newest first,
    /// following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails or cannot be parsed.
    pub async fn fetch_workflow_runs(&self, query: &RunQuery<'_>) -> Result<WorkflowRunsPage> {
        let url = self.repo_url(&format!("actions/workflows/{}/runs", query.workflow_id))?;
        let per_page = query.max_builds.clamp(1, MAX_PAGE_SIZE);

        info!(
            "Fetching up to {} runs of workflow {} in {}/{}...",
            query.max_builds, query.workflow_id, self.owner, self.repo
        );

        let mut runs = Vec::new();
        let mut total_count = 0;
        let mut page = 1;

        while runs.len() < query.max_builds {
            let mut params = vec![
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
            ];
            if let Some(branch) = query.branch {
                params.push(("branch", branch.to_string()));
            }
            if let Some(created) = query.created_range() {
                params.push(("created", created));
            }

            let response: WorkflowRunsResponse = self.get(url.clone(), &params).await?;
            total_count = response.total_count;
            let page_len = response.workflow_runs.len();
            runs.extend(response.workflow_runs);

            if page_len < per_page {
                break;
            }
            page += 1;
        }

        runs.truncate(query.max_builds);
        info!(
            "Received {} workflow runs (total_count={total_count})",
            runs.len()
        );

        Ok(WorkflowRunsPage { total_count, runs })
    }

    /// Fetches the jobs (with steps) of one workflow run attempt, following
    /// pagination until `total_count` jobs or a short page.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails or cannot be parsed.
    pub async fn fetch_run_jobs(&self, run_id: u64) -> Result<Vec<Job>> {
        let url = self.repo_url(&format!("actions/runs/{run_id}/jobs"))?;

        let mut jobs = Vec::new();
        let mut page = 1;

        loop {
            let params = [
                ("per_page", MAX_PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            let response: JobsResponse = self.get(url.clone(), &params).await?;
            let page_len = response.jobs.len();
            jobs.extend(response.jobs);

            if page_len < MAX_PAGE_SIZE || jobs.len() >= response.total_count {
                break;
            }
            page += 1;
        }

        debug!("Run {run_id} has {} jobs", jobs.len());
        Ok(jobs)
    }
}

impl JobSource for GitHubClient {
    async fn fetch_jobs(&self, run: &WorkflowRun) -> Vec<Job> {
        self.fetch_run_jobs(run.id).await.unwrap_or_else(|e| {
            warn!("Failed to fetch jobs for run {}: {e}", run.id);
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::github::fixtures;
    use mockito::Matcher;

    fn runs_body(ids: std::ops::RangeInclusive<u64>, total_count: usize) -> String {
        let runs: Vec<_> = ids
            .map(|id| fixtures::run(id, "2024-01-01T10:00:00Z", "2024-01-01T10:05:00Z", 1))
            .collect();
        serde_json::json!({ "total_count": total_count, "workflow_runs": runs }).to_string()
    }

    fn client(server: &mockito::Server, token: Option<Token>) -> GitHubClient {
        GitHubClient::new(&server.url(), "owner".into(), "repo".into(), token).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_workflow_runs_single_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/owner/repo/actions/workflows/ci.yml/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "5".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("branch".into(), "main".into()),
                Matcher::UrlEncoded("created".into(), "2024-01-01..2024-01-31".into()),
            ]))
            .match_header("authorization", "Bearer ghp_test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(runs_body(1..=3, 3))
            .create_async()
            .await;

        let query = RunQuery {
            workflow_id: "ci.yml",
            branch: Some("main"),
            max_builds: 5,
            created_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            created_to: NaiveDate::from_ymd_opt(2024, 1, 31),
        };
        let page = client(&server, Some(Token::from("ghp_test")))
            .fetch_workflow_runs(&query)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(page.total_count, 3);
        assert_eq!(page.runs.len(), 3);
        assert_eq!(page.runs[0].id, 1);
    }

    #[tokio::test]
    async fn test_fetch_workflow_runs_paginates_and_truncates() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/repos/owner/repo/actions/workflows/42/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(runs_body(1..=100, 250))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/owner/repo/actions/workflows/42/runs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(runs_body(101..=200, 250))
            .create_async()
            .await;

        let query = RunQuery {
            workflow_id: "42",
            max_builds: 150,
            ..Default::default()
        };
        let page = client(&server, None)
            .fetch_workflow_runs(&query)
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(page.total_count, 250);
        assert_eq!(page.runs.len(), 150);
        assert_eq!(page.runs.last().unwrap().id, 150);
    }

    #[tokio::test]
    async fn test_fetch_workflow_runs_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/owner/repo/actions/workflows/ci.yml/runs")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"message":"Not Found"}"#)
            .create_async()
            .await;

        let query = RunQuery {
            workflow_id: "ci.yml",
            max_builds: 10,
            ..Default::default()
        };
        let err = client(&server, None)
            .fetch_workflow_runs(&query)
            .await
            .unwrap_err();

        assert!(matches!(err, GhaMetricsError::Api { status: 404, .. }));
        assert!(err.to_string().contains("Not Found"));
    }

    #[tokio::test]
    async fn test_fetch_jobs_parses_steps() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "total_count": 1,
            "jobs": [{
                "id": 9,
                "name": "build",
                "status": "completed",
                "conclusion": "success",
                "started_at": "2024-01-01T10:00:00Z",
                "completed_at": "2024-01-01T10:03:00Z",
                "steps": [{
                    "name": "checkout",
                    "status": "completed",
                    "conclusion": "success",
                    "number": 1,
                    "started_at": "2024-01-01T10:00:00Z",
                    "completed_at": "2024-01-01T10:00:05Z"
                }]
            }]
        });
        let _mock = server
            .mock("GET", "/repos/owner/repo/actions/runs/7/jobs")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let run = fixtures::run(7, "2024-01-01T10:00:00Z", "2024-01-01T10:05:00Z", 1);
        let jobs = client(&server, None).fetch_jobs(&run).await;

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "build");
        assert_eq!(jobs[0].steps.as_ref().unwrap()[0].name, "checkout");
    }

    fn numbered_jobs(range: std::ops::Range<u64>) -> Vec<Job> {
        range
            .map(|i| {
                let mut job = fixtures::job(
                    &format!("matrix-{i}"),
                    "2024-01-01T10:00:00Z",
                    "2024-01-01T10:01:00Z",
                    Vec::new(),
                );
                job.id = i;
                job
            })
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_jobs_follows_pagination() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/repos/owner/repo/actions/runs/7/jobs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({ "total_count": 150, "jobs": numbered_jobs(0..100) })
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/repos/owner/repo/actions/runs/7/jobs")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("per_page".into(), "100".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(
                serde_json::json!({ "total_count": 150, "jobs": numbered_jobs(100..150) })
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let run = fixtures::run(7, "2024-01-01T10:00:00Z", "2024-01-01T10:05:00Z", 1);
        let jobs = client(&server, None).fetch_jobs(&run).await;

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(jobs.len(), 150);
        assert_eq!(jobs[0].name, "matrix-0");
        assert_eq!(jobs[149].name, "matrix-149");
    }

    #[tokio::test]
    async fn test_fetch_jobs_stops_at_total_count() {
        let mut server = mockito::Server::new_async().await;
        let only_page = server
            .mock("GET", "/repos/owner/repo/actions/runs/7/jobs")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(
                serde_json::json!({ "total_count": 100, "jobs": numbered_jobs(0..100) })
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let jobs = client(&server, None).fetch_run_jobs(7).await.unwrap();

        only_page.assert_async().await;
        assert_eq!(jobs.len(), 100);
    }

    #[tokio::test]
    async fn test_fetch_jobs_failure_yields_empty_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/repos/owner/repo/actions/runs/7/jobs")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let run = fixtures::run(7, "2024-01-01T10:00:00Z", "2024-01-01T10:05:00Z", 1);
        let jobs = client(&server, None).fetch_jobs(&run).await;

        assert!(jobs.is_empty());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = GitHubClient::new("not a url", "o".into(), "r".into(), None);
        assert!(matches!(result, Err(GhaMetricsError::Config(_))));
    }

    #[test]
    fn test_created_range() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 1);
        let to = NaiveDate::from_ymd_opt(2024, 2, 1);
        let mut query = RunQuery::default();
        assert_eq!(query.created_range(), None);

        query.created_from = from;
        assert_eq!(query.created_range().as_deref(), Some(">=2024-01-01"));

        query.created_to = to;
        assert_eq!(
            query.created_range().as_deref(),
            Some("2024-01-01..2024-02-01")
        );

        query.created_from = None;
        assert_eq!(query.created_range().as_deref(), Some("<=2024-02-01"));
    }
}

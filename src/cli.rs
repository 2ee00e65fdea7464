use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::analysis::filter::parse_date;
use crate::analysis::{export_all, FilterCriteria, RerunHandling};
use crate::auth::Token;
use crate::config::Config;
use crate::error::GhaMetricsError;
use crate::output::{self, exports};
use crate::providers::github::AnalysisRequest;
use crate::providers::GitHubProvider;

#[derive(Parser, Debug)]
#[command(name = "gha-metrics")]
#[command(author, version, about = "GitHub Actions workflow duration metrics", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./gha-metrics.{toml,json,yaml,yml})
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for exported metrics
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also write a JSON report
    #[arg(long)]
    json: bool,

    /// Pretty-print the JSON report
    #[arg(short, long)]
    pretty: bool,

    /// Repository owner
    #[arg(long)]
    owner: Option<String>,

    /// Repository name
    #[arg(long)]
    repo: Option<String>,

    /// Workflow file name or id (e.g., ci.yml)
    #[arg(short, long)]
    workflow_id: Option<String>,

    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[arg(short, long)]
    branch: Option<String>,

    /// Maximum number of workflow runs to fetch
    #[arg(short = 'n', long)]
    max_builds: Option<usize>,

    /// Only runs created on or after this date (YYYY-MM-DD)
    #[arg(long)]
    from_date: Option<String>,

    /// Only runs created on or before this date (YYYY-MM-DD)
    #[arg(long)]
    to_date: Option<String>,

    /// Only successful workflow runs
    #[arg(long)]
    only_success: bool,

    /// Exclude reruns, only process original workflow runs
    #[arg(long, conflicts_with = "only_reruns")]
    exclude_reruns: bool,

    /// Only process reruns
    #[arg(long)]
    only_reruns: bool,

    /// Maximum number of job fetches in flight
    #[arg(long)]
    concurrent_calls: Option<usize>,

    /// GitHub API base URL
    #[arg(long)]
    base_url: Option<String>,
}

impl Cli {
    /// Folds command-line flags over file configuration. Flags win;
    /// boolean flags can only switch an option on.
    fn merge_into(&self, mut config: Config) -> Config {
        let github = &mut config.github;
        if let Some(owner) = &self.owner {
            github.owner = Some(owner.clone());
        }
        if let Some(repo) = &self.repo {
            github.repo = Some(repo.clone());
        }
        if let Some(workflow_id) = &self.workflow_id {
            github.workflow_id = Some(workflow_id.clone());
        }
        if let Some(token) = &self.token {
            github.token = Some(token.clone());
        }
        if let Some(branch) = &self.branch {
            github.branch = Some(branch.clone());
        }
        if let Some(max_builds) = self.max_builds {
            github.max_builds = max_builds;
        }
        if let Some(concurrent_calls) = self.concurrent_calls {
            github.concurrent_calls = concurrent_calls;
        }
        if let Some(base_url) = &self.base_url {
            github.base_url = base_url.clone();
        }

        let filter = &mut config.filter;
        if let Some(from_date) = &self.from_date {
            filter.from_date = Some(from_date.clone());
        }
        if let Some(to_date) = &self.to_date {
            filter.to_date = Some(to_date.clone());
        }
        filter.only_success |= self.only_success;
        filter.exclude_reruns |= self.exclude_reruns;
        filter.only_reruns |= self.only_reruns;

        if let Some(output_dir) = &self.output_dir {
            config.output.directory = output_dir.clone();
        }
        config.output.json |= self.json;
        config.output.pretty |= self.pretty;

        config
    }

    pub async fn execute(&self) -> Result<()> {
        let config = self.merge_into(
            Config::load(self.config.as_deref()).context("Failed to load configuration")?,
        );

        let owner = required(config.github.owner.as_deref(), "owner")?;
        let repo = required(config.github.repo.as_deref(), "repo")?;
        let workflow_id = required(config.github.workflow_id.as_deref(), "workflow-id")?;

        let request = AnalysisRequest {
            workflow_id: workflow_id.to_string(),
            branch: config.github.branch.clone(),
            max_builds: config.github.max_builds,
            concurrent_calls: config.github.concurrent_calls,
            criteria: filter_criteria(&config)?,
        };

        info!("Collecting workflow metrics for {owner}/{repo} ({workflow_id})");

        let token = config.github.token.as_deref().map(Token::from);
        let provider = GitHubProvider::new(&config.github.base_url, owner, repo, token)?;
        let analysis = provider.analyze(&request).await?;

        output::print_summary(&analysis);

        let output_dir =
            output::create_output_directory(&config.output.directory, owner, repo, workflow_id)
                .with_context(|| {
                    format!(
                        "Failed to create output directory under {}",
                        config.output.directory.display()
                    )
                })?;

        let report = export_all(&analysis.collected, &analysis.jobs, &output_dir)
            .context("Failed to export metrics")?;

        let json_report = if config.output.json {
            Some(
                exports::export_json(
                    &analysis.collected,
                    &analysis.jobs,
                    config.output.pretty,
                    &output_dir,
                )
                .context("Failed to write JSON report")?,
            )
        } else {
            None
        };

        output::print_exports(&output_dir, &report, json_report.as_deref());
        info!("Metrics written to: {}", output_dir.display());

        Ok(())
    }
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, GhaMetricsError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| GhaMetricsError::Config(format!("missing required setting: {name}")))
}

fn filter_criteria(config: &Config) -> Result<FilterCriteria, GhaMetricsError> {
    let filter = &config.filter;
    Ok(FilterCriteria {
        from_date: filter
            .from_date
            .as_deref()
            .map(|value| parse_date(value, "from-date"))
            .transpose()?,
        to_date: filter
            .to_date
            .as_deref()
            .map(|value| parse_date(value, "to-date"))
            .transpose()?,
        only_success: filter.only_success,
        rerun_handling: RerunHandling::from_flags(filter.exclude_reruns, filter.only_reruns)?,
    })
}

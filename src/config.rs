use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for gha-metrics.
///
/// Allows users to save common analysis settings and reuse them across runs.
/// Configuration files are loaded from the current directory or specified path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Repository and API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Local run filters
    #[serde(default)]
    pub filter: FilterConfig,

    /// Export preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GitHubConfig {
    /// GitHub personal access token
    pub token: Option<String>,

    /// GitHub API base URL
    #[serde(default = "default_github_base_url")]
    pub base_url: String,

    pub owner: Option<String>,

    pub repo: Option<String>,

    /// Workflow file name or numeric id (e.g., 'ci.yml')
    pub workflow_id: Option<String>,

    /// Only fetch runs of this branch
    pub branch: Option<String>,

    /// Maximum number of workflow runs to fetch
    #[serde(default = "default_max_builds")]
    pub max_builds: usize,

    /// Maximum number of job fetches in flight
    #[serde(default = "default_concurrent_calls")]
    pub concurrent_calls: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Earliest creation date, `YYYY-MM-DD`
    pub from_date: Option<String>,

    /// Latest creation date, `YYYY-MM-DD`
    pub to_date: Option<String>,

    #[serde(default)]
    pub only_success: bool,

    #[serde(default)]
    pub exclude_reruns: bool,

    #[serde(default)]
    pub only_reruns: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Root under which each analysis gets its own directory
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Also write a JSON report
    #[serde(default)]
    pub json: bool,

    /// Pretty-print the JSON report
    #[serde(default)]
    pub pretty: bool,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: default_github_base_url(),
            owner: None,
            repo: None,
            workflow_id: None,
            branch: None,
            max_builds: default_max_builds(),
            concurrent_calls: default_concurrent_calls(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            json: false,
            pretty: false,
        }
    }
}

fn default_github_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_max_builds() -> usize {
    10
}

fn default_concurrent_calls() -> usize {
    8
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("output")
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./gha-metrics.toml
    /// 3. ./gha-metrics.json
    /// 4. ./gha-metrics.yaml
    /// 5. ./gha-metrics.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        Self::load_from_dir(Path::new("."))
    }

    /// Loads the first candidate file found in `dir`.
    fn load_from_dir(dir: &Path) -> Result<Self> {
        let candidates = [
            "gha-metrics.toml",
            "gha-metrics.json",
            "gha-metrics.yaml",
            "gha-metrics.yml",
        ];

        for candidate in &candidates {
            let path = dir.join(candidate);
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => {
                // Try TOML first, then JSON, then YAML
                toml::from_str(&contents)
                    .or_else(|_| serde_json::from_str(&contents))
                    .or_else(|_| serde_yaml::from_str(&contents))
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))
            }
        }
    }
}

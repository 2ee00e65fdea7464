use thiserror::Error;

#[derive(Error, Debug)]
pub enum GhaMetricsError {
    #[error("GitHub API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid {param} '{value}': use YYYY-MM-DD (e.g., 2024-01-01)")]
    InvalidDate { param: String, value: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GhaMetricsError>;

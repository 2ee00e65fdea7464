use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use log::debug;

use crate::error::Result;

const MAX_COMPONENT_LENGTH: usize = 100;

fn sanitize_component(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        };
        if !(c == '_' && sanitized.ends_with('_')) {
            sanitized.push(c);
        }
    }

    sanitized.trim_matches('_').chars().take(MAX_COMPONENT_LENGTH).collect()
}

/// `<owner>-<repo>-<workflow>-<YYYYMMDD-HHMMSS>`
fn directory_name(owner: &str, repo: &str, workflow_id: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{}-{}-{}-{}",
        sanitize_component(owner),
        sanitize_component(repo),
        sanitize_component(workflow_id),
        timestamp.format("%Y%m%d-%H%M%S")
    )
}

/// Creates a fresh, timestamped directory for one analysis under `root`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn create_output_directory(
    root: &Path,
    owner: &str,
    repo: &str,
    workflow_id: &str,
) -> Result<PathBuf> {
    let path = root.join(directory_name(
        owner,
        repo,
        workflow_id,
        Local::now().naive_local(),
    ));
    std::fs::create_dir_all(&path)?;
    debug!("Created output directory {}", path.display());

    Ok(path)
}

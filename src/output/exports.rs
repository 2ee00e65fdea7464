use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analysis::duration::format_duration;
use crate::analysis::{CollectedMetrics, DurationStats, JobMetrics};
use crate::error::Result;

pub const WORKFLOW_SUMMARY_FILE: &str = "workflow_summary.csv";
pub const JOBS_SUMMARY_FILE: &str = "gha_jobs_summary.csv";
pub const STEPS_SUMMARY_FILE: &str = "gha_steps_summary.csv";
pub const DETAILED_METRICS_FILE: &str = "gha_detailed_metrics.csv";
pub const JSON_REPORT_FILE: &str = "metrics.json";

/// Job names longer than this are truncated in file names.
const MAX_JOB_NAME_LENGTH: usize = 150;

/// Paths of every file written by one export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub workflow_summary: PathBuf,
    pub job_files: Vec<PathBuf>,
    pub jobs_summary: PathBuf,
    pub steps_summary: PathBuf,
    pub detailed: PathBuf,
}

/// Quotes a CSV field when it contains a comma, quote or newline, doubling
/// any embedded quotes (RFC 4180).
pub fn escape_csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `mean,median,p90,count` for a duration sequence.
///
/// Floats use the shortest representation that parses back to the same
/// value.
fn stats_columns(durations: &[u64]) -> String {
    let stats = DurationStats::from_durations(durations);
    format!(
        "{},{},{},{}",
        stats.mean, stats.median, stats.p90, stats.count
    )
}

/// 31-multiplier hash over UTF-16 code units, stable across runs and
/// platforms.
fn stable_hash(value: &str) -> u32 {
    value
        .encode_utf16()
        .fold(0i32, |hash, unit| {
            hash.wrapping_mul(31).wrapping_add(i32::from(unit))
        })
        .unsigned_abs()
}

/// Turns a job name into a file-name token.
///
/// Anything outside `[A-Za-z0-9_-]` becomes `_`, runs of `_` collapse, and
/// names over the length limit are truncated with a hash suffix so distinct
/// long names keep distinct files.
pub fn job_file_token(job_name: &str) -> String {
    let mut sanitized = String::with_capacity(job_name.len());
    for c in job_name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            '_'
        };
        if !(c == '_' && sanitized.ends_with('_')) {
            sanitized.push(c);
        }
    }

    if sanitized.len() > MAX_JOB_NAME_LENGTH {
        format!(
            "{}_{}",
            &sanitized[..MAX_JOB_NAME_LENGTH],
            stable_hash(&sanitized)
        )
    } else {
        sanitized
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes the overall workflow duration row.
pub fn export_workflow_summary(collected: &CollectedMetrics, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(WORKFLOW_SUMMARY_FILE);
    let mut output = create(&path)?;

    writeln!(output, "Metric Type,Mean,Median,P90,Count")?;
    writeln!(
        output,
        "Workflow Duration,{}",
        stats_columns(&collected.workflow_durations)
    )?;
    output.flush()?;

    Ok(path)
}

/// Writes one job's duration, its combined step duration and one row per
/// step name. Rows without any durations are skipped.
pub fn export_job_metrics(job: &JobMetrics, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(format!(
        "gha_metrics_job_{}.csv",
        job_file_token(&job.job_name)
    ));
    let mut output = create(&path)?;
    let name = escape_csv_field(&job.job_name);

    writeln!(output, "Metric Type,Name,Mean,Median,P90,Count")?;

    if !job.job_durations.is_empty() {
        writeln!(
            output,
            "Job Duration,{name},{}",
            stats_columns(&job.job_durations)
        )?;
    }

    if !job.step_durations.is_empty() {
        writeln!(
            output,
            "Step Duration (All Steps),{name},{}",
            stats_columns(&job.step_durations)
        )?;
    }

    for (step_name, step) in &job.steps {
        if step.durations.is_empty() {
            continue;
        }
        writeln!(
            output,
            "Step Duration,{},{}",
            escape_csv_field(step_name),
            stats_columns(&step.durations)
        )?;
    }
    output.flush()?;

    Ok(path)
}

/// Writes one row per job with its duration statistics.
pub fn export_jobs_summary(jobs: &BTreeMap<String, JobMetrics>, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(JOBS_SUMMARY_FILE);
    let mut output = create(&path)?;

    writeln!(output, "Job Name,Mean Duration,Median Duration,P90 Duration,Count")?;
    for (job_name, job) in jobs {
        if job.job_durations.is_empty() {
            continue;
        }
        writeln!(
            output,
            "{},{}",
            escape_csv_field(job_name),
            stats_columns(&job.job_durations)
        )?;
    }
    output.flush()?;

    Ok(path)
}

/// Writes one row per (job, step) pair with its duration statistics.
pub fn export_steps_summary(jobs: &BTreeMap<String, JobMetrics>, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(STEPS_SUMMARY_FILE);
    let mut output = create(&path)?;

    writeln!(
        output,
        "Job Name,Step Name,Mean Duration,Median Duration,P90 Duration,Count"
    )?;
    for (job_name, job) in jobs {
        for (step_name, step) in &job.steps {
            if step.durations.is_empty() {
                continue;
            }
            writeln!(
                output,
                "{},{},{}",
                escape_csv_field(job_name),
                escape_csv_field(step_name),
                stats_columns(&step.durations)
            )?;
        }
    }
    output.flush()?;

    Ok(path)
}

/// Writes every individual duration, raw and formatted.
pub fn export_detailed_metrics(collected: &CollectedMetrics, output_dir: &Path) -> Result<PathBuf> {
    let path = output_dir.join(DETAILED_METRICS_FILE);
    let mut output = create(&path)?;

    writeln!(output, "Type,Name,Duration (seconds),Duration (formatted)")?;

    let levels = [
        ("Workflow", "Run", &collected.workflow_durations),
        ("Job", "Job", &collected.job_durations),
        ("Step", "Step", &collected.step_durations),
    ];
    for (kind, label, durations) in levels {
        for (index, duration) in durations.iter().enumerate() {
            writeln!(
                output,
                "{kind},{label} {},{duration},{}",
                index + 1,
                format_duration(Some(*duration))
            )?;
        }
    }
    output.flush()?;

    Ok(path)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    runs_processed: usize,
    original_runs: usize,
    reruns: usize,
    workflow: DurationStats,
    jobs: &'a BTreeMap<String, JobMetrics>,
}

/// Writes the aggregated metrics as JSON.
pub fn export_json(
    collected: &CollectedMetrics,
    jobs: &BTreeMap<String, JobMetrics>,
    pretty: bool,
    output_dir: &Path,
) -> Result<PathBuf> {
    let report = JsonReport {
        runs_processed: collected.runs_processed(),
        original_runs: collected.original_run_count,
        reruns: collected.rerun_count,
        workflow: DurationStats::from_durations(&collected.workflow_durations),
        jobs,
    };

    let json = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    let path = output_dir.join(JSON_REPORT_FILE);
    std::fs::write(&path, json)?;

    Ok(path)
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::analysis::aggregate_job_metrics;
    use crate::analysis::collector::StepOutcome;

    fn collected() -> CollectedMetrics {
        let mut collected = CollectedMetrics {
            workflow_durations: vec![300, 120, 455, 61],
            job_durations: vec![100, 200, 7],
            step_durations: vec![10, 20, 5],
            original_run_count: 3,
            rerun_count: 1,
            ..Default::default()
        };
        collected
            .job_durations_by_name
            .insert("build, \"release\"".to_string(), vec![100, 200]);
        collected
            .job_durations_by_name
            .insert("lint".to_string(), vec![7]);
        collected
            .step_durations_by_job
            .insert("build, \"release\"".to_string(), vec![10, 20]);
        collected
            .step_durations_by_key
            .insert("build, \"release\":checkout".to_string(), vec![10, 20]);
        collected.step_outcomes.insert(
            "build, \"release\":checkout".to_string(),
            StepOutcome { success: 2, total: 2 },
        );
        collected
            .step_durations_by_key
            .insert("lint:clippy".to_string(), vec![5]);
        collected
    }

    fn read(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_escape_csv_field() {
        assert_eq!(escape_csv_field("build"), "build");
        assert_eq!(escape_csv_field("a,b"), "\"a,b\"");
        assert_eq!(escape_csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_job_file_token_sanitizes() {
        assert_eq!(job_file_token("build (ubuntu, 1.75)"), "build_ubuntu_1_75_");
        assert_eq!(job_file_token("lint-and_fmt"), "lint-and_fmt");
        assert_eq!(job_file_token("a  //  b"), "a_b");
    }

    #[test]
    fn test_job_file_token_truncates_with_stable_hash() {
        let long_a = format!("{}-alpha", "x".repeat(160));
        let long_b = format!("{}-bravo", "x".repeat(160));

        let token_a = job_file_token(&long_a);
        let token_b = job_file_token(&long_b);

        assert!(token_a.starts_with(&"x".repeat(150)));
        assert_ne!(token_a, token_b);
        assert_eq!(token_a, job_file_token(&long_a));
        assert!(token_a.len() > 150);
    }

    #[test]
    fn test_stable_hash_matches_known_value() {
        // 31-multiplier string hash of "abc" is 96354.
        assert_eq!(stable_hash("abc"), 96354);
        assert_eq!(stable_hash(""), 0);
    }

    #[test]
    fn test_workflow_summary() {
        let dir = tempfile::tempdir().unwrap();

        let path = export_workflow_summary(&collected(), dir.path()).unwrap();

        let lines = read(&path);
        assert_eq!(lines[0], "Metric Type,Mean,Median,P90,Count");
        assert_eq!(lines[1], "Workflow Duration,234,210,455,4");
    }

    #[test]
    fn test_job_file_escapes_names() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = aggregate_job_metrics(&collected());

        let path = export_job_metrics(&jobs["build, \"release\""], dir.path()).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "gha_metrics_job_build_release_.csv"
        );
        let lines = read(&path);
        assert_eq!(lines[0], "Metric Type,Name,Mean,Median,P90,Count");
        assert_eq!(
            lines[1],
            "Job Duration,\"build, \"\"release\"\"\",150,150,200,2"
        );
        assert_eq!(
            lines[2],
            "Step Duration (All Steps),\"build, \"\"release\"\"\",15,15,20,2"
        );
        assert_eq!(lines[3], "Step Duration,checkout,15,15,20,2");
    }

    #[test]
    fn test_job_file_skips_empty_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut collected = CollectedMetrics::default();
        collected.step_outcomes.insert(
            "deploy:push".to_string(),
            StepOutcome { success: 0, total: 1 },
        );
        let jobs = aggregate_job_metrics(&collected);

        let path = export_job_metrics(&jobs["deploy"], dir.path()).unwrap();

        assert_eq!(read(&path).len(), 1);
    }

    #[test]
    fn test_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = aggregate_job_metrics(&collected());

        let jobs_path = export_jobs_summary(&jobs, dir.path()).unwrap();
        let steps_path = export_steps_summary(&jobs, dir.path()).unwrap();

        assert_eq!(
            read(&jobs_path),
            vec![
                "Job Name,Mean Duration,Median Duration,P90 Duration,Count",
                "\"build, \"\"release\"\"\",150,150,200,2",
                "lint,7,7,7,1",
            ]
        );
        assert_eq!(
            read(&steps_path),
            vec![
                "Job Name,Step Name,Mean Duration,Median Duration,P90 Duration,Count",
                "\"build, \"\"release\"\"\",checkout,15,15,20,2",
                "lint,clippy,5,5,5,1",
            ]
        );
    }

    #[test]
    fn test_detailed_metrics() {
        let dir = tempfile::tempdir().unwrap();

        let path = export_detailed_metrics(&collected(), dir.path()).unwrap();

        let lines = read(&path);
        assert_eq!(lines[0], "Type,Name,Duration (seconds),Duration (formatted)");
        assert_eq!(lines[1], "Workflow,Run 1,300,5m 0s");
        assert_eq!(lines[5], "Job,Job 1,100,1m 40s");
        assert_eq!(lines.len(), 1 + 4 + 3 + 3);
    }

    #[test]
    fn test_export_json() {
        let dir = tempfile::tempdir().unwrap();
        let collected = collected();
        let jobs = aggregate_job_metrics(&collected);

        let path = export_json(&collected, &jobs, true, dir.path()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["runs_processed"], 4);
        assert_eq!(value["reruns"], 1);
        assert_eq!(value["workflow"]["count"], 4);
        assert_eq!(value["jobs"]["lint"]["job_durations"][0], 7);
    }

    #[test]
    fn test_round_trip_reproduces_statistics() {
        let dir = tempfile::tempdir().unwrap();
        let collected = CollectedMetrics {
            workflow_durations: vec![100, 101, 103, 250, 7, 99, 1000],
            ..Default::default()
        };

        let path = export_workflow_summary(&collected, dir.path()).unwrap();

        let lines = read(&path);
        let columns: Vec<&str> = lines[1].split(',').collect();
        let parsed: Vec<f64> = columns[1..4].iter().map(|c| c.parse().unwrap()).collect();
        let expected = DurationStats::from_durations(&collected.workflow_durations);

        assert_eq!(parsed, vec![expected.mean, expected.median, expected.p90]);
        assert_eq!(columns[4].parse::<usize>().unwrap(), expected.count);
    }
}

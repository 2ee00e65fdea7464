use std::fmt::Write;
use std::path::Path;

use chrono::DateTime;
use comfy_table::{Cell, Color as TableColor};

use crate::analysis::duration::format_duration;
use crate::analysis::DurationStats;
use crate::output::exports::ExportReport;
use crate::providers::github::{WorkflowAnalysis, WorkflowRun};

use super::styling::{bright, bright_green, bright_yellow, count, cyan, dim};
use super::tables::{color_coded_success_cell, create_table, unavailable_cell};

const MAX_RELIABILITY_ROWS: usize = 10;

/// Prints a human-readable summary of one workflow analysis to stdout.
///
/// Displays:
/// - Build date range: creation time of the first and last analyzed run
/// - Runs: totals, active filters and the original/rerun split
/// - Duration statistics for workflows, jobs and steps
/// - Least reliable steps, color coded by success rate
pub fn print_summary(analysis: &WorkflowAnalysis) {
    println!("{}", render_summary(analysis));
}

/// Prints where every export landed.
pub fn print_exports(output_dir: &Path, report: &ExportReport, json_report: Option<&Path>) {
    println!("{}", render_exports(output_dir, report, json_report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn display_created_at(run: &WorkflowRun) -> String {
    DateTime::parse_from_rfc3339(&run.created_at).map_or_else(
        |_| run.created_at.clone(),
        |created| created.format("%Y-%m-%d %H:%M:%S").to_string(),
    )
}

/// First and last run by creation time. Runs with unparseable timestamps
/// sort first.
fn build_date_range(runs: &[WorkflowRun]) -> Option<(String, String)> {
    let mut sorted: Vec<&WorkflowRun> = runs.iter().collect();
    sorted.sort_by_key(|run| DateTime::parse_from_rfc3339(&run.created_at).ok());

    let first = sorted.first()?;
    let last = sorted.last()?;
    Some((display_created_at(first), display_created_at(last)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn duration_cell(seconds: f64) -> Cell {
    Cell::new(format!(
        "{} ({}s)",
        format_duration(Some(seconds as u64)),
        seconds as u64
    ))
}

fn stats_row(label: &str, durations: &[u64]) -> Vec<Cell> {
    if durations.is_empty() {
        return vec![
            Cell::new(label),
            unavailable_cell(),
            unavailable_cell(),
            unavailable_cell(),
            Cell::new(0),
        ];
    }

    let stats = DurationStats::from_durations(durations);
    vec![
        Cell::new(label),
        duration_cell(stats.mean),
        duration_cell(stats.median),
        duration_cell(stats.p90),
        Cell::new(stats.count),
    ]
}

#[allow(clippy::format_push_string)]
fn render_summary(analysis: &WorkflowAnalysis) -> String {
    let mut output = String::new();
    let collected = &analysis.collected;

    if let Some((first, last)) = build_date_range(&analysis.runs) {
        add_section_header(&mut output, "📅", "Build Date Range");
        output.push_str(&format!(
            "  {} {}\n  {} {}\n\n",
            dim("First build:"),
            cyan(first),
            dim("Last build:"),
            cyan(last)
        ));
    }

    add_section_header(&mut output, "📊", "Runs");
    if !analysis.filter_descriptions.is_empty() {
        output.push_str(&format!("  {}\n", dim("Filters applied:")));
        for description in &analysis.filter_descriptions {
            output.push_str(&format!("    - {description}\n"));
        }
    }
    output.push_str(&format!(
        "  {} {}\n  {} {}\n",
        dim("Total workflow runs found:"),
        bright_yellow(analysis.total_found),
        dim("Workflow runs after filters:"),
        bright_yellow(analysis.runs.len())
    ));
    if collected.runs_processed() > 0 {
        output.push_str(&format!(
            "  {} {}\n  {} {}\n",
            dim("Original runs:"),
            bright_green(collected.original_run_count),
            dim("Reruns:"),
            count(collected.rerun_count)
        ));
    }
    output.push('\n');

    if analysis.runs.is_empty() {
        output.push_str(&format!("{}\n", bright_yellow("No workflow runs to analyze.")));
        return output;
    }

    add_section_header(&mut output, "⏱️", "Duration Statistics");
    let mut stats_table = create_table(&["Level", "Mean", "Median", "P90", "Count"]);
    stats_table.add_row(stats_row("Workflow", &collected.workflow_durations));
    stats_table.add_row(stats_row("Job", &collected.job_durations));
    stats_table.add_row(stats_row("Step", &collected.step_durations));
    output.push_str(&format!("{stats_table}\n\n"));

    let mut steps: Vec<(&str, &str, f64, usize)> = analysis
        .jobs
        .values()
        .flat_map(|job| {
            job.steps
                .iter()
                .filter(|(_, step)| step.total_count > 0)
                .map(move |(name, step)| {
                    (
                        job.job_name.as_str(),
                        name.as_str(),
                        step.success_rate(),
                        step.total_count,
                    )
                })
        })
        .collect();

    if steps.is_empty() {
        return output;
    }

    steps.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    add_section_header(&mut output, "🧪", "Least Reliable Steps");
    let mut reliability_table = create_table(&["Job", "Step", "Success", "Executions"]);
    for (job_name, step_name, rate, total) in steps.iter().take(MAX_RELIABILITY_ROWS) {
        reliability_table.add_row(vec![
            Cell::new(job_name),
            Cell::new(step_name),
            color_coded_success_cell(*rate),
            Cell::new(total),
        ]);
    }
    if steps.len() > MAX_RELIABILITY_ROWS {
        reliability_table.add_row(vec![
            Cell::new(format!("... and {} more", steps.len() - MAX_RELIABILITY_ROWS))
                .fg(TableColor::DarkGrey),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
        ]);
    }
    output.push_str(&format!("{reliability_table}\n"));

    output
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

#[allow(clippy::format_push_string)]
fn render_exports(output_dir: &Path, report: &ExportReport, json_report: Option<&Path>) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "💾", "Exports");
    output.push_str(&format!(
        "  {} {}\n",
        dim("All metrics exported to:"),
        cyan(output_dir.display())
    ));
    output.push_str(&format!("  - {}\n", file_name(&report.workflow_summary)));
    output.push_str(&format!("  {}\n", dim("Per-job metrics (including all steps):")));
    for job_file in &report.job_files {
        output.push_str(&format!("    - {}\n", file_name(job_file)));
    }
    output.push_str(&format!("  {}\n", dim("Summary files:")));
    output.push_str(&format!(
        "    - {} (jobs summary)\n    - {} (steps summary)\n    - {} (every duration)\n",
        file_name(&report.jobs_summary),
        file_name(&report.steps_summary),
        file_name(&report.detailed)
    ));
    if let Some(json_report) = json_report {
        output.push_str(&format!("  - {}\n", file_name(json_report)));
    }

    output
}

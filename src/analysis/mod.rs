pub mod aggregator;
pub mod collector;
pub mod duration;
pub mod filter;
pub mod statistics;

pub use aggregator::{aggregate_job_metrics, export_all, JobMetrics};
pub use collector::{collect_metrics, CollectedMetrics, JobSource};
pub use filter::{describe_criteria, filter_runs, FilterCriteria, RerunHandling};
pub use statistics::DurationStats;

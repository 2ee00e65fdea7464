mod client;
mod provider;
mod types;


pub use provider::{AnalysisRequest, GitHubProvider, WorkflowAnalysis};
pub use types::{Job, Step, WorkflowRun};

#[cfg(test)]
pub(crate) use types::fixtures;

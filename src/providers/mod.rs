pub mod github;

pub use github::GitHubProvider;

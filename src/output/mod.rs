mod directory;
pub mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use directory::create_output_directory;
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::{print_exports, print_summary};

/// Prints the `gha-metrics` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("⏱️ gha-metrics"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitHub Actions Duration Metrics")
    );
}

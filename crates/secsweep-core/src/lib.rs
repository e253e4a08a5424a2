pub mod collect;
pub mod config;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod publish;
pub mod report;
pub mod steps;
pub mod util;

pub use error::{Result, SweepError};
pub use pipeline::{Pipeline, RunOutcome, RunState};

pub const TOOL_NAME: &str = "secsweep";

/// JSON schema version of the machine-readable metrics record.
/// Bump only when the layout of `metrics.json` changes semantically.
pub const SCHEMA_VERSION: &str = "0.1.0";

/// Narrative summary written into every run's output directory.
pub const SUMMARY_FILE: &str = "security-summary.md";

/// Flat key/value metrics record written next to the summary.
pub const METRICS_FILE: &str = "metrics.json";

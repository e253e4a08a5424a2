use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Terminal outcome of one step. No variant aborts the run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Success,
    /// The analyzer exited non-zero; often how it reports findings.
    NonZeroExit,
    Timeout,
    /// The analyzer is not installed; no process was created.
    BinaryMissing,
    /// The process could not be started or its output files opened.
    LaunchFailed,
    /// Interrupted, or never started, because the run was cancelled.
    Cancelled,
}

impl ExitStatus {
    /// Whether the step's output files reflect a completed tool run.
    pub fn produced_output(self) -> bool {
        matches!(self, ExitStatus::Success | ExitStatus::NonZeroExit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExitStatus::Success => "success",
            ExitStatus::NonZeroExit => "non_zero_exit",
            ExitStatus::Timeout => "timeout",
            ExitStatus::BinaryMissing => "binary_missing",
            ExitStatus::LaunchFailed => "launch_failed",
            ExitStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one executed (or skipped) step. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepResult {
    pub step_name: String,
    pub exit_status: ExitStatus,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub output_paths: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StepResult {
    pub fn new(
        step_name: impl Into<String>,
        exit_status: ExitStatus,
        output_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            exit_status,
            exit_code: None,
            duration_ms: 0,
            output_paths,
            detail: None,
        }
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_runs_count_as_output() {
        assert!(ExitStatus::Success.produced_output());
        assert!(ExitStatus::NonZeroExit.produced_output());
        assert!(!ExitStatus::Timeout.produced_output());
        assert!(!ExitStatus::BinaryMissing.produced_output());
        assert!(!ExitStatus::LaunchFailed.produced_output());
        assert!(!ExitStatus::Cancelled.produced_output());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ExitStatus::BinaryMissing).unwrap();
        assert_eq!(json, "\"binary_missing\"");
        assert_eq!(ExitStatus::NonZeroExit.to_string(), "non_zero_exit");
    }

    #[test]
    fn detail_is_omitted_when_absent() {
        let r = StepResult::new("clippy", ExitStatus::Success, vec![])
            .with_duration(Duration::from_millis(1500));
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("detail").is_none());
        assert_eq!(v["duration_ms"], 1500);
        assert_eq!(r.duration(), Duration::from_millis(1500));
    }
}

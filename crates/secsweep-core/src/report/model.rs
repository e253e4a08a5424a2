use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collect::metric::{Metric, MetricSet};
use crate::config::RunConfig;
use crate::error::{Result, SweepError};
use crate::exec::result::StepResult;

/// Final aggregated summary of a run.
///
/// This struct is also the layout of `metrics.json`. Apart from
/// `generated_at` it is a pure function of the configuration, the step
/// results and the output files, so it can be rebuilt from cached outputs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub schema_version: String,
    pub tool: ToolInfo,
    pub generated_at: DateTime<Utc>,
    pub revision: String,
    pub config: RunConfig,
    /// Fixed sections, always all present, in presentation order.
    pub sections: Vec<SectionEntry>,
    /// Flat key → value record of every collected metric.
    pub metrics: MetricSet,
    /// One entry per planned step, in plan order.
    pub step_results: Vec<StepResult>,
}

impl Report {
    /// Value of a fixed section by name.
    pub fn section(&self, name: &str) -> Option<&Metric> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.value)
    }

    /// Load a previously written metrics record.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SweepError::Serialization(format!("failed to read {}: {e}", path.display()))
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Tool metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

/// One fixed report section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionEntry {
    pub name: String,
    pub metric_key: String,
    pub value: Metric,
}

/// Run metadata supplied by the caller; the only non-derived inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub tool: ToolInfo,
    pub generated_at: DateTime<Utc>,
    pub revision: String,
}

impl RunMetadata {
    pub fn new(tool: ToolInfo, revision: impl Into<String>) -> Self {
        Self {
            tool,
            generated_at: Utc::now(),
            revision: revision.into(),
        }
    }

    pub fn with_generated_at(mut self, at: DateTime<Utc>) -> Self {
        self.generated_at = at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Focus, Level};
    use crate::exec::result::ExitStatus;
    use tempfile::TempDir;

    fn sample() -> Report {
        let mut metrics = MetricSet::new();
        metrics.insert("vulnerabilities".into(), Metric::Count(2));
        metrics.insert("unsafe_usages".into(), Metric::Unavailable);

        Report {
            schema_version: crate::SCHEMA_VERSION.into(),
            tool: ToolInfo {
                name: "secsweep".into(),
                version: "0.1.0".into(),
            },
            generated_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
                .unwrap()
                .with_timezone(&Utc),
            revision: "abc123".into(),
            config: RunConfig::new(Level::Quick, Focus::Crypto, "out"),
            sections: vec![SectionEntry {
                name: "Vulnerabilities".into(),
                metric_key: "vulnerabilities".into(),
                value: Metric::Count(2),
            }],
            metrics,
            step_results: vec![StepResult::new("cargo-audit", ExitStatus::NonZeroExit, vec![])
                .with_exit_code(Some(1))],
        }
    }

    #[test]
    fn serialized_layout_matches_metrics_record() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["schema_version"], "0.1.0");
        assert_eq!(v["revision"], "abc123");
        assert_eq!(v["config"]["level"], "quick");
        assert_eq!(v["config"]["focus"], "crypto");
        assert_eq!(v["metrics"]["vulnerabilities"], 2);
        assert!(v["metrics"]["unsafe_usages"].is_null());
        assert_eq!(v["step_results"][0]["exit_status"], "non_zero_exit");
        assert_eq!(v["generated_at"], "2026-01-02T03:04:05Z");
    }

    #[test]
    fn load_reads_back_a_written_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        let report = sample();
        std::fs::write(&path, serde_json::to_string_pretty(&report).unwrap()).unwrap();

        let loaded = Report::load(&path).unwrap();
        assert_eq!(loaded, report);
        assert_eq!(loaded.section("Vulnerabilities"), Some(&Metric::Count(2)));
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(Report::load(&path).is_err());
        assert!(Report::load(&dir.path().join("absent.json")).is_err());
    }
}

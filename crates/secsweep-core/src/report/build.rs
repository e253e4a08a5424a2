//! Report construction.
//!
//! `build` is pure: identical configuration, step results, metrics and
//! metadata always produce an identical `Report`.

use crate::SCHEMA_VERSION;
use crate::collect::metric::{Metric, MetricSet};
use crate::config::RunConfig;
use crate::exec::result::StepResult;
use crate::report::model::{Report, RunMetadata, SectionEntry};
use crate::report::sections::SECTIONS;

/// Combine a run's results into its report.
///
/// Every fixed section is present; a section whose metric was not produced
/// is `Unavailable`. `step_results` are kept in the order given, which is
/// plan order when they come from `execute_plan`.
pub fn build(
    config: &RunConfig,
    step_results: &[StepResult],
    metrics: &MetricSet,
    meta: &RunMetadata,
) -> Report {
    let sections = SECTIONS
        .iter()
        .map(|(name, key)| SectionEntry {
            name: name.to_string(),
            metric_key: key.to_string(),
            value: metrics.get(*key).cloned().unwrap_or(Metric::Unavailable),
        })
        .collect();

    Report {
        schema_version: SCHEMA_VERSION.to_string(),
        tool: meta.tool.clone(),
        generated_at: meta.generated_at,
        revision: meta.revision.clone(),
        config: config.clone(),
        sections,
        metrics: metrics.clone(),
        step_results: step_results.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Focus, Level};
    use crate::exec::result::ExitStatus;
    use crate::report::model::ToolInfo;
    use chrono::{TimeZone, Utc};

    fn meta() -> RunMetadata {
        RunMetadata::new(
            ToolInfo {
                name: "secsweep".into(),
                version: "0.1.0".into(),
            },
            "deadbeef",
        )
        .with_generated_at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn all_sections_present_with_no_metrics() {
        let config = RunConfig::new(Level::Quick, Focus::Network, "out");
        let report = build(&config, &[], &MetricSet::new(), &meta());

        let names: Vec<&str> = report.sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Vulnerabilities",
                "Unsafe-Code",
                "Panic-Points",
                "Crypto-Patterns",
                "Concurrency-Patterns",
                "Raw-Pointer-Usage",
            ]
        );
        assert!(report.sections.iter().all(|s| s.value == Metric::Unavailable));
    }

    #[test]
    fn sections_pick_up_their_metrics() {
        let mut metrics = MetricSet::new();
        metrics.insert("vulnerabilities".into(), Metric::Count(0));
        metrics.insert("clippy_warnings".into(), Metric::Count(4));

        let config = RunConfig::new(Level::Full, Focus::All, "out");
        let report = build(&config, &[], &metrics, &meta());

        assert_eq!(report.section("Vulnerabilities"), Some(&Metric::Count(0)));
        assert_eq!(report.section("Unsafe-Code"), Some(&Metric::Unavailable));
        assert_eq!(report.metrics["clippy_warnings"], Metric::Count(4));
    }

    #[test]
    fn build_is_pure() {
        let mut metrics = MetricSet::new();
        metrics.insert("panic_points".into(), Metric::Count(9));
        let results = vec![
            StepResult::new("panic-points", ExitStatus::Success, vec![]).with_exit_code(Some(0)),
            StepResult::new("miri", ExitStatus::Timeout, vec![]),
        ];
        let config = RunConfig::new(Level::Full, Focus::Memory, "out");

        let a = build(&config, &results, &metrics, &meta());
        let b = build(&config, &results, &metrics, &meta());

        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        let names: Vec<&str> = a.step_results.iter().map(|r| r.step_name.as_str()).collect();
        assert_eq!(names, vec!["panic-points", "miri"]);
    }
}

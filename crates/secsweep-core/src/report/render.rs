use crate::collect::metric::Metric;
use crate::error::Result;
use crate::report::model::Report;
use crate::report::sections::is_section_key;

/// Render the narrative summary as markdown.
///
/// Output depends only on the report; the timestamp line is the only part
/// that differs between runs over identical results.
pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();

    out.push_str("# Security Analysis Summary\n\n");
    out.push_str(&format!(
        "- Tool: {} {}\n",
        report.tool.name, report.tool.version
    ));
    out.push_str(&format!("- Revision: {}\n", report.revision));
    out.push_str(&format!(
        "- Generated: {}\n",
        report.generated_at.format("%Y-%m-%dT%H:%M:%SZ")
    ));
    out.push_str(&format!("- Level: {}\n", report.config.level));
    out.push_str(&format!("- Focus: {}\n", report.config.focus));

    out.push_str("\n## Findings\n");
    for section in &report.sections {
        out.push_str(&format!("\n### {}\n\n", section.name));
        render_value(&mut out, &section.value);
    }

    let extra: Vec<(&String, &Metric)> = report
        .metrics
        .iter()
        .filter(|(k, _)| !is_section_key(k))
        .collect();
    if !extra.is_empty() {
        out.push_str("\n## Additional Metrics\n\n");
        out.push_str("| Metric | Value |\n|---|---|\n");
        for (key, value) in extra.iter().filter(|(_, v)| !matches!(v, Metric::Text(_))) {
            out.push_str(&format!("| {key} | {value} |\n"));
        }
        for (key, value) in extra.iter().filter(|(_, v)| matches!(v, Metric::Text(_))) {
            out.push_str(&format!("\n### {key}\n\n"));
            render_value(&mut out, value);
        }
    }

    out.push_str("\n## Steps\n\n");
    if report.step_results.is_empty() {
        out.push_str("No steps matched this configuration.\n");
    } else {
        out.push_str("| Step | Status | Exit code | Duration (ms) |\n|---|---|---|---|\n");
        for r in &report.step_results {
            let code = r
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                r.step_name, r.exit_status, code, r.duration_ms
            ));
        }
    }

    out
}

fn render_value(out: &mut String, value: &Metric) {
    match value {
        Metric::Count(n) => out.push_str(&format!("Count: {n}\n")),
        Metric::Unavailable => out.push_str("Could not analyze.\n"),
        Metric::Text(t) => {
            out.push_str("```\n");
            out.push_str(&t.text);
            if !t.text.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
            if t.truncated {
                out.push_str("\n_Output truncated._\n");
            }
        }
    }
}

/// Render the machine-readable metrics record.
pub fn render_metrics_json(report: &Report) -> Result<String> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::metric::{MetricSet, TextValue};
    use crate::config::{Focus, Level, RunConfig};
    use crate::exec::result::{ExitStatus, StepResult};
    use crate::report::build::build;
    use crate::report::model::{RunMetadata, ToolInfo};
    use crate::report::sections::SECTIONS;
    use chrono::{TimeZone, Utc};

    fn report(metrics: MetricSet, results: Vec<StepResult>) -> Report {
        let meta = RunMetadata::new(
            ToolInfo {
                name: "secsweep".into(),
                version: "0.1.0".into(),
            },
            "abc123",
        )
        .with_generated_at(Utc.with_ymd_and_hms(2026, 5, 4, 3, 2, 1).unwrap());
        build(
            &RunConfig::new(Level::Quick, Focus::Crypto, "out"),
            &results,
            &metrics,
            &meta,
        )
    }

    #[test]
    fn every_section_heading_is_rendered() {
        let md = render_markdown(&report(MetricSet::new(), vec![]));
        for (name, _) in SECTIONS {
            assert!(md.contains(&format!("### {name}\n")), "missing {name}");
        }
        assert!(md.contains("No steps matched this configuration."));
        assert!(!md.contains("Additional Metrics"));
    }

    #[test]
    fn zero_and_unavailable_render_differently() {
        let mut metrics = MetricSet::new();
        metrics.insert("vulnerabilities".into(), Metric::Count(0));
        let md = render_markdown(&report(metrics, vec![]));

        assert!(md.contains("### Vulnerabilities\n\nCount: 0\n"));
        assert!(md.contains("### Unsafe-Code\n\nCould not analyze.\n"));
    }

    #[test]
    fn header_and_steps_are_rendered() {
        let results = vec![
            StepResult::new("cargo-audit", ExitStatus::NonZeroExit, vec![])
                .with_exit_code(Some(1))
                .with_duration(std::time::Duration::from_millis(42)),
        ];
        let md = render_markdown(&report(MetricSet::new(), results));

        assert!(md.contains("- Revision: abc123"));
        assert!(md.contains("- Generated: 2026-05-04T03:02:01Z"));
        assert!(md.contains("- Level: quick"));
        assert!(md.contains("- Focus: crypto"));
        assert!(md.contains("| cargo-audit | non_zero_exit | 1 | 42 |"));
    }

    #[test]
    fn additional_metrics_include_counts_and_text() {
        let mut metrics = MetricSet::new();
        metrics.insert("clippy_warnings".into(), Metric::Count(7));
        metrics.insert("semgrep_findings".into(), Metric::Unavailable);
        metrics.insert(
            "coverage_summary".into(),
            Metric::Text(TextValue {
                text: "61.2% coverage".into(),
                truncated: true,
            }),
        );
        let md = render_markdown(&report(metrics, vec![]));

        assert!(md.contains("| clippy_warnings | 7 |"));
        assert!(md.contains("| semgrep_findings | could not analyze |"));
        assert!(md.contains("### coverage_summary\n\n```\n61.2% coverage\n```\n"));
        assert!(md.contains("_Output truncated._"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut metrics = MetricSet::new();
        metrics.insert("b".into(), Metric::Count(1));
        metrics.insert("a".into(), Metric::Count(2));
        let r = report(metrics, vec![]);

        assert_eq!(render_markdown(&r), render_markdown(&r));
        assert_eq!(
            render_metrics_json(&r).unwrap(),
            render_metrics_json(&r).unwrap()
        );

        let md = render_markdown(&r);
        assert!(md.find("| a | 2 |").unwrap() < md.find("| b | 1 |").unwrap());
    }
}

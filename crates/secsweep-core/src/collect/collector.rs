//! Result collection: turn each step's output files into metrics.
//!
//! Guarantees:
//! - collection never fails; every problem becomes `Metric::Unavailable`
//! - every metric key a planned step declares appears in the result
//! - steps that did not complete (missing binary, timeout, launch failure,
//!   cancellation) yield `Unavailable` even if a partial file exists

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::collect::extract;
use crate::collect::metric::{Metric, MetricSet};
use crate::exec::result::StepResult;
use crate::steps::catalog::{Extractor, Step};

/// Reads step outputs from one run's output directory.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    output_dir: PathBuf,
    max_text_bytes: usize,
}

impl ResultCollector {
    pub fn new(output_dir: impl Into<PathBuf>, max_text_bytes: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            max_text_bytes,
        }
    }

    /// Metrics declared by `step`, extracted according to `result`.
    pub fn collect(&self, step: &Step, result: &StepResult) -> MetricSet {
        let gated = !result.exit_status.produced_output();
        if gated {
            debug!(
                step = %step.name,
                status = %result.exit_status,
                "No usable output; marking metrics unavailable"
            );
        }

        step.metrics
            .iter()
            .map(|spec| {
                let value = if gated {
                    Metric::Unavailable
                } else {
                    self.extract(&step.name, &spec.key, &spec.extractor)
                };
                (spec.key.clone(), value)
            })
            .collect()
    }

    /// Merge metrics of every planned step, pairing steps with results by
    /// name. A step with no recorded result contributes `Unavailable` for
    /// each of its keys.
    pub fn collect_all(&self, plan: &[&Step], results: &[StepResult]) -> MetricSet {
        let mut metrics = MetricSet::new();
        for step in plan {
            match results.iter().find(|r| r.step_name == step.name) {
                Some(result) => metrics.extend(self.collect(step, result)),
                None => {
                    warn!(step = %step.name, "No result recorded for planned step");
                    for spec in &step.metrics {
                        metrics.insert(spec.key.clone(), Metric::Unavailable);
                    }
                }
            }
        }
        metrics
    }

    fn extract(&self, step: &str, key: &str, extractor: &Extractor) -> Metric {
        let path = self.output_dir.join(extractor.file());
        let outcome = match extractor {
            Extractor::JsonArrayLength { pointer, .. } => {
                extract::json_array_length(&path, pointer)
            }
            Extractor::LineCount { .. } => extract::line_count(&path),
            Extractor::PassThroughText { .. } => {
                extract::pass_through_text(&path, self.max_text_bytes)
            }
            Extractor::RegexCount { pattern, .. } => extract::regex_count(&path, pattern),
        };

        outcome.unwrap_or_else(|e| {
            warn!(step, metric = key, "Metric unavailable: {e}");
            Metric::Unavailable
        })
    }
}

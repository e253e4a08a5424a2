//! End-to-end run: plan, execute, collect, build, publish.
//!
//! Run state moves `Planned → Executing(i) → Collected → Built`, then to
//! `Published` or `BuiltUnpublished` when a sink is configured. Step
//! failures only ever change that step's `StepResult`; the run always
//! reaches `Built` once the output directory has been verified writable.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::collect::collector::ResultCollector;
use crate::config::{RunConfig, Settings};
use crate::error::Result;
use crate::exec::pool::{ExecutionObserver, execute_plan};
use crate::exec::result::StepResult;
use crate::exec::runner::{CancelToken, ToolRunner};
use crate::publish::{self, ArtifactSink, LocalDirectorySink, PublishResult};
use crate::report::build::build;
use crate::report::model::{Report, RunMetadata};
use crate::report::render::{render_markdown, render_metrics_json};
use crate::steps::catalog::{Catalog, Step, default_catalog};
use crate::steps::plan::plan;
use crate::util::fs::ensure_writable_dir;
use crate::{METRICS_FILE, SUMMARY_FILE};

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Planned,
    /// Number of steps finished so far.
    Executing(usize),
    Collected,
    Built,
    Published,
    /// Report is valid and on disk, but delivery failed.
    BuiltUnpublished,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Planned => f.write_str("planned"),
            RunState::Executing(i) => write!(f, "executing({i})"),
            RunState::Collected => f.write_str("collected"),
            RunState::Built => f.write_str("built"),
            RunState::Published => f.write_str("published"),
            RunState::BuiltUnpublished => f.write_str("built-unpublished"),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub state: RunState,
    pub publish: PublishResult,
    pub summary_path: PathBuf,
    pub metrics_path: PathBuf,
}

/// Logs `Executing(i)` transitions as workers finish steps.
struct StateLogger {
    total: usize,
}

impl ExecutionObserver for StateLogger {
    fn step_started(&self, step: &Step) {
        debug!(step = %step.name, "Step started");
    }

    fn step_finished(&self, completed: usize, result: &StepResult) {
        info!(
            step = %result.step_name,
            status = %result.exit_status,
            "Run state {} of {}",
            RunState::Executing(completed),
            self.total
        );
    }
}

/// Orchestrates runs over a catalog with fixed settings.
pub struct Pipeline {
    catalog: Catalog,
    settings: Settings,
    cancel: CancelToken,
    sink: Option<Box<dyn ArtifactSink>>,
}

impl Pipeline {
    /// Pipeline over the built-in catalog. A local sink is configured when
    /// `settings.publish` is set.
    pub fn new(settings: Settings) -> Self {
        let sink: Option<Box<dyn ArtifactSink>> = settings.publish.as_ref().map(|p| {
            Box::new(LocalDirectorySink::new(&p.destination, p.retention_days))
                as Box<dyn ArtifactSink>
        });
        Self {
            catalog: default_catalog(),
            settings,
            cancel: CancelToken::new(),
            sink,
        }
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_sink(mut self, sink: Box<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Token that cancels every in-flight and pending step of this pipeline.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn plan(&self, config: &RunConfig) -> Vec<&Step> {
        plan(&self.catalog, config)
    }

    /// Execute a full run.
    ///
    /// The only error is an unusable output directory, detected before any
    /// step executes (or, later, when the report files cannot be written).
    pub fn run(&self, config: &RunConfig, meta: &RunMetadata) -> Result<RunOutcome> {
        ensure_writable_dir(&config.output_dir)?;

        let planned = self.plan(config);
        info!(
            level = %config.level,
            focus = %config.focus,
            "Run state {}: {} steps",
            RunState::Planned,
            planned.len()
        );

        let runner =
            ToolRunner::new(&self.settings.repository_root).with_cancel(self.cancel.clone());
        let results = execute_plan(
            &runner,
            &planned,
            &config.output_dir,
            &self.settings.timeouts,
            self.settings.workers,
            &StateLogger {
                total: planned.len(),
            },
        );

        let collector = ResultCollector::new(&config.output_dir, self.settings.max_text_bytes);
        let metrics = collector.collect_all(&planned, &results);
        info!("Run state {}: {} metrics", RunState::Collected, metrics.len());

        let report = build(config, &results, &metrics, meta);
        let (summary_path, metrics_path) = write_report(&config.output_dir, &report)?;
        info!("Run state {}: {}", RunState::Built, summary_path.display());

        let (state, publish) = match &self.sink {
            None => (RunState::Built, PublishResult::Skipped),
            Some(sink) => {
                let result = publish::publish(sink.as_ref(), &config.output_dir, &report);
                let state = if result.is_failure() {
                    RunState::BuiltUnpublished
                } else {
                    RunState::Published
                };
                info!("Run state {state}");
                (state, result)
            }
        };

        Ok(RunOutcome {
            report,
            state,
            publish,
            summary_path,
            metrics_path,
        })
    }

    /// Rebuild both report files from a previous run's cached outputs
    /// without re-running any tool.
    ///
    /// The recorded configuration, step results, revision and timestamp
    /// are reused, so unchanged output files reproduce the original report.
    pub fn regenerate(&self, output_dir: &Path) -> Result<Report> {
        let previous = Report::load(&output_dir.join(METRICS_FILE))?;
        ensure_writable_dir(output_dir)?;

        let config = RunConfig {
            output_dir: output_dir.to_path_buf(),
            ..previous.config.clone()
        };
        let planned = self.plan(&config);
        for result in &previous.step_results {
            if !planned.iter().any(|s| s.name == result.step_name) {
                warn!(step = %result.step_name, "Recorded step is not in the current plan");
            }
        }

        let collector = ResultCollector::new(output_dir, self.settings.max_text_bytes);
        let metrics = collector.collect_all(&planned, &previous.step_results);

        let meta = RunMetadata {
            tool: previous.tool.clone(),
            generated_at: previous.generated_at,
            revision: previous.revision.clone(),
        };
        let report = build(&config, &previous.step_results, &metrics, &meta);
        write_report(output_dir, &report)?;
        info!("Regenerated report in {}", output_dir.display());

        Ok(report)
    }
}

fn write_report(output_dir: &Path, report: &Report) -> Result<(PathBuf, PathBuf)> {
    let summary_path = output_dir.join(SUMMARY_FILE);
    let metrics_path = output_dir.join(METRICS_FILE);
    fs::write(&summary_path, render_markdown(report))?;
    fs::write(&metrics_path, render_metrics_json(report)?)?;
    Ok((summary_path, metrics_path))
}

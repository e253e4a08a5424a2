//! Bounded parallel execution of a plan.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::TimeoutPolicy;
use crate::exec::result::StepResult;
use crate::exec::runner::ToolRunner;
use crate::steps::catalog::Step;

/// Receives execution progress. Callbacks may arrive from worker threads
/// in any order.
pub trait ExecutionObserver: Send + Sync {
    fn step_started(&self, _step: &Step) {}
    /// `completed` counts finished steps, including this one.
    fn step_finished(&self, _completed: usize, _result: &StepResult) {}
}

/// Observer that ignores every event.
pub struct NullObserver;

impl ExecutionObserver for NullObserver {}

/// Execute every planned step on at most `workers` threads.
///
/// Returns exactly one `StepResult` per planned step, in plan order,
/// regardless of completion order. Each step's timeout is enforced by its
/// own runner invocation, so a hung analyzer only occupies its own worker.
pub fn execute_plan(
    runner: &ToolRunner,
    plan: &[&Step],
    output_dir: &Path,
    timeouts: &TimeoutPolicy,
    workers: usize,
    observer: &dyn ExecutionObserver,
) -> Vec<StepResult> {
    let workers = workers.max(1);
    let completed = AtomicUsize::new(0);

    info!("Executing {} steps on up to {} workers", plan.len(), workers);

    let run_one = |step: &&Step| {
        observer.step_started(step);
        let result = runner.execute(step, output_dir, timeouts.timeout_for(step));
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        observer.step_finished(done, &result);
        result
    };

    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| plan.par_iter().map(run_one).collect()),
        Err(e) => {
            warn!("Could not build worker pool ({e}); running steps sequentially");
            plan.iter().map(run_one).collect()
        }
    }
}

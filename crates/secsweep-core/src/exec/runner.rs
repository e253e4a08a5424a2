//! Failure-tolerant execution of a single step.
//!
//! `execute` always returns a `StepResult`. A missing binary, a non-zero
//! exit, an expired timeout or a cancelled run are all recorded outcomes,
//! never errors, so one analyzer misbehaving cannot stop the others.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::exec::result::{ExitStatus, StepResult};
use crate::steps::catalog::Step;

/// Run-wide cancellation flag shared with every in-flight step.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Executes steps as subprocesses rooted at the repository under analysis.
#[derive(Debug, Clone)]
pub struct ToolRunner {
    repo_root: PathBuf,
    search_path: Option<OsString>,
    cancel: CancelToken,
    poll_interval: Duration,
}

impl ToolRunner {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            search_path: None,
            cancel: CancelToken::new(),
            poll_interval: Duration::from_millis(50),
        }
    }

    /// Share a cancellation token with this runner.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve binaries against `path` instead of the process `PATH`.
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    fn resolve(&self, binary: &str) -> Option<PathBuf> {
        let paths = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));
        which::which_in(binary, paths, &self.repo_root).ok()
    }

    /// Run `step`, writing its declared outputs under `output_dir`.
    pub fn execute(&self, step: &Step, output_dir: &Path, timeout: Duration) -> StepResult {
        // The child runs in `repo_root`, so relative output paths would
        // resolve against the wrong directory inside `{output_dir}`.
        let absolute = std::path::absolute(output_dir);
        let output_dir = absolute.as_deref().unwrap_or(output_dir);
        let output_paths: Vec<PathBuf> = step
            .output_files
            .iter()
            .map(|f| output_dir.join(f))
            .collect();

        if self.cancel.is_cancelled() {
            return StepResult::new(&step.name, ExitStatus::Cancelled, output_paths)
                .with_detail("run cancelled before the step started");
        }

        if self.resolve(&step.required_binary).is_none() {
            info!(step = %step.name, "Skipping: `{}` is not installed", step.required_binary);
            return StepResult::new(&step.name, ExitStatus::BinaryMissing, output_paths)
                .with_detail(format!("required binary `{}` not found", step.required_binary));
        }
        let Some(program) = self.resolve(&step.command.program) else {
            info!(step = %step.name, "Skipping: `{}` is not installed", step.command.program);
            return StepResult::new(&step.name, ExitStatus::BinaryMissing, output_paths)
                .with_detail(format!("program `{}` not found", step.command.program));
        };

        let started = Instant::now();
        let mut child = match self.spawn(step, &program, output_dir, &output_paths) {
            Ok(child) => child,
            Err(e) => {
                warn!(step = %step.name, "Failed to launch: {e}");
                return StepResult::new(&step.name, ExitStatus::LaunchFailed, output_paths)
                    .with_detail(e.to_string());
            }
        };

        let result = self.supervise(step, &mut child, started, timeout, output_paths);
        match result.exit_status {
            ExitStatus::Success => info!(
                step = %step.name,
                "Completed in {} ms", result.duration_ms
            ),
            status => warn!(
                step = %step.name,
                code = ?result.exit_code,
                "Finished with status {status}; continuing"
            ),
        }
        result
    }

    fn spawn(
        &self,
        step: &Step,
        program: &Path,
        output_dir: &Path,
        output_paths: &[PathBuf],
    ) -> std::io::Result<Child> {
        for path in output_paths {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let stdout = match output_paths.first() {
            Some(path) => File::create(path)?,
            None => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "step declares no output file",
                ));
            }
        };
        let stderr = match output_paths.get(1) {
            Some(path) => File::create(path)?,
            None => stdout.try_clone()?,
        };
        // Remaining declared outputs are written by the tool itself.

        let args = step.command.render_args(output_dir, &self.repo_root);
        debug!(step = %step.name, "Running {} {}", program.display(), args.join(" "));

        let mut command = Command::new(program);
        command
            .args(&args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        // Own process group, so `terminate` reaches everything the tool forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        command.spawn()
    }

    /// Poll the child until it exits, times out or the run is cancelled.
    fn supervise(
        &self,
        step: &Step,
        child: &mut Child,
        started: Instant,
        timeout: Duration,
        output_paths: Vec<PathBuf>,
    ) -> StepResult {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    let exit_status = if status.success() {
                        ExitStatus::Success
                    } else {
                        ExitStatus::NonZeroExit
                    };
                    return StepResult::new(&step.name, exit_status, output_paths)
                        .with_exit_code(status.code())
                        .with_duration(started.elapsed());
                }
                Ok(None) => {}
                Err(e) => {
                    terminate(step, child);
                    return StepResult::new(&step.name, ExitStatus::LaunchFailed, output_paths)
                        .with_duration(started.elapsed())
                        .with_detail(format!("failed to poll process: {e}"));
                }
            }

            if self.cancel.is_cancelled() {
                terminate(step, child);
                return StepResult::new(&step.name, ExitStatus::Cancelled, output_paths)
                    .with_duration(started.elapsed())
                    .with_detail("run cancelled while the step was running");
            }

            if started.elapsed() >= timeout {
                terminate(step, child);
                return StepResult::new(&step.name, ExitStatus::Timeout, output_paths)
                    .with_duration(started.elapsed())
                    .with_detail(format!("exceeded timeout of {}s", timeout.as_secs_f64()));
            }

            thread::sleep(self.poll_interval);
        }
    }
}

/// Kill the step's whole process group, then reap the direct child.
fn terminate(step: &Step, child: &mut Child) {
    if !kill_process_group(child) {
        if let Err(e) = child.kill() {
            debug!(step = %step.name, "kill failed (process may have exited): {e}");
        }
    }
    if let Err(e) = child.wait() {
        debug!(step = %step.name, "failed to reap process: {e}");
    }
}

#[cfg(unix)]
fn kill_process_group(child: &Child) -> bool {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return false;
    };
    // SAFETY: killpg has no memory-safety preconditions. The group id is the
    // child's pid, set by `process_group(0)` at spawn, and the child is not
    // yet reaped, so the id cannot have been recycled.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(
            "killpg({pgid}) failed: {}",
            std::io::Error::last_os_error()
        );
    }
    rc == 0
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) -> bool {
    false
}

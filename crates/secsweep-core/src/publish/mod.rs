//! Artifact delivery.
//!
//! Publishing is separate from computation: a sink failure is reported in
//! the `PublishResult` and never invalidates the report already written to
//! the output directory.

mod local;

pub use local::LocalDirectorySink;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PublishError;
use crate::report::model::Report;

/// Identity and retention of one published run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishManifest {
    pub run_id: String,
    pub revision: String,
    pub retention_days: u32,
    pub published_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub files: Vec<PublishedFile>,
}

/// A delivered file and its content digest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishedFile {
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
}

/// Outcome of delivering a run's artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishResult {
    Published {
        location: PathBuf,
        manifest: PublishManifest,
    },
    /// No sink configured.
    Skipped,
    Failed(PublishError),
}

impl PublishResult {
    pub fn is_failure(&self) -> bool {
        matches!(self, PublishResult::Failed(_))
    }
}

/// Destination for a run's output directory and report.
pub trait ArtifactSink: Send + Sync {
    fn name(&self) -> &str;

    fn publish(
        &self,
        output_dir: &Path,
        report: &Report,
    ) -> std::result::Result<(PathBuf, PublishManifest), PublishError>;
}

/// Deliver `output_dir` through `sink`, converting errors into a result.
pub fn publish(sink: &dyn ArtifactSink, output_dir: &Path, report: &Report) -> PublishResult {
    match sink.publish(output_dir, report) {
        Ok((location, manifest)) => {
            tracing::info!(
                sink = sink.name(),
                "Published {} files to {}",
                manifest.files.len(),
                location.display()
            );
            PublishResult::Published { location, manifest }
        }
        Err(e) => {
            tracing::warn!(sink = sink.name(), "Publishing failed: {e}; report kept locally");
            PublishResult::Failed(e)
        }
    }
}

/// Stable run identifier: revision plus generation time.
pub fn run_id(report: &Report) -> String {
    format!(
        "{}-{}",
        sanitize(&report.revision),
        report.generated_at.format("%Y%m%dT%H%M%SZ")
    )
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

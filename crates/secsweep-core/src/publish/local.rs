use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeDelta, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::PublishError;
use crate::publish::{ArtifactSink, PublishManifest, PublishedFile, run_id};
use crate::report::model::Report;

/// Manifest written next to the copied artifacts.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Copies a run's output directory into `<destination>/<run id>/`.
#[derive(Debug, Clone)]
pub struct LocalDirectorySink {
    destination: PathBuf,
    retention_days: u32,
}

impl LocalDirectorySink {
    pub fn new(destination: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            destination: destination.into(),
            retention_days,
        }
    }
}

impl ArtifactSink for LocalDirectorySink {
    fn name(&self) -> &str {
        "local-directory"
    }

    fn publish(
        &self,
        output_dir: &Path,
        report: &Report,
    ) -> Result<(PathBuf, PublishManifest), PublishError> {
        let published_at = Utc::now();
        let expires_at = TimeDelta::try_days(i64::from(self.retention_days))
            .and_then(|retention| published_at.checked_add_signed(retention))
            .ok_or(PublishError::RetentionOutOfRange(self.retention_days))?;

        let id = run_id(report);
        let target = self.destination.join(&id);

        fs::create_dir_all(&target).map_err(|e| {
            PublishError::DestinationUnavailable(format!("{}: {e}", target.display()))
        })?;

        // A destination nested in the output directory must not copy itself.
        let skip = fs::canonicalize(&self.destination)?;
        let mut files = Vec::new();
        copy_tree(output_dir, output_dir, &target, &skip, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let manifest = PublishManifest {
            run_id: id,
            revision: report.revision.clone(),
            retention_days: self.retention_days,
            published_at,
            expires_at,
            files,
        };

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;
        fs::write(target.join(MANIFEST_FILE), json)?;

        Ok((target, manifest))
    }
}

/// Copy every regular file under `dir`, recording relative path and digest.
/// The `skip` directory (canonical) is never entered.
fn copy_tree(
    root: &Path,
    dir: &Path,
    target_root: &Path,
    skip: &Path,
    files: &mut Vec<PublishedFile>,
) -> Result<(), PublishError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        let relative = path
            .strip_prefix(root)
            .map_err(|e| PublishError::Io(e.to_string()))?;

        if file_type.is_dir() {
            if fs::canonicalize(&path)? == skip {
                debug!("Skipping destination {}", relative.display());
                continue;
            }
            fs::create_dir_all(target_root.join(relative))?;
            copy_tree(root, &path, target_root, skip, files)?;
        } else if file_type.is_file() {
            let bytes = fs::read(&path)?;
            fs::write(target_root.join(relative), &bytes)?;
            debug!("Published {}", relative.display());

            files.push(PublishedFile {
                path: relative.to_string_lossy().replace('\\', "/"),
                size_bytes: bytes.len() as u64,
                sha256: hex::encode(Sha256::digest(&bytes)),
            });
        }
    }
    Ok(())
}

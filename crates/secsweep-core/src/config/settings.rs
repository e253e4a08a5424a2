//! Ambient settings shared by every run: repository location, worker
//! count, timeouts, text bounds and artifact publishing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SweepError};
use crate::steps::catalog::{CostClass, Step};

/// Settings loaded once per invocation, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Working directory for every analyzer invocation
    pub repository_root: PathBuf,

    /// Maximum number of steps executing concurrently
    pub workers: usize,

    /// Wall-clock bounds per step
    pub timeouts: TimeoutPolicy,

    /// Upper bound on pass-through text metrics
    pub max_text_bytes: usize,

    /// Artifact delivery; `None` disables publishing
    pub publish: Option<PublishSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("."),
            workers: default_workers(),
            timeouts: TimeoutPolicy::default(),
            max_text_bytes: 16 * 1024,
            publish: None,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(contents)
            .map_err(|e| SweepError::Config(format!("failed to parse settings: {e}")))?;
        settings.workers = settings.workers.max(1);
        Ok(settings)
    }

    /// Load settings from a TOML file.
    ///
    /// A missing or malformed file is fatal: it is reported before any step
    /// runs.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| SweepError::Config(format!("failed to read {}: {e}", path.display())))?;
        let settings = Self::from_toml_str(&contents)?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

/// Per-step wall-clock bounds, keyed by cost class with per-step overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutPolicy {
    pub cheap_secs: u64,
    pub standard_secs: u64,
    pub expensive_secs: u64,
    pub fuzz_secs: u64,
    /// Step name → seconds
    pub overrides: BTreeMap<String, u64>,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            cheap_secs: 300,
            standard_secs: 900,
            expensive_secs: 1800,
            fuzz_secs: 3600,
            overrides: BTreeMap::new(),
        }
    }
}

impl TimeoutPolicy {
    pub fn timeout_for(&self, step: &Step) -> Duration {
        if let Some(secs) = self.overrides.get(&step.name) {
            return Duration::from_secs(*secs);
        }
        let secs = match step.cost {
            CostClass::Cheap => self.cheap_secs,
            CostClass::Standard => self.standard_secs,
            CostClass::Expensive => self.expensive_secs,
            CostClass::Fuzz => self.fuzz_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Where and for how long run artifacts are retained.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublishSettings {
    pub destination: PathBuf,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    30
}

impl PublishSettings {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            retention_days: default_retention_days(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::catalog::default_catalog;

    #[test]
    fn empty_toml_yields_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings.timeouts, TimeoutPolicy::default());
        assert_eq!(settings.max_text_bytes, 16 * 1024);
        assert!(settings.publish.is_none());
        assert!(settings.workers >= 1);
    }

    #[test]
    fn toml_overrides_are_applied() {
        let settings = Settings::from_toml_str(
            r#"
            repository_root = "/src/project"
            workers = 0
            max_text_bytes = 128

            [timeouts]
            cheap_secs = 10

            [timeouts.overrides]
            clippy = 42

            [publish]
            destination = "/var/artifacts"
            "#,
        )
        .unwrap();

        assert_eq!(settings.repository_root, PathBuf::from("/src/project"));
        assert_eq!(settings.workers, 1, "worker count is clamped to one");
        assert_eq!(settings.max_text_bytes, 128);
        assert_eq!(settings.timeouts.cheap_secs, 10);
        assert_eq!(settings.timeouts.standard_secs, 900);

        let publish = settings.publish.unwrap();
        assert_eq!(publish.destination, PathBuf::from("/var/artifacts"));
        assert_eq!(publish.retention_days, 30);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Settings::from_toml_str("workers = \"many\"").unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }

    #[test]
    fn timeout_uses_override_before_cost_class() {
        let catalog = default_catalog();
        let audit = catalog.get("cargo-audit").unwrap();
        let fuzz = catalog.get("fuzz-smoke").unwrap();

        let mut policy = TimeoutPolicy::default();
        assert_eq!(policy.timeout_for(audit), Duration::from_secs(300));
        assert_eq!(policy.timeout_for(fuzz), Duration::from_secs(3600));

        policy.overrides.insert("cargo-audit".into(), 5);
        assert_eq!(policy.timeout_for(audit), Duration::from_secs(5));
    }
}

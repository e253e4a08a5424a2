//! Run configuration: what depth to sweep at, which areas to focus on and
//! where to write output.

mod settings;

pub use settings::{PublishSettings, Settings, TimeoutPolicy};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Depth setting controlling which steps are eligible.
///
/// Ordering is semantic: `Quick < Full < DeepDive`. A step declared for a
/// level runs at that level and every deeper one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Level {
    Quick,
    Full,
    DeepDive,
}

impl Default for Level {
    fn default() -> Self {
        Level::Full
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::Quick => "quick",
            Level::Full => "full",
            Level::DeepDive => "deep-dive",
        };
        f.write_str(s)
    }
}

/// Coarse category a step is relevant to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FocusArea {
    Crypto,
    Memory,
    Concurrency,
    Network,
}

impl FocusArea {
    pub const ALL: [FocusArea; 4] = [
        FocusArea::Crypto,
        FocusArea::Memory,
        FocusArea::Concurrency,
        FocusArea::Network,
    ];
}

/// Requested focus of a run: everything, or one area.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Focus {
    #[default]
    All,
    Crypto,
    Memory,
    Concurrency,
    Network,
}

impl Focus {
    /// The single area this focus narrows to, or `None` for `All`.
    pub fn area(self) -> Option<FocusArea> {
        match self {
            Focus::All => None,
            Focus::Crypto => Some(FocusArea::Crypto),
            Focus::Memory => Some(FocusArea::Memory),
            Focus::Concurrency => Some(FocusArea::Concurrency),
            Focus::Network => Some(FocusArea::Network),
        }
    }

    /// Whether a step tagged with `tags` is relevant under this focus.
    pub fn admits(self, tags: &[FocusArea]) -> bool {
        match self.area() {
            None => true,
            Some(area) => tags.contains(&area),
        }
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Focus::All => "all",
            Focus::Crypto => "crypto",
            Focus::Memory => "memory",
            Focus::Concurrency => "concurrency",
            Focus::Network => "network",
        };
        f.write_str(s)
    }
}

/// Caller-selected configuration of a single run. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunConfig {
    pub level: Level,
    pub focus: Focus,
    pub output_dir: PathBuf,
}

impl RunConfig {
    pub fn new(level: Level, focus: Focus, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            level,
            focus,
            output_dir: output_dir.into(),
        }
    }
}

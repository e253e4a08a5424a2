use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalized value extracted from a step's output.
///
/// `Unavailable` means "could not analyze" and is never interchangeable
/// with `Count(0)`. In JSON it is `null`; counts are plain numbers and text
/// is an object carrying its truncation flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Metric {
    Count(u64),
    Text(TextValue),
    Unavailable,
}

/// Bounded text taken verbatim from an output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    pub truncated: bool,
}

impl Metric {
    pub fn is_available(&self) -> bool {
        !matches!(self, Metric::Unavailable)
    }

    pub fn as_count(&self) -> Option<u64> {
        match self {
            Metric::Count(n) => Some(*n),
            _ => None,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Count(n) => write!(f, "{n}"),
            Metric::Text(t) if t.truncated => write!(f, "{} [truncated]", t.text),
            Metric::Text(t) => f.write_str(&t.text),
            Metric::Unavailable => f.write_str("could not analyze"),
        }
    }
}

/// Metric key → value. Sorted so serialization is deterministic.
pub type MetricSet = BTreeMap<String, Metric>;

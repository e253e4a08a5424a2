//! Extractors: pure functions from an output file to a metric.
//!
//! Each returns an `ExtractError` instead of guessing; the collector decides
//! how failures surface (always as `Metric::Unavailable`).

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::collect::metric::{Metric, TextValue};
use crate::error::ExtractError;

fn read(path: &Path) -> Result<Vec<u8>, ExtractError> {
    fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ExtractError::Missing(path.to_path_buf())
        } else {
            ExtractError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// Element count of the array found at `pointer` (RFC 6901).
pub fn json_array_length(path: &Path, pointer: &str) -> Result<Metric, ExtractError> {
    let bytes = read(path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|e| ExtractError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    value
        .pointer(pointer)
        .and_then(|v| v.as_array())
        .map(|items| Metric::Count(items.len() as u64))
        .ok_or_else(|| ExtractError::PointerNotArray {
            path: path.to_path_buf(),
            pointer: pointer.to_string(),
        })
}

/// Number of lines containing anything other than whitespace.
pub fn line_count(path: &Path) -> Result<Metric, ExtractError> {
    let bytes = read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let count = text.lines().filter(|l| !l.trim().is_empty()).count();
    Ok(Metric::Count(count as u64))
}

/// File content, cut at a character boundary no later than `max_bytes`.
pub fn pass_through_text(path: &Path, max_bytes: usize) -> Result<Metric, ExtractError> {
    let bytes = read(path)?;
    let text = String::from_utf8_lossy(&bytes);

    if text.len() <= max_bytes {
        return Ok(Metric::Text(TextValue {
            text: text.into_owned(),
            truncated: false,
        }));
    }

    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    Ok(Metric::Text(TextValue {
        text: text[..cut].to_string(),
        truncated: true,
    }))
}

/// Number of lines matching `pattern`.
pub fn regex_count(path: &Path, pattern: &str) -> Result<Metric, ExtractError> {
    let re = Regex::new(pattern).map_err(|e| ExtractError::Pattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;
    let bytes = read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let count = text.lines().filter(|l| re.is_match(l)).count();
    Ok(Metric::Count(count as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn json_array_length_counts_elements() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"vulnerabilities": [{}, {}]}"#);
        assert_eq!(
            json_array_length(&path, "/vulnerabilities").unwrap(),
            Metric::Count(2)
        );
    }

    #[test]
    fn json_array_length_follows_nested_pointers() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"results": {"detectors": [1, 2, 3]}}"#);
        assert_eq!(
            json_array_length(&path, "/results/detectors").unwrap(),
            Metric::Count(3)
        );
    }

    #[test]
    fn json_array_length_empty_array_is_zero() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "a.json", r#"{"results": []}"#);
        assert_eq!(json_array_length(&path, "/results").unwrap(), Metric::Count(0));
    }

    #[test]
    fn json_array_length_rejects_missing_and_malformed() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            json_array_length(&missing, "/x"),
            Err(ExtractError::Missing(_))
        ));

        let empty = write(&dir, "empty.json", "");
        assert!(matches!(
            json_array_length(&empty, "/x"),
            Err(ExtractError::Parse { .. })
        ));

        let partial = write(&dir, "partial.json", r#"{"vulnerabilities": [{}"#);
        assert!(matches!(
            json_array_length(&partial, "/vulnerabilities"),
            Err(ExtractError::Parse { .. })
        ));

        let wrong = write(&dir, "wrong.json", r#"{"vulnerabilities": {"count": 2}}"#);
        assert!(matches!(
            json_array_length(&wrong, "/vulnerabilities"),
            Err(ExtractError::PointerNotArray { .. })
        ));
    }

    #[test]
    fn line_count_ignores_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "l.txt", "src/a.rs:1: unsafe {\n\n   \nsrc/b.rs:9: unsafe fn x()\n");
        assert_eq!(line_count(&path).unwrap(), Metric::Count(2));

        let empty = write(&dir, "e.txt", "");
        assert_eq!(line_count(&empty).unwrap(), Metric::Count(0));

        assert!(line_count(&dir.path().join("gone.txt")).is_err());
    }

    #[test]
    fn pass_through_text_is_verbatim_under_the_bound() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "t.md", "| crate | unsafe |\n");
        assert_eq!(
            pass_through_text(&path, 1024).unwrap(),
            Metric::Text(TextValue {
                text: "| crate | unsafe |\n".into(),
                truncated: false,
            })
        );
    }

    #[test]
    fn pass_through_text_truncates_on_char_boundary() {
        let dir = TempDir::new().unwrap();
        // "é" is two bytes; a cut at byte 2 would split it.
        let path = write(&dir, "t.txt", "aéb");
        let Metric::Text(t) = pass_through_text(&path, 2).unwrap() else {
            panic!("expected text");
        };
        assert_eq!(t.text, "a");
        assert!(t.truncated);
    }

    #[test]
    fn regex_count_matches_per_line() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "c.txt",
            "src/a.rs:1:2: warning: x\nsrc/a.rs:3:4: error: y\nsrc/b.rs:5:6: warning: z\nwarning: 2 warnings emitted\n",
        );
        assert_eq!(
            regex_count(&path, r"^\S+:\d+:\d+: warning").unwrap(),
            Metric::Count(2)
        );
    }

    #[test]
    fn regex_count_reports_bad_patterns() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "c.txt", "x\n");
        assert!(matches!(
            regex_count(&path, "("),
            Err(ExtractError::Pattern { .. })
        ));
    }
}

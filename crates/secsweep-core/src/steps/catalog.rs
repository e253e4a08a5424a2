//! Static catalog of analysis steps.
//!
//! A step is one invocation of an external analyzer. Everything the rest of
//! the pipeline needs to know about it is declared here, up front: how to
//! invoke it, which files it writes, which binary must be installed, which
//! focus areas and levels it belongs to, and how its output is turned into
//! metrics. Nothing downstream inspects file contents to decide how to
//! parse them.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::config::{FocusArea, Level};
use crate::error::{Result, SweepError};
use crate::{METRICS_FILE, SUMMARY_FILE};

/// Presentation priority of a step. Plans are ordered by phase first,
/// then by catalog declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    VulnerabilityAudit,
    DependencyAnalysis,
    UnsafeCode,
    PatternScan,
    StaticAnalysis,
    RuleScan,
    Coverage,
    MemoryAnalysis,
    Fuzzing,
    ReportGeneration,
}

/// Expected runtime class; selects the default timeout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum CostClass {
    Cheap,
    Standard,
    Expensive,
    Fuzz,
}

/// Program plus argument templates.
///
/// `{output_dir}` and `{repo_root}` are substituted at execution time so no
/// step depends on the process-wide working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Substitute path placeholders in every argument.
    pub fn render_args(&self, output_dir: &Path, repo_root: &Path) -> Vec<String> {
        let out = output_dir.display().to_string();
        let root = repo_root.display().to_string();
        self.args
            .iter()
            .map(|a| a.replace("{output_dir}", &out).replace("{repo_root}", &root))
            .collect()
    }
}

impl std::fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Closed set of ways to turn an output file into a metric.
///
/// File names are relative to the run's output directory and must be one of
/// the owning step's declared outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extractor {
    /// Element count of the array at a JSON pointer.
    JsonArrayLength { file: String, pointer: String },
    /// Number of non-empty lines.
    LineCount { file: String },
    /// File content, bounded in size.
    PassThroughText { file: String },
    /// Number of lines matching a regular expression.
    RegexCount { file: String, pattern: String },
}

impl Extractor {
    pub fn json_array_length(file: impl Into<String>, pointer: impl Into<String>) -> Self {
        Extractor::JsonArrayLength {
            file: file.into(),
            pointer: pointer.into(),
        }
    }

    pub fn line_count(file: impl Into<String>) -> Self {
        Extractor::LineCount { file: file.into() }
    }

    pub fn pass_through_text(file: impl Into<String>) -> Self {
        Extractor::PassThroughText { file: file.into() }
    }

    pub fn regex_count(file: impl Into<String>, pattern: impl Into<String>) -> Self {
        Extractor::RegexCount {
            file: file.into(),
            pattern: pattern.into(),
        }
    }

    pub fn file(&self) -> &str {
        match self {
            Extractor::JsonArrayLength { file, .. }
            | Extractor::LineCount { file }
            | Extractor::PassThroughText { file }
            | Extractor::RegexCount { file, .. } => file,
        }
    }
}

/// A metric a step promises to produce, keyed globally across the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSpec {
    pub key: String,
    pub extractor: Extractor,
}

/// One catalog-defined invocation of an external analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub phase: Phase,
    pub cost: CostClass,
    pub command: CommandTemplate,
    /// Relative to the output directory. The first file receives stdout;
    /// the second, if declared, receives stderr. With a single file both
    /// streams are merged into it.
    pub output_files: Vec<String>,
    pub required_binary: String,
    pub focus_tags: Vec<FocusArea>,
    /// Shallowest level at which this step runs.
    pub required_for_level: Level,
    pub metrics: Vec<MetricSpec>,
}

impl Step {
    pub fn new(name: impl Into<String>, phase: Phase, cost: CostClass) -> Self {
        let name = name.into();
        Self {
            command: CommandTemplate::new(name.clone(), Vec::<String>::new()),
            required_binary: name.clone(),
            name,
            phase,
            cost,
            output_files: Vec::new(),
            focus_tags: Vec::new(),
            required_for_level: Level::Full,
            metrics: Vec::new(),
        }
    }

    pub fn with_command<I, S>(mut self, program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = CommandTemplate::new(program, args);
        self
    }

    pub fn with_output(mut self, file: impl Into<String>) -> Self {
        self.output_files.push(file.into());
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.required_binary = binary.into();
        self
    }

    pub fn with_tags(mut self, tags: &[FocusArea]) -> Self {
        self.focus_tags = tags.to_vec();
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.required_for_level = level;
        self
    }

    pub fn with_metric(mut self, key: impl Into<String>, extractor: Extractor) -> Self {
        self.metrics.push(MetricSpec {
            key: key.into(),
            extractor,
        });
        self
    }

    /// File receiving stdout (and stderr when only one file is declared).
    pub fn stdout_file(&self) -> Option<&str> {
        self.output_files.first().map(String::as_str)
    }

    /// Separate stderr file, if the step declares one.
    pub fn stderr_file(&self) -> Option<&str> {
        self.output_files.get(1).map(String::as_str)
    }
}

/// Validated, immutable list of steps in declaration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    steps: Vec<Step>,
}

impl Catalog {
    /// Build a catalog, enforcing its structural invariants:
    ///
    /// - step names are unique
    /// - every step declares at least one output file
    /// - output paths are plain relative paths and pairwise disjoint across
    ///   all steps, and never collide with the report files
    /// - every metric key is declared exactly once
    /// - every extractor reads one of its own step's outputs
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        let mut names = BTreeSet::new();
        let mut outputs = BTreeSet::new();
        let mut keys = BTreeSet::new();

        for step in &steps {
            if !names.insert(step.name.as_str()) {
                return Err(invalid(format!("duplicate step name '{}'", step.name)));
            }
            if step.output_files.is_empty() {
                return Err(invalid(format!("step '{}' declares no output", step.name)));
            }
            for file in &step.output_files {
                if !is_plain_relative(file) {
                    return Err(invalid(format!(
                        "step '{}' output '{}' must be a relative path inside the output directory",
                        step.name, file
                    )));
                }
                if file == SUMMARY_FILE || file == METRICS_FILE {
                    return Err(invalid(format!(
                        "step '{}' output '{}' collides with a report file",
                        step.name, file
                    )));
                }
                if !outputs.insert(file.as_str()) {
                    return Err(invalid(format!(
                        "output '{}' of step '{}' overlaps another step's output",
                        file, step.name
                    )));
                }
            }
            for metric in &step.metrics {
                if !keys.insert(metric.key.as_str()) {
                    return Err(invalid(format!(
                        "metric key '{}' declared more than once",
                        metric.key
                    )));
                }
                if !step.output_files.iter().any(|f| f == metric.extractor.file()) {
                    return Err(invalid(format!(
                        "metric '{}' reads '{}', which step '{}' does not write",
                        metric.key,
                        metric.extractor.file(),
                        step.name
                    )));
                }
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Position of a step in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn invalid(msg: String) -> SweepError {
    SweepError::InvalidCatalog(msg)
}

fn is_plain_relative(file: &str) -> bool {
    let path = Path::new(file);
    !file.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

const RUST_SOURCES: [&str; 4] = ["-rnE", "--include=*.rs", "--exclude-dir=target", "--"];

/// A grep-based pattern scan over the repository's Rust sources.
///
/// grep's own diagnostics go to a separate log so they are never counted
/// as matches.
fn grep_step(name: &str, phase: Phase, pattern: &str, key: &str, tags: &[FocusArea]) -> Step {
    let output = format!("{name}.txt");
    let mut args: Vec<String> = RUST_SOURCES.iter().map(|s| s.to_string()).collect();
    args.push(pattern.to_string());
    args.push(".".to_string());

    Step::new(name, phase, CostClass::Cheap)
        .with_command("grep", args)
        .with_binary("grep")
        .with_output(output.clone())
        .with_output(format!("{name}.stderr.log"))
        .with_tags(tags)
        .with_metric(key, Extractor::line_count(output))
}

/// The built-in sweep for a Rust code tree, plus the contract-analysis step.
pub fn default_catalog() -> Catalog {
    // Validity of the built-in list is pinned by `default_catalog_is_valid`.
    Catalog {
        steps: default_steps(),
    }
}

fn default_steps() -> Vec<Step> {
    use FocusArea::*;

    vec![
        Step::new("cargo-audit", Phase::VulnerabilityAudit, CostClass::Cheap)
            .with_command("cargo", ["audit", "--json"])
            .with_binary("cargo-audit")
            .with_output("cargo-audit.json")
            .with_output("cargo-audit.stderr.log")
            .with_tags(&FocusArea::ALL)
            .with_level(Level::Quick)
            .with_metric(
                "vulnerabilities",
                Extractor::json_array_length("cargo-audit.json", "/vulnerabilities"),
            ),
        grep_step(
            "unsafe-usage",
            Phase::UnsafeCode,
            r"unsafe[[:space:]]*(\{|fn|impl|trait)",
            "unsafe_usages",
            &[Memory, Concurrency],
        )
        .with_level(Level::Quick),
        Step::new("dependency-duplicates", Phase::DependencyAnalysis, CostClass::Standard)
            .with_command(
                "cargo",
                ["tree", "--duplicates", "--edges", "normal", "--prefix", "none"],
            )
            .with_binary("cargo")
            .with_output("dependency-duplicates.txt")
            .with_output("dependency-duplicates.stderr.log")
            .with_tags(&FocusArea::ALL)
            .with_metric(
                "duplicate_dependencies",
                Extractor::line_count("dependency-duplicates.txt"),
            ),
        Step::new("cargo-geiger", Phase::UnsafeCode, CostClass::Expensive)
            .with_command("cargo", ["geiger", "--output-format", "GitHubMarkdown"])
            .with_binary("cargo-geiger")
            .with_output("cargo-geiger.md")
            .with_output("cargo-geiger.stderr.log")
            .with_tags(&[Memory])
            .with_metric(
                "geiger_summary",
                Extractor::pass_through_text("cargo-geiger.md"),
            ),
        grep_step(
            "panic-points",
            Phase::PatternScan,
            r"\.unwrap\(\)|\.expect\(|panic!\(|unreachable!\(|todo!\(|unimplemented!\(",
            "panic_points",
            &[Memory, Concurrency, Network],
        ),
        grep_step(
            "crypto-patterns",
            Phase::PatternScan,
            r"sha2|sha3|keccak|blake2|aes|chacha|ed25519|secp256k1|hmac|OsRng|thread_rng|poseidon|constant_time|subtle::",
            "crypto_patterns",
            &[Crypto],
        ),
        grep_step(
            "concurrency-patterns",
            Phase::PatternScan,
            r"Mutex|RwLock|Condvar|Atomic[A-Z][a-z0-9]+|unsafe impl (Send|Sync)|thread::spawn|tokio::spawn",
            "concurrency_patterns",
            &[Concurrency],
        ),
        grep_step(
            "network-patterns",
            Phase::PatternScan,
            r"TcpStream|TcpListener|UdpSocket|tokio::net|reqwest::|hyper::|tonic::",
            "network_patterns",
            &[Network],
        ),
        grep_step(
            "raw-pointers",
            Phase::PatternScan,
            r"\*const |\*mut |as_ptr\(|as_mut_ptr\(|from_raw\(|transmute",
            "raw_pointer_usages",
            &[Memory],
        ),
        Step::new("clippy", Phase::StaticAnalysis, CostClass::Standard)
            .with_command(
                "cargo",
                [
                    "clippy",
                    "--all-targets",
                    "--message-format=short",
                    "--",
                    "-W",
                    "clippy::unwrap_used",
                    "-W",
                    "clippy::expect_used",
                    "-W",
                    "clippy::panic",
                    "-W",
                    "clippy::indexing_slicing",
                ],
            )
            .with_binary("cargo-clippy")
            .with_output("clippy.txt")
            .with_tags(&FocusArea::ALL)
            .with_metric(
                "clippy_warnings",
                Extractor::regex_count("clippy.txt", r"^\S+:\d+:\d+: warning"),
            ),
        Step::new("semgrep", Phase::RuleScan, CostClass::Standard)
            .with_command("semgrep", ["--config", "auto", "--json", "--quiet", "."])
            .with_output("semgrep.json")
            .with_output("semgrep.stderr.log")
            .with_tags(&FocusArea::ALL)
            .with_metric(
                "semgrep_findings",
                Extractor::json_array_length("semgrep.json", "/results"),
            ),
        Step::new("slither", Phase::RuleScan, CostClass::Standard)
            .with_command("slither", [".", "--json", "-"])
            .with_output("slither.json")
            .with_output("slither.stderr.log")
            .with_tags(&[Crypto, Network])
            .with_metric(
                "contract_detectors",
                Extractor::json_array_length("slither.json", "/results/detectors"),
            ),
        Step::new("coverage", Phase::Coverage, CostClass::Expensive)
            .with_command("cargo", ["tarpaulin", "--skip-clean", "--out", "Stdout"])
            .with_binary("cargo-tarpaulin")
            .with_output("coverage.txt")
            .with_tags(&FocusArea::ALL)
            .with_metric("coverage_summary", Extractor::pass_through_text("coverage.txt")),
        Step::new("miri", Phase::MemoryAnalysis, CostClass::Expensive)
            .with_command("cargo", ["+nightly", "miri", "test"])
            .with_binary("cargo-miri")
            .with_output("miri.txt")
            .with_tags(&[Memory, Concurrency])
            .with_metric(
                "miri_ub_reports",
                Extractor::regex_count("miri.txt", "Undefined Behavior"),
            ),
        Step::new("fuzz-smoke", Phase::Fuzzing, CostClass::Fuzz)
            .with_command(
                "sh",
                [
                    "-c",
                    "for t in $(cargo +nightly fuzz list); do \
                     cargo +nightly fuzz run \"$t\" -- -max_total_time=300 || exit 1; done",
                ],
            )
            .with_binary("cargo-fuzz")
            .with_output("fuzz.txt")
            .with_tags(&[Memory, Crypto])
            .with_level(Level::DeepDive)
            .with_metric(
                "fuzz_crashes",
                Extractor::regex_count("fuzz.txt", r"==\d+==\s*ERROR|panicked at"),
            ),
        Step::new("workspace-inventory", Phase::ReportGeneration, CostClass::Cheap)
            .with_command("cargo", ["metadata", "--format-version", "1", "--no-deps"])
            .with_binary("cargo")
            .with_output("workspace-inventory.json")
            .with_output("workspace-inventory.stderr.log")
            .with_tags(&FocusArea::ALL)
            .with_metric(
                "workspace_packages",
                Extractor::json_array_length("workspace-inventory.json", "/packages"),
            ),
    ]
}

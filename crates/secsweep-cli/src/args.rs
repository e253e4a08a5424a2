use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use secsweep_core::config::{Focus, Level};

#[derive(Debug, Parser)]
#[command(
    name = "secsweep",
    version,
    about = "Orchestrated security analysis for Rust repositories"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the analysis and write the report
    Run(RunArgs),

    /// Print the steps a run would execute, without running them
    Plan(PlanArgs),

    /// Rebuild the report from a previous run's output directory
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct Selection {
    /// Analysis depth
    #[arg(long, default_value = "full")]
    pub level: LevelArg,

    /// Restrict to one concern
    #[arg(long, default_value = "all")]
    pub focus: FocusArg,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Directory receiving raw outputs and the report
    #[arg(long, default_value = "security-reports")]
    pub output_dir: PathBuf,

    /// Repository to analyze (overrides the settings file)
    #[arg(long)]
    pub repo_root: Option<PathBuf>,

    /// Maximum concurrently executing steps (overrides the settings file)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Source revision recorded in the report
    #[arg(long, env = "GITHUB_SHA")]
    pub revision: Option<String>,

    /// Copy the finished output directory here
    #[arg(long)]
    pub publish_to: Option<PathBuf>,

    /// Days the published artifacts are retained
    #[arg(long)]
    pub retention_days: Option<u32>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub selection: Selection,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Output directory of a previous run
    #[arg(long, default_value = "security-reports")]
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LevelArg {
    Quick,
    Full,
    DeepDive,
}

impl From<LevelArg> for Level {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Quick => Level::Quick,
            LevelArg::Full => Level::Full,
            LevelArg::DeepDive => Level::DeepDive,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FocusArg {
    All,
    Crypto,
    Memory,
    Concurrency,
    Network,
}

impl From<FocusArg> for Focus {
    fn from(arg: FocusArg) -> Self {
        match arg {
            FocusArg::All => Focus::All,
            FocusArg::Crypto => Focus::Crypto,
            FocusArg::Memory => Focus::Memory,
            FocusArg::Concurrency => Focus::Concurrency,
            FocusArg::Network => Focus::Network,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use secsweep_core::config::{PublishSettings, RunConfig, Settings};
use secsweep_core::report::model::{RunMetadata, ToolInfo};
use secsweep_core::{Pipeline, RunState, TOOL_NAME};

mod args;
mod interrupt;

use args::{Cli, Commands, OutputFormat, PlanArgs, ReportArgs, RunArgs};

/// Report built, but delivering it failed.
const EXIT_PUBLISH_FAILED: i32 = 3;
/// Run cancelled by SIGINT/SIGTERM; the partial report was still written.
const EXIT_INTERRUPTED: i32 = 130;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("cannot load settings from {}", path.display()))?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Run(args) => run(args, settings),
        Commands::Plan(args) => plan(args, settings),
        Commands::Report(args) => report(args, settings),
    }
}

fn run(args: RunArgs, mut settings: Settings) -> Result<()> {
    if let Some(root) = args.repo_root {
        settings.repository_root = root;
    }
    if let Some(workers) = args.workers {
        settings.workers = workers.max(1);
    }
    if let Some(dest) = args.publish_to {
        let previous = settings.publish.take();
        let mut publish = PublishSettings::new(dest);
        if let Some(p) = previous {
            publish.retention_days = p.retention_days;
        }
        settings.publish = Some(publish);
    }
    if let Some(days) = args.retention_days {
        let Some(publish) = settings.publish.as_mut() else {
            bail!("--retention-days needs a destination (--publish-to or [publish])");
        };
        publish.retention_days = days;
    }

    let config = RunConfig::new(
        args.selection.level.into(),
        args.selection.focus.into(),
        args.output_dir,
    );
    let tool = ToolInfo {
        name: TOOL_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };
    let revision = args.revision.unwrap_or_else(|| "unknown".to_string());
    let meta = RunMetadata::new(tool, revision);

    let pipeline = Pipeline::new(settings);
    interrupt::cancel_on_interrupt(pipeline.cancel_token());
    let outcome = pipeline
        .run(&config, &meta)
        .context("security analysis run failed")?;

    for section in &outcome.report.sections {
        println!("{}: {}", section.name, section.value);
    }
    println!("Report: {}", outcome.summary_path.display());

    info!("Finished in state {}", outcome.state);
    if interrupt::interrupted() {
        std::process::exit(EXIT_INTERRUPTED);
    }
    if outcome.state == RunState::BuiltUnpublished {
        std::process::exit(EXIT_PUBLISH_FAILED);
    }
    Ok(())
}

fn plan(args: PlanArgs, settings: Settings) -> Result<()> {
    let config = RunConfig::new(
        args.selection.level.into(),
        args.selection.focus.into(),
        "security-reports",
    );
    let pipeline = Pipeline::new(settings);
    let steps = pipeline.plan(&config);

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<_> = steps
                .iter()
                .map(|s| {
                    json!({
                        "name": s.name,
                        "phase": s.phase,
                        "cost": s.cost,
                        "command": s.command.to_string(),
                        "required_binary": s.required_binary,
                        "timeout_secs": pipeline.settings().timeouts.timeout_for(s).as_secs(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text => {
            if steps.is_empty() {
                println!("No steps matched this configuration.");
            }
            for (i, s) in steps.iter().enumerate() {
                println!("{:>2}. {:<24} {}", i + 1, s.name, s.command);
            }
        }
    }
    Ok(())
}

fn report(args: ReportArgs, settings: Settings) -> Result<()> {
    let report = Pipeline::new(settings)
        .regenerate(&args.output_dir)
        .with_context(|| format!("cannot regenerate report in {}", args.output_dir.display()))?;

    for section in &report.sections {
        println!("{}: {}", section.name, section.value);
    }
    Ok(())
}

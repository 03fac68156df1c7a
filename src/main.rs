//! `weft` - agent workflow orchestration from the command line
//!
//! Validates and executes declarative workflow definitions. Reasoning is
//! scripted per agent in the definition, so runs are deterministic and need
//! no model access.

use anyhow::{Context, Result};
use clap::Parser;
use console::Style;
use futures::StreamExt;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::cli::render::EventPrinter;
use crate::cli::{Cli, Commands, OutputFormat};
use weft_core::agent::runtime::impls::{ConsoleTelemetry, TracingTelemetry};
use weft_core::agent::tools::ToolCatalog;
use weft_core::agent::{RunReport, Runner, WorkflowDefinition};
use weft_core::{AgentOutcome, EngineConfig};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Commands::Validate { path } => validate(&path),
        Commands::Run {
            path,
            input,
            format,
            config,
            log_file,
            trace,
        } => run(&path, input, format, config, log_file, trace).await,
        Commands::Config => show_config(),
    }
}

/// Logs go to stderr so stdout stays clean for events
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("weft=info,weft_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Explicit config file, with `WEFT_*` overrides applied on top
fn load_config(path: &Path) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(path)
        .with_context(|| format!("Failed to load config {}", path.display()))?;
    config.apply_env_overrides();
    Ok(config)
}

fn load_definition(path: &Path) -> Result<WorkflowDefinition> {
    WorkflowDefinition::load(path)
        .with_context(|| format!("Failed to load workflow {}", path.display()))
}

fn validate(path: &Path) -> Result<()> {
    let definition = load_definition(path)?;
    let (root, _) = definition
        .build_scripted(&ToolCatalog::builtin())
        .with_context(|| format!("Workflow {} is invalid", path.display()))?;

    let green = Style::new().green();
    println!(
        "{} {} ({} agent(s) under '{}')",
        green.apply_to("✓ valid:"),
        if definition.name.is_empty() {
            path.display().to_string()
        } else {
            definition.name.clone()
        },
        root.subtree_names().len(),
        root.name()
    );
    for name in root.subtree_names() {
        println!("  {}", name);
    }
    Ok(())
}

async fn run(
    path: &Path,
    input: Option<String>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
    log_file: Option<PathBuf>,
    trace: bool,
) -> Result<()> {
    let config = match config_path {
        Some(ref p) => load_config(p)?,
        None => EngineConfig::load_or_default(),
    };
    let definition = load_definition(path)?;
    let (root, _) = definition
        .build_scripted(&ToolCatalog::builtin())
        .with_context(|| format!("Workflow {} is invalid", path.display()))?;

    let mut runner = Runner::new(config);
    if let Some(ref file) = log_file {
        let telemetry = ConsoleTelemetry::with_file(file)
            .await
            .with_context(|| format!("Failed to open log file {}", file.display()))?
            .with_verbose(false);
        runner = runner.with_telemetry(Arc::new(telemetry));
    } else if trace {
        runner = runner.with_telemetry(Arc::new(TracingTelemetry));
    }

    let input = input.map(Value::String).unwrap_or_else(|| definition.input.clone());
    let mut handle = runner.run(root, definition.initial_state(), input);
    let run_id = handle.run_id();
    let state = handle.state().clone();
    let cancellation = handle.cancellation_token();
    let printer = EventPrinter::new();

    let mut events = Vec::new();
    let mut interrupted = false;
    loop {
        tokio::select! {
            next = handle.next() => match next {
                Some(event) => {
                    match format {
                        OutputFormat::Text => printer.print_event(&event),
                        OutputFormat::Json => println!("{}", serde_json::to_string(&event)?),
                        OutputFormat::Yaml => {}
                    }
                    events.push(event);
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                tracing::warn!("Interrupted, cancelling run");
                interrupted = true;
                cancellation.cancel();
            }
        }
    }

    let report = RunReport {
        run_id,
        events,
        final_state: state.snapshot(),
        outcome: handle
            .outcome()
            .unwrap_or(AgentOutcome::Cancelled(Value::Null)),
    };

    match format {
        OutputFormat::Text => printer.print_summary(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string(&report_json(&report))?),
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&report_json(&report))?),
    }

    if let AgentOutcome::Failed(ref error) = report.outcome {
        anyhow::bail!("run {} failed: {}", run_id, error.root_cause());
    }
    Ok(())
}

fn report_json(report: &RunReport) -> Value {
    let (status, output, error) = match report.outcome {
        AgentOutcome::Completed(ref v) => ("completed", v.clone(), Value::Null),
        AgentOutcome::Cancelled(ref v) => ("cancelled", v.clone(), Value::Null),
        AgentOutcome::Failed(ref e) => ("failed", Value::Null, json!(e)),
    };
    json!({
        "run_id": report.run_id.to_string(),
        "status": status,
        "output": output,
        "error": error,
        "state": report.final_state,
        "events": report.events,
    })
}

fn show_config() -> Result<()> {
    let config = EngineConfig::load_or_default();
    let dim = Style::new().dim();
    match EngineConfig::default_path() {
        Some(path) => eprintln!("{}", dim.apply_to(format!("# default location: {}", path.display()))),
        None => eprintln!("{}", dim.apply_to("# no user config directory")),
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_gets_env_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[budget]\nmax_turns = 3\nmax_depth = 5\n").unwrap();

        std::env::set_var("WEFT_MAX_TURNS", "12");
        let config = load_config(&path);
        std::env::remove_var("WEFT_MAX_TURNS");

        let config = config.unwrap();
        assert_eq!(config.budget.max_turns, 12);
        assert_eq!(config.budget.max_depth, 5);
    }
}

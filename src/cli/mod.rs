//! CLI argument parsing using clap 4.x derive macros

pub mod render;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Agent workflow orchestration engine
///
/// Runs declarative agent workflows (pipelines, fan-out groups and bounded
/// refinement loops) with scripted reasoning.
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(author, about, long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"))]
#[command(propagate_version = true)]
pub struct Cli {
    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a workflow's agent graph and report configuration errors
    Validate {
        /// Workflow definition (YAML)
        path: PathBuf,
    },

    /// Execute a workflow with its scripted reasoning responses
    Run {
        /// Workflow definition (YAML)
        path: PathBuf,

        /// Input for the root agent (overrides the definition's `input`)
        #[arg(short, long)]
        input: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Engine configuration file (defaults to $WEFT_CONFIG or the user config dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Also append timestamped events to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Forward events to the log output (RUST_LOG) instead of a file
        #[arg(long, conflicts_with = "log_file")]
        trace: bool,
    },

    /// Print the effective engine configuration
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Styled event lines
    Text,
    /// One JSON event per line, then the report
    Json,
    /// YAML report after the run
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from([
            "weft", "run", "review.yaml", "--input", "hello", "--format", "json",
        ]);
        match cli.command {
            Commands::Run {
                path,
                input,
                format,
                config,
                log_file,
                trace,
            } => {
                assert_eq!(path, PathBuf::from("review.yaml"));
                assert_eq!(input.as_deref(), Some("hello"));
                assert_eq!(format, OutputFormat::Json);
                assert!(config.is_none());
                assert!(log_file.is_none());
                assert!(!trace);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}

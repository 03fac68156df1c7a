//! Console Telemetry
//!
//! Logs every run event to console/file, or forwards it to `tracing`.

use crate::agent::runtime::capability::{Capability, TelemetrySink};
use crate::agent::types::events::{Completion, Event, ToolOutcome};
use crate::agent::types::ids::RunId;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Console telemetry - logs to stderr/file
pub struct ConsoleTelemetry {
    verbose: bool,
    log_file: Option<Arc<Mutex<tokio::fs::File>>>,
}

impl ConsoleTelemetry {
    pub fn new() -> Self {
        Self {
            verbose: true,
            log_file: None,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Create with file logging
    pub async fn with_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;

        Ok(Self {
            verbose: true,
            log_file: Some(Arc::new(Mutex::new(file))),
        })
    }

    async fn log(&self, message: impl AsRef<str>) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("[{}] {}\n", timestamp, message.as_ref());

        if self.verbose {
            eprintln!("{}", line.trim_end());
        }

        if let Some(ref file) = self.log_file {
            use tokio::io::AsyncWriteExt;
            let mut file = file.lock().await;
            let _ = file.write_all(line.as_bytes()).await;
        }
    }
}

impl Default for ConsoleTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl Capability for ConsoleTelemetry {
    fn name(&self) -> &'static str {
        "console-telemetry"
    }
}

#[async_trait::async_trait]
impl TelemetrySink for ConsoleTelemetry {
    async fn record(&self, run_id: RunId, event: &Event) {
        self.log(format!("[{}] {}", run_id.short(), format_event(event)))
            .await;
    }
}

/// Telemetry that forwards events to the `tracing` subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Capability for TracingTelemetry {
    fn name(&self) -> &'static str {
        "tracing-telemetry"
    }
}

#[async_trait::async_trait]
impl TelemetrySink for TracingTelemetry {
    async fn record(&self, run_id: RunId, event: &Event) {
        match event {
            Event::AgentFailed { .. } => {
                tracing::warn!(run = %run_id, "{}", format_event(event))
            }
            _ => tracing::info!(run = %run_id, "{}", format_event(event)),
        }
    }
}

/// One-line rendering of an event
pub fn format_event(event: &Event) -> String {
    match event {
        Event::PartialOutput { agent_name, text } => {
            format!("{} PARTIAL: {}", agent_name, truncate(text, 60))
        }
        Event::ToolCall {
            agent_name,
            tool_name,
            args,
        } => format!(
            "{} TOOL_CALL: {}({})",
            agent_name,
            tool_name,
            truncate(&args.to_string(), 50)
        ),
        Event::ToolResult {
            agent_name,
            tool_name,
            result,
        } => match result {
            ToolOutcome::Ok(value) => format!(
                "{} TOOL_RESULT: {} -> {}",
                agent_name,
                tool_name,
                truncate(&value.to_string(), 50)
            ),
            ToolOutcome::Error(error) => format!(
                "{} TOOL_ERROR: {} -> {}",
                agent_name,
                tool_name,
                truncate(error, 50)
            ),
        },
        Event::StateChange {
            agent_name,
            key,
            value,
        } => format!(
            "{} STATE: {} = {}",
            agent_name,
            key,
            truncate(&value.to_string(), 50)
        ),
        Event::AgentCompleted {
            agent_name,
            final_output,
            status,
        } => {
            let label = match status {
                Completion::Finished => "COMPLETED",
                Completion::Cancelled => "CANCELLED",
            };
            format!(
                "{} {}: {}",
                agent_name,
                label,
                truncate(&final_output.to_string(), 60)
            )
        }
        Event::AgentFailed { agent_name, error } => {
            format!("{} FAILED: {}", agent_name, error)
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len).collect();
        format!("{}...", cut)
    }
}

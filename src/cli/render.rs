//! Event rendering for the terminal

use console::Style;
use serde_json::Value;
use weft_core::agent::types::{AgentOutcome, Completion, Event, ToolOutcome};
use weft_core::RunReport;

/// Styled printer for run events
pub struct EventPrinter {
    blue: Style,
    green: Style,
    yellow: Style,
    red: Style,
    dim: Style,
    bold: Style,
}

impl Default for EventPrinter {
    fn default() -> Self {
        Self {
            blue: Style::new().blue(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }
}

impl EventPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_event(&self, event: &Event) {
        println!("{}", self.render_event(event));
    }

    pub fn render_event(&self, event: &Event) -> String {
        let agent = self.bold.apply_to(event.agent_name());
        match event {
            Event::PartialOutput { text, .. } => format!("{} {}", agent, text),
            Event::ToolCall {
                tool_name, args, ..
            } => format!(
                "{} {} {}({})",
                agent,
                self.blue.apply_to("→"),
                self.blue.apply_to(tool_name),
                self.dim.apply_to(compact(args))
            ),
            Event::ToolResult {
                tool_name, result, ..
            } => match result {
                ToolOutcome::Ok(value) => format!(
                    "{} {} {} {}",
                    agent,
                    self.blue.apply_to("←"),
                    tool_name,
                    self.dim.apply_to(compact(value))
                ),
                ToolOutcome::Error(error) => format!(
                    "{} {} {} {}",
                    agent,
                    self.red.apply_to("✗"),
                    tool_name,
                    self.red.apply_to(error)
                ),
            },
            Event::StateChange { key, value, .. } => format!(
                "{} {} {} = {}",
                agent,
                self.yellow.apply_to("state"),
                key,
                compact(value)
            ),
            Event::AgentCompleted {
                final_output,
                status: Completion::Finished,
                ..
            } => format!(
                "{} {} {}",
                agent,
                self.green.apply_to("✓ completed"),
                compact(final_output)
            ),
            Event::AgentCompleted { final_output, .. } => format!(
                "{} {} {}",
                agent,
                self.yellow.apply_to("■ cancelled"),
                compact(final_output)
            ),
            Event::AgentFailed { error, .. } => format!(
                "{} {} {}",
                agent,
                self.red.apply_to("✗ failed"),
                self.red.apply_to(error)
            ),
        }
    }

    /// Outcome and final session state
    pub fn print_summary(&self, report: &RunReport) {
        println!();
        let headline = match report.outcome {
            AgentOutcome::Completed(_) => self.green.apply_to("Run completed"),
            AgentOutcome::Cancelled(_) => self.yellow.apply_to("Run cancelled"),
            AgentOutcome::Failed(_) => self.red.apply_to("Run failed"),
        };
        println!(
            "{} {} ({} events)",
            headline,
            self.dim.apply_to(report.run_id),
            report.events.len()
        );

        if let Some(output) = report.outcome.output() {
            println!("{} {}", self.bold.apply_to("Output:"), compact(output));
        }

        if report.final_state.is_empty() {
            return;
        }
        println!("{}", self.bold.apply_to("Session state:"));
        for (key, value) in &report.final_state {
            println!("  {} = {}", self.yellow.apply_to(key), compact(value));
        }
    }
}

/// Strings unquoted, everything else as compact JSON
fn compact(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_contains_agent_and_payload() {
        console::set_colors_enabled(false);
        let printer = EventPrinter::new();

        let line = printer.render_event(&Event::ToolCall {
            agent_name: "draft".to_string(),
            tool_name: "echo".to_string(),
            args: json!({"message": "hi"}),
        });
        assert_eq!(line, r#"draft → echo({"message":"hi"})"#);

        let line = printer.render_event(&Event::AgentCompleted {
            agent_name: "loop".to_string(),
            final_output: json!("done"),
            status: Completion::Cancelled,
        });
        assert_eq!(line, "loop ■ cancelled done");
    }
}

//! Events emitted by agents during a run
//!
//! Every agent produces an ordered sequence of these, terminated by exactly one
//! `AgentCompleted` or `AgentFailed` for that agent. All events are
//! serializable for logging and transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AgentError;

/// An observable step of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Text produced by a leaf agent (intermediate thought or final answer)
    PartialOutput { agent_name: String, text: String },

    /// A validated tool call is about to be dispatched
    ToolCall {
        agent_name: String,
        tool_name: String,
        args: Value,
    },

    /// A dispatched tool call returned
    ToolResult {
        agent_name: String,
        tool_name: String,
        result: ToolOutcome,
    },

    /// SessionState key written
    StateChange {
        agent_name: String,
        key: String,
        value: Value,
    },

    /// Terminal: the agent finished (normally or by cancellation)
    AgentCompleted {
        agent_name: String,
        final_output: Value,
        #[serde(default)]
        status: Completion,
    },

    /// Terminal: the agent failed
    AgentFailed {
        agent_name: String,
        error: AgentError,
    },
}

/// Result carried by a `ToolResult` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok(Value),
    Error(String),
}

impl ToolOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutcome::Ok(_))
    }
}

/// How a completed agent finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    #[default]
    Finished,
    /// Cooperative cancellation observed; not an error
    Cancelled,
}

impl Event {
    /// Agent the event belongs to
    pub fn agent_name(&self) -> &str {
        match self {
            Event::PartialOutput { agent_name, .. }
            | Event::ToolCall { agent_name, .. }
            | Event::ToolResult { agent_name, .. }
            | Event::StateChange { agent_name, .. }
            | Event::AgentCompleted { agent_name, .. }
            | Event::AgentFailed { agent_name, .. } => agent_name,
        }
    }

    /// True for `AgentCompleted` and `AgentFailed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::AgentCompleted { .. } | Event::AgentFailed { .. })
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PartialOutput { .. } => "partial_output",
            Event::ToolCall { .. } => "tool_call",
            Event::ToolResult { .. } => "tool_result",
            Event::StateChange { .. } => "state_change",
            Event::AgentCompleted { .. } => "agent_completed",
            Event::AgentFailed { .. } => "agent_failed",
        }
    }
}

/// Terminal outcome of one agent execution, as seen by its parent
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome {
    Completed(Value),
    Cancelled(Value),
    Failed(AgentError),
}

impl AgentOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, AgentOutcome::Completed(_))
    }

    pub fn output(&self) -> Option<&Value> {
        match self {
            AgentOutcome::Completed(v) | AgentOutcome::Cancelled(v) => Some(v),
            AgentOutcome::Failed(_) => None,
        }
    }

    /// The terminal event this outcome corresponds to
    pub fn to_event(&self, agent_name: &str) -> Event {
        match self {
            AgentOutcome::Completed(output) => Event::AgentCompleted {
                agent_name: agent_name.to_string(),
                final_output: output.clone(),
                status: Completion::Finished,
            },
            AgentOutcome::Cancelled(output) => Event::AgentCompleted {
                agent_name: agent_name.to_string(),
                final_output: output.clone(),
                status: Completion::Cancelled,
            },
            AgentOutcome::Failed(error) => Event::AgentFailed {
                agent_name: agent_name.to_string(),
                error: error.clone(),
            },
        }
    }
}

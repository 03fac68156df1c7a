//! Conversation view exchanged with the reasoning capability

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::events::ToolOutcome;

/// One entry in a leaf agent's conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ConversationEntry {
    /// Input handed to the agent (previous sibling output, delegated request)
    Input { content: Value },
    /// Intermediate text the model produced alongside a tool request
    Thought { text: String },
    /// Tool request issued by the model
    ToolRequest { tool_name: String, args: Value },
    /// Result relayed back after dispatch
    ToolResponse { tool_name: String, result: ToolOutcome },
}

/// Tool as advertised to the reasoning capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-schema style parameter object
    pub parameters: Value,
}

/// Everything a reasoning call sees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningRequest {
    pub agent_name: String,
    /// Opaque directive, never interpreted by the engine
    pub instruction: String,
    pub conversation: Vec<ConversationEntry>,
    pub tools: Vec<ToolSpec>,
    /// SessionState snapshot at request time
    pub state: Map<String, Value>,
    /// Zero-based turn index within the agent's reasoning loop
    pub turn: u32,
}

/// What the reasoning capability decided
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReasoningResponse {
    /// Terminal answer; ends the leaf loop
    Answer { text: String },
    /// Request to dispatch a declared tool, then reason again
    ToolRequest {
        tool_name: String,
        #[serde(default)]
        args: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
    },
}

impl ReasoningResponse {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer { text: text.into() }
    }

    pub fn tool(tool_name: impl Into<String>, args: Value) -> Self {
        Self::ToolRequest {
            tool_name: tool_name.into(),
            args,
            thought: None,
        }
    }
}

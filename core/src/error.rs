//! Structured error types for weft
//!
//! Two families live here:
//!
//! - [`ConfigurationError`]: raised while an agent graph is being constructed.
//!   Never produced once a run is in flight.
//! - [`AgentError`]: everything that can go wrong during a run. Carried by the
//!   `AgentFailed` event of the agent it belongs to, and by composite parents
//!   that wrap or aggregate it.
//!
//! Cancellation is absent from both: it is a terminal non-error
//! outcome (see [`crate::agent::types::events::Completion`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Construction-time errors for agent graphs and engine configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    // =========================================================================
    // Graph shape
    // =========================================================================
    /// Agent registered with an empty name
    #[error("agent name must not be empty")]
    EmptyName,

    /// Two agents in one graph share a name
    #[error("duplicate agent name: {name}")]
    DuplicateAgent { name: String },

    /// A child or delegate reference points at nothing
    #[error("agent '{agent}' references unknown agent '{reference}'")]
    UnknownAgent { agent: String, reference: String },

    /// An agent transitively contains itself
    #[error("cyclic agent graph: {}", path.join(" -> "))]
    CyclicGraph { path: Vec<String> },

    /// Loop agent with a zero iteration ceiling
    #[error("loop agent '{agent}' needs max_iterations >= 1 (got {value})")]
    InvalidMaxIterations { agent: String, value: u32 },

    // =========================================================================
    // Leaf configuration
    // =========================================================================
    /// Tool name declared twice on the same agent
    #[error("agent '{agent}' declares tool '{tool}' more than once")]
    DuplicateTool { agent: String, tool: String },

    /// Tool name not present in the catalog used to build a definition
    #[error("agent '{agent}' references unknown tool '{tool}'")]
    UnknownTool { agent: String, tool: String },

    /// Reasoning agent defined without a reasoning capability
    #[error("reasoning agent '{agent}' has no reasoning capability")]
    MissingReasoning { agent: String },

    // =========================================================================
    // Engine configuration
    // =========================================================================
    /// A budget ceiling of zero, or otherwise unusable
    #[error("invalid budget: {reason}")]
    InvalidBudget { reason: String },

    /// A declarative workflow file that could not be read or parsed
    #[error("invalid workflow definition: {reason}")]
    InvalidDefinition { reason: String },
}

/// Run-time failure of a single agent
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentError {
    // =========================================================================
    // Bounded-iteration guards
    // =========================================================================
    /// Recursion depth or step ceiling reached before or while running
    #[error("agent '{agent}' exceeded its budget: {reason}")]
    BudgetExceeded { agent: String, reason: String },

    /// Leaf agent kept requesting tools past its turn cap
    #[error("agent '{agent}' hit its turn cap of {max_turns} without a terminal answer")]
    ToolLoopExceeded { agent: String, max_turns: u32 },

    // =========================================================================
    // Tool layer
    // =========================================================================
    /// Arguments rejected by the tool's validation contract
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool capability itself reported failure
    #[error("tool '{tool}' failed: {cause}")]
    ToolExecutionFailed { tool: String, cause: String },

    /// Reasoning asked for a tool the agent never declared
    #[error("agent '{agent}' requested undeclared tool '{tool}'")]
    UnknownTool { agent: String, tool: String },

    // =========================================================================
    // Upstream capabilities and hooks
    // =========================================================================
    /// The reasoning capability failed
    #[error("reasoning unavailable for agent '{agent}': {reason}")]
    ReasoningUnavailable { agent: String, reason: String },

    /// A callback returned an error or panicked
    #[error("callback '{callback}' failed at {hook} on agent '{agent}': {reason}")]
    CallbackError {
        agent: String,
        hook: String,
        callback: String,
        reason: String,
    },

    /// Failure reported by a custom agent behavior
    #[error("agent '{agent}' failed: {message}")]
    Custom { agent: String, message: String },

    /// An agent task panicked before reaching a terminal event
    #[error("agent '{agent}' panicked")]
    Panicked { agent: String },

    // =========================================================================
    // Composite propagation
    // =========================================================================
    /// Sequential or loop agent stopped because a child failed
    #[error("agent '{agent}' stopped: child '{child}' failed: {cause}")]
    ChildFailed {
        agent: String,
        child: String,
        #[source]
        cause: Box<AgentError>,
    },

    /// Parallel agent with one or more failing children
    #[error("parallel agent '{agent}' finished with {} failing child(ren)", failures.len())]
    ParallelFailed {
        agent: String,
        failures: Vec<ChildFailure>,
        /// Outputs of the children that did complete, in declaration order
        completed: Map<String, Value>,
    },
}

/// One failing child inside a [`AgentError::ParallelFailed`] aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildFailure {
    pub child: String,
    pub error: AgentError,
}

impl AgentError {
    /// Follow `ChildFailed` wrappers down to the error that started it
    pub fn root_cause(&self) -> &AgentError {
        let mut current = self;
        while let AgentError::ChildFailed { cause, .. } = current {
            current = cause;
        }
        current
    }

    /// Short machine-friendly label, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::BudgetExceeded { .. } => "budget_exceeded",
            AgentError::ToolLoopExceeded { .. } => "tool_loop_exceeded",
            AgentError::InvalidArguments { .. } => "invalid_arguments",
            AgentError::ToolExecutionFailed { .. } => "tool_execution_failed",
            AgentError::UnknownTool { .. } => "unknown_tool",
            AgentError::ReasoningUnavailable { .. } => "reasoning_unavailable",
            AgentError::CallbackError { .. } => "callback_error",
            AgentError::Custom { .. } => "custom",
            AgentError::Panicked { .. } => "panicked",
            AgentError::ChildFailed { .. } => "child_failed",
            AgentError::ParallelFailed { .. } => "parallel_failed",
        }
    }
}

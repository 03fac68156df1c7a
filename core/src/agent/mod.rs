//! Agent Orchestration
//!
//! Composes reasoning agents into pipelines, fan-out groups and bounded
//! refinement loops.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  RUNNER           Run entry point (async)                   │
//! │  - Runner / RunHandle: lazy event stream, cancellation      │
//! │  - GraphBuilder / WorkflowDefinition: validated agent trees │
//! ├─────────────────────────────────────────────────────────────┤
//! │  AGENTS           One execution contract, closed variants   │
//! │  - Reasoning leaf: AwaitingModel -> AwaitingTool -> Terminal│
//! │  - Sequential, Parallel, Loop, Custom                       │
//! │  - Callbacks: before/after agent run, before/after reasoning│
//! ├─────────────────────────────────────────────────────────────┤
//! │  RUNTIME          Injected capabilities and run context     │
//! │  - ReasoningCapability, ToolCapability, TelemetrySink       │
//! │  - OrchestrationContext: state, cancellation, budget, sink  │
//! │  - Tool registry/invoker                                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TYPES            Events, conversation, ids                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use weft_core::agent::{Agent, Runner, SessionState};
//! use weft_core::agent::runtime::impls::ScriptedReasoning;
//! use weft_core::agent::types::ReasoningResponse;
//! use std::sync::Arc;
//!
//! let reasoning = Arc::new(
//!     ScriptedReasoning::new()
//!         .script("draft", [ReasoningResponse::answer("A draft")])
//!         .script("review", [ReasoningResponse::answer("Approved")]),
//! );
//!
//! let draft = Agent::reasoning("draft").with_reasoning(reasoning.clone()).build()?;
//! let review = Agent::reasoning("review").with_reasoning(reasoning).build()?;
//! let pipeline = Agent::sequential("pipeline", vec![Arc::new(draft), Arc::new(review)])?;
//!
//! let report = Runner::default()
//!     .run(Arc::new(pipeline), SessionState::new(), serde_json::Value::Null)
//!     .collect()
//!     .await;
//! ```

#![forbid(unsafe_code)]

pub mod builder;
pub mod callbacks;
pub mod core;
pub mod definition;
pub mod reasoning;
pub mod runner;
pub mod runtime;
pub mod session;
pub mod tools;
pub mod types;
pub mod workflow;

pub use builder::{AgentDefinition, DefinitionKind, GraphBuilder};
pub use callbacks::{CallbackChain, CallbackContext, CallbackDecision, Callbacks, HookPoint};
pub use self::core::{Agent, AgentKind};
pub use definition::{AgentEntry, EntryKind, ScriptStep, WorkflowDefinition};
pub use reasoning::{ReasoningAgent, ReasoningAgentBuilder};
pub use runner::{run, RunHandle, RunReport, Runner};

pub use runtime::{
    AgentBehavior, Capability, OrchestrationContext, ReasoningCapability, ReasoningError,
    TelemetrySink, ToolCapability, ToolCapabilityError, CallbackFailure,
};

pub use session::SessionState;

pub use tools::{AgentTool, ArgumentSchema, ParamType, ToolCatalog, ToolDescriptor, ToolRegistry};

pub use types::{
    AgentOutcome, Completion, ConversationEntry, Event, ReasoningRequest, ReasoningResponse,
    RunId, ToolOutcome, ToolSpec,
};

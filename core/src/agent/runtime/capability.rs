//! Capability traits
//!
//! Base trait + the async capabilities the engine consumes but never
//! implements itself. No orchestration logic lives here.

use serde_json::Value;

use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::runtime::error::{ReasoningError, ToolCapabilityError};
use crate::agent::types::events::Event;
use crate::agent::types::ids::RunId;
use crate::agent::types::conversation::{ReasoningRequest, ReasoningResponse};
use crate::error::AgentError;

/// Base capability trait for identity
pub trait Capability: Send + Sync {
    fn name(&self) -> &'static str;
}

/// Reasoning capability - decides between a terminal answer and a tool request
#[async_trait::async_trait]
pub trait ReasoningCapability: Capability {
    async fn generate(
        &self,
        ctx: &OrchestrationContext,
        req: ReasoningRequest,
    ) -> Result<ReasoningResponse, ReasoningError>;
}

/// Tool capability - executes already-validated arguments
#[async_trait::async_trait]
pub trait ToolCapability: Send + Sync {
    async fn execute(
        &self,
        ctx: &OrchestrationContext,
        args: Value,
    ) -> Result<Value, ToolCapabilityError>;
}

/// Telemetry sink - receives every emitted event, best effort
#[async_trait::async_trait]
pub trait TelemetrySink: Capability {
    async fn record(&self, run_id: RunId, event: &Event);
}

/// Body of a custom agent
///
/// Runs inside the normal agent lifecycle (budget check, hooks, terminal
/// event). May read/write state, emit partial output or request loop exit
/// through the context.
#[async_trait::async_trait]
pub trait AgentBehavior: Send + Sync {
    async fn run(&self, ctx: &OrchestrationContext) -> Result<Value, AgentError>;
}

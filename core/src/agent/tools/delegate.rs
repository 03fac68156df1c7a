//! Agent delegation as a tool
//!
//! Wraps an agent so a reasoning agent can call it like any other tool. The
//! delegated agent runs on a forked scope (depth + 1, fresh step counter,
//! shared SessionState and cancellation) with the `request` argument as its
//! input. Its events land in the same stream as the caller's.

use serde_json::Value;
use std::sync::Arc;

use super::registry::ToolDescriptor;
use super::schema::{ArgumentSchema, ParamType};
use crate::agent::core::Agent;
use crate::agent::runtime::{
    capability::ToolCapability, context::OrchestrationContext, error::ToolCapabilityError,
};
use crate::agent::types::events::AgentOutcome;

pub struct AgentTool {
    agent: Arc<Agent>,
}

impl AgentTool {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Descriptor named after the agent, taking a single `request` argument
    pub fn descriptor(agent: Arc<Agent>) -> ToolDescriptor {
        let name = agent.name().to_string();
        let description = if agent.description().is_empty() {
            format!("Delegate a request to the '{}' agent", name)
        } else {
            agent.description().to_string()
        };

        ToolDescriptor::new(name, description, Arc::new(Self::new(agent))).with_schema(
            ArgumentSchema::new().with_param(
                "request",
                ParamType::Any,
                "Input handed to the delegated agent",
                true,
            ),
        )
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }
}

#[async_trait::async_trait]
impl ToolCapability for AgentTool {
    async fn execute(
        &self,
        ctx: &OrchestrationContext,
        args: Value,
    ) -> Result<Value, ToolCapabilityError> {
        let request = args.get("request").cloned().unwrap_or(Value::Null);
        let delegated = ctx.fork(request).without_loop_scope();
        tracing::debug!(
            "'{}' delegating to '{}' at depth {}",
            ctx.agent_name(),
            self.agent.name(),
            delegated.depth()
        );

        match self.agent.execute(delegated).await {
            AgentOutcome::Completed(output) => Ok(output),
            AgentOutcome::Cancelled(_) => Err(ToolCapabilityError::new(format!(
                "delegated agent '{}' was cancelled",
                self.agent.name()
            ))),
            AgentOutcome::Failed(error) => Err(ToolCapabilityError::new(format!(
                "delegated agent '{}' failed: {}",
                self.agent.name(),
                error
            ))),
        }
    }
}

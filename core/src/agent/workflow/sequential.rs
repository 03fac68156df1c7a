//! Sequential agent
//!
//! Children run strictly in declaration order on the parent's scope. Each
//! child receives the previous child's output as input and sees every state
//! write made before it started. The first failure stops the sequence.

use serde_json::Value;
use std::sync::Arc;

use crate::agent::core::Agent;
use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::types::events::AgentOutcome;
use crate::error::AgentError;

pub(crate) async fn run(parent: &str, children: &[Arc<Agent>], ctx: &OrchestrationContext) -> AgentOutcome {
    run_pass(parent, children, ctx, ctx.input().clone()).await
}

/// One ordered pass over `children`, shared with the loop agent.
///
/// Output is the last child's output. On cancellation the output is the last
/// output completed in this pass (`null` if none).
pub(crate) async fn run_pass(
    parent: &str,
    children: &[Arc<Agent>],
    ctx: &OrchestrationContext,
    input: Value,
) -> AgentOutcome {
    let mut next_input = input;
    let mut last = Value::Null;

    for child in children {
        if ctx.is_cancelled() {
            tracing::info!("'{}' cancelled before starting '{}'", parent, child.name());
            return AgentOutcome::Cancelled(last);
        }

        match child.execute(ctx.descend(next_input)).await {
            AgentOutcome::Completed(output) => {
                next_input = output.clone();
                last = output;
            }
            AgentOutcome::Cancelled(_) => return AgentOutcome::Cancelled(last),
            AgentOutcome::Failed(error) => {
                return AgentOutcome::Failed(AgentError::ChildFailed {
                    agent: parent.to_string(),
                    child: child.name().to_string(),
                    cause: Box::new(error),
                })
            }
        }
    }

    AgentOutcome::Completed(last)
}

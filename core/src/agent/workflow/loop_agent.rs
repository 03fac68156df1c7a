//! Loop agent
//!
//! Repeats sequential passes over its children. After each full pass it stops
//! if the exit signal was raised (by a child, a tool or a callback) or
//! `max_iterations` passes have run. Each pass after the first receives the
//! previous pass's output as input.

use serde_json::Value;
use std::sync::Arc;

use crate::agent::core::Agent;
use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::types::events::AgentOutcome;
use crate::agent::workflow::sequential::run_pass;

pub(crate) async fn run(
    parent: &str,
    children: &[Arc<Agent>],
    max_iterations: u32,
    ctx: &OrchestrationContext,
) -> AgentOutcome {
    let scoped = ctx.with_loop_scope();
    let mut input = ctx.input().clone();
    let mut last = Value::Null;

    for iteration in 1..=max_iterations {
        tracing::debug!("'{}' pass {}/{}", parent, iteration, max_iterations);

        match run_pass(parent, children, &scoped, input).await {
            AgentOutcome::Completed(output) => {
                input = output.clone();
                last = output;
            }
            AgentOutcome::Cancelled(partial) => {
                let output = if partial.is_null() { last } else { partial };
                return AgentOutcome::Cancelled(output);
            }
            failed @ AgentOutcome::Failed(_) => return failed,
        }

        if scoped.loop_exit_requested() {
            tracing::info!("'{}' exiting after pass {}", parent, iteration);
            break;
        }
    }

    AgentOutcome::Completed(last)
}

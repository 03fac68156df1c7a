//! Parallel agent
//!
//! Every child is spawned as its own task on a forked scope (shared state,
//! independent step counter, child cancellation token), so siblings really
//! run concurrently. The parent always waits for all of them; a failing
//! child never cancels its siblings.

use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::agent::core::Agent;
use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::types::events::{AgentOutcome, Event};
use crate::error::{AgentError, ChildFailure};

pub(crate) async fn run(parent: &str, children: &[Arc<Agent>], ctx: &OrchestrationContext) -> AgentOutcome {
    let (names, tasks): (Vec<String>, Vec<_>) = children
        .iter()
        .map(|child| {
            let task = tokio::spawn(child.execute(ctx.fork(ctx.input().clone())));
            (child.name().to_string(), task)
        })
        .unzip();
    tracing::debug!("'{}' started {} child task(s)", parent, tasks.len());

    let results = join_all(tasks).await;

    let mut completed = Map::new();
    let mut failures = Vec::new();
    let mut child_cancelled = false;

    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(AgentOutcome::Completed(output)) => {
                completed.insert(name, output);
            }
            Ok(AgentOutcome::Cancelled(_)) => child_cancelled = true,
            Ok(AgentOutcome::Failed(error)) => failures.push(ChildFailure { child: name, error }),
            Err(join_error) => {
                // The task died before emitting its terminal event
                let error = if join_error.is_panic() {
                    AgentError::Panicked { agent: name.clone() }
                } else {
                    AgentError::Custom {
                        agent: name.clone(),
                        message: join_error.to_string(),
                    }
                };
                ctx.emit(Event::AgentFailed {
                    agent_name: name.clone(),
                    error: error.clone(),
                });
                failures.push(ChildFailure { child: name, error });
            }
        }
    }

    // Results of children that finished after cancellation are discarded
    if ctx.is_cancelled() {
        return AgentOutcome::Cancelled(Value::Null);
    }
    if !failures.is_empty() {
        return AgentOutcome::Failed(AgentError::ParallelFailed {
            agent: parent.to_string(),
            failures,
            completed,
        });
    }
    if child_cancelled {
        return AgentOutcome::Cancelled(Value::Null);
    }
    AgentOutcome::Completed(Value::Object(completed))
}

//! Callback chains
//!
//! Ordered, short-circuiting hook pipelines at four points of an agent's
//! lifecycle:
//!
//! | Hook point | Payload | Abort value |
//! |------------|---------|-------------|
//! | `before_agent_run` | agent input | substitute output, body skipped |
//! | `after_agent_run` | agent output | replacement output |
//! | `before_reasoning` | reasoning request | substitute response, model skipped |
//! | `after_reasoning` | reasoning response | replacement response |
//!
//! Handlers run in registration order. `Continue` hands its (possibly
//! rewritten) payload to the next handler; `Abort` stops the chain. A handler
//! that returns an error or panics fails the enclosing agent with
//! `CallbackError`.

use serde_json::Value;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::runtime::error::CallbackFailure;
use crate::agent::types::conversation::{ReasoningRequest, ReasoningResponse};
use crate::error::AgentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    BeforeAgentRun,
    AfterAgentRun,
    BeforeReasoning,
    AfterReasoning,
}

impl HookPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforeAgentRun => "before_agent_run",
            HookPoint::AfterAgentRun => "after_agent_run",
            HookPoint::BeforeReasoning => "before_reasoning",
            HookPoint::AfterReasoning => "after_reasoning",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a handler decided
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackDecision<P, T> {
    /// Pass the payload on, possibly rewritten
    Continue(P),
    /// Stop here; `T` substitutes for the step about to run
    Abort(T),
}

/// What a handler can see and touch
pub struct CallbackContext<'a> {
    hook: HookPoint,
    ctx: &'a OrchestrationContext,
}

impl<'a> CallbackContext<'a> {
    pub fn hook(&self) -> HookPoint {
        self.hook
    }

    pub fn agent_name(&self) -> &str {
        self.ctx.agent_name()
    }

    pub fn get_state(&self, key: &str) -> Option<Value> {
        self.ctx.get_state(key)
    }

    /// Write SessionState (emits `StateChange`)
    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        self.ctx.set_state(key, value);
    }

    /// Raise the loop-exit signal of the enclosing loop
    pub fn request_loop_exit(&self) -> bool {
        self.ctx.request_loop_exit()
    }

    pub fn context(&self) -> &OrchestrationContext {
        self.ctx
    }
}

type Handler<P, T> =
    Arc<dyn Fn(&CallbackContext<'_>, P) -> Result<CallbackDecision<P, T>, CallbackFailure> + Send + Sync>;

struct Registration<P, T> {
    name: String,
    handler: Handler<P, T>,
}

impl<P, T> Clone for Registration<P, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: self.handler.clone(),
        }
    }
}

/// Handlers registered at one hook point
pub struct CallbackChain<P, T> {
    registrations: Vec<Registration<P, T>>,
}

impl<P, T> Clone for CallbackChain<P, T> {
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
        }
    }
}

impl<P, T> Default for CallbackChain<P, T> {
    fn default() -> Self {
        Self {
            registrations: Vec::new(),
        }
    }
}

impl<P, T> CallbackChain<P, T> {
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&CallbackContext<'_>, P) -> Result<CallbackDecision<P, T>, CallbackFailure>
            + Send
            + Sync
            + 'static,
    {
        self.registrations.push(Registration {
            name: name.into(),
            handler: Arc::new(handler),
        });
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.registrations.iter().map(|r| r.name.as_str()).collect()
    }

    /// Run every handler in order until one aborts
    pub fn evaluate(
        &self,
        hook: HookPoint,
        ctx: &OrchestrationContext,
        payload: P,
    ) -> Result<CallbackDecision<P, T>, AgentError> {
        let cb_ctx = CallbackContext { hook, ctx };
        let mut current = payload;

        for registration in &self.registrations {
            let handler = &registration.handler;
            let input = current;
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(&cb_ctx, input)));

            let reason = match outcome {
                Ok(Ok(CallbackDecision::Continue(next))) => {
                    current = next;
                    continue;
                }
                Ok(Ok(CallbackDecision::Abort(value))) => {
                    tracing::debug!(
                        "Callback '{}' aborted {} for '{}'",
                        registration.name,
                        hook,
                        ctx.agent_name()
                    );
                    return Ok(CallbackDecision::Abort(value));
                }
                Ok(Err(failure)) => failure.message,
                Err(panic) => format!("panicked: {}", panic_message(panic.as_ref())),
            };

            tracing::warn!(
                "Callback '{}' failed at {} for '{}': {}",
                registration.name,
                hook,
                ctx.agent_name(),
                reason
            );
            return Err(AgentError::CallbackError {
                agent: ctx.agent_name().to_string(),
                hook: hook.to_string(),
                callback: registration.name.clone(),
                reason,
            });
        }

        Ok(CallbackDecision::Continue(current))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// All callback registrations of one agent
#[derive(Clone, Default)]
pub struct Callbacks {
    pub before_agent: CallbackChain<Value, Value>,
    pub after_agent: CallbackChain<Value, Value>,
    pub before_reasoning: CallbackChain<ReasoningRequest, ReasoningResponse>,
    pub after_reasoning: CallbackChain<ReasoningResponse, ReasoningResponse>,
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("before_agent", &self.before_agent.names())
            .field("after_agent", &self.after_agent.names())
            .field("before_reasoning", &self.before_reasoning.names())
            .field("after_reasoning", &self.after_reasoning.names())
            .finish()
    }
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_agent_run<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&CallbackContext<'_>, Value) -> Result<CallbackDecision<Value, Value>, CallbackFailure>
            + Send
            + Sync
            + 'static,
    {
        self.before_agent.register(name, handler);
        self
    }

    pub fn on_after_agent_run<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&CallbackContext<'_>, Value) -> Result<CallbackDecision<Value, Value>, CallbackFailure>
            + Send
            + Sync
            + 'static,
    {
        self.after_agent.register(name, handler);
        self
    }

    pub fn on_before_reasoning<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(
                &CallbackContext<'_>,
                ReasoningRequest,
            ) -> Result<CallbackDecision<ReasoningRequest, ReasoningResponse>, CallbackFailure>
            + Send
            + Sync
            + 'static,
    {
        self.before_reasoning.register(name, handler);
        self
    }

    pub fn on_after_reasoning<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(
                &CallbackContext<'_>,
                ReasoningResponse,
            ) -> Result<CallbackDecision<ReasoningResponse, ReasoningResponse>, CallbackFailure>
            + Send
            + Sync
            + 'static,
    {
        self.after_reasoning.register(name, handler);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.before_agent.is_empty()
            && self.after_agent.is_empty()
            && self.before_reasoning.is_empty()
            && self.after_reasoning.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_continue_threads_payload_in_order() {
        let mut chain: CallbackChain<Value, Value> = CallbackChain::default();
        chain.register("append-a", |_cb, p: Value| {
            Ok(CallbackDecision::Continue(json!(format!("{}a", p.as_str().unwrap_or("")))))
        });
        chain.register("append-b", |_cb, p: Value| {
            Ok(CallbackDecision::Continue(json!(format!("{}b", p.as_str().unwrap_or("")))))
        });

        let (ctx, _rx) = OrchestrationContext::for_test();
        let decision = chain
            .evaluate(HookPoint::AfterAgentRun, &ctx, json!(">"))
            .unwrap();
        assert_eq!(decision, CallbackDecision::Continue(json!(">ab")));
    }

    #[test]
    fn test_abort_short_circuits() {
        let later = Arc::new(AtomicUsize::new(0));
        let seen = later.clone();

        let mut chain: CallbackChain<Value, Value> = CallbackChain::default();
        chain.register("stop", |_cb, _p| Ok(CallbackDecision::Abort(json!("x"))));
        chain.register("never", move |_cb, p| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(CallbackDecision::Continue(p))
        });

        let (ctx, _rx) = OrchestrationContext::for_test();
        let decision = chain
            .evaluate(HookPoint::BeforeAgentRun, &ctx, Value::Null)
            .unwrap();
        assert_eq!(decision, CallbackDecision::Abort(json!("x")));
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_and_panic_become_callback_errors() {
        let (ctx, _rx) = OrchestrationContext::for_test();
        let ctx = ctx.for_agent("guarded");

        let mut failing: CallbackChain<Value, Value> = CallbackChain::default();
        failing.register("policy", |_cb, _p| Err(CallbackFailure::new("denied")));
        let err = failing
            .evaluate(HookPoint::BeforeAgentRun, &ctx, Value::Null)
            .unwrap_err();
        assert_eq!(
            err,
            AgentError::CallbackError {
                agent: "guarded".to_string(),
                hook: "before_agent_run".to_string(),
                callback: "policy".to_string(),
                reason: "denied".to_string(),
            }
        );

        let mut panicking: CallbackChain<Value, Value> = CallbackChain::default();
        panicking.register("boom", |_cb, _p| panic!("kaboom"));
        let err = panicking
            .evaluate(HookPoint::AfterAgentRun, &ctx, Value::Null)
            .unwrap_err();
        match err {
            AgentError::CallbackError { callback, reason, .. } => {
                assert_eq!(callback, "boom");
                assert!(reason.contains("kaboom"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handlers_can_write_state() {
        let (ctx, mut rx) = OrchestrationContext::for_test();
        let callbacks = Callbacks::new().on_before_agent_run("mark", |cb, input| {
            cb.set_state("seen_hook", json!(cb.hook().as_str()));
            Ok(CallbackDecision::Continue(input))
        });

        callbacks
            .before_agent
            .evaluate(HookPoint::BeforeAgentRun, &ctx, Value::Null)
            .unwrap();
        assert_eq!(ctx.get_state("seen_hook"), Some(json!("before_agent_run")));
        assert_eq!(rx.recv().await.map(|e| e.kind()), Some("state_change"));
    }
}

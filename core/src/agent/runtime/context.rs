//! Orchestration context
//!
//! Passed to every agent, callback and capability call of a run. Carries the
//! shared SessionState, the cancellation token, the budget and the event sink.
//!
//! Derived contexts:
//! - [`OrchestrationContext::descend`] for sequential/loop children: same
//!   cancellation token, fresh step scope, depth + 1.
//! - [`OrchestrationContext::fork`] for parallel children and delegated
//!   agents: child cancellation token, fresh step scope, depth + 1.

use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::agent::runtime::sink::EventSink;
use crate::agent::session::SessionState;
use crate::agent::types::events::Event;
use crate::agent::types::ids::RunId;
use crate::config::Budget;
use crate::error::AgentError;

/// Per-agent view of a run
#[derive(Clone)]
pub struct OrchestrationContext {
    run_id: RunId,
    agent_name: Arc<str>,
    state: SessionState,
    cancellation: CancellationToken,
    budget: Budget,
    depth: u32,
    steps: Arc<AtomicU32>,
    loop_exit: Option<Arc<AtomicBool>>,
    input: Value,
    sink: EventSink,
}

impl std::fmt::Debug for OrchestrationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestrationContext")
            .field("run_id", &self.run_id)
            .field("agent_name", &self.agent_name)
            .field("depth", &self.depth)
            .field("steps", &self.steps.load(Ordering::Relaxed))
            .field("in_loop", &self.loop_exit.is_some())
            .field("cancelled", &self.cancellation.is_cancelled())
            .finish()
    }
}

impl OrchestrationContext {
    /// Root context of a run
    pub(crate) fn root(
        run_id: RunId,
        state: SessionState,
        cancellation: CancellationToken,
        budget: Budget,
        input: Value,
        sink: EventSink,
    ) -> Self {
        Self {
            run_id,
            agent_name: Arc::from(""),
            state,
            cancellation,
            budget,
            depth: 0,
            steps: Arc::new(AtomicU32::new(0)),
            loop_exit: None,
            input,
            sink,
        }
    }

    // =========================================================================
    // Public surface for agents, callbacks and capabilities
    // =========================================================================

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Agent currently executing with this context
    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    /// Input handed to the current agent (previous sibling output, request, ...)
    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Steps consumed in the current step scope
    pub fn steps_taken(&self) -> u32 {
        self.steps.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn get_state(&self, key: &str) -> Option<Value> {
        self.state.get(key)
    }

    pub fn state_snapshot(&self) -> Map<String, Value> {
        self.state.snapshot()
    }

    /// Write a SessionState key and emit `StateChange`
    pub fn set_state(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.state.insert(key.clone(), value.clone());
        self.emit(Event::StateChange {
            agent_name: self.agent_name.to_string(),
            key,
            value,
        });
    }

    /// Emit `PartialOutput` for the current agent
    pub fn emit_partial(&self, text: impl Into<String>) {
        self.emit(Event::PartialOutput {
            agent_name: self.agent_name.to_string(),
            text: text.into(),
        });
    }

    /// Signal the innermost enclosing loop to stop after its current pass.
    /// Returns false when no loop encloses this agent.
    pub fn request_loop_exit(&self) -> bool {
        match self.loop_exit {
            Some(ref flag) => {
                tracing::debug!("Agent '{}' requested loop exit", self.agent_name);
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => {
                tracing::debug!(
                    "Agent '{}' requested loop exit outside any loop; ignored",
                    self.agent_name
                );
                false
            }
        }
    }

    pub fn loop_exit_requested(&self) -> bool {
        self.loop_exit
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    // =========================================================================
    // Derivation, used by the engine
    // =========================================================================

    /// Same scope, now executing `name`
    pub(crate) fn for_agent(&self, name: &str) -> Self {
        let mut ctx = self.clone();
        ctx.agent_name = Arc::from(name);
        ctx
    }

    /// Same scope with a different input
    pub(crate) fn with_input(&self, input: Value) -> Self {
        let mut ctx = self.clone();
        ctx.input = input;
        ctx
    }

    /// Child of a sequential/loop composite. Ordering and cancellation stay
    /// with the parent; the step counter starts over.
    pub(crate) fn descend(&self, input: Value) -> Self {
        let mut ctx = self.clone();
        ctx.depth = self.depth + 1;
        ctx.steps = Arc::new(AtomicU32::new(0));
        ctx.input = input;
        ctx
    }

    /// Child of a parallel composite or a delegated agent
    pub(crate) fn fork(&self, input: Value) -> Self {
        let mut ctx = self.clone();
        ctx.depth = self.depth + 1;
        ctx.steps = Arc::new(AtomicU32::new(0));
        ctx.cancellation = self.cancellation.child_token();
        ctx.input = input;
        ctx
    }

    /// Fresh exit flag for the children of a loop agent
    pub(crate) fn with_loop_scope(&self) -> Self {
        let mut ctx = self.clone();
        ctx.loop_exit = Some(Arc::new(AtomicBool::new(false)));
        ctx
    }

    /// Detach from any enclosing loop
    pub(crate) fn without_loop_scope(&self) -> Self {
        let mut ctx = self.clone();
        ctx.loop_exit = None;
        ctx
    }

    /// Budget gate run before an agent body starts
    pub(crate) fn enter(&self) -> Result<(), AgentError> {
        if self.depth >= self.budget.max_depth {
            return Err(AgentError::BudgetExceeded {
                agent: self.agent_name.to_string(),
                reason: format!(
                    "depth {} reached max_depth {}",
                    self.depth, self.budget.max_depth
                ),
            });
        }
        self.take_step()
    }

    /// Consume one step of the current scope
    pub(crate) fn take_step(&self) -> Result<(), AgentError> {
        let taken = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        if taken > self.budget.max_steps {
            return Err(AgentError::BudgetExceeded {
                agent: self.agent_name.to_string(),
                reason: format!("step {} exceeds max_steps {}", taken, self.budget.max_steps),
            });
        }
        Ok(())
    }

    pub(crate) fn emit(&self, event: Event) {
        self.sink.emit(event);
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> (Self, tokio::sync::mpsc::UnboundedReceiver<Event>) {
        Self::for_test_with(Budget::default())
    }

    #[cfg(test)]
    pub(crate) fn for_test_with(
        budget: Budget,
    ) -> (Self, tokio::sync::mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let ctx = Self::root(
            RunId::generate(),
            SessionState::new(),
            CancellationToken::new(),
            budget,
            Value::Null,
            EventSink::new(tx),
        );
        (ctx, rx)
    }
}

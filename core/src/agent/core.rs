//! Agent
//!
//! One closed set of agent variants sharing a single execution contract:
//! every execution emits its events and ends with exactly one
//! `AgentCompleted` or `AgentFailed` for that agent.
//!
//! Lifecycle of every variant:
//! 1. budget gate (depth, steps) -> `BudgetExceeded` without running
//! 2. `before_agent_run` hooks; an abort completes with the substitute output
//! 3. cancellation check
//! 4. the variant's body
//! 5. `after_agent_run` hooks, on success only
//! 6. terminal event

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::Instrument;

use crate::agent::callbacks::{CallbackDecision, Callbacks, HookPoint};
use crate::agent::reasoning::{ReasoningAgent, ReasoningAgentBuilder};
use crate::agent::runtime::capability::AgentBehavior;
use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::types::events::AgentOutcome;
use crate::agent::workflow::{loop_agent, parallel, sequential};
use crate::error::{AgentError, ConfigurationError};

/// What an agent does when run
pub enum AgentKind {
    /// Leaf: reasoning/tool loop
    Reasoning(ReasoningAgent),
    /// Children in order on the same scope
    Sequential(Vec<Arc<Agent>>),
    /// Children concurrently on forked scopes
    Parallel(Vec<Arc<Agent>>),
    /// Sequential passes until exit signal or `max_iterations`
    Loop {
        children: Vec<Arc<Agent>>,
        max_iterations: u32,
    },
    /// Injected behavior
    Custom(Arc<dyn AgentBehavior>),
}

pub struct Agent {
    name: String,
    description: String,
    callbacks: Callbacks,
    kind: AgentKind,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("kind", &self.kind_name())
            .field(
                "children",
                &self.children().iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("callbacks", &self.callbacks)
            .finish()
    }
}

impl Agent {
    // =========================================================================
    // Construction
    // =========================================================================

    /// Start building a reasoning (leaf) agent
    pub fn reasoning(name: impl Into<String>) -> ReasoningAgentBuilder {
        ReasoningAgentBuilder::new(name)
    }

    pub fn sequential(
        name: impl Into<String>,
        children: Vec<Arc<Agent>>,
    ) -> Result<Agent, ConfigurationError> {
        let name = name.into();
        validate_composite(&name, &children)?;
        Ok(Self::from_parts(
            name,
            String::new(),
            Callbacks::default(),
            AgentKind::Sequential(children),
        ))
    }

    pub fn parallel(
        name: impl Into<String>,
        children: Vec<Arc<Agent>>,
    ) -> Result<Agent, ConfigurationError> {
        let name = name.into();
        validate_composite(&name, &children)?;
        Ok(Self::from_parts(
            name,
            String::new(),
            Callbacks::default(),
            AgentKind::Parallel(children),
        ))
    }

    pub fn loop_agent(
        name: impl Into<String>,
        children: Vec<Arc<Agent>>,
        max_iterations: u32,
    ) -> Result<Agent, ConfigurationError> {
        let name = name.into();
        validate_composite(&name, &children)?;
        if max_iterations < 1 {
            return Err(ConfigurationError::InvalidMaxIterations {
                agent: name,
                value: max_iterations,
            });
        }
        Ok(Self::from_parts(
            name,
            String::new(),
            Callbacks::default(),
            AgentKind::Loop {
                children,
                max_iterations,
            },
        ))
    }

    pub fn custom(
        name: impl Into<String>,
        behavior: Arc<dyn AgentBehavior>,
    ) -> Result<Agent, ConfigurationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        Ok(Self::from_parts(
            name,
            String::new(),
            Callbacks::default(),
            AgentKind::Custom(behavior),
        ))
    }

    pub(crate) fn from_parts(
        name: String,
        description: String,
        callbacks: Callbacks,
        kind: AgentKind,
    ) -> Self {
        Self {
            name,
            description,
            callbacks,
            kind,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> &AgentKind {
        &self.kind
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            AgentKind::Reasoning(_) => "reasoning",
            AgentKind::Sequential(_) => "sequential",
            AgentKind::Parallel(_) => "parallel",
            AgentKind::Loop { .. } => "loop",
            AgentKind::Custom(_) => "custom",
        }
    }

    /// Direct children, empty for leaves
    pub fn children(&self) -> &[Arc<Agent>] {
        match self.kind {
            AgentKind::Sequential(ref children)
            | AgentKind::Parallel(ref children)
            | AgentKind::Loop { ref children, .. } => children,
            AgentKind::Reasoning(_) | AgentKind::Custom(_) => &[],
        }
    }

    /// Every agent name in this subtree, depth first
    pub fn subtree_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        for child in self.children() {
            names.extend(child.subtree_names());
        }
        names
    }

    /// Path from this agent down to the first descendant named `target`
    fn path_to(&self, target: &str) -> Option<Vec<String>> {
        for child in self.children() {
            if child.name == target {
                return Some(vec![self.name.clone(), child.name.clone()]);
            }
            if let Some(mut path) = child.path_to(target) {
                path.insert(0, self.name.clone());
                return Some(path);
            }
        }
        None
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run this agent on `ctx`. Events go to the context's sink; the
    /// returned outcome mirrors the terminal event.
    pub fn execute(self: &Arc<Self>, ctx: OrchestrationContext) -> BoxFuture<'static, AgentOutcome> {
        let agent = Arc::clone(self);
        let span = tracing::info_span!(
            "agent",
            name = %agent.name,
            kind = agent.kind_name(),
            depth = ctx.depth()
        );

        async move {
            let ctx = ctx.for_agent(&agent.name);
            let outcome = agent.lifecycle(&ctx).await;
            match outcome {
                AgentOutcome::Completed(_) => tracing::debug!("completed"),
                AgentOutcome::Cancelled(_) => tracing::info!("cancelled"),
                AgentOutcome::Failed(ref e) => tracing::warn!(kind = e.kind(), "failed: {}", e),
            }
            ctx.emit(outcome.to_event(&agent.name));
            outcome
        }
        .instrument(span)
        .boxed()
    }

    async fn lifecycle(&self, ctx: &OrchestrationContext) -> AgentOutcome {
        if let Err(e) = ctx.enter() {
            return AgentOutcome::Failed(e);
        }

        let ctx = match self
            .callbacks
            .before_agent
            .evaluate(HookPoint::BeforeAgentRun, ctx, ctx.input().clone())
        {
            Ok(CallbackDecision::Continue(input)) => ctx.with_input(input),
            Ok(CallbackDecision::Abort(substitute)) => return AgentOutcome::Completed(substitute),
            Err(e) => return AgentOutcome::Failed(e),
        };

        if ctx.is_cancelled() {
            return AgentOutcome::Cancelled(Value::Null);
        }

        match self.run_body(&ctx).await {
            AgentOutcome::Completed(output) => match self.callbacks.after_agent.evaluate(
                HookPoint::AfterAgentRun,
                &ctx,
                output,
            ) {
                Ok(CallbackDecision::Continue(output)) | Ok(CallbackDecision::Abort(output)) => {
                    AgentOutcome::Completed(output)
                }
                Err(e) => AgentOutcome::Failed(e),
            },
            other => other,
        }
    }

    async fn run_body(&self, ctx: &OrchestrationContext) -> AgentOutcome {
        match self.kind {
            AgentKind::Reasoning(ref leaf) => leaf.run(ctx, &self.callbacks).await,
            AgentKind::Sequential(ref children) => sequential::run(&self.name, children, ctx).await,
            AgentKind::Parallel(ref children) => parallel::run(&self.name, children, ctx).await,
            AgentKind::Loop {
                ref children,
                max_iterations,
            } => loop_agent::run(&self.name, children, max_iterations, ctx).await,
            AgentKind::Custom(ref behavior) => {
                match AssertUnwindSafe(behavior.run(ctx)).catch_unwind().await {
                    Ok(Ok(output)) => AgentOutcome::Completed(output),
                    Ok(Err(e)) => AgentOutcome::Failed(e),
                    Err(_) => AgentOutcome::Failed(AgentError::Panicked {
                        agent: self.name.clone(),
                    }),
                }
            }
        }
    }
}

/// Name rules shared by every composite constructor
fn validate_composite(name: &str, children: &[Arc<Agent>]) -> Result<(), ConfigurationError> {
    if name.trim().is_empty() {
        return Err(ConfigurationError::EmptyName);
    }

    // An agent nested under itself, by name, is a cycle
    for child in children {
        if child.name == name {
            return Err(ConfigurationError::CyclicGraph {
                path: vec![name.to_string(), name.to_string()],
            });
        }
        if let Some(mut path) = child.path_to(name) {
            path.insert(0, name.to_string());
            return Err(ConfigurationError::CyclicGraph { path });
        }
    }

    let mut seen = HashSet::new();
    for child in children {
        for descendant in child.subtree_names() {
            if !seen.insert(descendant) {
                return Err(ConfigurationError::DuplicateAgent {
                    name: descendant.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::events::Event;
    use serde_json::json;

    struct Constant(Value);

    #[async_trait::async_trait]
    impl AgentBehavior for Constant {
        async fn run(&self, _ctx: &OrchestrationContext) -> Result<Value, AgentError> {
            Ok(self.0.clone())
        }
    }

    fn constant(name: &str, value: Value) -> Arc<Agent> {
        Arc::new(Agent::custom(name, Arc::new(Constant(value))).unwrap())
    }

    #[test]
    fn test_composite_validation() {
        let a = constant("a", json!(1));
        let b = constant("b", json!(2));

        assert!(Agent::sequential("seq", vec![a.clone(), b.clone()]).is_ok());
        assert!(matches!(
            Agent::sequential("", vec![a.clone()]),
            Err(ConfigurationError::EmptyName)
        ));
        assert_eq!(
            Agent::parallel("par", vec![a.clone(), a.clone()]).unwrap_err(),
            ConfigurationError::DuplicateAgent {
                name: "a".to_string()
            }
        );
        assert!(matches!(
            Agent::loop_agent("loop", vec![a.clone()], 0),
            Err(ConfigurationError::InvalidMaxIterations { value: 0, .. })
        ));

        let inner = Arc::new(Agent::sequential("outer", vec![b.clone()]).unwrap());
        let mid = Arc::new(Agent::sequential("mid", vec![inner]).unwrap());
        assert_eq!(
            Agent::sequential("outer", vec![mid]).unwrap_err(),
            ConfigurationError::CyclicGraph {
                path: vec!["outer".to_string(), "mid".to_string(), "outer".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_before_agent_abort_skips_body() {
        struct Unreachable;

        #[async_trait::async_trait]
        impl AgentBehavior for Unreachable {
            async fn run(&self, _ctx: &OrchestrationContext) -> Result<Value, AgentError> {
                panic!("body must not run");
            }
        }

        let agent = Arc::new(
            Agent::custom("n", Arc::new(Unreachable))
                .unwrap()
                .with_callbacks(Callbacks::new().on_before_agent_run("short", |_cb, _input| {
                    Ok(CallbackDecision::Abort(json!("x")))
                })),
        );

        let (ctx, mut rx) = OrchestrationContext::for_test();
        assert_eq!(agent.execute(ctx).await, AgentOutcome::Completed(json!("x")));

        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            Event::AgentCompleted { agent_name, final_output, .. }
                if agent_name == "n" && final_output == &json!("x")
        ));
    }

    #[tokio::test]
    async fn test_after_agent_replaces_output_and_input_rewrite() {
        struct EchoInput;

        #[async_trait::async_trait]
        impl AgentBehavior for EchoInput {
            async fn run(&self, ctx: &OrchestrationContext) -> Result<Value, AgentError> {
                Ok(ctx.input().clone())
            }
        }

        let callbacks = Callbacks::new()
            .on_before_agent_run("rewrite-input", |_cb, _input| {
                Ok(CallbackDecision::Continue(json!("rewritten")))
            })
            .on_after_agent_run("wrap", |_cb, output| {
                Ok(CallbackDecision::Continue(json!({ "wrapped": output })))
            });
        let agent = Arc::new(
            Agent::custom("echo", Arc::new(EchoInput))
                .unwrap()
                .with_callbacks(callbacks),
        );

        let (ctx, _rx) = OrchestrationContext::for_test();
        assert_eq!(
            agent.execute(ctx).await,
            AgentOutcome::Completed(json!({"wrapped": "rewritten"}))
        );
    }

    #[tokio::test]
    async fn test_custom_failures_and_panics() {
        struct Failing;
        struct Panicking;

        #[async_trait::async_trait]
        impl AgentBehavior for Failing {
            async fn run(&self, ctx: &OrchestrationContext) -> Result<Value, AgentError> {
                Err(AgentError::Custom {
                    agent: ctx.agent_name().to_string(),
                    message: "nope".to_string(),
                })
            }
        }

        #[async_trait::async_trait]
        impl AgentBehavior for Panicking {
            async fn run(&self, _ctx: &OrchestrationContext) -> Result<Value, AgentError> {
                panic!("custom body exploded");
            }
        }

        let (ctx, _rx) = OrchestrationContext::for_test();
        let failing = Arc::new(Agent::custom("f", Arc::new(Failing)).unwrap());
        assert!(matches!(
            failing.execute(ctx.clone()).await,
            AgentOutcome::Failed(AgentError::Custom { .. })
        ));

        let panicking = Arc::new(Agent::custom("p", Arc::new(Panicking)).unwrap());
        assert_eq!(
            panicking.execute(ctx).await,
            AgentOutcome::Failed(AgentError::Panicked {
                agent: "p".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_body() {
        let agent = constant("c", json!(1));
        let (ctx, _rx) = OrchestrationContext::for_test();
        ctx.cancellation_token().cancel();
        assert_eq!(agent.execute(ctx).await, AgentOutcome::Cancelled(Value::Null));
    }
}

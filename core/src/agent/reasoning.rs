//! Reasoning (leaf) agent
//!
//! Bounded loop around the reasoning capability:
//!
//! ```text
//! AwaitingModel --answer--> Terminal
//!       |  ^
//!  tool |  | result
//!       v  |
//! AwaitingTool
//! ```
//!
//! Each model call is one turn. A tool request on the last allowed turn fails
//! the agent with `ToolLoopExceeded` instead of dispatching. Tool-layer errors
//! fail the agent; they are not relayed back to the model.

use futures::FutureExt;
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::agent::callbacks::{CallbackDecision, Callbacks, HookPoint};
use crate::agent::core::{Agent, AgentKind};
use crate::agent::runtime::capability::ReasoningCapability;
use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::tools::registry::{ToolDescriptor, ToolRegistry};
use crate::agent::types::conversation::{ConversationEntry, ReasoningRequest, ReasoningResponse};
use crate::agent::types::events::{AgentOutcome, ToolOutcome};
use crate::error::{AgentError, ConfigurationError};

/// Where a leaf agent is in its reasoning loop
#[derive(Debug)]
enum TurnState {
    AwaitingModel,
    AwaitingTool { tool_name: String, args: Value },
    Terminal(String),
}

pub struct ReasoningAgent {
    instruction: String,
    reasoning: Arc<dyn ReasoningCapability>,
    tools: ToolRegistry,
    max_turns: Option<u32>,
    output_key: Option<String>,
}

impl std::fmt::Debug for ReasoningAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningAgent")
            .field("reasoning", &self.reasoning.name())
            .field("tools", &self.tools.names())
            .field("max_turns", &self.max_turns)
            .field("output_key", &self.output_key)
            .finish()
    }
}

impl ReasoningAgent {
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_turns(&self) -> Option<u32> {
        self.max_turns
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }

    /// Run the reasoning loop; lifecycle hooks and the terminal event are the
    /// caller's business.
    pub(crate) async fn run(&self, ctx: &OrchestrationContext, callbacks: &Callbacks) -> AgentOutcome {
        let max_turns = self.max_turns.unwrap_or(ctx.budget().max_turns);
        let mut conversation = Vec::new();
        if !ctx.input().is_null() {
            conversation.push(ConversationEntry::Input {
                content: ctx.input().clone(),
            });
        }

        let mut turn = 0u32;
        let mut state = TurnState::AwaitingModel;
        loop {
            state = match state {
                TurnState::AwaitingModel => {
                    if ctx.is_cancelled() {
                        return AgentOutcome::Cancelled(Value::Null);
                    }
                    if let Err(e) = ctx.take_step() {
                        return AgentOutcome::Failed(e);
                    }

                    let response = match self.reason(ctx, callbacks, &conversation, turn).await {
                        Ok(response) => response,
                        Err(e) => return AgentOutcome::Failed(e),
                    };
                    turn += 1;

                    match response {
                        ReasoningResponse::Answer { text } => TurnState::Terminal(text),
                        ReasoningResponse::ToolRequest {
                            tool_name,
                            args,
                            thought,
                        } => {
                            if turn >= max_turns {
                                tracing::warn!(
                                    "'{}' still requesting tools after {} turn(s)",
                                    ctx.agent_name(),
                                    turn
                                );
                                return AgentOutcome::Failed(AgentError::ToolLoopExceeded {
                                    agent: ctx.agent_name().to_string(),
                                    max_turns,
                                });
                            }
                            if let Some(text) = thought {
                                ctx.emit_partial(text.clone());
                                conversation.push(ConversationEntry::Thought { text });
                            }
                            conversation.push(ConversationEntry::ToolRequest {
                                tool_name: tool_name.clone(),
                                args: args.clone(),
                            });
                            TurnState::AwaitingTool { tool_name, args }
                        }
                    }
                }

                TurnState::AwaitingTool { tool_name, args } => {
                    if ctx.is_cancelled() {
                        return AgentOutcome::Cancelled(Value::Null);
                    }
                    match self.tools.invoke(ctx, &tool_name, args).await {
                        Ok(value) => {
                            conversation.push(ConversationEntry::ToolResponse {
                                tool_name,
                                result: ToolOutcome::Ok(value),
                            });
                            TurnState::AwaitingModel
                        }
                        Err(e) => return AgentOutcome::Failed(e),
                    }
                }

                TurnState::Terminal(text) => {
                    ctx.emit_partial(text.clone());
                    if let Some(ref key) = self.output_key {
                        ctx.set_state(key.clone(), Value::String(text.clone()));
                    }
                    return AgentOutcome::Completed(Value::String(text));
                }
            };
        }
    }

    /// One model call wrapped in the reasoning hooks
    async fn reason(
        &self,
        ctx: &OrchestrationContext,
        callbacks: &Callbacks,
        conversation: &[ConversationEntry],
        turn: u32,
    ) -> Result<ReasoningResponse, AgentError> {
        let request = ReasoningRequest {
            agent_name: ctx.agent_name().to_string(),
            instruction: self.instruction.clone(),
            conversation: conversation.to_vec(),
            tools: self.tools.specs(),
            state: ctx.state_snapshot(),
            turn,
        };

        let request = match callbacks
            .before_reasoning
            .evaluate(HookPoint::BeforeReasoning, ctx, request)?
        {
            CallbackDecision::Continue(request) => request,
            // Substitute response: no model call, no after_reasoning hooks
            CallbackDecision::Abort(response) => return Ok(response),
        };

        let response = match AssertUnwindSafe(self.reasoning.generate(ctx, request))
            .catch_unwind()
            .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(AgentError::ReasoningUnavailable {
                    agent: ctx.agent_name().to_string(),
                    reason: e.message,
                })
            }
            Err(_) => {
                tracing::error!("Reasoning capability panicked for '{}'", ctx.agent_name());
                return Err(AgentError::Panicked {
                    agent: ctx.agent_name().to_string(),
                });
            }
        };

        match callbacks
            .after_reasoning
            .evaluate(HookPoint::AfterReasoning, ctx, response)?
        {
            CallbackDecision::Continue(response) | CallbackDecision::Abort(response) => Ok(response),
        }
    }
}

/// Builder for reasoning agents
pub struct ReasoningAgentBuilder {
    name: String,
    description: String,
    instruction: String,
    reasoning: Option<Arc<dyn ReasoningCapability>>,
    tools: Vec<ToolDescriptor>,
    max_turns: Option<u32>,
    output_key: Option<String>,
    callbacks: Callbacks,
}

impl ReasoningAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            reasoning: None,
            tools: Vec::new(),
            max_turns: None,
            output_key: None,
            callbacks: Callbacks::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: Arc<dyn ReasoningCapability>) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDescriptor>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Per-agent turn cap; defaults to the engine budget's `max_turns`
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    /// Write the final answer to this SessionState key
    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    pub fn build(self) -> Result<Agent, ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        let reasoning = self
            .reasoning
            .ok_or_else(|| ConfigurationError::MissingReasoning {
                agent: self.name.clone(),
            })?;
        if self.max_turns == Some(0) {
            return Err(ConfigurationError::InvalidBudget {
                reason: format!("agent '{}' needs max_turns >= 1", self.name),
            });
        }
        let tools = ToolRegistry::for_agent(&self.name, self.tools)?;

        let leaf = ReasoningAgent {
            instruction: self.instruction,
            reasoning,
            tools,
            max_turns: self.max_turns,
            output_key: self.output_key,
        };
        Ok(Agent::from_parts(
            self.name,
            self.description,
            self.callbacks,
            AgentKind::Reasoning(leaf),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::impls::ScriptedReasoning;
    use crate::agent::tools::builtin::echo_tool;
    use crate::agent::types::events::Event;
    use serde_json::json;

    fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_tool_round_trip_then_answer() {
        let reasoning = Arc::new(ScriptedReasoning::new().script(
            "writer",
            vec![
                ReasoningResponse::ToolRequest {
                    tool_name: "echo".to_string(),
                    args: json!({"message": "draft"}),
                    thought: Some("checking".to_string()),
                },
                ReasoningResponse::answer("final"),
            ],
        ));
        let agent = Arc::new(
            Agent::reasoning("writer")
                .with_reasoning(reasoning.clone())
                .with_tool(echo_tool())
                .with_output_key("article")
                .build()
                .unwrap(),
        );

        let (ctx, mut rx) = OrchestrationContext::for_test();
        let outcome = agent.execute(ctx.clone()).await;
        assert_eq!(outcome, AgentOutcome::Completed(json!("final")));
        assert_eq!(ctx.get_state("article"), Some(json!("final")));

        let kinds: Vec<_> = drain(&mut rx).iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                "partial_output",
                "tool_call",
                "tool_result",
                "partial_output",
                "state_change",
                "agent_completed"
            ]
        );

        // Second request carries the tool exchange
        let requests = reasoning.requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(
            requests[1].conversation.last(),
            Some(ConversationEntry::ToolResponse { .. })
        ));
        assert_eq!(requests[0].tools[0].name, "echo");
    }

    #[tokio::test]
    async fn test_turn_cap() {
        let reasoning = Arc::new(
            ScriptedReasoning::new()
                .script("spinner", vec![ReasoningResponse::tool("echo", json!({"message": "again"}))]),
        );
        let agent = Arc::new(
            Agent::reasoning("spinner")
                .with_reasoning(reasoning.clone())
                .with_tool(echo_tool())
                .with_max_turns(3)
                .build()
                .unwrap(),
        );

        let (ctx, _rx) = OrchestrationContext::for_test();
        let outcome = agent.execute(ctx).await;
        assert_eq!(
            outcome,
            AgentOutcome::Failed(AgentError::ToolLoopExceeded {
                agent: "spinner".to_string(),
                max_turns: 3
            })
        );
        assert_eq!(reasoning.calls("spinner"), 3);
    }

    #[tokio::test]
    async fn test_reasoning_failure_and_undeclared_tool() {
        let reasoning = Arc::new(
            ScriptedReasoning::new()
                .fail("down", "503")
                .script("rogue", vec![ReasoningResponse::tool("shell", json!({}))]),
        );
        let down = Arc::new(
            Agent::reasoning("down")
                .with_reasoning(reasoning.clone())
                .build()
                .unwrap(),
        );
        let rogue = Arc::new(
            Agent::reasoning("rogue")
                .with_reasoning(reasoning)
                .build()
                .unwrap(),
        );

        let (ctx, _rx) = OrchestrationContext::for_test();
        assert!(matches!(
            down.execute(ctx.clone()).await,
            AgentOutcome::Failed(AgentError::ReasoningUnavailable { ref reason, .. }) if reason == "503"
        ));
        assert!(matches!(
            rogue.execute(ctx).await,
            AgentOutcome::Failed(AgentError::UnknownTool { ref tool, .. }) if tool == "shell"
        ));
    }

    #[tokio::test]
    async fn test_before_reasoning_abort_skips_model() {
        let reasoning = Arc::new(ScriptedReasoning::new());
        let callbacks = Callbacks::new()
            .on_before_reasoning("cache", |_cb, _req| {
                Ok(CallbackDecision::Abort(ReasoningResponse::answer("cached")))
            })
            .on_after_reasoning("never", |_cb, _resp| {
                Ok(CallbackDecision::Continue(ReasoningResponse::answer("rewritten")))
            });
        let agent = Arc::new(
            Agent::reasoning("cached")
                .with_reasoning(reasoning.clone())
                .with_callbacks(callbacks)
                .build()
                .unwrap(),
        );

        let (ctx, _rx) = OrchestrationContext::for_test();
        assert_eq!(
            agent.execute(ctx).await,
            AgentOutcome::Completed(json!("cached"))
        );
        assert_eq!(reasoning.calls("cached"), 0);
    }

    #[tokio::test]
    async fn test_after_reasoning_rewrites_response() {
        let reasoning = Arc::new(ScriptedReasoning::new().script("a", vec![ReasoningResponse::answer("raw")]));
        let callbacks = Callbacks::new().on_after_reasoning("redact", |_cb, resp| match resp {
            ReasoningResponse::Answer { text } => Ok(CallbackDecision::Continue(
                ReasoningResponse::answer(text.replace("raw", "clean")),
            )),
            other => Ok(CallbackDecision::Continue(other)),
        });
        let agent = Arc::new(
            Agent::reasoning("a")
                .with_reasoning(reasoning)
                .with_callbacks(callbacks)
                .build()
                .unwrap(),
        );

        let (ctx, _rx) = OrchestrationContext::for_test();
        assert_eq!(agent.execute(ctx).await, AgentOutcome::Completed(json!("clean")));
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(
            Agent::reasoning("x").build(),
            Err(ConfigurationError::MissingReasoning { .. })
        ));

        let reasoning: Arc<dyn ReasoningCapability> = Arc::new(ScriptedReasoning::new());
        assert!(matches!(
            Agent::reasoning(" ").with_reasoning(reasoning.clone()).build(),
            Err(ConfigurationError::EmptyName)
        ));
        assert!(matches!(
            Agent::reasoning("x")
                .with_reasoning(reasoning.clone())
                .with_max_turns(0)
                .build(),
            Err(ConfigurationError::InvalidBudget { .. })
        ));
        assert!(matches!(
            Agent::reasoning("x")
                .with_reasoning(reasoning)
                .with_tool(echo_tool())
                .with_tool(echo_tool())
                .build(),
            Err(ConfigurationError::DuplicateTool { .. })
        ));
    }
}

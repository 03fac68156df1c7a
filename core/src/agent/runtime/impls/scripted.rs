//! Scripted reasoning
//!
//! Replays a fixed list of responses per agent name. Drives tests and the
//! CLI's dry-run execution without any model access. Once a script is down
//! to its last entry, that entry repeats.

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::agent::runtime::{
    capability::{Capability, ReasoningCapability},
    context::OrchestrationContext,
    error::ReasoningError,
};
use crate::agent::types::conversation::{ReasoningRequest, ReasoningResponse};

type ScriptEntry = Result<ReasoningResponse, String>;

#[derive(Default)]
pub struct ScriptedReasoning {
    scripts: Mutex<HashMap<String, VecDeque<ScriptEntry>>>,
    requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append responses to an agent's script
    pub fn script(
        self,
        agent: impl Into<String>,
        responses: impl IntoIterator<Item = ReasoningResponse>,
    ) -> Self {
        {
            let mut scripts = self.scripts.lock();
            let queue = scripts.entry(agent.into()).or_default();
            queue.extend(responses.into_iter().map(Ok));
        }
        self
    }

    /// Append an upstream failure to an agent's script
    pub fn fail(self, agent: impl Into<String>, message: impl Into<String>) -> Self {
        self.push_entry(agent.into(), Err(message.into()));
        self
    }

    pub fn push(&self, agent: impl Into<String>, response: ReasoningResponse) {
        self.push_entry(agent.into(), Ok(response));
    }

    fn push_entry(&self, agent: String, entry: ScriptEntry) {
        self.scripts.lock().entry(agent).or_default().push_back(entry);
    }

    /// Every request received so far, in call order
    pub fn requests(&self) -> Vec<ReasoningRequest> {
        self.requests.lock().clone()
    }

    /// Number of calls made on behalf of `agent`
    pub fn calls(&self, agent: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.agent_name == agent)
            .count()
    }

    fn next_entry(&self, agent: &str) -> Option<ScriptEntry> {
        let mut scripts = self.scripts.lock();
        let queue = scripts.get_mut(agent)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl Capability for ScriptedReasoning {
    fn name(&self) -> &'static str {
        "scripted-reasoning"
    }
}

#[async_trait::async_trait]
impl ReasoningCapability for ScriptedReasoning {
    async fn generate(
        &self,
        _ctx: &OrchestrationContext,
        req: ReasoningRequest,
    ) -> Result<ReasoningResponse, ReasoningError> {
        let agent = req.agent_name.clone();
        self.requests.lock().push(req);

        match self.next_entry(&agent) {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ReasoningError::new(message)),
            None => Err(ReasoningError::new(format!(
                "no scripted responses for agent '{}'",
                agent
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn request(agent: &str) -> ReasoningRequest {
        ReasoningRequest {
            agent_name: agent.to_string(),
            instruction: String::new(),
            conversation: Vec::new(),
            tools: Vec::new(),
            state: Map::new(),
            turn: 0,
        }
    }

    #[tokio::test]
    async fn test_replays_then_repeats_last() {
        let (ctx, _rx) = OrchestrationContext::for_test();
        let reasoning = ScriptedReasoning::new().script(
            "a",
            vec![
                ReasoningResponse::tool("echo", json!({"message": "hi"})),
                ReasoningResponse::answer("done"),
            ],
        );

        let first = reasoning.generate(&ctx, request("a")).await.unwrap();
        assert!(matches!(first, ReasoningResponse::ToolRequest { .. }));
        for _ in 0..3 {
            let next = reasoning.generate(&ctx, request("a")).await.unwrap();
            assert_eq!(next, ReasoningResponse::answer("done"));
        }
        assert_eq!(reasoning.calls("a"), 4);
    }

    #[tokio::test]
    async fn test_unknown_agent_and_failures() {
        let (ctx, _rx) = OrchestrationContext::for_test();
        let reasoning = ScriptedReasoning::new().fail("b", "upstream 503");

        let err = reasoning.generate(&ctx, request("b")).await.unwrap_err();
        assert_eq!(err.message, "upstream 503");
        assert!(reasoning.generate(&ctx, request("nobody")).await.is_err());
    }
}

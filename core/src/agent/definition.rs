//! Declarative workflow definitions
//!
//! YAML description of an agent graph plus its initial state, input and
//! (for dry runs) scripted reasoning responses.
//!
//! ```yaml
//! name: review
//! root: pipeline
//! input: "Write about ownership"
//! state:
//!   audience: beginners
//! agents:
//!   - name: pipeline
//!     kind: sequential
//!     children: [draft, refine]
//!   - name: draft
//!     kind: reasoning
//!     tools: [echo]
//!     output_key: draft
//!     script:
//!       - tool: echo
//!         args: { message: outline }
//!       - answer: "First draft"
//!   - name: refine
//!     kind: loop
//!     max_iterations: 3
//!     children: [critic]
//!   - name: critic
//!     kind: reasoning
//!     tools: [exit_loop]
//!     script:
//!       - tool: exit_loop
//!       - answer: "Looks good"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use crate::agent::builder::{AgentDefinition, GraphBuilder};
use crate::agent::core::Agent;
use crate::agent::runtime::capability::ReasoningCapability;
use crate::agent::runtime::impls::ScriptedReasoning;
use crate::agent::session::SessionState;
use crate::agent::tools::builtin::ToolCatalog;
use crate::agent::types::conversation::ReasoningResponse;
use crate::error::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Name of the agent the run starts from
    pub root: String,
    /// Initial SessionState
    #[serde(default)]
    pub state: Map<String, Value>,
    /// Input handed to the root agent
    #[serde(default)]
    pub input: Value,
    pub agents: Vec<AgentEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Reasoning,
    Sequential,
    Parallel,
    Loop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentEntry {
    pub name: String,
    pub kind: EntryKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub children: Vec<String>,
    /// Catalog tool names
    #[serde(default)]
    pub tools: Vec<String>,
    /// Agents exposed as tools
    #[serde(default)]
    pub delegates: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    /// Scripted reasoning responses, replayed in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub script: Vec<ScriptStep>,
}

/// One scripted reasoning response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    Answer {
        answer: String,
    },
    Tool {
        tool: String,
        #[serde(default)]
        args: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought: Option<String>,
    },
    Fail {
        fail: String,
    },
}

impl WorkflowDefinition {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        serde_yml::from_str(content).map_err(|e| ConfigurationError::InvalidDefinition {
            reason: e.to_string(),
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigurationError::InvalidDefinition {
                reason: format!("{}: {}", path.display(), e),
            })?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigurationError> {
        serde_yml::to_string(self).map_err(|e| ConfigurationError::InvalidDefinition {
            reason: e.to_string(),
        })
    }

    pub fn initial_state(&self) -> SessionState {
        SessionState::from_map(self.state.clone())
    }

    /// Reasoning capability replaying every entry's `script`
    pub fn scripted_reasoning(&self) -> ScriptedReasoning {
        let mut reasoning = ScriptedReasoning::new();
        for entry in &self.agents {
            for step in &entry.script {
                reasoning = match step {
                    ScriptStep::Answer { answer } => reasoning
                        .script(&entry.name, [ReasoningResponse::answer(answer.clone())]),
                    ScriptStep::Tool {
                        tool,
                        args,
                        thought,
                    } => reasoning.script(
                        &entry.name,
                        [ReasoningResponse::ToolRequest {
                            tool_name: tool.clone(),
                            args: args.clone(),
                            thought: thought.clone(),
                        }],
                    ),
                    ScriptStep::Fail { fail } => reasoning.fail(&entry.name, fail.clone()),
                };
            }
        }
        reasoning
    }

    /// Translate into a graph builder, resolving tool names in `catalog`
    pub fn graph_builder(
        &self,
        catalog: &ToolCatalog,
        reasoning: Arc<dyn ReasoningCapability>,
    ) -> Result<GraphBuilder, ConfigurationError> {
        let mut builder = GraphBuilder::new().with_default_reasoning(reasoning);

        for entry in &self.agents {
            let definition = match entry.kind {
                EntryKind::Reasoning => {
                    let mut definition = AgentDefinition::reasoning(&entry.name)
                        .with_instruction(&entry.instruction);
                    for tool in &entry.tools {
                        let descriptor =
                            catalog
                                .get(tool)
                                .ok_or_else(|| ConfigurationError::UnknownTool {
                                    agent: entry.name.clone(),
                                    tool: tool.clone(),
                                })?;
                        definition = definition.with_tool(descriptor.clone());
                    }
                    for delegate in &entry.delegates {
                        definition = definition.with_delegate(delegate);
                    }
                    if let Some(turns) = entry.max_turns {
                        definition = definition.with_max_turns(turns);
                    }
                    if let Some(ref key) = entry.output_key {
                        definition = definition.with_output_key(key);
                    }
                    definition
                }
                EntryKind::Sequential => AgentDefinition::sequential(&entry.name, &entry.children),
                EntryKind::Parallel => AgentDefinition::parallel(&entry.name, &entry.children),
                EntryKind::Loop => AgentDefinition::loop_agent(
                    &entry.name,
                    &entry.children,
                    entry.max_iterations.unwrap_or(0),
                ),
            };
            builder.register(definition.with_description(&entry.description));
        }

        Ok(builder)
    }

    /// Build the root agent
    pub fn build(
        &self,
        catalog: &ToolCatalog,
        reasoning: Arc<dyn ReasoningCapability>,
    ) -> Result<Arc<Agent>, ConfigurationError> {
        self.graph_builder(catalog, reasoning)?.build(&self.root)
    }

    /// Build the root agent driven by the entries' scripts
    pub fn build_scripted(
        &self,
        catalog: &ToolCatalog,
    ) -> Result<(Arc<Agent>, Arc<ScriptedReasoning>), ConfigurationError> {
        let reasoning = Arc::new(self.scripted_reasoning());
        let root = self.build(catalog, reasoning.clone())?;
        Ok((root, reasoning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const REVIEW: &str = r#"
name: review
root: pipeline
input: "Write about ownership"
state:
  audience: beginners
agents:
  - name: pipeline
    kind: sequential
    children: [draft, refine]
  - name: draft
    kind: reasoning
    tools: [echo]
    output_key: draft
    script:
      - tool: echo
        args: { message: outline }
        thought: sketching
      - answer: "First draft"
  - name: refine
    kind: loop
    max_iterations: 3
    children: [critic]
  - name: critic
    kind: reasoning
    tools: [exit_loop]
    script:
      - fail: "not reached"
"#;

    #[test]
    fn test_parse_yaml() {
        let def = WorkflowDefinition::from_yaml_str(REVIEW).unwrap();
        assert_eq!(def.root, "pipeline");
        assert_eq!(def.input, json!("Write about ownership"));
        assert_eq!(def.initial_state().get("audience"), Some(json!("beginners")));
        assert_eq!(def.agents.len(), 4);
        assert_eq!(def.agents[2].kind, EntryKind::Loop);
        assert_eq!(
            def.agents[1].script[0],
            ScriptStep::Tool {
                tool: "echo".to_string(),
                args: json!({"message": "outline"}),
                thought: Some("sketching".to_string()),
            }
        );
        assert_eq!(
            def.agents[3].script[0],
            ScriptStep::Fail {
                fail: "not reached".to_string()
            }
        );
    }

    #[test]
    fn test_build_from_definition() {
        let def = WorkflowDefinition::from_yaml_str(REVIEW).unwrap();
        let (root, _reasoning) = def.build_scripted(&ToolCatalog::builtin()).unwrap();
        assert_eq!(root.name(), "pipeline");
        assert_eq!(root.subtree_names(), vec!["pipeline", "draft", "refine", "critic"]);
    }

    #[test]
    fn test_definition_errors() {
        assert!(matches!(
            WorkflowDefinition::from_yaml_str("root: [unclosed"),
            Err(ConfigurationError::InvalidDefinition { .. })
        ));
        assert!(matches!(
            WorkflowDefinition::from_yaml_str("root: a\nagents: []\nsurprise: 1\n"),
            Err(ConfigurationError::InvalidDefinition { .. })
        ));

        let def = WorkflowDefinition::from_yaml_str(
            "root: a\nagents:\n  - name: a\n    kind: reasoning\n    tools: [shell]\n",
        )
        .unwrap();
        assert_eq!(
            def.build_scripted(&ToolCatalog::builtin()).err(),
            Some(ConfigurationError::UnknownTool {
                agent: "a".to_string(),
                tool: "shell".to_string()
            })
        );

        let def = WorkflowDefinition::from_yaml_str(
            "root: l\nagents:\n  - name: l\n    kind: loop\n    children: [x]\n  - name: x\n    kind: reasoning\n",
        )
        .unwrap();
        assert!(matches!(
            def.build_scripted(&ToolCatalog::builtin()),
            Err(ConfigurationError::InvalidMaxIterations { value: 0, .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("review.yaml");
        std::fs::write(&path, REVIEW).unwrap();

        let def = WorkflowDefinition::load(&path).unwrap();
        assert_eq!(def.name, "review");
        assert!(WorkflowDefinition::load(dir.path().join("missing.yaml")).is_err());
    }
}

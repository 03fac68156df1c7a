//! Graph Builder
//!
//! Builds a validated agent tree from definitions that reference each other
//! by name.
//!
//! # Example
//! ```ignore
//! use weft_core::agent::{AgentDefinition, GraphBuilder};
//! use weft_core::agent::runtime::impls::ScriptedReasoning;
//! use std::sync::Arc;
//!
//! let root = GraphBuilder::new()
//!     .with_default_reasoning(Arc::new(ScriptedReasoning::new()))
//!     .add(AgentDefinition::sequential("pipeline", ["draft", "review"]))
//!     .add(AgentDefinition::reasoning("draft").with_output_key("draft"))
//!     .add(AgentDefinition::reasoning("review").with_delegate("fact_check"))
//!     .add(AgentDefinition::reasoning("fact_check"))
//!     .build("pipeline")?;
//! ```
//!
//! `build` checks, in order: empty and duplicate names, unknown references,
//! cycles through children and delegates (reporting the path),
//! `max_iterations >= 1`, then materializes the tree. Leaf checks (missing
//! reasoning, duplicate tools, turn cap) run during materialization.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::agent::callbacks::Callbacks;
use crate::agent::core::Agent;
use crate::agent::runtime::capability::{AgentBehavior, ReasoningCapability};
use crate::agent::tools::delegate::AgentTool;
use crate::agent::tools::registry::ToolDescriptor;
use crate::error::ConfigurationError;

/// What a definition builds into
pub enum DefinitionKind {
    Reasoning {
        instruction: String,
        reasoning: Option<Arc<dyn ReasoningCapability>>,
        tools: Vec<ToolDescriptor>,
        /// Agents exposed to this one as tools, by name
        delegates: Vec<String>,
        max_turns: Option<u32>,
        output_key: Option<String>,
    },
    Sequential {
        children: Vec<String>,
    },
    Parallel {
        children: Vec<String>,
    },
    Loop {
        children: Vec<String>,
        max_iterations: u32,
    },
    Custom(Arc<dyn AgentBehavior>),
}

/// A named agent whose children and delegates are referenced by name
pub struct AgentDefinition {
    name: String,
    description: String,
    callbacks: Callbacks,
    kind: DefinitionKind,
}

fn names<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, kind: DefinitionKind) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            callbacks: Callbacks::default(),
            kind,
        }
    }

    pub fn reasoning(name: impl Into<String>) -> Self {
        Self::new(
            name,
            DefinitionKind::Reasoning {
                instruction: String::new(),
                reasoning: None,
                tools: Vec::new(),
                delegates: Vec::new(),
                max_turns: None,
                output_key: None,
            },
        )
    }

    pub fn sequential<I, S>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, DefinitionKind::Sequential { children: names(children) })
    }

    pub fn parallel<I, S>(name: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, DefinitionKind::Parallel { children: names(children) })
    }

    pub fn loop_agent<I, S>(name: impl Into<String>, children: I, max_iterations: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            DefinitionKind::Loop {
                children: names(children),
                max_iterations,
            },
        )
    }

    pub fn custom(name: impl Into<String>, behavior: Arc<dyn AgentBehavior>) -> Self {
        Self::new(name, DefinitionKind::Custom(behavior))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &DefinitionKind {
        &self.kind
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    // Leaf-only settings below; ignored on other kinds

    pub fn with_instruction(mut self, text: impl Into<String>) -> Self {
        if let DefinitionKind::Reasoning { ref mut instruction, .. } = self.kind {
            *instruction = text.into();
        }
        self
    }

    pub fn with_reasoning(mut self, capability: Arc<dyn ReasoningCapability>) -> Self {
        if let DefinitionKind::Reasoning { ref mut reasoning, .. } = self.kind {
            *reasoning = Some(capability);
        }
        self
    }

    pub fn with_tool(mut self, tool: ToolDescriptor) -> Self {
        if let DefinitionKind::Reasoning { ref mut tools, .. } = self.kind {
            tools.push(tool);
        }
        self
    }

    pub fn with_delegate(mut self, agent: impl Into<String>) -> Self {
        if let DefinitionKind::Reasoning { ref mut delegates, .. } = self.kind {
            delegates.push(agent.into());
        }
        self
    }

    pub fn with_max_turns(mut self, turns: u32) -> Self {
        if let DefinitionKind::Reasoning { ref mut max_turns, .. } = self.kind {
            *max_turns = Some(turns);
        }
        self
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        if let DefinitionKind::Reasoning { ref mut output_key, .. } = self.kind {
            *output_key = Some(key.into());
        }
        self
    }

    /// Every name this definition points at: children first, then delegates
    pub fn references(&self) -> Vec<&str> {
        match self.kind {
            DefinitionKind::Sequential { ref children }
            | DefinitionKind::Parallel { ref children }
            | DefinitionKind::Loop { ref children, .. } => {
                children.iter().map(String::as_str).collect()
            }
            DefinitionKind::Reasoning { ref delegates, .. } => {
                delegates.iter().map(String::as_str).collect()
            }
            DefinitionKind::Custom(_) => Vec::new(),
        }
    }
}

/// Collects definitions and builds validated agent trees from them
#[derive(Default)]
pub struct GraphBuilder {
    definitions: Vec<AgentDefinition>,
    default_reasoning: Option<Arc<dyn ReasoningCapability>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reasoning capability for leaves that do not bring their own
    pub fn with_default_reasoning(mut self, reasoning: Arc<dyn ReasoningCapability>) -> Self {
        self.default_reasoning = Some(reasoning);
        self
    }

    pub fn add(mut self, definition: AgentDefinition) -> Self {
        self.register(definition);
        self
    }

    pub fn register(&mut self, definition: AgentDefinition) {
        self.definitions.push(definition);
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn get(&self, name: &str) -> Option<&AgentDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Run every graph-level check without building anything
    pub fn validate(&self, root: &str) -> Result<(), ConfigurationError> {
        let mut seen = HashSet::new();
        for definition in &self.definitions {
            if definition.name.trim().is_empty() {
                return Err(ConfigurationError::EmptyName);
            }
            if !seen.insert(definition.name.as_str()) {
                return Err(ConfigurationError::DuplicateAgent {
                    name: definition.name.clone(),
                });
            }
        }

        if self.get(root).is_none() {
            return Err(ConfigurationError::UnknownAgent {
                agent: "<root>".to_string(),
                reference: root.to_string(),
            });
        }

        for definition in &self.definitions {
            for reference in definition.references() {
                if self.get(reference).is_none() {
                    return Err(ConfigurationError::UnknownAgent {
                        agent: definition.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path = Vec::new();
        let starts = std::iter::once(root).chain(self.definitions.iter().map(|d| d.name.as_str()));
        for start in starts {
            self.visit(start, &mut marks, &mut path)?;
        }

        for definition in &self.definitions {
            if let DefinitionKind::Loop { max_iterations, .. } = definition.kind {
                if max_iterations < 1 {
                    return Err(ConfigurationError::InvalidMaxIterations {
                        agent: definition.name.clone(),
                        value: max_iterations,
                    });
                }
            }
        }

        Ok(())
    }

    /// Depth-first cycle search through children and delegates
    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<(), ConfigurationError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|n| *n == name).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                cycle.push(name.to_string());
                return Err(ConfigurationError::CyclicGraph { path: cycle });
            }
            None => {}
        }

        marks.insert(name, Mark::Visiting);
        path.push(name);
        if let Some(definition) = self.get(name) {
            for reference in definition.references() {
                self.visit(reference, marks, path)?;
            }
        }
        path.pop();
        marks.insert(name, Mark::Done);
        Ok(())
    }

    /// Validate and materialize the tree rooted at `root`
    pub fn build(&self, root: &str) -> Result<Arc<Agent>, ConfigurationError> {
        self.validate(root)?;
        let mut built = HashMap::new();
        let agent = self.materialize(root, &mut built)?;
        tracing::debug!(
            "Built agent graph '{}' ({} agent(s))",
            root,
            built.len()
        );
        Ok(agent)
    }

    fn materialize(
        &self,
        name: &str,
        built: &mut HashMap<String, Arc<Agent>>,
    ) -> Result<Arc<Agent>, ConfigurationError> {
        if let Some(agent) = built.get(name) {
            return Ok(Arc::clone(agent));
        }
        let definition = self.get(name).ok_or_else(|| ConfigurationError::UnknownAgent {
            agent: "<root>".to_string(),
            reference: name.to_string(),
        })?;

        let mut children_of = |children: &[String]| -> Result<Vec<Arc<Agent>>, ConfigurationError> {
            children.iter().map(|c| self.materialize(c, built)).collect()
        };

        let agent = match definition.kind {
            DefinitionKind::Reasoning {
                ref instruction,
                ref reasoning,
                ref tools,
                ref delegates,
                max_turns,
                ref output_key,
            } => {
                let delegated = children_of(delegates)?;
                let mut builder = Agent::reasoning(&definition.name)
                    .with_description(&definition.description)
                    .with_instruction(instruction)
                    .with_tools(tools.iter().cloned())
                    .with_tools(delegated.into_iter().map(AgentTool::descriptor))
                    .with_callbacks(definition.callbacks.clone());
                if let Some(r) = reasoning.clone().or_else(|| self.default_reasoning.clone()) {
                    builder = builder.with_reasoning(r);
                }
                if let Some(turns) = max_turns {
                    builder = builder.with_max_turns(turns);
                }
                if let Some(key) = output_key {
                    builder = builder.with_output_key(key);
                }
                builder.build()?
            }
            DefinitionKind::Sequential { ref children } => {
                Agent::sequential(&definition.name, children_of(children)?)?
            }
            DefinitionKind::Parallel { ref children } => {
                Agent::parallel(&definition.name, children_of(children)?)?
            }
            DefinitionKind::Loop {
                ref children,
                max_iterations,
            } => Agent::loop_agent(&definition.name, children_of(children)?, max_iterations)?,
            DefinitionKind::Custom(ref behavior) => {
                Agent::custom(&definition.name, Arc::clone(behavior))?
            }
        };

        let agent = Arc::new(
            agent
                .with_description(&definition.description)
                .with_callbacks(definition.callbacks.clone()),
        );
        built.insert(name.to_string(), Arc::clone(&agent));
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::core::AgentKind;
    use crate::agent::runtime::impls::ScriptedReasoning;

    fn builder() -> GraphBuilder {
        GraphBuilder::new().with_default_reasoning(Arc::new(ScriptedReasoning::new()))
    }

    #[test]
    fn test_builds_nested_tree() {
        let root = builder()
            .add(AgentDefinition::sequential("pipeline", ["draft", "refine"]))
            .add(AgentDefinition::reasoning("draft").with_delegate("research"))
            .add(AgentDefinition::loop_agent("refine", ["critic"], 3))
            .add(AgentDefinition::reasoning("critic"))
            .add(AgentDefinition::reasoning("research").with_description("Looks things up"))
            .build("pipeline")
            .unwrap();

        assert_eq!(root.kind_name(), "sequential");
        assert_eq!(root.subtree_names(), vec!["pipeline", "draft", "refine", "critic"]);

        match root.children()[0].kind() {
            AgentKind::Reasoning(leaf) => {
                assert_eq!(leaf.tools().names(), vec!["research"]);
                assert_eq!(leaf.tools().get("research").unwrap().description(), "Looks things up");
            }
            _ => panic!("draft should be a reasoning agent"),
        }
    }

    #[test]
    fn test_reference_errors() {
        let err = builder()
            .add(AgentDefinition::sequential("pipeline", ["ghost"]))
            .build("pipeline")
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownAgent {
                agent: "pipeline".to_string(),
                reference: "ghost".to_string()
            }
        );

        let err = builder()
            .add(AgentDefinition::reasoning("a"))
            .add(AgentDefinition::reasoning("a"))
            .build("a")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateAgent { .. }));

        assert!(matches!(
            builder().build("nothing"),
            Err(ConfigurationError::UnknownAgent { .. })
        ));
    }

    #[test]
    fn test_cycle_through_children_and_delegates() {
        let err = builder()
            .add(AgentDefinition::sequential("a", ["b"]))
            .add(AgentDefinition::parallel("b", ["c"]))
            .add(AgentDefinition::reasoning("c").with_delegate("a"))
            .build("a")
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::CyclicGraph {
                path: vec!["a", "b", "c", "a"].into_iter().map(String::from).collect()
            }
        );

        let err = builder()
            .add(AgentDefinition::loop_agent("self", ["self"], 2))
            .build("self")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::CyclicGraph { .. }));
    }

    #[test]
    fn test_invalid_iterations_and_missing_reasoning() {
        let err = builder()
            .add(AgentDefinition::loop_agent("l", ["x"], 0))
            .add(AgentDefinition::reasoning("x"))
            .build("l")
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidMaxIterations {
                agent: "l".to_string(),
                value: 0
            }
        );

        let err = GraphBuilder::new()
            .add(AgentDefinition::reasoning("bare"))
            .build("bare")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingReasoning { .. }));
    }

    #[test]
    fn test_shared_child_is_duplicate_but_shared_delegate_is_not() {
        let err = builder()
            .add(AgentDefinition::parallel("fan", ["left", "right"]))
            .add(AgentDefinition::sequential("left", ["shared"]))
            .add(AgentDefinition::sequential("right", ["shared"]))
            .add(AgentDefinition::reasoning("shared"))
            .build("fan")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::DuplicateAgent { ref name } if name == "shared"));

        let ok = builder()
            .add(AgentDefinition::parallel("fan", ["left", "right"]))
            .add(AgentDefinition::reasoning("left").with_delegate("helper"))
            .add(AgentDefinition::reasoning("right").with_delegate("helper"))
            .add(AgentDefinition::reasoning("helper"))
            .build("fan");
        assert!(ok.is_ok());
    }
}

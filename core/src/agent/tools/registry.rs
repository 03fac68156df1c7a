//! Tool registry and invoker
//!
//! Each reasoning agent owns one registry holding the tools it declared.
//! Names resolve against that registry only; there is no global namespace.
//!
//! `invoke` adds exactly three things on top of the capability: argument
//! validation, error wrapping and the `ToolCall`/`ToolResult` events.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::schema::ArgumentSchema;
use crate::agent::runtime::{
    capability::ToolCapability, context::OrchestrationContext, error::ToolCapabilityError,
};
use crate::agent::types::conversation::ToolSpec;
use crate::agent::types::events::{Event, ToolOutcome};
use crate::error::{AgentError, ConfigurationError};

/// Closure signature backing [`FnTool`]
pub type ToolFn = Arc<
    dyn Fn(OrchestrationContext, Value) -> BoxFuture<'static, Result<Value, ToolCapabilityError>>
        + Send
        + Sync,
>;

/// Extra validation on top of the schema
pub type ArgValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// Tool capability backed by an async closure
#[derive(Clone)]
pub struct FnTool {
    func: ToolFn,
}

impl FnTool {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(OrchestrationContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolCapabilityError>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |ctx, args| Box::pin(func(ctx, args))),
        }
    }
}

#[async_trait::async_trait]
impl ToolCapability for FnTool {
    async fn execute(
        &self,
        ctx: &OrchestrationContext,
        args: Value,
    ) -> Result<Value, ToolCapabilityError> {
        (self.func)(ctx.clone(), args).await
    }
}

/// A tool an agent may request during reasoning
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    schema: ArgumentSchema,
    validator: Option<ArgValidator>,
    capability: Arc<dyn ToolCapability>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("has_validator", &self.validator.is_some())
            .finish()
    }
}

impl ToolDescriptor {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        capability: Arc<dyn ToolCapability>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: ArgumentSchema::default(),
            validator: None,
            capability,
        }
    }

    /// Descriptor around an async closure
    pub fn from_fn<F, Fut>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(OrchestrationContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolCapabilityError>> + Send + 'static,
    {
        Self::new(name, description, Arc::new(FnTool::new(func)))
    }

    pub fn with_schema(mut self, schema: ArgumentSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    /// How the tool is advertised to reasoning
    pub fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.to_json_schema(),
        }
    }

    pub fn validate(&self, args: &Value) -> Result<(), String> {
        self.schema.validate(args)?;
        match self.validator {
            Some(ref validator) => validator(args),
            None => Ok(()),
        }
    }
}

/// Ordered set of an agent's tools
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry for `agent`, rejecting duplicate names
    pub fn for_agent(
        agent: &str,
        descriptors: impl IntoIterator<Item = ToolDescriptor>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            if registry.contains(descriptor.name()) {
                return Err(ConfigurationError::DuplicateTool {
                    agent: agent.to_string(),
                    tool: descriptor.name().to_string(),
                });
            }
            registry.tools.push(descriptor);
        }
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(ToolDescriptor::spec).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolve, validate, dispatch and report one tool call
    pub async fn invoke(
        &self,
        ctx: &OrchestrationContext,
        tool_name: &str,
        args: Value,
    ) -> Result<Value, AgentError> {
        let descriptor = self.get(tool_name).ok_or_else(|| AgentError::UnknownTool {
            agent: ctx.agent_name().to_string(),
            tool: tool_name.to_string(),
        })?;

        // Rejected calls never reach the capability and emit nothing
        descriptor
            .validate(&args)
            .map_err(|reason| AgentError::InvalidArguments {
                tool: tool_name.to_string(),
                reason,
            })?;

        ctx.emit(Event::ToolCall {
            agent_name: ctx.agent_name().to_string(),
            tool_name: tool_name.to_string(),
            args: args.clone(),
        });
        tracing::debug!("Invoking tool '{}' for '{}'", tool_name, ctx.agent_name());

        let outcome = AssertUnwindSafe(descriptor.capability.execute(ctx, args))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(ToolCapabilityError::new("tool panicked")));

        match outcome {
            Ok(value) => {
                ctx.emit(Event::ToolResult {
                    agent_name: ctx.agent_name().to_string(),
                    tool_name: tool_name.to_string(),
                    result: ToolOutcome::Ok(value.clone()),
                });
                Ok(value)
            }
            Err(e) => {
                tracing::warn!("Tool '{}' failed: {}", tool_name, e);
                ctx.emit(Event::ToolResult {
                    agent_name: ctx.agent_name().to_string(),
                    tool_name: tool_name.to_string(),
                    result: ToolOutcome::Error(e.detail.clone()),
                });
                Err(AgentError::ToolExecutionFailed {
                    tool: tool_name.to_string(),
                    cause: e.detail,
                })
            }
        }
    }
}

//! Built-in tools and the named tool catalog
//!
//! | Tool | Description |
//! |------|-------------|
//! | `echo` | Returns its `message` argument |
//! | `exit_loop` | Stops the innermost enclosing loop after its current pass |

use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::registry::ToolDescriptor;
use super::schema::ArgumentSchema;

pub const ECHO_TOOL: &str = "echo";
pub const EXIT_LOOP_TOOL: &str = "exit_loop";

/// Returns `{"message": ...}` unchanged
pub fn echo_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(ECHO_TOOL, "Return the given message unchanged", |_ctx, args| async move {
        Ok(args.get("message").cloned().unwrap_or(Value::Null))
    })
    .with_schema(ArgumentSchema::new().with_string_param("message", "Text to echo back", true))
}

/// Raises the loop-exit signal for the calling agent's loop
pub fn exit_loop_tool() -> ToolDescriptor {
    ToolDescriptor::from_fn(
        EXIT_LOOP_TOOL,
        "Stop the enclosing loop once the current pass finishes",
        |ctx, args| async move {
            let in_loop = ctx.request_loop_exit();
            Ok(json!({
                "exit_requested": in_loop,
                "reason": args.get("reason").cloned().unwrap_or(Value::Null),
            }))
        },
    )
    .with_schema(ArgumentSchema::new().with_string_param("reason", "Why the loop should stop", false))
}

/// Named tool descriptors available to declarative workflow definitions
#[derive(Clone, Debug, Default)]
pub struct ToolCatalog {
    tools: BTreeMap<String, ToolDescriptor>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with `echo` and `exit_loop`
    pub fn builtin() -> Self {
        Self::new().with(echo_tool()).with(exit_loop_tool())
    }

    pub fn with(mut self, descriptor: ToolDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.tools.insert(descriptor.name().to_string(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }
}

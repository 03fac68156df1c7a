//! Tools
//!
//! Argument schemas, the per-agent registry/invoker, built-in tools and
//! agent delegation.

pub mod builtin;
pub mod delegate;
pub mod registry;
pub mod schema;

pub use builtin::{echo_tool, exit_loop_tool, ToolCatalog, ECHO_TOOL, EXIT_LOOP_TOOL};
pub use delegate::AgentTool;
pub use registry::{ArgValidator, FnTool, ToolDescriptor, ToolFn, ToolRegistry};
pub use schema::{ArgumentSchema, Param, ParamType};

//! Weft core
//!
//! Agent workflow orchestration: reasoning agents composed into sequential
//! pipelines, parallel fan-out groups and bounded loops, with lifecycle
//! callbacks, per-agent tools and run-scoped session state.

pub mod agent;
pub mod config;
pub mod error;

// Re-exports for convenience
pub use agent::core::Agent;
pub use agent::runner::{run, RunHandle, RunReport, Runner};
pub use agent::types::events::{AgentOutcome, Event};
pub use config::EngineConfig;
pub use error::{AgentError, ConfigurationError};

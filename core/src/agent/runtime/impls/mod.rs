//! Capability Implementations
//!
//! Concrete implementations of runtime capability traits.
//!
//! ## Reasoning
//! - `ScriptedReasoning`: replays scripted responses per agent
//!
//! ## Telemetry
//! - `ConsoleTelemetry`: timestamped event lines to stderr/file
//! - `TracingTelemetry`: forwards events to `tracing`

pub mod console_telemetry;
pub mod scripted;

pub use console_telemetry::{format_event, ConsoleTelemetry, TracingTelemetry};
pub use scripted::ScriptedReasoning;

//! Capability runtime
//!
//! Injected capabilities, the context threaded through a run, and event
//! delivery. No orchestration decisions are made here.

pub mod capability;
pub mod context;
pub mod error;
pub mod impls;
pub mod sink;

pub use capability::*;
pub use context::*;
pub use error::*;
pub use sink::{EventSink, TelemetryDispatcher};

//! Session scope
//!
//! State shared by every agent and callback of one top-level run.

pub mod state;

pub use state::SessionState;

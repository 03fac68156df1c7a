//! Shared types for the orchestration engine
//!
//! NO dependencies on other modules within agent/.
//! Runtime, tools and workflow agents all import from here.

pub mod conversation;
pub mod events;
pub mod ids;

// Re-exports for convenience
pub use conversation::*;
pub use events::*;
pub use ids::*;

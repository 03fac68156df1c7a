//! Workflow (composite) agents
//!
//! Control-flow combinators built only on the agent execution contract.
//! Each function here is the body of one composite variant; the budget gate,
//! hooks and terminal event are handled by [`crate::agent::core::Agent`].

pub mod loop_agent;
pub mod parallel;
pub mod sequential;

//! Capability errors
//!
//! What injected capabilities report back. The engine maps these onto
//! [`crate::error::AgentError`] for the agent they happened in.

use std::fmt;

/// Reasoning capability error (upstream model failure, timeout, ...)
#[derive(Debug, Clone)]
pub struct ReasoningError {
    pub message: String,
}

impl ReasoningError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl fmt::Display for ReasoningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reasoning error: {}", self.message)
    }
}

impl std::error::Error for ReasoningError {}

/// Tool capability error
#[derive(Debug, Clone)]
pub struct ToolCapabilityError {
    pub detail: String,
}

impl ToolCapabilityError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ToolCapabilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tool error: {}", self.detail)
    }
}

impl std::error::Error for ToolCapabilityError {}

/// Failure returned by a callback handler
#[derive(Debug, Clone)]
pub struct CallbackFailure {
    pub message: String,
}

impl CallbackFailure {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl fmt::Display for CallbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback failure: {}", self.message)
    }
}

impl std::error::Error for CallbackFailure {}

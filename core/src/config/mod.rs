//! Configuration management
//!
//! Engine-wide settings: budgets that bound every run and telemetry delivery.

pub mod store;

pub use store::{Budget, EngineConfig, TelemetryConfig, CONFIG_PATH_ENV};

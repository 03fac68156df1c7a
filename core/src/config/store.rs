//! Engine Configuration Store
//!
//! Loads/saves the engine's TOML config and applies `WEFT_*` environment
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "WEFT_CONFIG";

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recursion / iteration / turn ceilings
    #[serde(default)]
    pub budget: Budget,

    /// Telemetry delivery settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Bounds enforced on every run to guarantee termination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Budget {
    /// Maximum nesting depth of agents (composites and delegated agents)
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum steps within one step-counter scope
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Default reasoning turn cap for leaf agents without their own
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

fn default_max_depth() -> u32 {
    16
}

fn default_max_steps() -> u32 {
    256
}

fn default_max_turns() -> u32 {
    8
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_steps: default_max_steps(),
            max_turns: default_max_turns(),
        }
    }
}

impl Budget {
    /// Every ceiling must leave room for at least one step
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let zero = [
            ("max_depth", self.max_depth),
            ("max_steps", self.max_steps),
            ("max_turns", self.max_turns),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);

        match zero {
            Some((field, _)) => Err(ConfigurationError::InvalidBudget {
                reason: format!("{} must be greater than zero", field),
            }),
            None => Ok(()),
        }
    }
}

/// Telemetry delivery settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Bounded buffer between the engine and the sink; overflow is dropped
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

fn default_buffer() -> usize {
    1024
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            buffer: default_buffer(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.budget.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Render as pretty TOML
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from `$WEFT_CONFIG`, then the default location, then defaults.
    /// Environment overrides are applied last in every case.
    pub fn load_or_default() -> Self {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let candidates = explicit.into_iter().chain(Self::default_path());

        let mut config = Self::default();
        for path in candidates {
            if !path.exists() {
                continue;
            }
            match Self::load(&path) {
                Ok(loaded) => {
                    tracing::debug!("Loaded engine config from {}", path.display());
                    config = loaded;
                    break;
                }
                Err(e) => {
                    tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
                }
            }
        }

        config.apply_env_overrides();
        config
    }

    /// Default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("weft").join("config.toml"))
    }

    /// Apply `WEFT_MAX_DEPTH`, `WEFT_MAX_STEPS`, `WEFT_MAX_TURNS` and
    /// `WEFT_TELEMETRY_BUFFER`. Unparseable or zero values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u32("WEFT_MAX_DEPTH") {
            self.budget.max_depth = v;
        }
        if let Some(v) = env_u32("WEFT_MAX_STEPS") {
            self.budget.max_steps = v;
        }
        if let Some(v) = env_u32("WEFT_MAX_TURNS") {
            self.budget.max_turns = v;
        }
        if let Some(v) = env_u32("WEFT_TELEMETRY_BUFFER") {
            self.telemetry.buffer = v as usize;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.budget.validate()
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.budget.max_depth, 16);
        assert_eq!(config.budget.max_steps, 256);
        assert_eq!(config.budget.max_turns, 8);
        assert_eq!(config.telemetry.buffer, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str("[budget]\nmax_turns = 3\n").unwrap();
        assert_eq!(config.budget.max_turns, 3);
        assert_eq!(config.budget.max_depth, 16);
        assert_eq!(config.telemetry, TelemetryConfig::default());
    }

    #[test]
    fn test_zero_budget_rejected() {
        let budget = Budget {
            max_steps: 0,
            ..Budget::default()
        };
        assert!(matches!(
            budget.validate(),
            Err(ConfigurationError::InvalidBudget { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = EngineConfig::default();
        config.budget.max_depth = 4;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_rejects_zero_budget() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[budget]\nmax_depth = 0\n").unwrap();

        assert!(EngineConfig::load(&path).is_err());
    }
}

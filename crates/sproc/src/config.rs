//! Engine configuration

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::RedefinePolicy;
use crate::environment::DEFAULT_MAX_CALL_DEPTH;

/// Settings fixed for the lifetime of an engine.
///
/// ```
/// use sproc::{EngineConfig, RedefinePolicy};
///
/// let config = EngineConfig::from_toml_str(
///     r#"
///     max_call_depth = 64
///     redefinition = "frozen"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.max_call_depth, 64);
/// assert_eq!(config.redefinition, RedefinePolicy::Frozen);
/// assert!(!config.trace);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Procedure nesting limit per execution
    pub max_call_depth: usize,
    /// What registering an existing procedure name does
    pub redefinition: RedefinePolicy,
    /// Emit a `trace` event for every statement
    pub trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            redefinition: RedefinePolicy::Replace,
            trace: false,
        }
    }
}

/// Invalid configuration text.
#[derive(Error, Debug)]
#[error("invalid engine configuration: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

impl EngineConfig {
    /// Parse settings from TOML; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Set the procedure nesting limit.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the redefinition policy.
    pub fn with_redefinition(mut self, policy: RedefinePolicy) -> Self {
        self.redefinition = policy;
        self
    }

    /// Turn per-statement tracing on or off.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

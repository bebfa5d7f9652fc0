//! Harness configuration — deserialization, validation, and env-var
//! reference resolution.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{HarnessError, Result};

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only. Returns `None` if the value is not a
/// valid env-var reference.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve a map of env-var references to their actual values.
///
/// Values using `${VAR}` syntax are read from the process environment
/// (unknown variables resolve to the empty string); literal values pass
/// through unchanged.
pub fn resolve_env_vars(env: &HashMap<String, String>) -> HashMap<String, String> {
    env.iter()
        .map(|(k, v)| {
            let resolved = match parse_env_ref(v) {
                Some(var_name) => std::env::var(var_name).unwrap_or_default(),
                None => v.clone(),
            };
            (k.clone(), resolved)
        })
        .collect()
}

/// Harness configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    /// The target CLI executable (default: "rosa").
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Command execution timeout in seconds (default: 5 minutes).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout per individual `--help` introspection subprocess.
    #[serde(default = "default_help_timeout_secs")]
    pub help_timeout_secs: u64,
    /// AWS region appended to region-scoped commands.
    pub region: Option<String>,
    /// Env vars injected into every subprocess. Values may be `${VAR}`
    /// references, resolved at harness construction.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

fn default_binary() -> String {
    "rosa".to_string()
}

fn default_timeout_secs() -> u64 {
    5 * 60
}

fn default_help_timeout_secs() -> u64 {
    10
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
            help_timeout_secs: default_help_timeout_secs(),
            region: None,
            env: HashMap::new(),
        }
    }
}

impl HarnessConfig {
    /// Validate field constraints not expressible in the type.
    pub fn validate(&self) -> Result<()> {
        if self.binary.trim().is_empty() {
            return Err(HarnessError::InvalidConfig(
                "binary must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(HarnessError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.help_timeout_secs == 0 {
            return Err(HarnessError::InvalidConfig(
                "help_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

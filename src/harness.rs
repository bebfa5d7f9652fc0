//! Harness facade — owns the target-binary identity, timeouts, resolved env
//! overrides, and the capability cache, and wires discovery → synthesis →
//! execution into one `run` operation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::CapabilityCache;
use crate::config::{HarnessConfig, resolve_env_vars};
use crate::error::Result;
use crate::execute::{ExecutionResult, execute};
use crate::synthesize::{Invocation, synthesize};
use crate::tree::CommandNode;

/// Harness for one target CLI binary.
///
/// Read-mostly after construction: the capability tree is built once on
/// first use and shared; `rebuild_capabilities` replaces it atomically.
pub struct RosaHarness {
    binary: String,
    region: Option<String>,
    /// Env overrides injected into every subprocess, `${VAR}` refs resolved.
    env: HashMap<String, String>,
    timeout: Duration,
    help_timeout: Duration,
    cache: CapabilityCache,
}

impl RosaHarness {
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            binary: config.binary,
            region: config.region,
            env: resolve_env_vars(&config.env),
            timeout: Duration::from_secs(config.timeout_secs),
            help_timeout: Duration::from_secs(config.help_timeout_secs),
            cache: CapabilityCache::new(),
        })
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// The capability tree for the target binary, built on first use.
    pub async fn capability_tree(&self) -> Result<Arc<CommandNode>> {
        self.cache
            .get_or_build(&self.binary, &self.env, self.help_timeout)
            .await
    }

    /// Force a fresh discovery walk, atomically replacing the cached tree.
    pub async fn rebuild_capabilities(&self) -> Result<Arc<CommandNode>> {
        self.cache
            .rebuild(&self.binary, &self.env, self.help_timeout)
            .await
    }

    /// Synthesize `command` against the capability tree without executing.
    pub async fn build_invocation(&self, command: &str) -> Result<Invocation> {
        let tree = self.capability_tree().await?;
        synthesize(&self.binary, command, &tree, self.region.as_deref())
    }

    /// Resolve, synthesize, and execute one user command.
    pub async fn run(&self, command: &str) -> Result<ExecutionResult> {
        let invocation = self.build_invocation(command).await?;
        execute(&invocation, &self.env, self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarnessError;
    use crate::execute::ParsedPayload;
    use crate::test_support::scenario_a_cli;

    fn harness_for(binary: String) -> RosaHarness {
        RosaHarness::new(HarnessConfig {
            binary,
            timeout_secs: 10,
            help_timeout_secs: 5,
            region: Some("us-east-1".to_string()),
            env: Default::default(),
        })
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = HarnessConfig {
            binary: "".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            RosaHarness::new(config),
            Err(HarnessError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_build_invocation_appends_derived_flags() {
        let (_dir, binary) = scenario_a_cli();
        let harness = harness_for(binary.clone());
        let invocation = harness
            .build_invocation("create cluster --name foo")
            .await
            .unwrap();
        assert_eq!(
            invocation.argv(),
            [
                binary.as_str(),
                "create",
                "cluster",
                "--name",
                "foo",
                "-ojson",
                "--region=us-east-1"
            ]
        );
    }

    #[tokio::test]
    async fn test_run_decodes_structured_stdout() {
        let (_dir, binary) = scenario_a_cli();
        let harness = harness_for(binary);
        let result = harness.run("create cluster --name foo").await.unwrap();
        assert_eq!(
            result.stdout,
            ParsedPayload::Structured(serde_json::json!({"kind": "Cluster", "name": "foo"}))
        );
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_run_unknown_command_fails_before_execution() {
        let (dir, binary) = scenario_a_cli();
        let harness = harness_for(binary);
        let _ = harness.capability_tree().await.unwrap();
        let calls_before = std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap()
            .lines()
            .count();

        let err = harness.run("destroy cluster").await.unwrap_err();
        assert!(matches!(err, HarnessError::UnknownCommand(ref s) if s == "destroy"));

        let calls_after = std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap()
            .lines()
            .count();
        assert_eq!(calls_before, calls_after, "nothing may be executed");
    }

    #[tokio::test]
    async fn test_tree_is_built_once_across_runs() {
        let (dir, binary) = scenario_a_cli();
        let harness = harness_for(binary);
        harness.run("create cluster --name foo").await.unwrap();
        let calls_first = std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap()
            .lines()
            .filter(|l| l.ends_with("--help"))
            .count();

        harness.run("create cluster --name foo").await.unwrap();
        let calls_second = std::fs::read_to_string(dir.path().join("calls.log"))
            .unwrap()
            .lines()
            .filter(|l| l.ends_with("--help"))
            .count();
        assert_eq!(calls_first, calls_second);
    }
}

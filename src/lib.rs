//! rosa-harness — capability-discovering harness for the ROSA CLI.
//!
//! Discovers the target CLI's command hierarchy by recursively introspecting
//! its `--help` output, caches the resulting capability tree per binary,
//! synthesizes flag-correct invocations from free-form command strings,
//! executes them with timeout-kill semantics, and brackets authenticated
//! operations with an OCM login/logout session.

pub mod cache;
pub mod config;
pub mod error;
pub mod execute;
pub mod harness;
pub mod introspect;
pub mod session;
pub mod synthesize;
pub mod tree;

#[cfg(test)]
mod test_support;

pub use cache::CapabilityCache;
pub use config::{HarnessConfig, parse_env_ref, resolve_env_vars};
pub use error::{HarnessError, Result};
pub use execute::{ExecutionResult, ParsedPayload, execute};
pub use harness::RosaHarness;
pub use introspect::{HelpSections, introspect};
pub use session::{
    Auth, CredentialSource, EnvCredentials, HomeOverride, IdentityProvider, SessionManager,
    SessionState,
};
pub use synthesize::{Invocation, synthesize};
pub use tree::{Capabilities, CommandNode, build_tree};

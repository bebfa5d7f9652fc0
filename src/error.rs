//! Error types for ROSA harness operations.

use thiserror::Error;

/// Main error type for harness operations.
///
/// Session-lifecycle failures are deliberately split into distinct variants
/// (`NotLoggedIn`, `LoginFailed`, `EnvironmentMismatch`, `MalformedStatus`)
/// because each implies a different remediation.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// `--help` introspection failed at a command path (spawn failure,
    /// non-zero exit, or help timeout). Aborts the whole tree build.
    #[error("discovery failed at '{0}': {1}")]
    Discovery(String, String),

    /// The user command string could not be split into shell words.
    #[error("invalid command string: {0}")]
    InvalidCommand(String),

    /// A command-path segment does not resolve against the capability tree.
    #[error("unknown command segment '{0}'")]
    UnknownCommand(String),

    /// The synthesized invocation exited non-zero; carries captured stderr.
    #[error("failed to execute: {0}")]
    Execution(String),

    /// Execution exceeded the wait bound; the subprocess was killed.
    #[error("command timed out after {0}s")]
    Timeout(u64),

    /// The credential collaborator could not provide/verify credentials.
    #[error("missing credentials: {0}")]
    MissingCredentials(String),

    /// An unauthenticated operation was attempted without a live login.
    #[error("not logged in to OCM: {0}")]
    NotLoggedIn(String),

    /// The post-login status check could not be executed.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The status check reports a different logged-in environment.
    #[error("User is logged in to OCM in {actual} environment and not {expected} environment.")]
    EnvironmentMismatch { expected: String, actual: String },

    /// The status response was not a structured mapping.
    #[error("status response is not a mapping: {0}")]
    MalformedStatus(String),

    /// Invalid harness configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

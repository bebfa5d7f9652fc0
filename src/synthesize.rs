//! Command synthesis — resolves a free-form user command string against the
//! capability tree and appends derived flags in a fixed, deterministic order.
//!
//! Synthesized flag strings are stable and documented:
//! `-ojson`, `--yes`, `--mode=auto`, `--region={region}`.

use std::fmt;

use regex::Regex;

use crate::error::{HarnessError, Result};
use crate::tree::CommandNode;

/// Structured-output flag appended for `structured_output` leaves.
pub const STRUCTURED_OUTPUT_FLAG: &str = "-ojson";
/// Auto-confirm flag appended for `auto_confirm` leaves.
pub const AUTO_CONFIRM_FLAG: &str = "--yes";
/// Unattended-mode flag appended for `unattended_mode` leaves.
pub const UNATTENDED_MODE_FLAG: &str = "--mode=auto";

/// Fixed placeholder substituted for token values in logs.
const TOKEN_MASK: &str = "--token=hashed-token";

/// A fully-formed argument vector: binary name, the user's tokens in their
/// original order, then synthesized flags. Never re-tokenized after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    argv: Vec<String>,
}

impl Invocation {
    /// Build an invocation directly from an argument vector. The first
    /// element is the binary name.
    pub fn from_argv(argv: Vec<String>) -> Self {
        debug_assert!(!argv.is_empty());
        Self { argv }
    }

    /// The complete argument vector, binary included.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// The binary name (first element).
    pub fn binary(&self) -> &str {
        &self.argv[0]
    }

    /// The arguments after the binary name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// The joined command line with any `--token=…` value replaced by a
    /// fixed placeholder. This is the only form that may be logged.
    pub fn masked(&self) -> String {
        let token_re = Regex::new(r"--token=\S*").expect("valid regex");
        token_re
            .replace_all(&self.argv.join(" "), TOKEN_MASK)
            .into_owned()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Resolve `user_command` against `tree` and synthesize the invocation.
///
/// Tokens are split with shell-quoting rules, so quoted values with spaces
/// stay single tokens. Tokens not starting with `--` are treated as path
/// segments until a leaf is reached; past the leaf they pass through as
/// values. A segment that matches no child of a non-leaf node fails with
/// [`HarnessError::UnknownCommand`].
///
/// Derived flags are appended in fixed order: structured output, auto
/// confirm, unattended mode, region. The region flag is silently omitted
/// when the leaf does not declare region support — a deliberate no-op, not
/// an error.
pub fn synthesize(
    binary: &str,
    user_command: &str,
    tree: &CommandNode,
    region: Option<&str>,
) -> Result<Invocation> {
    let tokens = shell_words::split(user_command)
        .map_err(|e| HarnessError::InvalidCommand(e.to_string()))?;

    let mut node = tree;
    for token in tokens.iter().filter(|t| !t.starts_with("--")) {
        if node.is_leaf() {
            // Remaining bare tokens are values for pass-through flags.
            break;
        }
        match node.children.get(token) {
            Some(child) => node = child,
            None => return Err(HarnessError::UnknownCommand(token.clone())),
        }
    }

    let mut argv = Vec::with_capacity(tokens.len() + 5);
    argv.push(binary.to_string());
    argv.extend(tokens);

    if let Some(caps) = &node.capabilities {
        if caps.structured_output {
            argv.push(STRUCTURED_OUTPUT_FLAG.to_string());
        }
        if caps.auto_confirm {
            argv.push(AUTO_CONFIRM_FLAG.to_string());
        }
        if caps.unattended_mode {
            argv.push(UNATTENDED_MODE_FLAG.to_string());
        }
        if caps.region_scoped {
            if let Some(region) = region {
                argv.push(format!("--region={}", region));
            }
        }
    }

    Ok(Invocation { argv })
}

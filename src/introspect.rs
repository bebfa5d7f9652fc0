//! Help introspection — runs the target CLI with `--help` at a command path
//! and extracts the sub-command and flag-descriptor sections from its output.
//!
//! One subprocess spawn per call; caching is the capability cache's concern,
//! not this layer's. The section boundaries deliberately mirror the captured
//! output format of the rosa CLI and must not be generalized: tests are built
//! against literal help-text fixtures.

use std::collections::HashMap;
use std::time::Duration;

use regex::Regex;

use crate::error::{HarnessError, Result};

/// The two text blocks extracted from one `--help` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HelpSections {
    /// Sub-command names listed under "Available Commands:". Empty when the
    /// command has no sub-commands (a leaf).
    pub subcommands: Vec<String>,
    /// Flag-descriptor lines from the "Flags:" section, including the
    /// "Global Flags:" tail. Used for substring matching against known flag
    /// signatures, never parsed structurally.
    pub flags: Vec<String>,
}

/// Run `binary [path…] --help` and extract both help sections from stdout.
///
/// Fails with [`HarnessError::Discovery`] when the subprocess cannot be
/// spawned, exits non-zero, or does not complete within `timeout`.
pub async fn introspect(
    binary: &str,
    path: &[String],
    env: &HashMap<String, String>,
    timeout: Duration,
) -> Result<HelpSections> {
    let display_path = if path.is_empty() {
        binary.to_string()
    } else {
        format!("{} {}", binary, path.join(" "))
    };

    let mut cmd = tokio::process::Command::new(binary);
    cmd.args(path);
    cmd.arg("--help");
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    for (k, v) in env {
        cmd.env(k, v);
    }

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| {
            HarnessError::Discovery(
                display_path.clone(),
                format!("--help timed out after {}ms", timeout.as_millis()),
            )
        })?
        .map_err(|e| {
            HarnessError::Discovery(display_path.clone(), format!("failed to spawn: {}", e))
        })?;

    if !output.status.success() {
        return Err(HarnessError::Discovery(
            display_path,
            format!(
                "--help exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    let help_text = String::from_utf8_lossy(&output.stdout).into_owned();

    tracing::debug!(
        path = %display_path,
        bytes = %help_text.len(),
        "introspected --help output"
    );

    Ok(HelpSections {
        subcommands: extract_subcommands(&help_text),
        flags: extract_flags(&help_text),
    })
}

/// Extract sub-command names from the section between "Available Commands:"
/// and the "Flags:" marker. The first whitespace-delimited token of each
/// non-empty line is the command name. No section means no sub-commands.
pub fn extract_subcommands(help_text: &str) -> Vec<String> {
    let section_re =
        Regex::new(r"(?s)Available Commands:(.*)\nFlags:").expect("valid regex");

    let Some(caps) = section_re.captures(help_text) else {
        return Vec::new();
    };

    caps[1]
        .trim()
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Extract flag-descriptor lines from the "Flags:" section.
///
/// Captures both the text between "Flags:" and "Global Flags:" and the text
/// after "Global Flags:", joined with a space before line-splitting — global
/// flags count toward capability detection. No "Global Flags:" terminator
/// means no flags are extracted.
pub fn extract_flags(help_text: &str) -> Vec<String> {
    let section_re = Regex::new(r"(?s)Flags:(.*)Global Flags:(.*)").expect("valid regex");

    let Some(caps) = section_re.captures(help_text) else {
        return Vec::new();
    };

    format!("{} {}", &caps[1], &caps[2])
        .trim()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

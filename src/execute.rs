//! Execution engine — runs a synthesized invocation as a subprocess with a
//! bounded wait, classifies success by exit status, and decodes each output
//! stream independently.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, Result};
use crate::synthesize::Invocation;

/// One decoded output stream: structured when the raw text parses as JSON,
/// raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    Structured(serde_json::Value),
    Raw(String),
}

impl ParsedPayload {
    /// Attempt the structured decode; degrade to raw text on failure.
    pub fn from_text(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(value) => ParsedPayload::Structured(value),
            Err(_) => ParsedPayload::Raw(text.to_string()),
        }
    }

    /// The payload as a structured mapping, if it is one.
    pub fn as_object(&self) -> Option<&serde_json::Map<String, serde_json::Value>> {
        match self {
            ParsedPayload::Structured(value) => value.as_object(),
            ParsedPayload::Raw(_) => None,
        }
    }

    /// The raw text form, if the payload did not decode.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedPayload::Raw(text) => Some(text),
            ParsedPayload::Structured(_) => None,
        }
    }

    /// Substring check over the rendered payload.
    pub fn contains(&self, needle: &str) -> bool {
        match self {
            ParsedPayload::Raw(text) => text.contains(needle),
            ParsedPayload::Structured(value) => value.to_string().contains(needle),
        }
    }

    /// The raw text split into its ordered lines. Secondary parsing entry
    /// point for line-oriented output.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ParsedPayload::Raw(text) => text.lines().map(str::to_string).collect(),
            ParsedPayload::Structured(value) => vec![value.to_string()],
        }
    }
}

impl fmt::Display for ParsedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedPayload::Raw(text) => f.write_str(text),
            ParsedPayload::Structured(value) => write!(f, "{}", value),
        }
    }
}

/// Result of a successful execution. Streams are decoded independently; a
/// decode failure on one never affects the other.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub stdout: ParsedPayload,
    pub stderr: ParsedPayload,
    pub exit_code: i32,
}

/// Execute `invocation` as a subprocess, waiting at most `timeout`.
///
/// The invocation is logged in masked form before spawning. A non-zero exit
/// fails with [`HarnessError::Execution`] carrying captured stderr; no
/// partial result is returned on that path. On timeout the child is killed,
/// not left running.
pub async fn execute(
    invocation: &Invocation,
    env: &HashMap<String, String>,
    timeout: Duration,
) -> Result<ExecutionResult> {
    let start = Instant::now();

    tracing::info!(
        command = %invocation.masked(),
        timeout_secs = %timeout.as_secs(),
        "executing command"
    );

    let mut cmd = tokio::process::Command::new(invocation.binary());
    cmd.args(invocation.args());
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());
    for (k, v) in env {
        cmd.env(k, v);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| HarnessError::Execution(format!("failed to spawn '{}': {}", invocation.binary(), e)))?;

    // Take pipes before waiting so the child stays killable on timeout.
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();

    let output = tokio::select! {
        result = async {
            use tokio::io::AsyncReadExt;
            let mut stdout_bytes = Vec::new();
            let mut stderr_bytes = Vec::new();
            if let Some(mut out) = stdout_pipe {
                let _ = out.read_to_end(&mut stdout_bytes).await;
            }
            if let Some(mut err) = stderr_pipe {
                let _ = err.read_to_end(&mut stderr_bytes).await;
            }
            let status = child
                .wait()
                .await
                .map_err(|e| HarnessError::Execution(format!("process wait error: {}", e)))?;
            Ok::<std::process::Output, HarnessError>(std::process::Output {
                status,
                stdout: stdout_bytes,
                stderr: stderr_bytes,
            })
        } => result?,
        _ = tokio::time::sleep(timeout) => {
            // Kill the process, not just the future.
            let _ = child.kill().await;
            return Err(HarnessError::Timeout(timeout.as_secs()));
        }
    };

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    tracing::info!(
        command = %invocation.masked(),
        exit_code = %exit_code,
        duration_ms = %start.elapsed().as_millis(),
        "command finished"
    );

    if exit_code != 0 {
        return Err(HarnessError::Execution(stderr));
    }

    Ok(ExecutionResult {
        stdout: ParsedPayload::from_text(&stdout),
        stderr: ParsedPayload::from_text(&stderr),
        exit_code,
    })
}

//! External tool runner
//!
//! Spawns a tool, waits for it without blocking the runtime and returns the
//! captured output as a value. Every run is bounded by a timeout; the child
//! is killed when the wait is abandoned.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;

use super::ConversionError;

/// Captured result of a finished tool run
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }
}

/// Display name for a tool program (`/usr/bin/qpdf` -> `qpdf`).
pub fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

/// Run a command, accepting the listed exit codes as success.
pub async fn run_tool(
    tool: &str,
    cmd: &mut Command,
    timeout: Duration,
    accepted_codes: &[i32],
) -> Result<ToolOutput, ConversionError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| ConversionError::TimedOut {
            tool: tool.to_string(),
            timeout,
        })?
        .map_err(|e| ConversionError::Spawn {
            tool: tool.to_string(),
            source: e,
        })?;

    let output = ToolOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    };

    tracing::debug!(
        tool,
        status = %output.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Tool finished"
    );

    match output.code() {
        Some(code) if accepted_codes.contains(&code) => Ok(output),
        _ => {
            tracing::error!(tool, status = %output.status, stderr = %output.stderr, "Tool failed");
            Err(ConversionError::Failed {
                tool: tool.to_string(),
                status: output.status.to_string(),
                stderr: output.stderr,
            })
        }
    }
}

/// Check whether a program can be started at all.
pub async fn probe(program: &Path, version_flag: &str) -> bool {
    let mut cmd = Command::new(program);
    cmd.arg(version_flag);
    matches!(
        run_tool(&tool_name(program), &mut cmd, Duration::from_secs(10), &[0]).await,
        Ok(_)
    )
}

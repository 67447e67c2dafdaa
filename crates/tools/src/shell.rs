//! Shell and AppleScript execution.

use serde_json::Value;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use wayfarer_core::error::ToolError;
use wayfarer_core::tool::ToolResult;
use crate::args::{optional_str, optional_u64, required_str};
use crate::paths;

/// Upper bound a model may ask for via `timeout_secs`.
const MAX_TIMEOUT_SECS: u64 = 600;

pub(crate) async fn run_shell(args: &Value, home: &Path, default_timeout: Duration) -> Result<ToolResult, ToolError> {
    let command = required_str(args, "command")?;
    let cwd = optional_str(args, "cwd")
        .map(|raw| paths::expand(raw, home))
        .unwrap_or_else(|| home.to_path_buf());
    if !cwd.is_dir() {
        return Ok(ToolResult::failed(format!("Working directory {} does not exist", cwd.display())));
    }
    let timeout = optional_u64(args, "timeout_secs")
        .map(|secs| Duration::from_secs(secs.clamp(1, MAX_TIMEOUT_SECS)))
        .unwrap_or(default_timeout);

    debug!(command = %command, cwd = %cwd.display(), "Executing shell command");

    let mut cmd = if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };
    cmd.current_dir(&cwd);
    run("run_shell", cmd, timeout).await
}

pub(crate) async fn run_applescript(args: &Value, default_timeout: Duration) -> Result<ToolResult, ToolError> {
    let script = required_str(args, "script")?;
    if !cfg!(target_os = "macos") {
        return Err(ToolError::Unsupported("AppleScript is only available on macOS".into()));
    }

    let mut cmd = Command::new("osascript");
    cmd.args(["-e", script]);
    run("run_applescript", cmd, default_timeout).await
}

/// Run a prepared command, collecting stdout and stderr under a timeout.
async fn run(tool: &str, mut cmd: Command, timeout: Duration) -> Result<ToolResult, ToolError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool.to_string(),
        reason: e.to_string(),
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(ToolError::ExecutionFailed {
                tool_name: tool.to_string(),
                reason: e.to_string(),
            });
        }
        Err(_) => {
            warn!(tool, timeout_secs = timeout.as_secs(), "Command timed out");
            return Err(ToolError::Timeout {
                tool_name: tool.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    if output.status.success() {
        let text = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            format!("{}\n[stderr]: {}", stdout.trim(), stderr.trim())
        };
        let text = if text.is_empty() { "(no output)".to_string() } else { text };
        Ok(ToolResult::ok(text))
    } else {
        let code = output.status.code().unwrap_or(-1);
        warn!(tool, exit_code = code, "Command failed");
        Ok(ToolResult::failed(
            format!("[exit code: {code}]\n{}\n{}", stdout.trim(), stderr.trim())
                .trim()
                .to_string(),
        ))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn echo_succeeds() {
        let home = TempDir::new().unwrap();
        let result = run_shell(&json!({"command": "echo hello"}), home.path(), TIMEOUT)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello");
    }

    #[tokio::test]
    async fn runs_in_home_by_default() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join("marker.txt"), "x").unwrap();
        let result = run_shell(&json!({"command": "ls"}), home.path(), TIMEOUT).await.unwrap();
        assert!(result.output.contains("marker.txt"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_failed_result() {
        let home = TempDir::new().unwrap();
        let result = run_shell(&json!({"command": "echo oops >&2; exit 3"}), home.path(), TIMEOUT)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("[exit code: 3]"));
        assert!(result.output.contains("oops"));
    }

    #[tokio::test]
    async fn timeout_is_an_error() {
        let home = TempDir::new().unwrap();
        let err = run_shell(&json!({"command": "sleep 5", "timeout_secs": 1}), home.path(), TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Timeout { timeout_secs: 1, .. }));
    }

    #[tokio::test]
    async fn missing_command_is_invalid() {
        let home = TempDir::new().unwrap();
        let err = run_shell(&json!({}), home.path(), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[cfg(not(target_os = "macos"))]
    #[tokio::test]
    async fn applescript_needs_macos() {
        let err = run_applescript(&json!({"script": "beep"}), TIMEOUT).await.unwrap_err();
        assert!(matches!(err, ToolError::Unsupported(_)));
    }
}

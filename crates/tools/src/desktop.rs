//! Clipboard, `open_target`, and `system_info`, using the host's standard
//! command-line utilities.

use serde_json::Value;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use wayfarer_core::error::ToolError;
use wayfarer_core::tool::ToolResult;
use crate::args::{required_str, required_text};
use crate::paths;

/// A host utility invocation: program plus fixed arguments.
type Utility = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const PASTE: &[Utility] = &[("pbpaste", &[])];
#[cfg(target_os = "macos")]
const COPY: &[Utility] = &[("pbcopy", &[])];

#[cfg(target_os = "windows")]
const PASTE: &[Utility] = &[("powershell", &["-NoProfile", "-Command", "Get-Clipboard"])];
#[cfg(target_os = "windows")]
const COPY: &[Utility] = &[("clip", &[])];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PASTE: &[Utility] = &[
    ("wl-paste", &["--no-newline"]),
    ("xclip", &["-selection", "clipboard", "-o"]),
    ("xsel", &["--clipboard", "--output"]),
];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const COPY: &[Utility] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
];

fn unsupported(what: &str) -> ToolError {
    ToolError::Unsupported(format!(
        "no {what} utility found (install wl-clipboard, xclip, or xsel)"
    ))
}

pub(crate) async fn clipboard_read() -> Result<ToolResult, ToolError> {
    for (program, args) in PASTE {
        let output = Command::new(program)
            .args(*args)
            .stdin(Stdio::null())
            .output()
            .await;
        match output {
            Ok(out) if out.status.success() => {
                let text = String::from_utf8_lossy(&out.stdout).into_owned();
                if text.is_empty() {
                    return Ok(ToolResult::ok("(clipboard is empty)"));
                }
                return Ok(ToolResult::ok(text));
            }
            Ok(out) => {
                debug!(program, code = ?out.status.code(), "Clipboard utility failed, trying next");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Ok(ToolResult::failed(format!("{program} failed: {e}"))),
        }
    }
    Err(unsupported("clipboard"))
}

pub(crate) async fn clipboard_write(args: &Value) -> Result<ToolResult, ToolError> {
    let text = required_text(args, "text")?;

    for (program, util_args) in COPY {
        let spawned = Command::new(program)
            .args(*util_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == ErrorKind::NotFound => continue,
            Err(e) => return Ok(ToolResult::failed(format!("{program} failed: {e}"))),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()).await {
                return Ok(ToolResult::failed(format!("{program} failed: {e}")));
            }
            // dropping stdin closes the pipe so the utility can exit
        }
        match child.wait().await {
            Ok(status) if status.success() => {
                return Ok(ToolResult::ok(format!(
                    "Copied {} characters to the clipboard",
                    text.chars().count()
                )));
            }
            Ok(status) => debug!(program, code = ?status.code(), "Clipboard utility failed, trying next"),
            Err(e) => return Ok(ToolResult::failed(format!("{program} failed: {e}"))),
        }
    }
    Err(unsupported("clipboard"))
}

pub(crate) async fn open_target(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let raw = required_str(args, "target")?.trim();
    let target = if raw.contains("://") || raw.starts_with("mailto:") {
        raw.to_string()
    } else if raw.starts_with('~') || raw.starts_with('/') || raw.starts_with('.') {
        paths::expand(raw, home).display().to_string()
    } else {
        raw.to_string()
    };

    let mut cmd = if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        // bare names such as "Safari" are applications
        if !target.contains('/') && !target.contains(':') {
            cmd.arg("-a");
        }
        cmd.arg(&target);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", ""]).arg(&target);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(&target);
        cmd
    };

    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => Ok(ToolResult::ok(format!("Opened {target}"))),
        Ok(status) => Ok(ToolResult::failed(format!(
            "Could not open {target} (exit code {})",
            status.code().unwrap_or(-1)
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ToolError::Unsupported(
            "no opener utility found on this system".into(),
        )),
        Err(e) => Ok(ToolResult::failed(format!("Could not open {target}: {e}"))),
    }
}

pub(crate) async fn system_info(home: &Path) -> Result<ToolResult, ToolError> {
    let hostname = match Command::new("hostname").output().await {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim().to_string(),
        _ => std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .unwrap_or_else(|_| "unknown".into()),
    };

    let info = [
        format!("os: {}", std::env::consts::OS),
        format!("arch: {}", std::env::consts::ARCH),
        format!("hostname: {hostname}"),
        format!("home: {}", home.display()),
        format!("time: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S %:z")),
    ];
    Ok(ToolResult::ok(info.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn system_info_reports_host_facts() {
        let result = system_info(Path::new("/home/ada")).await.unwrap();
        assert!(result.success);
        assert!(result.output.contains(&format!("os: {}", std::env::consts::OS)));
        assert!(result.output.contains("home: /home/ada"));
        assert!(result.output.contains("time: "));
    }

    #[tokio::test]
    async fn clipboard_write_requires_text() {
        let err = clipboard_write(&json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn open_target_requires_target() {
        let err = open_target(&json!({"target": " "}), Path::new("/home/ada")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

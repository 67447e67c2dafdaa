//! Filesystem tools.
//!
//! Missing files and similar everyday failures come back as failed
//! results the model can react to; only bad arguments and protected
//! paths are errors.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use wayfarer_core::error::ToolError;
use wayfarer_core::tool::ToolResult;
use crate::args::{flag, optional_str, optional_u64, required_str, required_text};
use crate::output::MAX_OUTPUT_BYTES;
use crate::paths::{self, guard};

const MAX_DIR_ENTRIES: usize = 500;
const DEFAULT_SEARCH_RESULTS: usize = 50;
const MAX_SEARCH_DEPTH: usize = 8;
/// Entries visited before a search gives up.
const SEARCH_BUDGET: usize = 20_000;

fn failed(action: &str, path: &Path, e: std::io::Error) -> ToolResult {
    ToolResult::failed(format!("Failed to {action} {}: {e}", path.display()))
}

pub(crate) async fn read_file(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let path = paths::expand(required_str(args, "path")?, home);

    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) => return Ok(failed("read", &path, e)),
    };
    if meta.is_dir() {
        return Ok(ToolResult::failed(format!(
            "{} is a directory; use read_dir to list it",
            path.display()
        )));
    }

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => return Ok(failed("read", &path, e)),
    };
    if bytes.iter().take(8192).any(|b| *b == 0) {
        return Ok(ToolResult::failed(format!(
            "{} looks like a binary file ({} bytes)",
            path.display(),
            bytes.len()
        )));
    }

    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_OUTPUT_BYTES + 1)]).into_owned();
    Ok(ToolResult::ok(text))
}

pub(crate) async fn write_file(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let path = paths::expand(required_str(args, "path")?, home);
    let content = required_text(args, "content")?;
    let append = flag(args, "append");
    guard("write_file", &path, home)?;

    if let Some(parent) = path.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        return Ok(failed("create directory", parent, e));
    }

    let written = if append {
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await;
        match file {
            Ok(mut file) => file.write_all(content.as_bytes()).await,
            Err(e) => Err(e),
        }
    } else {
        tokio::fs::write(&path, content).await
    };

    match written {
        Ok(()) => {
            let verb = if append { "Appended" } else { "Wrote" };
            Ok(ToolResult::ok(format!("{verb} {} bytes to {}", content.len(), path.display())))
        }
        Err(e) => Ok(failed("write", &path, e)),
    }
}

pub(crate) async fn read_dir(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let path = paths::expand(required_str(args, "path")?, home);

    let mut reader = match tokio::fs::read_dir(&path).await {
        Ok(reader) => reader,
        Err(e) => return Ok(failed("list", &path, e)),
    };

    let mut names = Vec::new();
    loop {
        match reader.next_entry().await {
            Ok(Some(entry)) => {
                let mut name = entry.file_name().to_string_lossy().into_owned();
                if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                    name.push('/');
                }
                names.push(name);
            }
            Ok(None) => break,
            Err(e) => return Ok(failed("list", &path, e)),
        }
    }

    if names.is_empty() {
        return Ok(ToolResult::ok(format!("{} is empty", path.display())));
    }

    names.sort_by_key(|n| n.to_lowercase());
    let total = names.len();
    names.truncate(MAX_DIR_ENTRIES);
    let mut listing = names.join("\n");
    if total > MAX_DIR_ENTRIES {
        listing.push_str(&format!("\n… and {} more", total - MAX_DIR_ENTRIES));
    }
    Ok(ToolResult::ok(listing))
}

pub(crate) async fn create_directory(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let path = paths::expand(required_str(args, "path")?, home);
    guard("create_directory", &path, home)?;

    match tokio::fs::create_dir_all(&path).await {
        Ok(()) => Ok(ToolResult::ok(format!("Created {}", path.display()))),
        Err(e) => Ok(failed("create", &path, e)),
    }
}

pub(crate) async fn move_path(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let from = paths::expand(required_str(args, "from")?, home);
    let to = paths::expand(required_str(args, "to")?, home);
    guard("move_path", &from, home)?;
    guard("move_path", &to, home)?;

    if tokio::fs::try_exists(&to).await.unwrap_or(false) {
        return Ok(ToolResult::failed(format!("{} already exists", to.display())));
    }
    if let Some(parent) = to.parent()
        && let Err(e) = tokio::fs::create_dir_all(parent).await
    {
        return Ok(failed("create directory", parent, e));
    }

    match tokio::fs::rename(&from, &to).await {
        Ok(()) => Ok(ToolResult::ok(format!("Moved {} to {}", from.display(), to.display()))),
        Err(e) => Ok(failed("move", &from, e)),
    }
}

pub(crate) async fn delete_path(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let path = paths::expand(required_str(args, "path")?, home);
    let recursive = flag(args, "recursive");
    guard("delete_path", &path, home)?;

    let meta = match tokio::fs::symlink_metadata(&path).await {
        Ok(meta) => meta,
        Err(e) => return Ok(failed("delete", &path, e)),
    };

    let removed = if meta.is_dir() {
        if recursive {
            tokio::fs::remove_dir_all(&path).await
        } else {
            if !is_empty_dir(&path).await {
                return Ok(ToolResult::failed(format!(
                    "{} is not empty; set recursive to delete it with its contents",
                    path.display()
                )));
            }
            tokio::fs::remove_dir(&path).await
        }
    } else {
        tokio::fs::remove_file(&path).await
    };

    match removed {
        Ok(()) => Ok(ToolResult::ok(format!("Deleted {}", path.display()))),
        Err(e) => Ok(failed("delete", &path, e)),
    }
}

async fn is_empty_dir(path: &Path) -> bool {
    match tokio::fs::read_dir(path).await {
        Ok(mut reader) => matches!(reader.next_entry().await, Ok(None)),
        Err(_) => false,
    }
}

pub(crate) async fn search_files(args: &Value, home: &Path) -> Result<ToolResult, ToolError> {
    let pattern = required_str(args, "pattern")?.to_lowercase();
    let root = optional_str(args, "directory")
        .map(|raw| paths::expand(raw, home))
        .unwrap_or_else(|| home.to_path_buf());
    let limit = optional_u64(args, "max_results")
        .map(|n| n.clamp(1, 500) as usize)
        .unwrap_or(DEFAULT_SEARCH_RESULTS);

    if !root.is_dir() {
        return Ok(ToolResult::failed(format!("{} is not a directory", root.display())));
    }

    debug!(root = %root.display(), pattern = %pattern, "Searching files");
    let (matches, exhausted) = walk(&root, &pattern, limit).await;

    if matches.is_empty() {
        return Ok(ToolResult::ok(format!(
            "No files matching '{pattern}' under {}",
            root.display()
        )));
    }
    let mut listing: Vec<String> = matches.iter().map(|p| p.display().to_string()).collect();
    if exhausted {
        listing.push("(search stopped early; narrow the directory for complete results)".into());
    }
    Ok(ToolResult::ok(listing.join("\n")))
}

/// Breadth-first walk skipping hidden entries. Returns the matches and
/// whether the visit budget ran out.
async fn walk(root: &Path, pattern: &str, limit: usize) -> (Vec<PathBuf>, bool) {
    let mut matches = Vec::new();
    let mut queue = std::collections::VecDeque::from([(root.to_path_buf(), 0usize)]);
    let mut visited = 0usize;

    while let Some((dir, depth)) = queue.pop_front() {
        let Ok(mut reader) = tokio::fs::read_dir(&dir).await else {
            continue;
        };
        while let Ok(Some(entry)) = reader.next_entry().await {
            visited += 1;
            if visited > SEARCH_BUDGET {
                return (matches, true);
            }

            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            if name.contains(pattern) {
                matches.push(path.clone());
                if matches.len() >= limit {
                    return (matches, false);
                }
            }
            if depth < MAX_SEARCH_DEPTH && entry.file_type().await.is_ok_and(|t| t.is_dir()) {
                queue.push_back((path, depth + 1));
            }
        }
    }
    (matches, false)
}

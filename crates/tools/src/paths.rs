//! Path expansion and critical-path protection.
//!
//! Mutating filesystem tools refuse to touch the filesystem root, the home
//! directory itself, system directories, and key material under the home
//! directory. Reads are not restricted.

use std::path::{Component, Path, PathBuf};
use wayfarer_core::error::ToolError;

/// System locations that may never be modified, including anything below them.
const SYSTEM_DIRS: &[&str] = &[
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/lib",
    "/lib64",
    "/proc",
    "/sbin",
    "/sys",
    "/usr",
    "/private/etc",
    "/system",
    "/library",
    "/applications",
    "c:/windows",
    "c:/program files",
    "c:/program files (x86)",
];

/// Home subdirectories holding credentials.
const SENSITIVE_HOME_DIRS: &[&str] = &[".ssh", ".gnupg", ".aws", ".wayfarer"];

/// Expand `~` and resolve relative paths against `home`.
pub fn expand(raw: &str, home: &Path) -> PathBuf {
    let raw = raw.trim();
    let expanded = if raw == "~" {
        home.to_path_buf()
    } else if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        home.join(rest)
    } else {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            path
        } else {
            home.join(path)
        }
    };
    normalize(&expanded)
}

/// Resolve `.` and `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Symlinks are resolved when the path (or its parent) exists.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => match parent.canonicalize() {
            Ok(parent) => parent.join(name),
            Err(_) => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

fn comparable(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/").to_lowercase();
    let trimmed = s.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
}

fn within(path: &str, dir: &str) -> bool {
    path == dir || path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

/// Whether modifying `path` could break the system or the user's account.
pub fn is_critical(path: &Path, home: &Path) -> bool {
    let target = comparable(&resolve(path));
    let home = comparable(&resolve(home));

    if target == "/" || target == home || (target.len() <= 3 && target.ends_with(':')) {
        return true;
    }
    if SYSTEM_DIRS.iter().any(|dir| within(&target, dir)) {
        return true;
    }
    SENSITIVE_HOME_DIRS
        .iter()
        .any(|dir| within(&target, &format!("{home}/{dir}")))
}

/// Fail with `PermissionDenied` when `path` is critical.
pub(crate) fn guard(tool: &str, path: &Path, home: &Path) -> Result<(), ToolError> {
    if is_critical(path, home) {
        return Err(ToolError::PermissionDenied {
            tool_name: tool.to_string(),
            reason: format!("{} is a protected location", path.display()),
        });
    }
    Ok(())
}

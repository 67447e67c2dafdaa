//! The static tool catalog.
//!
//! Every tool the agent can offer a model is defined here once, with its
//! parameter list, danger flag, and confirmation text. Executing them is
//! the [`LocalExecutor`](crate::LocalExecutor)'s job.

use serde_json::Value;
use wayfarer_core::tool::{ParamType, ToolCategory, ToolDefinition, ToolParam};

pub const RUN_SHELL: ToolDefinition = ToolDefinition {
    name: "run_shell",
    description: "Run a shell command on the user's machine and return its combined output. \
                  Prefer the filesystem tools for simple reads and writes.",
    category: ToolCategory::Shell,
    params: &[
        ToolParam::required("command", ParamType::String, "The command line to execute"),
        ToolParam::optional("cwd", ParamType::String, "Working directory (defaults to home)"),
        ToolParam::optional("timeout_secs", ParamType::Integer, "Timeout in seconds (default 60)"),
    ],
    dangerous: true,
    confirm: Some(confirm_shell),
};

pub const RUN_APPLESCRIPT: ToolDefinition = ToolDefinition {
    name: "run_applescript",
    description: "Run an AppleScript through osascript to automate macOS apps. macOS only.",
    category: ToolCategory::Applescript,
    params: &[ToolParam::required("script", ParamType::String, "The AppleScript source")],
    dangerous: true,
    confirm: Some(confirm_applescript),
};

pub const READ_FILE: ToolDefinition = ToolDefinition {
    name: "read_file",
    description: "Read a text file. Large files are cut off.",
    category: ToolCategory::Filesystem,
    params: &[ToolParam::required("path", ParamType::String, "File path; ~ is the home directory")],
    dangerous: false,
    confirm: None,
};

pub const WRITE_FILE: ToolDefinition = ToolDefinition {
    name: "write_file",
    description: "Write text to a file, creating parent directories as needed. Overwrites unless append is set.",
    category: ToolCategory::Filesystem,
    params: &[
        ToolParam::required("path", ParamType::String, "File path; ~ is the home directory"),
        ToolParam::required("content", ParamType::String, "Text to write"),
        ToolParam::optional("append", ParamType::Boolean, "Append instead of overwriting"),
    ],
    dangerous: true,
    confirm: Some(confirm_write),
};

pub const READ_DIR: ToolDefinition = ToolDefinition {
    name: "read_dir",
    description: "List the entries of a directory. Directories end with a slash.",
    category: ToolCategory::Filesystem,
    params: &[ToolParam::required("path", ParamType::String, "Directory path; ~ is the home directory")],
    dangerous: false,
    confirm: None,
};

pub const CREATE_DIRECTORY: ToolDefinition = ToolDefinition {
    name: "create_directory",
    description: "Create a directory and any missing parents.",
    category: ToolCategory::Filesystem,
    params: &[ToolParam::required("path", ParamType::String, "Directory path; ~ is the home directory")],
    dangerous: false,
    confirm: None,
};

pub const MOVE_PATH: ToolDefinition = ToolDefinition {
    name: "move_path",
    description: "Move or rename a file or directory.",
    category: ToolCategory::Filesystem,
    params: &[
        ToolParam::required("from", ParamType::String, "Existing path"),
        ToolParam::required("to", ParamType::String, "Destination path"),
    ],
    dangerous: true,
    confirm: Some(confirm_move),
};

pub const DELETE_PATH: ToolDefinition = ToolDefinition {
    name: "delete_path",
    description: "Delete a file, or a directory when recursive is set.",
    category: ToolCategory::Filesystem,
    params: &[
        ToolParam::required("path", ParamType::String, "Path to delete"),
        ToolParam::optional("recursive", ParamType::Boolean, "Delete directories and their contents"),
    ],
    dangerous: true,
    confirm: Some(confirm_delete),
};

pub const SEARCH_FILES: ToolDefinition = ToolDefinition {
    name: "search_files",
    description: "Find files whose name contains a pattern (case-insensitive) under a directory.",
    category: ToolCategory::Filesystem,
    params: &[
        ToolParam::required("pattern", ParamType::String, "Substring to look for in file names"),
        ToolParam::optional("directory", ParamType::String, "Where to search (defaults to home)"),
        ToolParam::optional("max_results", ParamType::Integer, "Result limit (default 50)"),
    ],
    dangerous: false,
    confirm: None,
};

pub const HTTP_REQUEST: ToolDefinition = ToolDefinition {
    name: "http_request",
    description: "Make an HTTP request and return the status line and body.",
    category: ToolCategory::Http,
    params: &[
        ToolParam::required("url", ParamType::String, "http:// or https:// URL"),
        ToolParam::optional("method", ParamType::String, "HTTP method (default GET)")
            .one_of(&["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"]),
        ToolParam::optional("headers", ParamType::Object, "Request headers as a string map"),
        ToolParam::optional("body", ParamType::String, "Request body"),
    ],
    dangerous: false,
    confirm: None,
};

pub const MEMORY_SEARCH: ToolDefinition = ToolDefinition {
    name: "memory_search",
    description: "Search long-term memory for facts and preferences about the user.",
    category: ToolCategory::Memory,
    params: &[
        ToolParam::required("query", ParamType::String, "What to look for"),
        ToolParam::optional("limit", ParamType::Integer, "Maximum results (default 5)"),
    ],
    dangerous: false,
    confirm: None,
};

pub const MEMORY_ADD: ToolDefinition = ToolDefinition {
    name: "memory_add",
    description: "Remember a fact for future conversations.",
    category: ToolCategory::Memory,
    params: &[ToolParam::required("text", ParamType::String, "The fact to remember")],
    dangerous: false,
    confirm: None,
};

pub const CLIPBOARD_READ: ToolDefinition = ToolDefinition {
    name: "clipboard_read",
    description: "Read the current text on the clipboard.",
    category: ToolCategory::Clipboard,
    params: &[],
    dangerous: false,
    confirm: None,
};

pub const CLIPBOARD_WRITE: ToolDefinition = ToolDefinition {
    name: "clipboard_write",
    description: "Replace the clipboard contents with text.",
    category: ToolCategory::Clipboard,
    params: &[ToolParam::required("text", ParamType::String, "Text to copy")],
    dangerous: false,
    confirm: None,
};

pub const OPEN_TARGET: ToolDefinition = ToolDefinition {
    name: "open_target",
    description: "Open a URL, file, folder, or application with the system's default handler.",
    category: ToolCategory::System,
    params: &[ToolParam::required("target", ParamType::String, "URL, path, or application name")],
    dangerous: false,
    confirm: None,
};

pub const SYSTEM_INFO: ToolDefinition = ToolDefinition {
    name: "system_info",
    description: "Report the operating system, architecture, hostname, home directory, and current time.",
    category: ToolCategory::System,
    params: &[],
    dangerous: false,
    confirm: None,
};

/// Every tool, in the order they are offered to the model.
pub static CATALOG: &[ToolDefinition] = &[
    RUN_SHELL,
    RUN_APPLESCRIPT,
    READ_FILE,
    WRITE_FILE,
    READ_DIR,
    CREATE_DIRECTORY,
    MOVE_PATH,
    DELETE_PATH,
    SEARCH_FILES,
    HTTP_REQUEST,
    MEMORY_SEARCH,
    MEMORY_ADD,
    CLIPBOARD_READ,
    CLIPBOARD_WRITE,
    OPEN_TARGET,
    SYSTEM_INFO,
];

/// Look up a tool by name.
pub fn find(name: &str) -> Option<&'static ToolDefinition> {
    CATALOG.iter().find(|def| def.name == name)
}

/// Catalog entries whose category is in `categories`, in catalog order.
pub fn definitions_for(categories: &[ToolCategory]) -> Vec<&'static ToolDefinition> {
    CATALOG
        .iter()
        .filter(|def| categories.contains(&def.category))
        .collect()
}

fn arg<'a>(args: &'a Value, key: &str) -> &'a str {
    args.get(key).and_then(Value::as_str).unwrap_or("?")
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

fn confirm_shell(args: &Value) -> String {
    format!("Run shell command: {}", preview(arg(args, "command"), 200))
}

fn confirm_applescript(args: &Value) -> String {
    format!("Run AppleScript:\n{}", preview(arg(args, "script"), 300))
}

fn confirm_write(args: &Value) -> String {
    let verb = if args.get("append").and_then(Value::as_bool).unwrap_or(false) {
        "Append to"
    } else {
        "Write"
    };
    let bytes = args.get("content").and_then(Value::as_str).map_or(0, str::len);
    format!("{verb} file {} ({bytes} bytes)", arg(args, "path"))
}

fn confirm_move(args: &Value) -> String {
    format!("Move {} to {}", arg(args, "from"), arg(args, "to"))
}

fn confirm_delete(args: &Value) -> String {
    if args.get("recursive").and_then(Value::as_bool).unwrap_or(false) {
        format!("Delete {} and everything inside it", arg(args, "path"))
    } else {
        format!("Delete {}", arg(args, "path"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique() {
        let names: HashSet<_> = CATALOG.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), CATALOG.len());
        assert_eq!(CATALOG.len(), 16);
    }

    #[test]
    fn dangerous_tools() {
        let dangerous: Vec<_> = CATALOG.iter().filter(|d| d.dangerous).map(|d| d.name).collect();
        assert_eq!(
            dangerous,
            vec!["run_shell", "run_applescript", "write_file", "move_path", "delete_path"]
        );
        // every dangerous tool renders its own confirmation
        assert!(CATALOG.iter().filter(|d| d.dangerous).all(|d| d.confirm.is_some()));
    }

    #[test]
    fn find_by_name() {
        assert_eq!(find("read_dir").map(|d| d.category), Some(ToolCategory::Filesystem));
        assert!(find("rm_rf").is_none());
    }

    #[test]
    fn filter_by_category() {
        let names: Vec<_> = definitions_for(&[ToolCategory::Memory, ToolCategory::Clipboard])
            .iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["memory_search", "memory_add", "clipboard_read", "clipboard_write"]);
        assert!(definitions_for(&[]).is_empty());
    }

    #[test]
    fn primary_params() {
        assert_eq!(RUN_SHELL.primary_param().map(|p| p.name), Some("command"));
        assert_eq!(SEARCH_FILES.primary_param().map(|p| p.name), Some("pattern"));
        assert!(SYSTEM_INFO.primary_param().is_none());
    }

    #[test]
    fn confirmation_messages() {
        assert_eq!(
            RUN_SHELL.confirmation_message(&json!({"command": "rm -rf ~/tmp"})),
            "Run shell command: rm -rf ~/tmp"
        );
        assert_eq!(
            DELETE_PATH.confirmation_message(&json!({"path": "~/old", "recursive": true})),
            "Delete ~/old and everything inside it"
        );
        assert_eq!(
            WRITE_FILE.confirmation_message(&json!({"path": "~/a.txt", "content": "hello"})),
            "Write file ~/a.txt (5 bytes)"
        );
        assert!(MOVE_PATH.confirmation_message(&json!({})).contains('?'));
    }

    #[test]
    fn long_commands_are_previewed() {
        let msg = confirm_shell(&json!({"command": "x".repeat(500)}));
        assert!(msg.ends_with('…'));
        assert!(msg.chars().count() < 230);
    }
}

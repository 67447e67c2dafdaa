//! The local tool executor.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wayfarer_core::error::ToolError;
use wayfarer_core::memory::MemoryStore;
use wayfarer_core::tool::{ToolExecutor, ToolResult};
use crate::{desktop, fs, http_request, memory, output, shell};

const DEFAULT_SHELL_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs catalog tools on the local machine.
///
/// Relative paths and `~` resolve against the home directory, output is
/// capped at [`MAX_OUTPUT_BYTES`](crate::output::MAX_OUTPUT_BYTES), and
/// mutating filesystem tools refuse protected locations.
pub struct LocalExecutor {
    home: PathBuf,
    memory: Arc<dyn MemoryStore>,
    http: reqwest::Client,
    shell_timeout: Duration,
}

impl LocalExecutor {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("wayfarer/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build HTTP client, using defaults");
                reqwest::Client::default()
            });
        Self {
            home: wayfarer_config::home_dir(),
            memory,
            http,
            shell_timeout: DEFAULT_SHELL_TIMEOUT,
        }
    }

    /// Resolve paths against `home` instead of the user's home directory.
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = home.into();
        self
    }

    pub fn with_shell_timeout(mut self, timeout: Duration) -> Self {
        self.shell_timeout = timeout;
        self
    }

    pub fn home(&self) -> &Path {
        &self.home
    }
}

#[async_trait]
impl ToolExecutor for LocalExecutor {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<ToolResult, ToolError> {
        let home = self.home.as_path();
        let started = Instant::now();

        let result = match name {
            "run_shell" => shell::run_shell(arguments, home, self.shell_timeout).await,
            "run_applescript" => shell::run_applescript(arguments, self.shell_timeout).await,
            "read_file" => fs::read_file(arguments, home).await,
            "write_file" => fs::write_file(arguments, home).await,
            "read_dir" => fs::read_dir(arguments, home).await,
            "create_directory" => fs::create_directory(arguments, home).await,
            "move_path" => fs::move_path(arguments, home).await,
            "delete_path" => fs::delete_path(arguments, home).await,
            "search_files" => fs::search_files(arguments, home).await,
            "http_request" => http_request::http_request(&self.http, arguments).await,
            "memory_search" => memory::memory_search(self.memory.as_ref(), arguments).await,
            "memory_add" => memory::memory_add(self.memory.as_ref(), arguments).await,
            "clipboard_read" => desktop::clipboard_read().await,
            "clipboard_write" => desktop::clipboard_write(arguments).await,
            "open_target" => desktop::open_target(arguments, home).await,
            "system_info" => desktop::system_info(home).await,
            other => Err(ToolError::NotFound(other.to_string())),
        }?;

        debug!(
            tool = name,
            success = result.success,
            bytes = result.output.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Tool finished"
        );

        Ok(ToolResult {
            output: output::cap(result.output),
            ..result
        })
    }
}

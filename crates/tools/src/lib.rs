//! The tool catalog and a local executor for Wayfarer.
//!
//! [`catalog`] is the static list of tools a model may be offered.
//! [`LocalExecutor`] performs them on this machine: shell commands,
//! filesystem operations, HTTP, long-term memory, the clipboard, and
//! opening files or URLs.

mod args;
pub mod catalog;
mod desktop;
mod executor;
mod fs;
mod http_request;
mod memory;
pub mod output;
pub mod paths;
mod shell;

pub use catalog::{CATALOG, definitions_for, find};
pub use executor::LocalExecutor;
pub use memory::AGENT_SOURCE;

//! Subcommand implementations.

pub mod chat;
pub mod config_cmd;
pub mod route;
pub mod run;
pub mod tools;

use std::path::Path;
use wayfarer_config::AppConfig;

/// Load the config file (default or explicit), then environment overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        None => AppConfig::load(),
        Some(path) => AppConfig::load_from(path).and_then(|mut config| {
            config.apply_env(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

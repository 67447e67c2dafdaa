//! `wayfarer config`: Configuration helpers.

use std::path::Path;
use clap::Subcommand;
use wayfarer_config::AppConfig;
use wayfarer_providers::best_route;

#[derive(Subcommand, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the default configuration as TOML
    #[default]
    Defaults,
    /// Print the config file location
    Path,
    /// Load and validate the configuration
    Validate,
}

pub fn run(action: ConfigAction, explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Defaults => print!("{}", AppConfig::default_toml()),
        ConfigAction::Path => println!("{}", config_path(explicit).display()),
        ConfigAction::Validate => validate(explicit)?,
    }
    Ok(())
}

fn config_path(explicit: Option<&Path>) -> std::path::PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

fn validate(explicit: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", config_path(explicit).display());
    let config = super::load_config(explicit)?;
    println!("   Config parsed successfully");

    let warnings = warnings(&config);
    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    let route = best_route(&config.ai);
    println!();
    println!("   Provider:  {}", route.provider);
    println!("   Model:     {}", route.model);
    println!("   Access:    {}", config.agent.access_level);
    println!("   Max steps: {}", config.agent.max_steps);
    Ok(())
}

fn warnings(config: &AppConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if !config.ai.is_usable(config.ai.provider) {
        warnings.push(format!(
            "ai.provider is {} but it has no credentials; another backend will be used",
            config.ai.provider
        ));
    }
    if config.agent.enabled_categories.is_empty() {
        warnings.push("agent.enabled_categories is empty; the agent can only talk".into());
    }
    if config.agent.access_level.is_max() && !config.agent.auto_approve_categories.is_empty() {
        warnings.push("agent.auto_approve_categories has no effect at the ultimate access level".into());
    }
    warnings
}

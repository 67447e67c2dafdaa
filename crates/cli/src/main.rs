//! Wayfarer CLI: the main entry point.
//!
//! Commands:
//! - `run`: Let the agent carry out a task with tools
//! - `chat`: Stream a plain answer, no tools
//! - `tools`: List the tools the agent would be offered
//! - `route`: Show which provider and model would be used
//! - `config`: Print defaults, the config path, or validate
//! - `completions`: Generate shell completions

use std::path::PathBuf;
use clap::{CommandFactory, Parser, Subcommand};
use wayfarer_core::AccessLevel;

mod commands;

use commands::config_cmd::ConfigAction;

#[derive(Parser)]
#[command(
    name = "wayfarer",
    about = "Wayfarer: a tool-calling AI agent for your computer",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Config file to use instead of ~/.wayfarer/config.toml
    #[arg(long, global = true, env = "WAYFARER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the agent to do something
    Run {
        /// What you want done
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,

        /// Override the configured access level (safe, power, ultimate)
        #[arg(long)]
        access: Option<AccessLevel>,

        /// Approve every dangerous action without asking
        #[arg(short, long)]
        yes: bool,

        /// Override the step limit
        #[arg(long)]
        max_steps: Option<u32>,
    },

    /// Stream an answer without using tools
    Chat {
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
    },

    /// List the tools offered at an access level
    Tools {
        #[arg(long)]
        access: Option<AccessLevel>,
    },

    /// Show the resolved provider and model
    Route,

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers can be piped
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run {
            prompt,
            access,
            yes,
            max_steps,
        } => {
            let mut config = commands::load_config(config_path)?;
            if let Some(level) = access {
                config.agent.access_level = level;
            }
            if let Some(steps) = max_steps {
                config.agent.max_steps = steps;
            }
            commands::run::run(config, prompt.join(" "), yes).await?
        }
        Commands::Chat { prompt } => {
            let config = commands::load_config(config_path)?;
            commands::chat::run(config, prompt.join(" ")).await?
        }
        Commands::Tools { access } => {
            let mut config = commands::load_config(config_path)?;
            if let Some(level) = access {
                config.agent.access_level = level;
            }
            commands::tools::run(&config)
        }
        Commands::Route => {
            let config = commands::load_config(config_path)?;
            commands::route::run(&config)
        }
        Commands::Config { action } => {
            commands::config_cmd::run(action.unwrap_or_default(), config_path)?
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "wayfarer", &mut std::io::stdout());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_joins_prompt_words() {
        let cli = Cli::try_parse_from(["wayfarer", "run", "--access", "safe", "list", "my", "files"]).unwrap();
        match cli.command {
            Commands::Run { prompt, access, yes, .. } => {
                assert_eq!(prompt.join(" "), "list my files");
                assert_eq!(access, Some(AccessLevel::Safe));
                assert!(!yes);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn unknown_access_level_is_rejected() {
        assert!(Cli::try_parse_from(["wayfarer", "tools", "--access", "root"]).is_err());
    }

    #[test]
    fn run_requires_a_prompt() {
        assert!(Cli::try_parse_from(["wayfarer", "run"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["wayfarer", "route", "-v", "--config", "/tmp/w.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/w.toml")));
    }
}

//! Configuration loading, validation, and management for Wayfarer.
//!
//! Loads configuration from `~/.wayfarer/config.toml` with environment
//! variable overrides. Validates all settings at startup. The loaded
//! [`AppConfig`] is handed to the agent loop explicitly; nothing here is
//! cached globally.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wayfarer_core::{AccessLevel, ProviderKind, ToolCategory};

/// The root configuration structure.
///
/// Maps directly to `~/.wayfarer/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider selection, credentials and generation defaults
    #[serde(default)]
    pub ai: AiConfig,

    /// Agent policy: access level, tool categories, step budget
    #[serde(default)]
    pub agent: AgentConfig,
}

/// The AI configuration consumed by the completion adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Active provider
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,

    /// Pinned model; when unset each provider's default model is used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub openai: ProviderConfig,

    #[serde(default)]
    pub anthropic: ProviderConfig,

    #[serde(default)]
    pub ollama: ProviderConfig,

    #[serde(default)]
    pub openai_compatible: ProviderConfig,
}

fn default_provider() -> ProviderKind {
    ProviderKind::OpenAi
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_temperature() -> f32 {
    0.7
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout(),
            openai: ProviderConfig::default(),
            anthropic: ProviderConfig::default(),
            ollama: ProviderConfig::default(),
            openai_compatible: ProviderConfig::default(),
        }
    }
}

impl AiConfig {
    /// The settings block for one backend.
    pub fn provider_config(&self, kind: ProviderKind) -> &ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &self.openai,
            ProviderKind::Anthropic => &self.anthropic,
            ProviderKind::Ollama => &self.ollama,
            ProviderKind::OpenAiCompatible => &self.openai_compatible,
        }
    }

    pub fn provider_config_mut(&mut self, kind: ProviderKind) -> &mut ProviderConfig {
        match kind {
            ProviderKind::OpenAi => &mut self.openai,
            ProviderKind::Anthropic => &mut self.anthropic,
            ProviderKind::Ollama => &mut self.ollama,
            ProviderKind::OpenAiCompatible => &mut self.openai_compatible,
        }
    }

    /// Whether enough is configured to talk to `kind`.
    ///
    /// Hosted APIs need a key, a compatible endpoint needs a base URL, and
    /// a local Ollama daemon needs nothing.
    pub fn is_usable(&self, kind: ProviderKind) -> bool {
        let cfg = self.provider_config(kind);
        match kind {
            ProviderKind::OpenAi | ProviderKind::Anthropic => cfg.api_key().is_some(),
            ProviderKind::OpenAiCompatible => cfg.base_url().is_some(),
            ProviderKind::Ollama => true,
        }
    }
}

/// Connection settings for one backend.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for the API base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model used when `[ai].model` is not pinned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl ProviderConfig {
    /// The API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.api_key)
    }

    /// The base URL, ignoring blank values.
    pub fn base_url(&self) -> Option<&str> {
        non_blank(&self.base_url)
    }

    pub fn default_model(&self) -> Option<&str> {
        non_blank(&self.default_model)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Agent policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub access_level: AccessLevel,

    /// Tool categories the agent may use at all
    #[serde(default = "default_enabled_categories")]
    pub enabled_categories: Vec<ToolCategory>,

    /// Categories whose dangerous tools run without asking
    #[serde(default)]
    pub auto_approve_categories: Vec<ToolCategory>,

    /// Maximum model turns per request
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Retry a failed completion once after a short pause
    #[serde(default = "default_true")]
    pub auto_recovery: bool,

    /// Store "I prefer..." style statements in long-term memory
    #[serde(default = "default_true")]
    pub learn_preferences: bool,

    /// Number of memory snippets pulled into the system prompt
    #[serde(default = "default_memory_context_limit")]
    pub memory_context_limit: usize,

    /// Phrases that mark a prompt sentence as a stated preference
    #[serde(default = "default_preference_phrases")]
    pub preference_phrases: Vec<String>,

    /// Extra capabilities advertised in the system prompt
    #[serde(default)]
    pub skills: Vec<SkillConfig>,
}

fn default_enabled_categories() -> Vec<ToolCategory> {
    ToolCategory::ALL.to_vec()
}
fn default_max_steps() -> u32 {
    30
}
fn default_true() -> bool {
    true
}
fn default_memory_context_limit() -> usize {
    5
}
fn default_preference_phrases() -> Vec<String> {
    [
        "i prefer",
        "i like",
        "i don't like",
        "i hate",
        "i always",
        "i never",
        "always",
        "never",
        "my favorite",
        "remember that",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            access_level: AccessLevel::default(),
            enabled_categories: default_enabled_categories(),
            auto_approve_categories: vec![],
            max_steps: default_max_steps(),
            auto_recovery: true,
            learn_preferences: true,
            memory_context_limit: default_memory_context_limit(),
            preference_phrases: default_preference_phrases(),
            skills: vec![],
        }
    }
}

/// A named capability listed in the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillConfig {
    pub name: String,

    #[serde(default)]
    pub description: String,
}

impl AppConfig {
    /// Load configuration from the default path (~/.wayfarer/config.toml).
    ///
    /// Environment variables override the file:
    /// - `WAYFARER_PROVIDER`, `WAYFARER_MODEL`
    /// - `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`
    /// - `OLLAMA_HOST`
    /// - `WAYFARER_COMPAT_BASE_URL`, `WAYFARER_COMPAT_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// Blank values are ignored. An unknown `WAYFARER_PROVIDER` is an error
    /// rather than a silent fallback.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(provider) = get("WAYFARER_PROVIDER") {
            self.ai.provider = provider.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "WAYFARER_PROVIDER '{provider}' is not a known provider"
                ))
            })?;
        }
        if let Some(model) = get("WAYFARER_MODEL") {
            self.ai.model = Some(model);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.ai.openai.api_key = Some(key);
        }
        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.ai.anthropic.api_key = Some(key);
        }
        if let Some(host) = get("OLLAMA_HOST") {
            self.ai.ollama.base_url = Some(host);
        }
        if let Some(url) = get("WAYFARER_COMPAT_BASE_URL") {
            self.ai.openai_compatible.base_url = Some(url);
        }
        if let Some(key) = get("WAYFARER_COMPAT_API_KEY") {
            self.ai.openai_compatible.api_key = Some(key);
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        home_dir().join(".wayfarer")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(ConfigError::ValidationError(
                "ai.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.ai.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "ai.request_timeout_secs must be > 0".into(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_steps must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
pub fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.ai.provider, ProviderKind::OpenAi);
        assert_eq!(config.agent.access_level, AccessLevel::Power);
        assert_eq!(config.agent.max_steps, 30);
        assert_eq!(config.agent.enabled_categories.len(), ToolCategory::ALL.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.ai.provider, config.ai.provider);
        assert_eq!(parsed.agent.max_steps, config.agent.max_steps);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.ai.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut config = AppConfig::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.ai.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[ai]
provider = "anthropic"
model = "claude-3-5-haiku-latest"

[ai.anthropic]
api_key = "sk-ant-test"

[agent]
access_level = "safe"
enabled_categories = ["filesystem", "memory"]
auto_approve_categories = ["filesystem"]
max_steps = 12

[[agent.skills]]
name = "photo-sorter"
description = "Sorts photos into dated folders"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.ai.provider, ProviderKind::Anthropic);
        assert_eq!(config.ai.model.as_deref(), Some("claude-3-5-haiku-latest"));
        assert_eq!(config.ai.anthropic.api_key(), Some("sk-ant-test"));
        assert_eq!(config.agent.access_level, AccessLevel::Safe);
        assert_eq!(
            config.agent.enabled_categories,
            vec![ToolCategory::Filesystem, ToolCategory::Memory]
        );
        assert_eq!(config.agent.max_steps, 12);
        assert_eq!(config.agent.skills[0].name, "photo-sorter");
        // Untouched fields keep their defaults
        assert!(config.agent.auto_recovery);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ai\nprovider = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("WAYFARER_PROVIDER", "openai-compatible"),
                ("WAYFARER_MODEL", "qwen2.5"),
                ("OPENAI_API_KEY", "sk-test"),
                ("OLLAMA_HOST", "http://gpu-box:11434"),
                ("WAYFARER_COMPAT_BASE_URL", "http://localhost:1234/v1"),
                ("ANTHROPIC_API_KEY", "  "),
            ]))
            .unwrap();

        assert_eq!(config.ai.provider, ProviderKind::OpenAiCompatible);
        assert_eq!(config.ai.model.as_deref(), Some("qwen2.5"));
        assert_eq!(config.ai.openai.api_key(), Some("sk-test"));
        assert_eq!(config.ai.ollama.base_url(), Some("http://gpu-box:11434"));
        assert!(config.ai.is_usable(ProviderKind::OpenAiCompatible));
        // Blank values are ignored
        assert!(!config.ai.is_usable(ProviderKind::Anthropic));
    }

    #[test]
    fn unknown_env_provider_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env(env(&[("WAYFARER_PROVIDER", "gemini")]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn ollama_is_always_usable() {
        let config = AiConfig::default();
        assert!(config.is_usable(ProviderKind::Ollama));
        assert!(!config.is_usable(ProviderKind::OpenAi));
    }

    #[test]
    fn debug_redacts_api_keys() {
        let mut config = AppConfig::default();
        config.ai.openai.api_key = Some("sk-super-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("openai"));
        assert!(toml_str.contains("max_steps = 30"));
    }
}

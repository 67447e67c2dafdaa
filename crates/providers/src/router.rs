//! Provider router: picks a backend and model from configuration and
//! builds the matching provider.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use wayfarer_config::AiConfig;
use wayfarer_core::provider::{ModelRoute, Provider, ProviderKind};
use wayfarer_core::ProviderError;
use crate::anthropic::AnthropicProvider;
use crate::ollama::OllamaProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Built-in model for each backend when nothing is configured.
pub fn default_model(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "gpt-4o-mini",
        ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
        ProviderKind::Ollama => "llama3.1",
        ProviderKind::OpenAiCompatible => "llama-3.1-8b-instant",
    }
}

/// Resolve the backend and model for the next request.
///
/// The active provider wins when it is usable. Otherwise the first usable
/// backend in [`ProviderKind::ALL`] order is taken; Ollama needs no
/// credentials so this always resolves. A pinned `ai.model` only applies
/// to the active provider.
pub fn best_route(config: &AiConfig) -> ModelRoute {
    let active = config.provider;
    let provider = if config.is_usable(active) {
        active
    } else {
        let fallback = ProviderKind::ALL
            .into_iter()
            .find(|kind| config.is_usable(*kind))
            .unwrap_or(ProviderKind::Ollama);
        info!(active = %active, fallback = %fallback, "Active provider not configured, falling back");
        fallback
    };

    let pinned = if provider == active {
        config.model.as_deref().filter(|m| !m.trim().is_empty())
    } else {
        None
    };
    let model = pinned
        .or_else(|| config.provider_config(provider).default_model())
        .unwrap_or_else(|| default_model(provider))
        .to_string();

    debug!(provider = %provider, model = %model, "Resolved model route");
    ModelRoute { provider, model }
}

/// Build the provider a route points at.
pub fn build_provider(config: &AiConfig, route: &ModelRoute) -> Result<Arc<dyn Provider>, ProviderError> {
    let settings = config.provider_config(route.provider);
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let missing = |what: &str| {
        ProviderError::NotConfigured(format!("{} requires {what}", route.provider))
    };

    let provider: Arc<dyn Provider> = match route.provider {
        ProviderKind::OpenAi => {
            let key = settings.api_key().ok_or_else(|| missing("an API key"))?;
            let mut provider = OpenAiCompatProvider::openai(key).with_timeout(timeout);
            if let Some(base_url) = settings.base_url() {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
        ProviderKind::Anthropic => {
            let key = settings.api_key().ok_or_else(|| missing("an API key"))?;
            let mut provider = AnthropicProvider::new(key).with_timeout(timeout);
            if let Some(base_url) = settings.base_url() {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenAiCompatible => {
            let base_url = settings.base_url().ok_or_else(|| missing("a base URL"))?;
            Arc::new(
                OpenAiCompatProvider::compatible(base_url, settings.api_key().map(String::from))
                    .with_timeout(timeout),
            )
        }
        ProviderKind::Ollama => {
            Arc::new(OllamaProvider::new(settings.base_url()).with_timeout(timeout))
        }
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key(kind: ProviderKind, key: &str) -> AiConfig {
        let mut config = AiConfig::default();
        config.provider_config_mut(kind).api_key = Some(key.into());
        config
    }

    #[test]
    fn active_provider_wins_when_usable() {
        let mut config = with_key(ProviderKind::Anthropic, "sk-ant");
        config.provider = ProviderKind::Anthropic;
        config.model = Some("claude-3-opus".into());
        let route = best_route(&config);
        assert_eq!(route.provider, ProviderKind::Anthropic);
        assert_eq!(route.model, "claude-3-opus");
    }

    #[test]
    fn falls_back_in_probe_order() {
        let mut config = with_key(ProviderKind::Anthropic, "sk-ant");
        config.provider = ProviderKind::OpenAi;
        config.model = Some("gpt-4o".into());
        let route = best_route(&config);
        assert_eq!(route.provider, ProviderKind::Anthropic);
        // the pinned model belongs to the active provider only
        assert_eq!(route.model, "claude-3-5-sonnet-latest");
    }

    #[test]
    fn nothing_configured_lands_on_ollama() {
        let route = best_route(&AiConfig::default());
        assert_eq!(route.provider, ProviderKind::Ollama);
        assert_eq!(route.model, "llama3.1");
    }

    #[test]
    fn provider_default_model_beats_builtin() {
        let mut config = AiConfig::default();
        config.provider = ProviderKind::Ollama;
        config.ollama.default_model = Some("qwen2.5".into());
        assert_eq!(best_route(&config).model, "qwen2.5");
    }

    #[test]
    fn blank_key_is_not_usable() {
        let mut config = with_key(ProviderKind::OpenAi, "   ");
        config.provider = ProviderKind::OpenAi;
        assert_eq!(best_route(&config).provider, ProviderKind::Ollama);
    }

    #[test]
    fn build_requires_credentials() {
        let config = AiConfig::default();
        let route = ModelRoute {
            provider: ProviderKind::Anthropic,
            model: "claude-3-5-sonnet-latest".into(),
        };
        let err = build_provider(&config, &route).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn builds_every_usable_backend() {
        let mut config = with_key(ProviderKind::OpenAi, "sk-test");
        config.anthropic.api_key = Some("sk-ant".into());
        config.openai_compatible.base_url = Some("https://api.groq.com/openai/v1".into());

        for kind in ProviderKind::ALL {
            let route = ModelRoute {
                provider: kind,
                model: default_model(kind).into(),
            };
            let provider = build_provider(&config, &route).unwrap();
            assert_eq!(provider.kind(), kind);
        }
    }
}

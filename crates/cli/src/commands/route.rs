//! `wayfarer route`: Show which backend a request would go to.

use wayfarer_config::AppConfig;
use wayfarer_core::ProviderKind;
use wayfarer_providers::best_route;

pub fn run(config: &AppConfig) {
    let route = best_route(&config.ai);
    println!("  Provider:  {}", route.provider);
    println!("  Model:     {}", route.model);
    if route.provider != config.ai.provider {
        println!(
            "  Note:      {} is selected but not configured, so {} is used instead",
            config.ai.provider, route.provider
        );
    }
    println!();
    for line in availability(config) {
        println!("  {line}");
    }
}

/// One line per backend saying whether it can be used.
fn availability(config: &AppConfig) -> Vec<String> {
    ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            let settings = config.ai.provider_config(kind);
            let state = if !config.ai.is_usable(kind) {
                match kind {
                    ProviderKind::OpenAiCompatible => "needs a base URL",
                    _ => "needs an API key",
                }
            } else {
                "ready"
            };
            match settings.base_url() {
                Some(url) => format!("{:<18} {state} ({url})", kind.as_str()),
                None => format!("{:<18} {state}", kind.as_str()),
            }
        })
        .collect()
}

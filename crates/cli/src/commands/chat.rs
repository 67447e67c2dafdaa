//! `wayfarer chat`: Stream a plain answer without tools.

use std::io::Write;
use futures::StreamExt;
use tracing::debug;
use wayfarer_config::AppConfig;
use wayfarer_core::message::Message;
use wayfarer_core::provider::ProviderRequest;
use wayfarer_providers::{best_route, build_provider};

const CHAT_PERSONA: &str = "You are Wayfarer, a concise and friendly assistant. \
Answer directly; you cannot use tools in this mode.";

pub async fn run(config: AppConfig, prompt: String) -> Result<(), Box<dyn std::error::Error>> {
    let route = best_route(&config.ai);
    let provider = build_provider(&config.ai, &route)?;
    debug!(route = %route, "Streaming chat");

    let mut request = ProviderRequest::new(
        route.model.as_str(),
        vec![Message::system(CHAT_PERSONA), Message::user(prompt)],
    );
    request.max_tokens = Some(config.ai.max_tokens);
    request.temperature = Some(config.ai.temperature);

    let mut deltas = provider.stream_text(request).await?;
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            delta = deltas.next() => match delta {
                Some(text) => {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    writeln!(stdout)?;
    Ok(())
}

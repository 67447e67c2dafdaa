//! User-facing error text.
//!
//! Raw provider bodies, HTTP status lines, and stack traces never reach
//! the user; they are replaced with a summary of what the agent tried.

use regex::Regex;
use std::sync::LazyLock;
use wayfarer_core::agent::AccessLevel;
use wayfarer_core::error::{ProviderError, ProviderErrorKind};

const MAX_DETAIL_CHARS: usize = 160;
const MAX_PLAIN_CHARS: usize = 400;

static TECHNICAL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bhttp\s*/?\s*\d(?:\.\d)?\s+\d{3}\b|\bhttp\s+\d{3}\b|\bstatus(?:\s*code)?\s*[:=]?\s*\d{3}\b|^\d{3}\b|"(?:error|type|code|message)"\s*:|\bat line \d+|\btraceback\b|\bstack trace\b|\w+::\w+"#,
    )
    .ok()
});

/// One tool invocation, remembered for the failure summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub tool: String,
    pub success: bool,
    /// The (truncated) tool output
    pub detail: String,
}

/// Whether `message` reads like machine output rather than a sentence.
pub fn looks_technical(message: &str) -> bool {
    let text = message.trim();
    if text.is_empty() || text.starts_with(['{', '[', '<']) {
        return true;
    }
    if text.chars().count() > MAX_PLAIN_CHARS {
        return true;
    }
    TECHNICAL.as_ref().is_some_and(|re| re.is_match(text))
}

/// Turn a completion failure into something the user can act on.
pub fn user_safe_error(error: &ProviderError, attempts: &[Attempt], steps: u32, level: AccessLevel) -> String {
    match error.kind() {
        ProviderErrorKind::InvalidKey => {
            "The AI provider rejected the API key. Check the key in your settings.".into()
        }
        ProviderErrorKind::RateLimited => {
            "The AI provider is limiting requests right now. Wait a minute and try again.".into()
        }
        ProviderErrorKind::QuotaExceeded => {
            "Your AI provider account is out of quota or credits. Top it up or switch providers in settings."
                .into()
        }
        ProviderErrorKind::ModelNotFound => format!("{error}. Pick a different model in settings."),
        ProviderErrorKind::ContextTooLong => {
            "This conversation got too long for the model. Start a new request with less context.".into()
        }
        ProviderErrorKind::Overloaded => {
            "The AI provider is overloaded right now. Try again in a few minutes.".into()
        }
        ProviderErrorKind::Network => {
            "Couldn't reach the AI provider. Check your internet connection and try again.".into()
        }
        ProviderErrorKind::NotConfigured => {
            "No AI provider is set up yet. Add an API key or start Ollama, then try again.".into()
        }
        ProviderErrorKind::ToolCallMalformed
        | ProviderErrorKind::InvalidResponse
        | ProviderErrorKind::Generic => {
            let message = match error {
                ProviderError::Api { message, .. } => message.clone(),
                other => other.to_string(),
            };
            if looks_technical(&message) {
                attempts_summary(steps, attempts, level)
            } else {
                message
            }
        }
    }
}

/// "I made N attempts" summary listing the tools tried and the latest blocker.
pub fn attempts_summary(steps: u32, attempts: &[Attempt], level: AccessLevel) -> String {
    let plural = if steps == 1 { "attempt" } else { "attempts" };
    let mut out = format!("I made {steps} {plural} but couldn't finish the task.");

    let mut tried: Vec<String> = Vec::new();
    for attempt in attempts {
        let label = if attempt.success {
            attempt.tool.clone()
        } else {
            format!("{} (failed)", attempt.tool)
        };
        if !tried.contains(&label) {
            tried.push(label);
        }
    }
    if !tried.is_empty() {
        out.push_str(&format!(" Tools I tried: {}.", tried.join(", ")));
    }

    if let Some(last) = attempts.iter().rev().find(|a| !a.success) {
        let first_line = last.detail.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
        let blocker = if first_line.is_empty() || looks_technical(first_line) {
            format!("the {} tool failed", last.tool)
        } else {
            clip(first_line, MAX_DETAIL_CHARS)
        };
        out.push_str(&format!(" The latest problem: {}", blocker.trim_end_matches('.')));
        out.push('.');
    }

    if !level.is_max() {
        out.push_str(" Raising the access level in settings may let me do more.");
    }
    out
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

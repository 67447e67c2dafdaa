//! `wayfarer run`: Let the agent carry out a task.
//!
//! Progress goes to stderr and the final answer to stdout. Dangerous
//! actions are confirmed on the terminal unless `--yes` is given.

use std::io::Write;
use std::sync::Arc;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wayfarer_agent::{
    AgentLoop, AgentPolicy, AgentRequest, AutoApprove, ChannelConfirmer, Confirmer, PendingConfirmation,
    PhraseClassifier,
};
use wayfarer_config::AppConfig;
use wayfarer_core::agent::LoopStatus;
use wayfarer_core::event::{AgentEvent, AgentEventKind};
use wayfarer_core::memory::MemoryStore;
use wayfarer_memory::FileStore;
use wayfarer_providers::{best_route, build_provider};
use wayfarer_tools::LocalExecutor;

const MAX_ARGS_CHARS: usize = 120;

pub async fn run(config: AppConfig, prompt: String, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let route = best_route(&config.ai);
    let provider = build_provider(&config.ai, &route)?;

    let memory: Arc<dyn MemoryStore> = Arc::new(FileStore::new(AppConfig::config_dir().join("memory.jsonl")));
    let agent = AgentLoop::new(provider, route, AgentPolicy::from(&config.agent))
        .with_executor(Arc::new(LocalExecutor::new(Arc::clone(&memory))))
        .with_memory(memory)
        .with_classifier(Arc::new(PhraseClassifier::new(&config.agent.preference_phrases)))
        .with_sampling(config.ai.max_tokens, config.ai.temperature);

    eprintln!(
        "  {} · {} · access {}",
        agent.route().provider,
        agent.route().model,
        agent.policy().access_level
    );

    let cancel = CancellationToken::new();
    let (events_tx, mut events) = mpsc::unbounded_channel::<AgentEvent>();
    let (channel_confirmer, mut questions) = ChannelConfirmer::new(1);
    let confirmer: Arc<dyn Confirmer> = if yes {
        // closes the question channel so the UI loop ends with the events
        drop(channel_confirmer);
        Arc::new(AutoApprove)
    } else {
        Arc::new(channel_confirmer)
    };

    let request = AgentRequest::new(prompt)
        .with_cancel(cancel.clone())
        .with_sink(Arc::new(events_tx))
        .with_confirmer(confirmer);

    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let task = tokio::spawn(async move { agent.run(request).await });

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some(event) = events.recv() => render(&event.kind),
            Some(question) = questions.recv() => {
                let approved = tokio::select! {
                    answer = ask(&question, &mut stdin) => answer,
                    _ = cancel.cancelled() => false,
                };
                question.resolve(approved);
            }
            else => break,
        }
    }

    let result = task.await?;
    match result.status {
        LoopStatus::Done => Ok(()),
        // the error event has already been printed
        LoopStatus::Error => std::process::exit(1),
        LoopStatus::Cancelled => {
            eprintln!("  Cancelled.");
            // stdin may still be blocked on a read the runtime would wait for
            std::process::exit(130)
        }
    }
}

async fn ask<R>(question: &PendingConfirmation, stdin: &mut tokio::io::Lines<R>) -> bool
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    eprint!("  ? {} [y/N] ", question.request.message);
    let _ = std::io::stderr().flush();
    match stdin.next_line().await {
        Ok(Some(line)) => is_yes(&line),
        _ => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn render(kind: &AgentEventKind) {
    match kind {
        AgentEventKind::TextChunk { content } => println!("{content}"),
        other => {
            if let Some(line) = describe(other) {
                eprintln!("{line}");
            }
        }
    }
}

/// Progress line for an event, if it deserves one.
fn describe(kind: &AgentEventKind) -> Option<String> {
    match kind {
        AgentEventKind::Status { step, message } => Some(format!("  [{step}] {message}")),
        AgentEventKind::Thinking { content } => Some(format!("  … {content}")),
        AgentEventKind::ToolCall { name, arguments, .. } => {
            Some(format!("  → {name} {}", compact(arguments)))
        }
        AgentEventKind::ToolResult {
            name,
            success,
            output,
            duration_ms,
            ..
        } => {
            if *success {
                Some(format!("  ✓ {name} ({duration_ms} ms)"))
            } else {
                let reason = output.lines().find(|l| !l.trim().is_empty()).unwrap_or("failed");
                Some(format!("  ✗ {name}: {}", clip(reason.trim(), MAX_ARGS_CHARS)))
            }
        }
        AgentEventKind::Done { steps } => {
            Some(format!("  Done in {steps} step{}.", if *steps == 1 { "" } else { "s" }))
        }
        AgentEventKind::Error { message } => Some(format!("  Error: {message}")),
        AgentEventKind::ConfirmNeeded { .. } | AgentEventKind::TextChunk { .. } => None,
    }
}

fn compact(arguments: &Value) -> String {
    match arguments {
        Value::Object(map) if map.is_empty() => String::new(),
        other => clip(&other.to_string(), MAX_ARGS_CHARS),
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

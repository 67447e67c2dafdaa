//! The agent reasoning loop implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wayfarer_core::agent::AgentLoopResult;
use wayfarer_core::event::{AgentEvent, AgentEventKind, EventSink, NullSink};
use wayfarer_core::memory::MemoryStore;
use wayfarer_core::message::{Message, MessageToolCall, Role};
use wayfarer_core::provider::{ModelRoute, Provider, ProviderRequest};
use wayfarer_core::tool::{ToolCall, ToolDefinition, ToolExecutor, ToolResult, truncate_output};
use wayfarer_core::ToolError;
use wayfarer_providers::{RetryPolicy, complete_with_retry};
use crate::confirm::{AutoDeny, ConfirmationRequest, Confirmer};
use crate::policy::{AgentPolicy, enabled_tools, needs_confirmation};
use crate::preferences::{self, PhraseClassifier, PreferenceClassifier};
use crate::prompt::build_system_prompt;
use crate::summary::{Attempt, attempts_summary, user_safe_error};

/// Longest tool output fed back to the model, in characters.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 4000;

/// Pause before retrying a step whose completion call failed.
pub const DEFAULT_RECOVERY_DELAY: Duration = Duration::from_millis(1200);

/// Consecutive completion failures tolerated before giving up.
const MAX_CONSECUTIVE_FAILURES: u32 = 2;

const DENIED_OUTPUT: &str = "The user denied this action. Do not try it again; \
explain what you wanted to do, or find a way that doesn't need it.";

/// One user request: what to answer and where progress goes.
pub struct AgentRequest {
    pub prompt: String,

    /// Earlier turns of the conversation, oldest first
    pub history: Vec<Message>,

    /// Correlates every emitted event
    pub request_id: String,

    pub cancel: CancellationToken,
    pub sink: Arc<dyn EventSink>,
    pub confirmer: Arc<dyn Confirmer>,
}

impl AgentRequest {
    /// A request with a fresh ID, no history, no listener, and every
    /// dangerous call denied.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            history: Vec::new(),
            request_id: uuid::Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
            sink: Arc::new(NullSink),
            confirmer: Arc::new(AutoDeny),
        }
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_confirmer(mut self, confirmer: Arc<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }
}

/// Stands in when no executor was attached.
struct NoExecutor;

#[async_trait]
impl ToolExecutor for NoExecutor {
    async fn execute(&self, _name: &str, _arguments: &Value) -> Result<ToolResult, ToolError> {
        Err(ToolError::Unsupported("no tool executor configured".into()))
    }
}

/// Drives one request from prompt to a terminal [`AgentLoopResult`].
///
/// The loop owns no per-request state, so one instance can serve many
/// requests concurrently.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    route: ModelRoute,
    policy: AgentPolicy,
    catalog: &'static [ToolDefinition],
    executor: Arc<dyn ToolExecutor>,
    memory: Option<Arc<dyn MemoryStore>>,
    classifier: Arc<dyn PreferenceClassifier>,
    retry: RetryPolicy,
    recovery_delay: Duration,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, route: ModelRoute, policy: AgentPolicy) -> Self {
        Self {
            provider,
            route,
            policy,
            catalog: wayfarer_tools::CATALOG,
            executor: Arc::new(NoExecutor),
            memory: None,
            classifier: Arc::new(PhraseClassifier::default()),
            retry: RetryPolicy::default(),
            recovery_delay: DEFAULT_RECOVERY_DELAY,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = executor;
        self
    }

    /// Attach long-term memory for prompt context and preference learning.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn PreferenceClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Retry behaviour inside a single completion call.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_recovery_delay(mut self, delay: Duration) -> Self {
        self.recovery_delay = delay;
        self
    }

    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = Some(max_tokens);
        self.temperature = Some(temperature);
        self
    }

    /// Replace the tool catalog the enabled set is drawn from.
    pub fn with_catalog(mut self, catalog: &'static [ToolDefinition]) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn route(&self) -> &ModelRoute {
        &self.route
    }

    pub fn policy(&self) -> &AgentPolicy {
        &self.policy
    }

    /// Run the loop until it answers, fails, or is cancelled.
    ///
    /// Cancellation is checked on entry and after every suspension point.
    /// Once observed, no further events are emitted.
    pub async fn run(&self, request: AgentRequest) -> AgentLoopResult {
        let AgentRequest {
            prompt,
            history,
            request_id,
            cancel,
            sink,
            confirmer,
        } = request;

        let mut run = Run {
            emitter: Emitter { sink, request_id },
            cancel,
            confirmer,
            messages: Vec::with_capacity(history.len() + 2),
            attempts: Vec::new(),
        };

        if run.cancel.is_cancelled() {
            return AgentLoopResult::cancelled(0);
        }

        info!(
            request_id = %run.emitter.request_id,
            provider = %self.route.provider,
            model = %self.route.model,
            access = %self.policy.access_level,
            "Agent request started"
        );

        let tools = enabled_tools(self.catalog, &self.policy);
        let memory_context = tokio::select! {
            biased;
            _ = run.cancel.cancelled() => return AgentLoopResult::cancelled(0),
            context = self.memory_context(&prompt) => context,
        };
        let offered: Vec<ToolDefinition> = tools.iter().map(|def| **def).collect();

        run.messages.push(Message::system(build_system_prompt(
            &self.policy,
            &tools,
            memory_context.as_deref(),
        )));
        run.messages
            .extend(history.into_iter().filter(|m| m.role != Role::System));
        run.messages.push(Message::user(prompt.as_str()));

        let mut step = 0;
        let mut consecutive_failures = 0;

        while step < self.policy.max_steps {
            if run.cancel.is_cancelled() {
                return AgentLoopResult::cancelled(step);
            }
            step += 1;
            run.emitter.emit(AgentEventKind::Status {
                step,
                message: status_message(step),
            });

            let mut request = ProviderRequest::new(self.route.model.as_str(), run.messages.clone())
                .with_tools(offered.clone());
            request.max_tokens = self.max_tokens;
            request.temperature = self.temperature;

            let outcome = tokio::select! {
                biased;
                _ = run.cancel.cancelled() => return AgentLoopResult::cancelled(step),
                outcome = complete_with_retry(self.provider.as_ref(), request, &self.retry) => outcome,
            };

            let response = match outcome {
                Ok(response) => {
                    consecutive_failures = 0;
                    response
                }
                Err(error) => {
                    consecutive_failures += 1;
                    if self.policy.auto_recovery && consecutive_failures < MAX_CONSECUTIVE_FAILURES {
                        warn!(
                            request_id = %run.emitter.request_id,
                            step,
                            error = %error,
                            "Completion failed, retrying step"
                        );
                        tokio::select! {
                            biased;
                            _ = run.cancel.cancelled() => return AgentLoopResult::cancelled(step),
                            _ = tokio::time::sleep(self.recovery_delay) => {}
                        }
                        step -= 1;
                        continue;
                    }

                    warn!(request_id = %run.emitter.request_id, step, error = %error, "Completion failed");
                    let message = user_safe_error(&error, &run.attempts, step, self.policy.access_level);
                    run.emitter.emit(AgentEventKind::Error {
                        message: message.clone(),
                    });
                    return AgentLoopResult::error(step, message);
                }
            };

            if response.recovered {
                debug!(request_id = %run.emitter.request_id, "Using tool call recovered from malformed output");
            }

            let text = response
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from);

            if !response.has_tool_calls() {
                let answer = text.unwrap_or_else(|| "Done.".to_string());
                run.emitter.emit(AgentEventKind::TextChunk {
                    content: answer.clone(),
                });
                run.messages.push(Message::assistant(answer.as_str()));

                if self.policy.learn_preferences {
                    if let Some(memory) = &self.memory {
                        preferences::learn(self.classifier.as_ref(), memory.as_ref(), &prompt).await;
                    }
                }
                if run.cancel.is_cancelled() {
                    return AgentLoopResult::cancelled(step);
                }

                run.emitter.emit(AgentEventKind::Done { steps: step });
                info!(request_id = %run.emitter.request_id, steps = step, "Agent request finished");
                return AgentLoopResult::done(step, answer);
            }

            let calls = response.tool_calls;
            run.messages.push(Message::assistant_with_tools(
                text.clone(),
                calls
                    .iter()
                    .map(|call| MessageToolCall {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    })
                    .collect(),
            ));
            if let Some(content) = text {
                run.emitter.emit(AgentEventKind::Thinking { content });
            }

            debug!(
                request_id = %run.emitter.request_id,
                step,
                tool_count = calls.len(),
                "Executing tool calls"
            );

            // One at a time, in the order the model asked for them
            for call in &calls {
                if run.cancel.is_cancelled() || self.handle_call(&mut run, &tools, call).await.is_none() {
                    return AgentLoopResult::cancelled(step);
                }
            }
        }

        warn!(request_id = %run.emitter.request_id, steps = step, "Step limit reached without an answer");
        let message = attempts_summary(step, &run.attempts, self.policy.access_level);
        run.emitter.emit(AgentEventKind::Error {
            message: message.clone(),
        });
        AgentLoopResult::error(step, message)
    }

    /// Bulleted memory snippets relevant to the prompt, if any.
    async fn memory_context(&self, prompt: &str) -> Option<String> {
        let memory = self.memory.as_ref()?;
        let limit = self.policy.memory_context_limit;
        if limit == 0 {
            return None;
        }
        match memory.search(prompt, limit).await {
            Ok(snippets) if !snippets.is_empty() => Some(
                snippets
                    .iter()
                    .map(|s| format!("- {}", s.trim()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Memory search failed, continuing without context");
                None
            }
        }
    }

    /// Confirm, execute, and record one tool call. `None` means cancelled.
    async fn handle_call(&self, run: &mut Run, tools: &[&ToolDefinition], call: &ToolCall) -> Option<()> {
        let def = tools.iter().find(|def| def.name == call.name).copied();
        let dangerous = def.is_some_and(|def| needs_confirmation(def, &self.policy));

        run.emitter.emit(AgentEventKind::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            dangerous,
        });

        let started = Instant::now();
        let result = match def {
            None => ToolResult::failed(self.unavailable_message(&call.name)),
            Some(def) => {
                let approved = if dangerous { run.confirm(def, call).await? } else { true };
                if approved {
                    run.execute(&self.executor, call).await?
                } else {
                    ToolResult::failed(DENIED_OUTPUT)
                }
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let output = truncate_output(&result.output, MAX_TOOL_OUTPUT_CHARS);
        if !result.success {
            debug!(tool = %call.name, "Tool call failed");
        }
        run.attempts.push(Attempt {
            tool: call.name.clone(),
            success: result.success,
            detail: output.clone(),
        });
        run.messages
            .push(Message::tool_result(call.id.as_str(), call.name.as_str(), output.as_str()));
        run.emitter.emit(AgentEventKind::ToolResult {
            id: call.id.clone(),
            name: call.name.clone(),
            success: result.success,
            output,
            duration_ms,
        });
        Some(())
    }

    fn unavailable_message(&self, name: &str) -> String {
        if self.catalog.iter().any(|def| def.name == name) {
            format!(
                "Tool '{name}' is not enabled at the '{}' access level or in the current settings.",
                self.policy.access_level
            )
        } else {
            format!("Unknown tool: {name}")
        }
    }
}

/// Per-request mutable state.
struct Run {
    emitter: Emitter,
    cancel: CancellationToken,
    confirmer: Arc<dyn Confirmer>,
    messages: Vec<Message>,
    attempts: Vec<Attempt>,
}

impl Run {
    /// Ask the user. `None` means cancelled while waiting.
    async fn confirm(&self, def: &ToolDefinition, call: &ToolCall) -> Option<bool> {
        let message = def.confirmation_message(&call.arguments);
        self.emitter.emit(AgentEventKind::ConfirmNeeded {
            id: call.id.clone(),
            name: call.name.clone(),
            message: message.clone(),
        });

        let request = ConfirmationRequest {
            request_id: self.emitter.request_id.clone(),
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            message,
            arguments: call.arguments.clone(),
        };
        let approved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            approved = self.confirmer.confirm(request) => approved,
        };
        if self.cancel.is_cancelled() {
            return None;
        }
        if !approved {
            info!(tool = %call.name, "User denied tool call");
        }
        Some(approved)
    }

    /// Run the tool on its own task so cancellation can leave it behind.
    async fn execute(&self, executor: &Arc<dyn ToolExecutor>, call: &ToolCall) -> Option<ToolResult> {
        let executor = Arc::clone(executor);
        let name = call.name.clone();
        let arguments = call.arguments.clone();
        let task = tokio::spawn(async move { executor.execute(&name, &arguments).await });

        let joined = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            joined = task => joined,
        };
        if self.cancel.is_cancelled() {
            return None;
        }

        Some(match joined {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::failed(e.to_string())
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool task panicked");
                ToolResult::failed(format!("{} stopped unexpectedly", call.name))
            }
        })
    }
}

struct Emitter {
    sink: Arc<dyn EventSink>,
    request_id: String,
}

impl Emitter {
    fn emit(&self, kind: AgentEventKind) {
        self.sink.emit(AgentEvent::new(self.request_id.as_str(), kind));
    }
}

fn status_message(step: u32) -> String {
    if step == 1 {
        "Thinking…".to_string()
    } else {
        format!("Step {step}: reviewing results")
    }
}

//! The agent loop: the heart of Wayfarer.
//!
//! Each request follows a **prompt → complete → act → observe** cycle:
//!
//! 1. **Filter** the tool catalog by the access level and enabled categories
//! 2. **Build context** (persona, access disclaimer, skills, recalled memory)
//! 3. **Send to the LLM** through the configured provider
//! 4. **If tool calls**: confirm the dangerous ones, run them one at a time,
//!    append the results, and go back to step 3
//! 5. **If text**: emit the answer, learn any stated preferences, finish
//!
//! The loop stops at the first text-only answer, at the step limit, on an
//! unrecoverable provider error, or when the request is cancelled.

pub mod confirm;
pub mod loop_runner;
pub mod policy;
pub mod preferences;
pub mod prompt;
pub mod summary;

pub use confirm::{AutoApprove, AutoDeny, ChannelConfirmer, ConfirmationRequest, Confirmer, PendingConfirmation};
pub use loop_runner::{AgentLoop, AgentRequest, DEFAULT_RECOVERY_DELAY, MAX_TOOL_OUTPUT_CHARS};
pub use policy::{AgentPolicy, enabled_tools, needs_confirmation};
pub use preferences::{PREFERENCE_SOURCE, PhraseClassifier, PreferenceClassifier};
pub use prompt::build_system_prompt;
pub use summary::{Attempt, attempts_summary, looks_technical, user_safe_error};

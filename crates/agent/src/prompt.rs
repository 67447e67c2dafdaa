//! System prompt assembly.

use std::path::PathBuf;
use wayfarer_core::agent::AccessLevel;
use wayfarer_core::tool::ToolDefinition;
use crate::policy::AgentPolicy;

/// Facts about the host interpolated into the persona.
#[derive(Debug, Clone)]
pub struct HostFacts {
    pub os: String,
    pub home: PathBuf,
    pub today: String,
}

impl HostFacts {
    pub fn detect() -> Self {
        Self {
            os: os_name().to_string(),
            home: wayfarer_config::home_dir(),
            today: chrono::Local::now().format("%A, %B %-d, %Y").to_string(),
        }
    }
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "macOS",
        "windows" => "Windows",
        "linux" => "Linux",
        other => other,
    }
}

/// Build the system prompt for this machine.
pub fn build_system_prompt(
    policy: &AgentPolicy,
    tools: &[&ToolDefinition],
    memory_context: Option<&str>,
) -> String {
    render(&HostFacts::detect(), policy, tools, memory_context)
}

/// Persona, access disclaimer, skills, then memory, separated by blank lines.
pub fn render(
    facts: &HostFacts,
    policy: &AgentPolicy,
    tools: &[&ToolDefinition],
    memory_context: Option<&str>,
) -> String {
    let mut sections = vec![persona(facts), access_disclaimer(policy.access_level)];

    if tools.is_empty() {
        sections.push("No tools are available for this request; answer from your own knowledge.".into());
    } else {
        let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        sections.push(format!("Tools available right now: {}.", names.join(", ")));
    }

    if !policy.skills.is_empty() {
        let mut skills = String::from("## Skills\n");
        for skill in &policy.skills {
            if skill.description.trim().is_empty() {
                skills.push_str(&format!("- {}\n", skill.name));
            } else {
                skills.push_str(&format!("- {}: {}\n", skill.name, skill.description.trim()));
            }
        }
        sections.push(skills.trim_end().to_string());
    }

    if let Some(memory) = memory_context.map(str::trim).filter(|m| !m.is_empty()) {
        sections.push(format!("## What you remember about the user\n{memory}"));
    }

    sections.join("\n\n")
}

fn persona(facts: &HostFacts) -> String {
    format!(
        "You are Wayfarer, an assistant that gets things done on the user's computer by calling tools.\n\
         The user is on {os}. Their home directory is {home}. Today is {today}.\n\
         Work step by step: call one tool at a time, read its result, then decide the next step. \
         When the task is complete, reply with a short plain-language summary of what you did. \
         Never invent tool results, and say so plainly when something failed.",
        os = facts.os,
        home = facts.home.display(),
        today = facts.today,
    )
}

fn access_disclaimer(level: AccessLevel) -> String {
    match level {
        AccessLevel::Safe => "Access level: safe. You can read files, list and create directories, make HTTP requests, \
             and use memory, but you cannot run commands or write, move, or delete files. If a task \
             needs that, explain what you would do and suggest raising the access level in settings."
            .into(),
        AccessLevel::Power => "Access level: power. Running commands and changing files needs the user's \
             approval, which the app asks for automatically. Call the tool normally; if the user \
             declines, do not retry the same action."
            .into(),
        AccessLevel::Ultimate => "Access level: ultimate. Every tool runs without confirmation. Double-check \
             destructive actions such as deleting or overwriting before you make them."
            .into(),
    }
}

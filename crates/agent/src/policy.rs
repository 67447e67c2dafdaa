//! Agent policy: which tools are offered and which need the user's OK.

use wayfarer_config::{AgentConfig, SkillConfig};
use wayfarer_core::agent::AccessLevel;
use wayfarer_core::tool::{ToolCategory, ToolDefinition};

/// Per-request policy derived from `[agent]` configuration.
#[derive(Debug, Clone)]
pub struct AgentPolicy {
    pub access_level: AccessLevel,
    pub enabled_categories: Vec<ToolCategory>,
    pub auto_approve_categories: Vec<ToolCategory>,
    pub max_steps: u32,
    pub auto_recovery: bool,
    pub learn_preferences: bool,
    pub memory_context_limit: usize,
    pub skills: Vec<SkillConfig>,
}

impl From<&AgentConfig> for AgentPolicy {
    fn from(config: &AgentConfig) -> Self {
        Self {
            access_level: config.access_level,
            enabled_categories: config.enabled_categories.clone(),
            auto_approve_categories: config.auto_approve_categories.clone(),
            max_steps: config.max_steps.max(1),
            auto_recovery: config.auto_recovery,
            learn_preferences: config.learn_preferences,
            memory_context_limit: config.memory_context_limit,
            skills: config.skills.clone(),
        }
    }
}

impl Default for AgentPolicy {
    fn default() -> Self {
        Self::from(&AgentConfig::default())
    }
}

impl AgentPolicy {
    pub fn with_access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = level;
        self
    }
}

/// The tools offered to the model, in catalog order.
///
/// A tool must belong to an enabled category. At the `safe` level,
/// dangerous tools and anything that runs arbitrary code are withheld.
pub fn enabled_tools<'a>(catalog: &'a [ToolDefinition], policy: &AgentPolicy) -> Vec<&'a ToolDefinition> {
    catalog
        .iter()
        .filter(|def| policy.enabled_categories.contains(&def.category))
        .filter(|def| {
            policy.access_level != AccessLevel::Safe || !(def.dangerous || def.category.runs_code())
        })
        .collect()
}

/// Whether calling `def` must wait for the user's approval.
pub fn needs_confirmation(def: &ToolDefinition, policy: &AgentPolicy) -> bool {
    policy.access_level != AccessLevel::Ultimate
        && def.dangerous
        && !policy.auto_approve_categories.contains(&def.category)
}

//! `wayfarer tools`: List the tools the agent would be offered.

use wayfarer_agent::{AgentPolicy, enabled_tools, needs_confirmation};
use wayfarer_config::AppConfig;
use wayfarer_tools::CATALOG;

pub fn run(config: &AppConfig) {
    let policy = AgentPolicy::from(&config.agent);
    let rows = rows(&policy);
    println!("  Access level: {}", policy.access_level);
    println!("  {} of {} tools offered", rows.len(), CATALOG.len());
    println!();
    for row in rows {
        println!("  {row}");
    }
}

fn rows(policy: &AgentPolicy) -> Vec<String> {
    enabled_tools(CATALOG, policy)
        .into_iter()
        .map(|def| {
            let gate = if needs_confirmation(def, policy) { "asks first" } else { "" };
            format!(
                "{:<17} {:<11} {:<10} {}",
                def.name,
                def.category.as_str(),
                gate,
                def.description
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::AccessLevel;

    #[test]
    fn power_marks_gated_tools() {
        let policy = AgentPolicy::default().with_access_level(AccessLevel::Power);
        let rows = rows(&policy);
        let shell = rows.iter().find(|r| r.starts_with("run_shell")).unwrap();
        assert!(shell.contains("asks first"));
        let read = rows.iter().find(|r| r.starts_with("read_file")).unwrap();
        assert!(!read.contains("asks first"));
    }

    #[test]
    fn safe_hides_shell() {
        let policy = AgentPolicy::default().with_access_level(AccessLevel::Safe);
        assert!(!rows(&policy).iter().any(|r| r.starts_with("run_shell")));
    }
}

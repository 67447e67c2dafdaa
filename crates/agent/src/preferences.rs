//! Preference learning.
//!
//! After a final answer, sentences in the user's prompt that look like a
//! standing preference ("I prefer dark mode", "always use metric units")
//! are stored in long-term memory. The classifier is a heuristic, so it is
//! a trait and callers may swap it.

use regex::Regex;
use tracing::{debug, warn};
use wayfarer_config::AgentConfig;
use wayfarer_core::memory::MemoryStore;

/// Memory source tag for learned preferences.
pub const PREFERENCE_SOURCE: &str = "preference";

/// Picks the sentences of a prompt worth remembering.
pub trait PreferenceClassifier: Send + Sync {
    fn extract(&self, prompt: &str) -> Vec<String>;
}

/// Matches whole-word phrases such as "i prefer" or "never".
#[derive(Debug, Clone)]
pub struct PhraseClassifier {
    pattern: Option<Regex>,
}

impl PhraseClassifier {
    pub fn new(phrases: &[String]) -> Self {
        let alternatives: Vec<String> = phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| regex::escape(p).replace(' ', r"\s+"))
            .collect();
        if alternatives.is_empty() {
            return Self { pattern: None };
        }
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives.join("|")))
            .map_err(|e| warn!(error = %e, "Invalid preference phrase pattern"))
            .ok();
        Self { pattern }
    }
}

impl Default for PhraseClassifier {
    fn default() -> Self {
        Self::new(&AgentConfig::default().preference_phrases)
    }
}

impl PreferenceClassifier for PhraseClassifier {
    fn extract(&self, prompt: &str) -> Vec<String> {
        let Some(pattern) = &self.pattern else {
            return Vec::new();
        };
        prompt
            .split(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty() && pattern.is_match(s))
            .map(String::from)
            .collect()
    }
}

/// Store every preference found in `prompt`. Returns how many were stored.
///
/// Memory failures are logged and otherwise ignored.
pub async fn learn(classifier: &dyn PreferenceClassifier, memory: &dyn MemoryStore, prompt: &str) -> usize {
    let mut stored = 0;
    for sentence in classifier.extract(prompt) {
        match memory.add(&sentence, PREFERENCE_SOURCE).await {
            Ok(()) => stored += 1,
            Err(e) => debug!(error = %e, "Preference not stored"),
        }
    }
    if stored > 0 {
        debug!(count = stored, "Learned preferences");
    }
    stored
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_memory::InMemoryStore;

    #[test]
    fn extracts_matching_sentences_only() {
        let classifier = PhraseClassifier::default();
        let found = classifier.extract(
            "List my downloads. I prefer the newest files first! Also, never touch ~/Work\nthanks",
        );
        assert_eq!(found, vec!["I prefer the newest files first", "Also, never touch ~/Work"]);
    }

    #[test]
    fn whole_words_only() {
        let classifier = PhraseClassifier::new(&["always".into()]);
        assert!(classifier.extract("Hallways are long").is_empty());
        assert_eq!(classifier.extract("ALWAYS ask first"), vec!["ALWAYS ask first"]);
    }

    #[test]
    fn phrases_tolerate_extra_whitespace() {
        let classifier = PhraseClassifier::new(&["my favorite".into()]);
        assert_eq!(classifier.extract("my   favorite editor is helix").len(), 1);
    }

    #[test]
    fn no_phrases_matches_nothing() {
        let classifier = PhraseClassifier::new(&[]);
        assert!(classifier.extract("I prefer tabs").is_empty());
    }

    #[tokio::test]
    async fn learn_stores_with_preference_source() {
        let memory = InMemoryStore::default();
        let stored = learn(&PhraseClassifier::default(), &memory, "I like short answers. What time is it?").await;
        assert_eq!(stored, 1);
        let entries = memory.entries().await;
        assert_eq!(entries[0].content, "I like short answers");
        assert_eq!(entries[0].source, PREFERENCE_SOURCE);
    }
}

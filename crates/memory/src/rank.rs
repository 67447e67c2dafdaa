//! Keyword ranking shared by the local stores.

use wayfarer_core::memory::MemoryEntry;

/// Rank `entries` against `query` and return the best `limit` contents.
///
/// Each distinct query term (case-insensitive, two characters or more)
/// found in an entry scores one point; containing the whole query adds a
/// bonus. Entries scoring zero are dropped and ties go to the newer entry.
/// A blank query returns the most recent entries.
pub fn rank(entries: &[MemoryEntry], query: &str, limit: usize) -> Vec<String> {
    let query = query.trim().to_lowercase();
    let terms = terms(&query);

    let mut scored: Vec<(usize, &MemoryEntry)> = entries
        .iter()
        .filter_map(|entry| {
            if terms.is_empty() {
                return Some((1, entry));
            }
            let content = entry.content.to_lowercase();
            let mut score = terms.iter().filter(|t| content.contains(t.as_str())).count();
            if score == 0 {
                return None;
            }
            if terms.len() > 1 && content.contains(&query) {
                score += terms.len();
            }
            Some((score, entry))
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then(b.created_at.cmp(&a.created_at)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, entry)| entry.content.clone())
        .collect()
}

fn terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(String::from)
        .collect();
    terms.sort();
    terms.dedup();
    terms
}

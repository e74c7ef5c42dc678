//! Finding topics and sessions a user names in free text.

use crate::agenda::Agenda;
use regex::RegexBuilder;
use std::collections::HashSet;

/// Topic tags, session titles and session ids named in `text`, in agenda
/// first-seen order. Matching is case-insensitive on word boundaries, so
/// "AI" matches "excited about AI!" but not "fair".
pub fn extract_mentions(text: &str, agenda: &Agenda) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut candidates: Vec<&str> = Vec::new();
    for session in &agenda.sessions {
        candidates.extend(session.topics.iter().map(String::as_str));
        candidates.push(&session.title);
        candidates.push(session.id.as_str());
    }

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for candidate in candidates {
        let candidate = candidate.trim();
        if candidate.is_empty() || !seen.insert(candidate.to_lowercase()) {
            continue;
        }
        if names(text, candidate) {
            found.push(candidate.to_string());
        }
    }

    if !found.is_empty() {
        log::debug!("Mentions in user text: {:?}", found);
    }
    found
}

fn names(text: &str, candidate: &str) -> bool {
    // Whitespace inside multi-word names may vary in the user's text.
    let body = candidate
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    // `\b` never matches after a symbol like the `+` in "C++", so anchor on
    // non-word characters or the text edges instead.
    let pattern = format!(r"(?:^|[^\w])(?:{})(?:$|[^\w])", body);
    match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(text),
        Err(e) => {
            log::warn!("Skipping unmatchable agenda term '{}': {}", candidate, e);
            false
        }
    }
}

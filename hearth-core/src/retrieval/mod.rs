//! Retrieval — best-effort lexical recall over character lore and chat logs.
//!
//! Both entry points rank by [`scoring::overlap`], keep only positive scores,
//! and break ties by original order (stable sort). They are pure: the only
//! fallible part of retrieval is reading the log corpus from the store, which
//! the caller handles.

pub mod scoring;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::doc;

/// Maximum characters of a log line carried into a hit.
pub const LOG_SNIPPET_CHARS: usize = 180;

/// A retrieved piece of context for the system prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalHit {
    /// Episode title or `log:<role>`.
    pub title: String,
    /// Text to blend into the conversation.
    pub snippet: String,
}

impl RetrievalHit {
    /// Create a hit.
    #[must_use]
    pub fn new(title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
        }
    }
}

/// Rank tellable lore entries of an episodes document against `query`.
///
/// Entries whose `tellable.allow` is `false` are never returned, whatever
/// their score.
#[must_use]
pub fn retrieve_episodes(query: &str, episodes: &Value, top_k: usize) -> Vec<RetrievalHit> {
    let query_tokens = scoring::token_set(query);

    let mut scored: Vec<(usize, String, String, Vec<String>)> = Vec::new();
    for entry in doc::list(episodes, "episodes") {
        if !entry.is_object() {
            continue;
        }
        let tellable = doc::node(entry, "tellable");
        if !doc::allowed(tellable, "allow") {
            continue;
        }
        let title = doc::text_at(entry, "title");
        let summary = doc::text_at(entry, "summary");
        let key_lines = doc::texts(doc::list(tellable, "key_lines"));

        let mut text = vec![title.clone(), summary.clone()];
        text.extend(key_lines.iter().cloned());
        let score = scoring::overlap(&query_tokens, &text.join(" "));

        scored.push((score, title, summary, key_lines));
    }

    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let hits: Vec<RetrievalHit> = scored
        .into_iter()
        .take(top_k)
        .filter(|(score, ..)| *score > 0)
        .map(|(_, title, summary, key_lines)| {
            let mut snippet = summary;
            if !key_lines.is_empty() {
                let lines: Vec<&str> = key_lines.iter().take(2).map(String::as_str).collect();
                snippet.push_str(" / ");
                snippet.push_str(&lines.join(" / "));
            }
            RetrievalHit::new(title, snippet)
        })
        .collect();

    debug!(hits = hits.len(), top_k, "Episode retrieval");
    hits
}

/// Rank historical `(role, content)` lines against `query`.
#[must_use]
pub fn retrieve_logs<R, C>(query: &str, role_contents: &[(R, C)], top_k: usize) -> Vec<RetrievalHit>
where
    R: AsRef<str>,
    C: AsRef<str>,
{
    let query_tokens = scoring::token_set(query);

    let mut scored: Vec<(usize, &str, &str)> = role_contents
        .iter()
        .map(|(role, content)| {
            let content = content.as_ref();
            (scoring::overlap(&query_tokens, content), role.as_ref(), content)
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let hits: Vec<RetrievalHit> = scored
        .into_iter()
        .take(top_k)
        .filter(|(score, ..)| *score > 0)
        .map(|(_, role, content)| RetrievalHit::new(format!("log:{role}"), log_snippet(content)))
        .collect();

    debug!(hits = hits.len(), top_k, "Log retrieval");
    hits
}

/// Single-line, length-capped form of a log message.
#[must_use]
pub fn log_snippet(content: &str) -> String {
    let flat = content.replace('\n', " ");
    if flat.chars().count() > LOG_SNIPPET_CHARS {
        let mut cut: String = flat.chars().take(LOG_SNIPPET_CHARS).collect();
        cut.push('…');
        cut
    } else {
        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lore() -> Value {
        json!({
            "episodes": [
                {"title": "Lab fire", "summary": "The lab caught fire during a late experiment",
                 "tellable": {"allow": true, "key_lines": ["I still smell smoke", "Never again", "third"]}},
                {"title": "Secret", "summary": "A secret fire experiment",
                 "tellable": {"allow": false}},
                {"title": "Summer trip", "summary": "A trip to the sea"},
                "not an entry",
                {"title": "Second fire", "summary": "Another fire story"},
            ]
        })
    }

    #[test]
    fn episodes_rank_by_overlap_and_skip_untellable() {
        let hits = retrieve_episodes("any fire memories", &lore(), 5);
        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Lab fire", "Second fire"]);
        assert_eq!(
            hits[0].snippet,
            "The lab caught fire during a late experiment / I still smell smoke / Never again"
        );
        assert_eq!(hits[1].snippet, "Another fire story");
    }

    #[test]
    fn episodes_respect_top_k_and_zero_scores() {
        assert_eq!(retrieve_episodes("fire", &lore(), 1).len(), 1);
        assert!(retrieve_episodes("fire", &lore(), 0).is_empty());
        assert!(retrieve_episodes("volcano", &lore(), 5).is_empty());
        assert!(retrieve_episodes("fire", &json!({}), 5).is_empty());
    }

    #[test]
    fn ties_keep_document_order() {
        let docs = json!({"episodes": [
            {"title": "B", "summary": "apple"},
            {"title": "A", "summary": "apple"},
        ]});
        let hits = retrieve_episodes("apple", &docs, 2);
        assert_eq!(hits[0].title, "B");
        assert_eq!(hits[1].title, "A");
    }

    #[test]
    fn logs_are_titled_by_role_and_truncated() {
        let long = format!("coffee {}", "x".repeat(300));
        let logs = vec![
            ("user", "I like tea".to_string()),
            ("assistant", long),
            ("user", "nothing relevant".to_string()),
        ];
        let hits = retrieve_logs("coffee please", &logs, 6);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "log:assistant");
        assert_eq!(hits[0].snippet.chars().count(), LOG_SNIPPET_CHARS + 1);
        assert!(hits[0].snippet.ends_with('…'));
    }

    #[test]
    fn log_snippet_flattens_newlines() {
        assert_eq!(log_snippet("a\nb"), "a b");
    }
}

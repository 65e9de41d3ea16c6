//! Lexical tokenization and overlap scoring.
//!
//! Score(q, d) = |tokens(q) ∩ tokens(d)|
//!
//! Tokens are the lowercase whitespace-delimited words of the text plus every
//! overlapping character bigram over the text's kana/ideograph characters,
//! which approximates word matching for scripts without spaces.

use std::collections::HashSet;

/// Whether `ch` belongs to the kana or CJK unified ideograph ranges.
#[must_use]
pub fn is_cjk(ch: char) -> bool {
    matches!(ch, '\u{3040}'..='\u{30FF}' | '\u{4E00}'..='\u{9FFF}')
}

/// Split `text` into lexical tokens (may contain duplicates).
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase().replace('\n', " ");
    let mut tokens: Vec<String> = lowered.split_whitespace().map(str::to_string).collect();

    let cjk: Vec<char> = lowered.chars().filter(|c| is_cjk(*c)).collect();
    tokens.extend(cjk.windows(2).map(|w| w.iter().collect::<String>()));

    tokens
}

/// Token set for `text`.
#[must_use]
pub fn token_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

/// Overlap between a precomputed query token set and a document.
#[must_use]
pub fn overlap(query_tokens: &HashSet<String>, doc: &str) -> usize {
    if query_tokens.is_empty() {
        return 0;
    }
    let doc_tokens = token_set(doc);
    query_tokens.intersection(&doc_tokens).count()
}

/// Score a query against a document.
#[must_use]
pub fn score(query: &str, doc: &str) -> usize {
    overlap(&token_set(query), doc)
}

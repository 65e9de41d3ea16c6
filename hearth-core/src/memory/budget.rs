//! Context budgets for the short-term memory projection.
//!
//! Budgets are counted from the newest pair backward so that the most recent
//! exchange always survives trimming.

use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Characters per approximate token. Deliberately low so the estimate
/// over-counts for CJK-heavy text.
pub const CHARS_PER_TOKEN: usize = 2;

/// Limits applied to one session's short-term memory.
///
/// A value of `0` disables that dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryBudget {
    /// Turns kept in the buffer (`2 × turns` messages).
    pub turns: usize,
    /// Cumulative character budget for the projected pairs.
    pub max_chars: usize,
    /// Cumulative approximate-token budget for the projected pairs.
    pub max_tokens: usize,
}

impl MemoryBudget {
    /// Maximum buffered messages, or `None` when turn trimming is off.
    #[must_use]
    pub fn max_messages(&self) -> Option<usize> {
        (self.turns > 0).then(|| self.turns.saturating_mul(2))
    }

    /// Whether either cumulative budget is active.
    #[must_use]
    pub fn has_size_limit(&self) -> bool {
        self.max_chars > 0 || self.max_tokens > 0
    }
}

/// Approximate token count of `text`.
#[must_use]
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Keep the newest pairs that fit the character/token budgets.
///
/// Pairs are taken newest-first; each is included before the running totals
/// are checked, and accumulation stops once any active budget is reached.
/// The result is in chronological order.
#[must_use]
pub fn trim_to_budget(pairs: Vec<(Role, String)>, budget: &MemoryBudget) -> Vec<(Role, String)> {
    if !budget.has_size_limit() {
        return pairs;
    }

    let mut chars = 0usize;
    let mut tokens = 0usize;
    let mut kept = Vec::new();

    for (role, content) in pairs.into_iter().rev() {
        chars += content.chars().count();
        if budget.max_tokens > 0 {
            tokens += approx_tokens(&content);
        }
        kept.push((role, content));

        let chars_met = budget.max_chars > 0 && chars >= budget.max_chars;
        let tokens_met = budget.max_tokens > 0 && tokens >= budget.max_tokens;
        if chars_met || tokens_met {
            break;
        }
    }

    kept.reverse();
    kept
}

//! Short-term memory — the per-session view of recent turns sent to the model.
//!
//! The buffer is hydrated from the message store once per session and kept in
//! sync by appending every persisted message. It is bounded by a turn count
//! ([`MemoryBudget::turns`]) and, when projected with [`ShortTermMemory::pairs`],
//! by character/token budgets.

pub mod budget;

pub use budget::{MemoryBudget, approx_tokens, trim_to_budget};

use std::collections::HashMap;

use tracing::debug;

use crate::types::{Message, Role, SessionId};

/// In-process message buffers keyed by session.
#[derive(Debug, Clone, Default)]
pub struct ShortTermMemory {
    budget: MemoryBudget,
    by_session: HashMap<SessionId, Vec<Message>>,
}

impl ShortTermMemory {
    /// Create an empty memory with the given budget.
    #[must_use]
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            budget,
            by_session: HashMap::new(),
        }
    }

    /// Current budget.
    #[must_use]
    pub fn budget(&self) -> &MemoryBudget {
        &self.budget
    }

    /// Replace the budget. Takes effect on the next load/add/projection.
    pub fn set_budget(&mut self, budget: MemoryBudget) {
        self.budget = budget;
    }

    /// Replace a session's buffer with `history` (oldest first).
    pub fn load(&mut self, session_id: SessionId, history: Vec<Message>) {
        debug!(session = %session_id, messages = history.len(), "Hydrating short-term memory");
        self.by_session.insert(session_id, history);
        self.trim(session_id);
    }

    /// Append a persisted message to its session's buffer.
    pub fn add(&mut self, message: Message) {
        let session_id = message.session_id;
        self.by_session.entry(session_id).or_default().push(message);
        self.trim(session_id);
    }

    /// Dialogue pairs for the model, trimmed to the size budgets.
    ///
    /// `system` messages are dropped before trimming.
    #[must_use]
    pub fn pairs(&self, session_id: SessionId) -> Vec<(Role, String)> {
        let pairs = self
            .by_session
            .get(&session_id)
            .map(|msgs| {
                msgs.iter()
                    .filter(|m| m.role.is_dialogue())
                    .map(|m| (m.role, m.content.clone()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        trim_to_budget(pairs, &self.budget)
    }

    /// Drop everything buffered for a session.
    pub fn clear(&mut self, session_id: SessionId) {
        self.by_session.insert(session_id, Vec::new());
    }

    /// Number of buffered messages (all roles) for a session.
    #[must_use]
    pub fn len(&self, session_id: SessionId) -> usize {
        self.by_session.get(&session_id).map_or(0, Vec::len)
    }

    /// Whether a session has nothing buffered.
    #[must_use]
    pub fn is_empty(&self, session_id: SessionId) -> bool {
        self.len(session_id) == 0
    }

    fn trim(&mut self, session_id: SessionId) {
        let Some(max) = self.budget.max_messages() else {
            return;
        };
        if let Some(msgs) = self.by_session.get_mut(&session_id) {
            if msgs.len() > max {
                let excess = msgs.len() - max;
                msgs.drain(..excess);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(session: SessionId, role: Role, content: &str) -> Message {
        Message::new(session, role, content)
    }

    #[test]
    fn add_trims_to_twice_the_turns() {
        let session = SessionId::new();
        let mut mem = ShortTermMemory::new(MemoryBudget { turns: 2, ..Default::default() });
        for i in 0..7 {
            mem.add(msg(session, Role::User, &format!("m{i}")));
        }
        assert_eq!(mem.len(session), 4);
        let pairs = mem.pairs(session);
        assert_eq!(pairs.first().map(|p| p.1.as_str()), Some("m3"));
        assert_eq!(pairs.last().map(|p| p.1.as_str()), Some("m6"));
    }

    #[test]
    fn zero_turns_never_trims() {
        let session = SessionId::new();
        let mut mem = ShortTermMemory::new(MemoryBudget::default());
        for i in 0..50 {
            mem.add(msg(session, Role::Assistant, &format!("m{i}")));
        }
        assert_eq!(mem.len(session), 50);
    }

    #[test]
    fn load_replaces_and_trims() {
        let session = SessionId::new();
        let mut mem = ShortTermMemory::new(MemoryBudget { turns: 1, ..Default::default() });
        mem.add(msg(session, Role::User, "stale"));
        mem.load(
            session,
            vec![
                msg(session, Role::User, "a"),
                msg(session, Role::Assistant, "b"),
                msg(session, Role::User, "c"),
            ],
        );
        let contents: Vec<_> = mem.pairs(session).into_iter().map(|p| p.1).collect();
        assert_eq!(contents, vec!["b", "c"]);
    }

    #[test]
    fn system_messages_are_not_projected() {
        let session = SessionId::new();
        let mut mem = ShortTermMemory::new(MemoryBudget::default());
        mem.add(msg(session, Role::System, "note"));
        mem.add(msg(session, Role::User, "hello"));
        assert_eq!(mem.len(session), 2);
        assert_eq!(mem.pairs(session), vec![(Role::User, "hello".to_string())]);
    }

    #[test]
    fn char_budget_applies_to_pairs() {
        let session = SessionId::new();
        let mut mem = ShortTermMemory::new(MemoryBudget { turns: 0, max_chars: 8, max_tokens: 0 });
        for content in ["aaaaa", "bbbbb", "ccccc", "ddddd"] {
            mem.add(msg(session, Role::User, content));
        }
        let contents: Vec<_> = mem.pairs(session).into_iter().map(|p| p.1).collect();
        assert_eq!(contents, vec!["ccccc", "ddddd"]);
    }

    #[test]
    fn sessions_are_independent_and_clearable() {
        let a = SessionId::new();
        let b = SessionId::new();
        let mut mem = ShortTermMemory::new(MemoryBudget::default());
        mem.add(msg(a, Role::User, "for a"));
        mem.add(msg(b, Role::User, "for b"));
        mem.clear(a);
        assert!(mem.is_empty(a));
        assert_eq!(mem.len(b), 1);
        assert!(mem.pairs(SessionId::new()).is_empty());
    }
}

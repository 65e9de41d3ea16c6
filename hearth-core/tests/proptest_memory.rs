//! Property-based tests for the Hearth core.
//!
//! Uses `proptest` to check the invariants the turn pipeline relies on:
//! bounded emotion vectors, bounded short-term memory, and deterministic,
//! policy-respecting retrieval.

use proptest::prelude::*;
use serde_json::{Value, json};

use hearth_core::emotion::{EMOTION_KEYS, EMOTION_MAX, normalize};
use hearth_core::memory::{MemoryBudget, ShortTermMemory, trim_to_budget};
use hearth_core::retrieval::{retrieve_episodes, retrieve_logs};
use hearth_core::types::{Message, Role, SessionId};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        (-1.0e6..1.0e6f64).prop_map(|f| json!(f)),
        "[a-z0-9 ]{0,8}".prop_map(Value::String),
    ]
}

fn arb_emotion_input() -> impl Strategy<Value = Value> {
    prop_oneof![
        arb_json_scalar(),
        prop::collection::vec(arb_json_scalar(), 0..4).prop_map(Value::Array),
        prop::collection::btree_map(
            prop_oneof![
                prop::sample::select(EMOTION_KEYS.to_vec()).prop_map(str::to_string),
                "[a-z]{1,6}",
            ],
            arb_json_scalar(),
            0..12,
        )
        .prop_map(|m| Value::Object(m.into_iter().collect())),
    ]
}

fn arb_role() -> impl Strategy<Value = Role> {
    prop::sample::select(vec![Role::User, Role::Assistant, Role::System])
}

fn arb_words() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec!["fire", "tea", "lab", "sea", "cat", "rain", "book"]),
        0..6,
    )
    .prop_map(|w| w.join(" "))
}

// ---------------------------------------------------------------------------
// Property: normalize always yields 8 bounded keys
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn normalized_emotion_is_complete_and_bounded(raw in arb_emotion_input()) {
        let vector = normalize(&raw);
        let value = vector.to_value();
        let obj = value.as_object().expect("object");
        prop_assert_eq!(obj.len(), 8);
        for key in EMOTION_KEYS {
            let v = obj[key].as_u64().expect("integer");
            prop_assert!(v <= u64::from(EMOTION_MAX));
        }
    }

    #[test]
    fn normalize_is_idempotent(raw in arb_emotion_input()) {
        let once = normalize(&raw);
        prop_assert_eq!(normalize(&once.to_value()), once);
    }
}

// ---------------------------------------------------------------------------
// Property: memory never exceeds 2 × turns and keeps the newest messages
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn turn_budget_bounds_memory(turns in 1usize..8, n in 0usize..40) {
        let session = SessionId::new();
        let mut memory = ShortTermMemory::new(MemoryBudget { turns, max_chars: 0, max_tokens: 0 });
        for i in 0..n {
            let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
            memory.add(Message::new(session, role, format!("m{i}")));
        }

        let pairs = memory.pairs(session);
        prop_assert!(pairs.len() <= 2 * turns);
        prop_assert_eq!(pairs.len(), n.min(2 * turns));
        if n > 0 {
            prop_assert_eq!(&pairs.last().expect("last").1, &format!("m{}", n - 1));
        }
    }

    #[test]
    fn char_budget_keeps_a_chronological_suffix(
        lens in prop::collection::vec(1usize..20, 0..15),
        max_chars in 1usize..100,
    ) {
        let pairs: Vec<(Role, String)> = lens
            .iter()
            .enumerate()
            .map(|(i, len)| (Role::User, format!("{i:02}{}", "x".repeat(*len))))
            .collect();
        let budget = MemoryBudget { turns: 0, max_chars, max_tokens: 0 };
        let kept = trim_to_budget(pairs.clone(), &budget);

        prop_assert!(kept.len() <= pairs.len());
        prop_assert_eq!(&pairs[pairs.len() - kept.len()..], kept.as_slice());
        if !pairs.is_empty() {
            prop_assert!(!kept.is_empty(), "newest message is always kept");
        }
        // Dropping the oldest kept message would bring the total under budget.
        if kept.len() > 1 {
            let without_oldest: usize = kept[1..].iter().map(|(_, c)| c.chars().count()).sum();
            prop_assert!(without_oldest < max_chars);
        }
    }

    #[test]
    fn system_messages_never_reach_the_model(roles in prop::collection::vec(arb_role(), 0..20)) {
        let session = SessionId::new();
        let mut memory = ShortTermMemory::new(MemoryBudget::default());
        for role in &roles {
            memory.add(Message::new(session, *role, "text"));
        }
        prop_assert!(memory.pairs(session).iter().all(|(r, _)| r.is_dialogue()));
    }
}

// ---------------------------------------------------------------------------
// Property: retrieval is deterministic and respects filters
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn episode_retrieval_is_deterministic_and_filtered(
        query in arb_words(),
        entries in prop::collection::vec((arb_words(), any::<bool>()), 0..10),
        top_k in 0usize..6,
    ) {
        let episodes: Vec<Value> = entries
            .iter()
            .enumerate()
            .map(|(i, (summary, allow))| json!({
                "title": format!("ep{i}"),
                "summary": summary,
                "tellable": {"allow": allow},
            }))
            .collect();
        let doc = json!({ "episodes": episodes });

        let a = retrieve_episodes(&query, &doc, top_k);
        let b = retrieve_episodes(&query, &doc, top_k);
        prop_assert_eq!(&a, &b);
        prop_assert!(a.len() <= top_k);

        for hit in &a {
            let idx: usize = hit.title[2..].parse().expect("index");
            let (summary, allow) = &entries[idx];
            prop_assert!(*allow, "untellable entry {} retrieved", hit.title);
            prop_assert!(hearth_core::retrieval::scoring::score(&query, summary) > 0);
        }
    }

    #[test]
    fn log_retrieval_never_returns_zero_scores(
        query in arb_words(),
        lines in prop::collection::vec(arb_words(), 0..12),
    ) {
        let logs: Vec<(&str, String)> = lines.iter().map(|l| ("user", l.clone())).collect();
        let hits = retrieve_logs(&query, &logs, 6);
        prop_assert!(hits.len() <= 6);
        for hit in &hits {
            prop_assert!(hearth_core::retrieval::scoring::score(&query, &hit.snippet) > 0);
        }
    }
}

//! Hearth benchmark suite — the CPU work done on every turn.
//!
//! Targets (bench profile, one core):
//!   retrieve_episodes_top3_from_200 ... < 200μs
//!   retrieve_logs_top6_from_200 ....... < 300μs
//!   memory_pairs_200_msgs_12k_chars ... < 100μs
//!   build_system_prompt_full .......... < 100μs

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use hearth_core::character::CharacterBundle;
use hearth_core::memory::{MemoryBudget, ShortTermMemory};
use hearth_core::prompt::{build_system_prompt, PromptMode};
use hearth_core::retrieval::{retrieve_episodes, retrieve_logs};
use hearth_core::types::{Message, Role, SessionId};

const TOPICS: [&str; 8] = [
    "the lab fire",
    "a rainy festival night",
    "the quantum exam",
    "a stray cat near the station",
    "研究室の火事",
    "late trains and vending machines",
    "her first conference talk",
    "the broken telescope",
];

fn episodes(n: usize) -> Value {
    let entries: Vec<Value> = (0..n)
        .map(|i| {
            let topic = TOPICS[i % TOPICS.len()];
            json!({
                "title": format!("Episode {i}: {topic}"),
                "summary": format!("Something happened around {topic}, day {i} of the semester"),
                "tellable": {"allow": i % 5 != 0, "key_lines": [format!("I remember {topic}"), "It was strange"]},
            })
        })
        .collect();
    json!({ "episodes": entries })
}

fn logs(n: usize) -> Vec<(String, String)> {
    (0..n)
        .map(|i| {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            let topic = TOPICS[i % TOPICS.len()];
            (role.to_string(), format!("Line {i}: do you still think about {topic}? ").repeat(3))
        })
        .collect()
}

fn bench_episode_retrieval(c: &mut Criterion) {
    let doc = episodes(200);
    c.bench_function("retrieve_episodes_top3_from_200", |b| {
        b.iter(|| black_box(retrieve_episodes(black_box("tell me about the lab fire"), &doc, 3)));
    });
}

fn bench_log_retrieval(c: &mut Criterion) {
    let history = logs(200);
    c.bench_function("retrieve_logs_top6_from_200", |b| {
        b.iter(|| black_box(retrieve_logs(black_box("that rainy festival night"), &history, 6)));
    });
}

fn bench_memory_projection(c: &mut Criterion) {
    let session = SessionId::new();
    let mut memory = ShortTermMemory::new(MemoryBudget {
        turns: 100,
        max_chars: 12_000,
        max_tokens: 0,
    });
    for (i, (_, content)) in logs(200).into_iter().enumerate() {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        memory.add(Message::new(session, role, content));
    }

    c.bench_function("memory_pairs_200_msgs_12k_chars", |b| {
        b.iter(|| black_box(memory.pairs(black_box(session))));
    });
}

fn bench_prompt_build(c: &mut Criterion) {
    let bundle = CharacterBundle {
        profile: json!({"character": {
            "name": "Tokina",
            "profile": {"age": 19, "occupation": "physics student",
                        "affiliation": {"faculty": "Science", "department": "Physics"}},
            "traits": {
                "personality": [{"label": "curious", "value": "asks follow-up questions"}],
                "abilities": [{"label": "lab work", "value": "careful with reagents"}],
                "desires": [{"label": "stars", "value": "wants to fix the telescope"}],
            },
            "relationships": [{"name": "Professor Ota", "summary": "strict advisor",
                               "talk_policy": {"reveal_level": "low"}}],
        }}),
        speech_style: json!({"speech_style": {
            "baseline": {"first_person": "I", "tone_keywords": ["dry", "warm"], "politeness": "casual"},
            "modes": [{"name": "flustered", "example_lines": ["W-wait!", "That's not it!"]}],
            "humor": {"style": "deadpan", "rules": ["never mean"], "examples": ["Science, probably."]},
        }}),
        episodes: episodes(40),
    };
    let hits = retrieve_episodes("the lab fire", &bundle.episodes, 3);

    c.bench_function("build_system_prompt_full", |b| {
        b.iter(|| black_box(build_system_prompt(black_box(&bundle), &hits, PromptMode::Default)));
    });
}

criterion_group!(
    benches,
    bench_episode_retrieval,
    bench_log_retrieval,
    bench_memory_projection,
    bench_prompt_build,
);
criterion_main!(benches);

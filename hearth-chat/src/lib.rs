//! # hearth-chat — turn pipeline and interactive chat
//!
//! Ties `hearth-core` (memory, retrieval, prompts, storage) to `hearth-llm`
//! (model access) and drives them from a line-oriented control loop.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ChatApp  (lines → commands | turns → sinks) │
//! │  ┌────────────────────────────────────────┐  │
//! │  │  TurnPipeline                          │  │
//! │  │   store · memory · characters · LLM    │  │
//! │  └────────────────────────────────────────┘  │
//! │  SessionService          ReplySink(s)        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `pipeline` — one turn: persist, retrieve, prompt, call, persist
//! - `session` — resume or create sessions under a count cap
//! - `command` — slash-command routing
//! - `sink` — reply outputs
//! - `app` — the control loop

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod app;
pub mod command;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod sink;

pub use app::{ChatApp, Flow};
pub use error::TurnError;
pub use pipeline::{TurnOutput, TurnPipeline, TurnSettings};
pub use session::SessionService;
pub use sink::{ReplySink, TextSink};

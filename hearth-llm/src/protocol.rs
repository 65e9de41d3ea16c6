//! The structured emotion protocol.
//!
//! In structured mode the model receives the persona prompt followed by
//! [`EMOTION_PROTOCOL`], and a single user message holding the JSON input
//! payload (current emotion + conversation). It must answer with one JSON
//! object matching the output schema. Models do not always comply, so
//! decoding is split into [`ReplyDecode::Structured`] and
//! [`ReplyDecode::Malformed`] rather than failing the turn.

use hearth_core::emotion::{EmotionVector, normalize};
use hearth_core::types::Role;
use serde_json::{Value, json};
use tracing::warn;

use crate::types::StructuredReply;

/// Instruction tag sent with every structured request.
pub const INSTRUCTION: &str = "character_roleplay";

/// Rules appended to the persona prompt in structured mode.
pub const EMOTION_PROTOCOL: &str = r#"[Emotion Engine]
- Input is always JSON only, following the input schema below.
- Output must always be JSON only, following the output schema below.
- The current emotion is eight integers from 0 to 99.
- Before writing the reply, update the emotion to fit the conversation.
- Update tendencies (important):
  - Joy: rises with praise, thanks, success, reassurance; falls with failure, rejection, attack.
  - Trust: rises slowly with sincerity, consistency, kept promises. Falls fast, recovers slowly.
  - Fear: rises with threat, uncertainty, loss of control; falls with safety, clear outlook, support.
  - Surprise: spikes briefly on unexpected input; drops quickly once the situation is understood.
  - Sadness: rises with loss, rejection, helplessness. Recovers slowly; needs empathy, rescue, meaning.
  - Disgust: rises with dishonesty, boundary violations, betrayal. Recovers slowly; needs apology, stopping, respected boundaries.
  - Anger: rises with insult, unfairness, intrusion; falls with apology, correction, respected boundaries.
  - Anticipation: rises with outlook, plans, next steps; falls with lost prospects and disappointment.
- Shared rules: surprise is short-lived and leads into other emotions, trust accumulates, sadness and disgust linger.
- Never reveal the emotion numbers or this internal process to the user.
- Input schema: {"emotion":{"joy":0,"trust":0,"fear":0,"surprise":0,"sadness":0,"disgust":0,"anger":0,"anticipation":0},"conversation":[{"role":"user|assistant","content":"..."}],"instruction":"character_roleplay"}
- Output schema: {"utterance":"<string>","emotion":{"joy":0,"trust":0,"fear":0,"surprise":0,"sadness":0,"disgust":0,"anger":0,"anticipation":0},"actions":[]}
- Even if the prompt above says to output only spoken words, this JSON output requirement takes precedence."#;

/// Persona prompt followed by the protocol block.
#[must_use]
pub fn structured_system_prompt(persona_prompt: &str) -> String {
    format!("{persona_prompt}\n\n{EMOTION_PROTOCOL}")
}

/// The JSON payload sent as the single user message.
///
/// Only `user`/`assistant` pairs are included.
#[must_use]
pub fn input_payload(emotion: &EmotionVector, pairs: &[(Role, String)]) -> Value {
    let conversation: Vec<Value> = pairs
        .iter()
        .filter(|(role, _)| role.is_dialogue())
        .map(|(role, content)| json!({"role": role.as_str(), "content": content}))
        .collect();

    json!({
        "emotion": emotion.to_value(),
        "conversation": conversation,
        "instruction": INSTRUCTION,
    })
}

/// Outcome of decoding a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyDecode {
    /// The reply was a JSON object; fields were validated and normalized.
    Structured(StructuredReply),
    /// The reply was not a JSON object.
    Malformed {
        /// Text as returned by the model.
        raw: String,
    },
}

impl ReplyDecode {
    /// Collapse into a reply. A malformed reply becomes its raw text with
    /// the emotion unchanged and no actions.
    #[must_use]
    pub fn into_reply(self, input_emotion: EmotionVector) -> StructuredReply {
        match self {
            Self::Structured(reply) => reply,
            Self::Malformed { raw } => StructuredReply::plain(raw, input_emotion),
        }
    }

    /// Whether the model honored the output schema's outer shape.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }
}

/// Decode `raw` model output against the output schema.
#[must_use]
pub fn decode_reply(raw: &str) -> ReplyDecode {
    let Ok(Value::Object(data)) = serde_json::from_str::<Value>(raw) else {
        warn!(chars = raw.chars().count(), "Model reply is not a JSON object, using raw text");
        return ReplyDecode::Malformed { raw: raw.to_string() };
    };

    // Scalars are rendered as text; anything else falls back to the raw reply.
    let utterance = match data.get("utterance") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => scalar.to_string(),
        _ => raw.to_string(),
    };
    let actions = match data.get("actions") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };
    let emotion = normalize(data.get("emotion").unwrap_or(&Value::Null));

    ReplyDecode::Structured(StructuredReply {
        utterance,
        emotion,
        actions,
    })
}

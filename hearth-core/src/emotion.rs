//! Emotion State — the 8-dimension vector the character carries between turns.
//!
//! Dimensions follow Plutchik's wheel (joy, trust, fear, surprise, sadness,
//! disgust, anger, anticipation). Each is an integer in `[0, 99]` with 50 as
//! neutral. The vector is never updated mechanically here: the language model
//! proposes the next vector and [`normalize`] makes whatever it returned
//! structurally valid.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed emotion keys, in wire order.
pub const EMOTION_KEYS: [&str; 8] = [
    "joy",
    "trust",
    "fear",
    "surprise",
    "sadness",
    "disgust",
    "anger",
    "anticipation",
];

/// Value used for missing or unreadable dimensions.
pub const NEUTRAL_VALUE: u8 = 50;
/// Lowest allowed value.
pub const EMOTION_MIN: u8 = 0;
/// Highest allowed value.
pub const EMOTION_MAX: u8 = 99;

/// A complete, bounded emotion vector.
///
/// Serializes as a JSON object with exactly the eight [`EMOTION_KEYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmotionVector {
    /// Rises on praise, thanks, success; falls on failure, rejection, attack.
    pub joy: u8,
    /// Accrues slowly through sincerity; drops fast.
    pub trust: u8,
    /// Threat and uncertainty.
    pub fear: u8,
    /// Short-lived reaction to the unexpected.
    pub surprise: u8,
    /// Loss and helplessness; slow to recover.
    pub sadness: u8,
    /// Dishonesty and boundary violations; slow to recover.
    pub disgust: u8,
    /// Insult and unfairness.
    pub anger: u8,
    /// Outlook and plans.
    pub anticipation: u8,
}

impl EmotionVector {
    /// All dimensions at [`NEUTRAL_VALUE`].
    pub const NEUTRAL: Self = Self {
        joy: NEUTRAL_VALUE,
        trust: NEUTRAL_VALUE,
        fear: NEUTRAL_VALUE,
        surprise: NEUTRAL_VALUE,
        sadness: NEUTRAL_VALUE,
        disgust: NEUTRAL_VALUE,
        anger: NEUTRAL_VALUE,
        anticipation: NEUTRAL_VALUE,
    };

    /// The all-50 vector.
    #[must_use]
    pub fn neutral() -> Self {
        Self::NEUTRAL
    }

    /// Look up a dimension by key name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u8> {
        match key {
            "joy" => Some(self.joy),
            "trust" => Some(self.trust),
            "fear" => Some(self.fear),
            "surprise" => Some(self.surprise),
            "sadness" => Some(self.sadness),
            "disgust" => Some(self.disgust),
            "anger" => Some(self.anger),
            "anticipation" => Some(self.anticipation),
            _ => None,
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut u8> {
        match key {
            "joy" => Some(&mut self.joy),
            "trust" => Some(&mut self.trust),
            "fear" => Some(&mut self.fear),
            "surprise" => Some(&mut self.surprise),
            "sadness" => Some(&mut self.sadness),
            "disgust" => Some(&mut self.disgust),
            "anger" => Some(&mut self.anger),
            "anticipation" => Some(&mut self.anticipation),
            _ => None,
        }
    }

    /// Iterate `(key, value)` in [`EMOTION_KEYS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u8)> + '_ {
        EMOTION_KEYS
            .iter()
            .filter_map(move |k| self.get(k).map(|v| (*k, v)))
    }

    /// The strongest dimension; earlier keys win ties.
    #[must_use]
    pub fn dominant(&self) -> &'static str {
        let mut best = (EMOTION_KEYS[0], self.joy);
        for (key, value) in self.iter() {
            if value > best.1 {
                best = (key, value);
            }
        }
        best.0
    }

    /// JSON object form, as stored in message metadata.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let map = self
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(map)
    }
}

impl Default for EmotionVector {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Coerce an arbitrary JSON value into a valid [`EmotionVector`].
///
/// Never fails. Non-objects yield the neutral vector; each numeric dimension
/// is truncated toward zero and clamped to `[0, 99]`; anything else for a
/// dimension falls back to 50. Unknown keys are ignored.
#[must_use]
pub fn normalize(raw: &Value) -> EmotionVector {
    let mut out = EmotionVector::NEUTRAL;
    let Value::Object(map) = raw else {
        return out;
    };

    for key in EMOTION_KEYS {
        let Some(number) = map.get(key).and_then(Value::as_f64) else {
            continue;
        };
        if let Some(slot) = out.slot_mut(key) {
            *slot = clamp_dimension(number);
        }
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_dimension(value: f64) -> u8 {
    let truncated = value.trunc();
    truncated.clamp(f64::from(EMOTION_MIN), f64::from(EMOTION_MAX)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_yields_neutral() {
        for raw in [json!(null), json!(42), json!("joy"), json!([1, 2, 3])] {
            assert_eq!(normalize(&raw), EmotionVector::NEUTRAL);
        }
    }

    #[test]
    fn values_are_truncated_and_clamped() {
        let e = normalize(&json!({
            "joy": 80.9,
            "trust": -3.5,
            "fear": 150,
            "surprise": 0,
            "sadness": 99.99,
        }));
        assert_eq!(e.joy, 80);
        assert_eq!(e.trust, 0);
        assert_eq!(e.fear, 99);
        assert_eq!(e.surprise, 0);
        assert_eq!(e.sadness, 99);
        assert_eq!(e.disgust, 50);
    }

    #[test]
    fn non_numeric_dimensions_fall_back_to_neutral() {
        let e = normalize(&json!({
            "joy": "80",
            "trust": true,
            "fear": null,
            "anger": {"value": 10},
            "unknown": 5,
        }));
        assert_eq!(e, EmotionVector::NEUTRAL);
    }

    #[test]
    fn serializes_with_all_eight_keys() {
        let value = serde_json::to_value(EmotionVector::NEUTRAL).expect("serialize");
        let obj = value.as_object().expect("object");
        assert_eq!(obj.len(), 8);
        for key in EMOTION_KEYS {
            assert_eq!(obj[key], json!(50));
        }
        assert_eq!(value, EmotionVector::NEUTRAL.to_value());
    }

    #[test]
    fn dominant_prefers_highest_then_key_order() {
        assert_eq!(EmotionVector::NEUTRAL.dominant(), "joy");
        let e = normalize(&json!({"anger": 90, "fear": 90}));
        assert_eq!(e.dominant(), "fear");
    }

    #[test]
    fn renormalizing_is_idempotent() {
        let e = normalize(&json!({"joy": 12, "anticipation": 77}));
        assert_eq!(normalize(&e.to_value()), e);
    }
}

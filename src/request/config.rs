//! Per-attempt generation config.

use crate::structured::JsonMode;
use crate::types::message::Message;
use serde::{Deserialize, Serialize};

/// Decoding parameters passed through to the model service.
///
/// Field names follow the service's `options` object, so this serializes directly
/// into the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_last_n: Option<i32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    /// Server-side token limit. Unset leaves generation unbounded on the server;
    /// `max_length` on the request is enforced client-side regardless.
    #[serde(
        default,
        rename = "num_predict",
        alias = "max_tokens",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_tokens: Option<i32>,
}

/// Immutable record of one attempt: what to send and how to judge the answer.
///
/// Each retry derives a fresh config with [`GenerationRequestConfig::repair`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequestConfig {
    pub model: String,
    pub messages: Vec<Message>,
    pub decoding: DecodingOptions,
    pub grammar: Option<String>,
    pub json_mode: JsonMode,
    pub max_length: Option<usize>,
    pub retries_remaining: u32,
}

impl GenerationRequestConfig {
    /// Derive the next attempt's config from a failed one.
    ///
    /// Appends the repair turn (the model's own raw output, then the diagnostic) and
    /// spends one retry. Returns `None` when the budget is already spent.
    pub fn repair(self, raw_output: impl Into<String>, diagnostic: impl Into<String>) -> Option<Self> {
        let retries_remaining = self.retries_remaining.checked_sub(1)?;
        let mut messages = self.messages;
        messages.extend(repair_turn(raw_output, diagnostic));
        Some(Self {
            messages,
            retries_remaining,
            ..self
        })
    }
}

/// The two messages that drive a retry: `{assistant: raw}` then `{user: diagnostic}`.
pub fn repair_turn(raw_output: impl Into<String>, diagnostic: impl Into<String>) -> [Message; 2] {
    [
        Message::assistant(raw_output),
        Message::user(diagnostic),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;

    fn base(retries: u32) -> GenerationRequestConfig {
        GenerationRequestConfig {
            model: "llama3".into(),
            messages: vec![Message::user("pick two")],
            decoding: DecodingOptions::default(),
            grammar: None,
            json_mode: JsonMode::Object,
            max_length: None,
            retries_remaining: retries,
        }
    }

    #[test]
    fn repair_appends_assistant_then_user() {
        let next = base(2).repair("[1,1]", "duplicates").unwrap();
        assert_eq!(next.retries_remaining, 1);
        assert_eq!(next.messages.len(), 3);
        assert_eq!(next.messages[1].role, MessageRole::Assistant);
        assert_eq!(next.messages[1].content, "[1,1]");
        assert_eq!(next.messages[2].role, MessageRole::User);
        assert_eq!(next.messages[2].content, "duplicates");
        assert_eq!(next.json_mode, JsonMode::Object);
    }

    #[test]
    fn repair_refuses_when_budget_spent() {
        assert!(base(0).repair("x", "y").is_none());
    }

    #[test]
    fn identical_diagnostics_give_identical_turns() {
        let a = base(3).repair("[0]", "bad").unwrap();
        let b = base(1).repair("[0]", "bad").unwrap();
        assert_eq!(a.messages, b.messages);
        assert_ne!(a.retries_remaining, b.retries_remaining);
        assert_eq!(repair_turn("[0]", "bad"), repair_turn("[0]", "bad"));
    }

    #[test]
    fn decoding_serializes_service_names() {
        let d = DecodingOptions {
            top_k: Some(40),
            max_tokens: Some(128),
            ..Default::default()
        };
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v, serde_json::json!({"top_k": 40, "num_predict": 128}));
    }
}

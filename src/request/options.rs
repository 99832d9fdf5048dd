//! Caller-facing chat options and their pre-call validation.

use crate::request::config::{DecodingOptions, GenerationRequestConfig};
use crate::structured::JsonMode;
use crate::types::message::Message;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;

/// Custom stop predicate: `(latest_chunk, accumulated_text) -> stop?`.
#[derive(Clone)]
pub struct StopWhen(Arc<dyn Fn(&str, &str) -> bool + Send + Sync>);

impl StopWhen {
    pub fn new(f: impl Fn(&str, &str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn should_stop(&self, chunk: &str, accumulated: &str) -> bool {
        (self.0)(chunk, accumulated)
    }
}

impl std::fmt::Debug for StopWhen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StopWhen(..)")
    }
}

/// Options for one `chat` call.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub decoding: DecodingOptions,
    pub json: JsonMode,
    pub grammar: Option<String>,
    pub max_length: Option<usize>,
    pub retries: Option<u32>,
    pub stop_when: Option<StopWhen>,
}

impl ChatOptions {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Override the engine's default model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temp: f64) -> Self {
        self.decoding.temperature = Some(temp);
        self
    }

    pub fn top_k(mut self, k: u32) -> Self {
        self.decoding.top_k = Some(k);
        self
    }

    pub fn top_p(mut self, p: f64) -> Self {
        self.decoding.top_p = Some(p);
        self
    }

    pub fn repeat_penalty(mut self, penalty: f64) -> Self {
        self.decoding.repeat_penalty = Some(penalty);
        self
    }

    pub fn repeat_last_n(mut self, n: i32) -> Self {
        self.decoding.repeat_last_n = Some(n);
        self
    }

    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.decoding.stop = stop;
        self
    }

    /// Server-side token limit.
    pub fn max_tokens(mut self, max: i32) -> Self {
        self.decoding.max_tokens = Some(max);
        self
    }

    pub fn json(mut self, mode: JsonMode) -> Self {
        self.json = mode;
        self
    }

    pub fn grammar(mut self, grammar: impl Into<String>) -> Self {
        self.grammar = Some(grammar.into());
        self
    }

    /// Hard cap on the accumulated character count of one answer.
    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Number of repair attempts after the first one.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn stop_when(mut self, f: impl Fn(&str, &str) -> bool + Send + Sync + 'static) -> Self {
        self.stop_when = Some(StopWhen::new(f));
        self
    }

    /// Check option combinations before any model call is made.
    pub fn validate(&self) -> Result<()> {
        match (self.json, self.grammar.is_some()) {
            (JsonMode::Object, true) => {
                return Err(Error::configuration_with_context(
                    "JSON object mode cannot be combined with a grammar",
                    ErrorContext::new()
                        .with_field_path("options.grammar")
                        .with_details("use JsonMode::Any to parse grammar-constrained output")
                        .with_source("option_validator"),
                ));
            }
            (JsonMode::Any, false) => {
                return Err(Error::configuration_with_context(
                    "JSON any mode requires a grammar",
                    ErrorContext::new()
                        .with_field_path("options.grammar")
                        .with_details("use JsonMode::Object to let the service emit JSON natively")
                        .with_source("option_validator"),
                ));
            }
            _ => {}
        }

        if self.stop_when.is_some() && self.json.is_enabled() {
            return Err(Error::configuration_with_context(
                "a custom stop predicate cannot be combined with JSON mode",
                ErrorContext::new()
                    .with_field_path("options.stop_when")
                    .with_details(format!("json mode is '{}'", self.json))
                    .with_source("option_validator"),
            ));
        }

        if self.messages.is_empty() {
            return Err(Error::configuration_with_context(
                "at least one message is required",
                ErrorContext::new()
                    .with_field_path("options.messages")
                    .with_source("option_validator"),
            ));
        }

        Ok(())
    }

    /// Validate and split into the first attempt's config plus the stop predicate.
    pub fn into_request(
        self,
        default_model: &str,
        default_retries: u32,
    ) -> Result<(GenerationRequestConfig, Option<StopWhen>)> {
        self.validate()?;
        let config = GenerationRequestConfig {
            model: self.model.unwrap_or_else(|| default_model.to_string()),
            messages: self.messages,
            decoding: self.decoding,
            grammar: self.grammar,
            json_mode: self.json,
            max_length: self.max_length,
            retries_remaining: self.retries.unwrap_or(default_retries),
        };
        Ok((config, self.stop_when))
    }
}

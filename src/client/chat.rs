//! The validated retry loop.
//!
//! ```text
//!             ┌──────────── repair turn: [assistant: raw, user: diagnostic] ───────────┐
//!             ▼                                                                         │
//! options ─► Attempting ─► StreamingSession ─► extract ─► Ok(T) ─────────► Success(T)  │
//!                               │                  │                                   │
//!                     LengthExceeded,          Parse/Validation ── retries > 0 ────────┘
//!                     transport errors             │
//!                          (fatal)                 └── retries == 0 ─► RetriesExhausted
//! ```

use crate::client::core::ChatEngine;
use crate::client::types::ChatStats;
use crate::pipeline::{SessionEnd, StreamingSession};
use crate::request::ChatOptions;
use crate::structured::{extract, identity};
use crate::{Error, Result};
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

impl ChatEngine {
    /// Run the chat loop without a transform: the parsed JSON (or the raw text as a
    /// JSON string when JSON mode is off) is the result.
    pub async fn chat(&self, options: ChatOptions) -> Result<Value> {
        self.chat_with(options, identity).await
    }

    /// Run the chat loop, converting each candidate with `transform`.
    ///
    /// `transform` returns `Err(diagnostic)` to reject a candidate; the diagnostic is
    /// sent back to the model verbatim on the next attempt.
    pub async fn chat_with<T, F>(&self, options: ChatOptions, transform: F) -> Result<T>
    where
        T: Send,
        F: Fn(Value) -> std::result::Result<T, String> + Send + Sync,
    {
        self.chat_with_stats(options, transform)
            .await
            .map(|(value, _)| value)
    }

    /// Like [`ChatEngine::chat_with`], also returning per-call statistics.
    pub async fn chat_with_stats<T, F>(
        &self,
        options: ChatOptions,
        transform: F,
    ) -> Result<(T, ChatStats)>
    where
        T: Send,
        F: Fn(Value) -> std::result::Result<T, String> + Send + Sync,
    {
        let (mut config, stop_when) =
            options.into_request(&self.config.default_model, self.config.default_retries)?;

        let request_id = Uuid::new_v4().to_string();
        let start = Instant::now();
        let mut stats = ChatStats::new(config.model.clone(), request_id.clone());

        loop {
            stats.attempts += 1;
            let session = StreamingSession::new(&config, stop_when.as_ref());
            let output = match session.run(self.service.as_ref(), &request_id).await {
                Ok(output) => output,
                Err(e) => {
                    info!(
                        model = config.model.as_str(),
                        request_id = request_id.as_str(),
                        attempt = stats.attempts,
                        error = %e,
                        "chat attempt aborted"
                    );
                    return Err(e);
                }
            };
            stats.chunks += output.chunks;
            if output.end == SessionEnd::Stopped {
                stats.stopped_early += 1;
            }

            let failure = match extract(&output.text, config.json_mode, &transform) {
                Ok(value) => {
                    stats.duration_ms = start.elapsed().as_millis();
                    info!(
                        model = config.model.as_str(),
                        request_id = request_id.as_str(),
                        attempts = stats.attempts,
                        chunks = stats.chunks,
                        duration_ms = stats.duration_ms,
                        "chat succeeded"
                    );
                    return Ok((value, stats));
                }
                Err(e) if e.is_retryable() => e,
                Err(e) => return Err(e),
            };

            let diagnostic = failure.diagnostic();
            warn!(
                model = config.model.as_str(),
                request_id = request_id.as_str(),
                attempt = stats.attempts,
                retries_remaining = config.retries_remaining,
                error = %failure,
                "chat attempt rejected"
            );

            config = match config.repair(output.text, diagnostic.clone()) {
                Some(next) => next,
                None => {
                    info!(
                        request_id = request_id.as_str(),
                        attempts = stats.attempts,
                        duration_ms = start.elapsed().as_millis(),
                        "chat retries exhausted"
                    );
                    return Err(Error::RetriesExhausted {
                        message: diagnostic,
                        attempts: stats.attempts,
                    });
                }
            };
        }
    }
}

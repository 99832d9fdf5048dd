//! # Pipeline
//!
//! Turns a model service's raw response body into text chunks, and drives one
//! streaming attempt over those chunks.
//!
//! ```text
//! Raw Bytes → Decoder → Mapper → StreamChunk → StreamingSession → accumulated text
//!     │          │         │                         │
//!   HTTP      NDJSON   message.content        stop predicate,
//!             frames   + done flag            length cap, abort
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Pipeline`] | Decoder + mapper for one response body |
//! | [`Decoder`] | Bytes → JSON frames |
//! | [`Mapper`] | JSON frames → [`StreamChunk`] |
//! | [`session::StreamingSession`] | Accumulates one attempt's answer |

pub mod decode;
pub mod event_map;
pub mod session;

#[cfg(test)]
mod tests;

use crate::types::events::StreamChunk;
use crate::{BoxStream, PipeResult};

pub use session::{SessionEnd, SessionOutput, StreamingSession};

/// Decoder trait for stream decoding
#[async_trait::async_trait]
pub trait Decoder: Send + Sync {
    /// Decode a byte stream into JSON values
    async fn decode_stream(
        &self,
        input: BoxStream<'static, bytes::Bytes>,
    ) -> PipeResult<BoxStream<'static, serde_json::Value>>;
}

/// Final stage: JSON frames to text chunks
#[async_trait::async_trait]
pub trait Mapper: Send + Sync {
    async fn map(
        &self,
        input: BoxStream<'static, serde_json::Value>,
    ) -> PipeResult<BoxStream<'static, StreamChunk>>;
}

/// Pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Chunk mapper error: {0}")]
    Mapper(String),

    #[error("Operator execution failed: {operator} - {reason}{}", .hint.as_ref().map(|h| format!("\n💡 Hint: {}", h)).unwrap_or_default())]
    Execution {
        operator: String,
        reason: String,
        hint: Option<String>,
    },
}

impl PipelineError {
    /// Attach an actionable hint to the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        let hint_val = Some(hint.into());
        if let PipelineError::Execution { ref mut hint, .. } = self {
            *hint = hint_val;
        }
        self
    }
}

/// Decoder and mapper for one response format.
pub struct Pipeline {
    decoder: Box<dyn Decoder>,
    mapper: Box<dyn Mapper>,
}

impl Pipeline {
    pub fn new(decoder: Box<dyn Decoder>, mapper: Box<dyn Mapper>) -> Self {
        Self { decoder, mapper }
    }

    /// Newline-delimited JSON chat frames, as streamed by `/api/chat`.
    pub fn ndjson_chat() -> Self {
        Self::new(
            Box::new(decode::NdjsonDecoder::new()),
            Box::new(event_map::ChatChunkMapper),
        )
    }

    pub async fn process_stream(
        &self,
        input: BoxStream<'static, bytes::Bytes>,
    ) -> PipeResult<BoxStream<'static, StreamChunk>> {
        let frames = self.decoder.decode_stream(input).await?;
        self.mapper.map(frames).await
    }
}

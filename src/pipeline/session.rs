//! Streaming session: one model invocation, from request to accumulated answer.

use crate::request::{GenerationRequestConfig, StopWhen};
use crate::transport::ModelService;
use crate::types::events::StreamChunk;
use crate::{Error, Result};
use futures::StreamExt;
use serde::de::IgnoredAny;
use tracing::{debug, warn};

/// How a session that produced text came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The service ended the stream.
    Completed,
    /// The stop predicate fired and the stream was aborted.
    Stopped,
}

/// Accumulated answer of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutput {
    pub text: String,
    pub end: SessionEnd,
    pub chunks: usize,
}

/// Default stop predicate under JSON mode.
///
/// A blank chunk after text that already parses as JSON means the answer is over,
/// even if the service keeps the stream open (constrained decoders tend to pad with
/// whitespace until they hit their token limit).
pub fn json_complete(chunk: &str, accumulated: &str) -> bool {
    chunk.trim().is_empty() && serde_json::from_str::<IgnoredAny>(accumulated).is_ok()
}

/// Drives one model invocation for a given attempt config.
pub struct StreamingSession<'a> {
    config: &'a GenerationRequestConfig,
    stop_when: Option<&'a StopWhen>,
}

impl<'a> StreamingSession<'a> {
    pub fn new(config: &'a GenerationRequestConfig, stop_when: Option<&'a StopWhen>) -> Self {
        Self { config, stop_when }
    }

    fn should_stop(&self, chunk: &StreamChunk, accumulated: &str) -> bool {
        match self.stop_when {
            Some(predicate) => predicate.should_stop(&chunk.content, accumulated),
            None if self.config.json_mode.is_enabled() => json_complete(&chunk.content, accumulated),
            None => false,
        }
    }

    /// Consume chunks until the stream ends, the stop predicate fires, or the
    /// accumulated character count exceeds `max_length`. A chunk flagged `done`
    /// ends the session as completed without consulting the predicate.
    ///
    /// Length overflow aborts the stream and returns [`Error::LengthExceeded`].
    pub async fn run(&self, service: &dyn ModelService, request_id: &str) -> Result<SessionOutput> {
        let mut stream = service.stream_chat(self.config, request_id).await?;
        let mut text = String::new();
        let mut chars = 0usize;
        let mut chunks = 0usize;

        while let Some(item) = stream.next().await {
            let chunk = item?;
            chunks += 1;
            chars += chunk.content.chars().count();
            text.push_str(&chunk.content);

            if let Some(limit) = self.config.max_length {
                if chars > limit {
                    stream.abort();
                    warn!(
                        model = self.config.model.as_str(),
                        request_id,
                        limit,
                        received = chars,
                        "response length exceeded, stream aborted"
                    );
                    return Err(Error::LengthExceeded { limit });
                }
            }

            // The service's own end marker is a natural end, not a stop.
            if chunk.done {
                break;
            }

            if self.should_stop(&chunk, &text) {
                stream.abort();
                debug!(request_id, chunks, "stop predicate matched, stream aborted");
                return Ok(SessionOutput {
                    text,
                    end: SessionEnd::Stopped,
                    chunks,
                });
            }
        }

        Ok(SessionOutput {
            text,
            end: SessionEnd::Completed,
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DecodingOptions;
    use crate::structured::JsonMode;
    use crate::transport::ModelStream;
    use crate::types::Message;

    /// Replays fixed chunks, ending with the service's empty `done` frame.
    struct FramedService(Vec<StreamChunk>);

    #[async_trait::async_trait]
    impl ModelService for FramedService {
        async fn stream_chat(
            &self,
            _request: &GenerationRequestConfig,
            _request_id: &str,
        ) -> Result<ModelStream> {
            let chunks: Vec<Result<StreamChunk>> = self.0.iter().cloned().map(Ok).collect();
            Ok(ModelStream::new(Box::pin(futures::stream::iter(chunks))))
        }
    }

    fn config(json_mode: JsonMode) -> GenerationRequestConfig {
        GenerationRequestConfig {
            model: "llama3".into(),
            messages: vec![Message::user("ids")],
            decoding: DecodingOptions::default(),
            grammar: None,
            json_mode,
            max_length: None,
            retries_remaining: 0,
        }
    }

    #[tokio::test]
    async fn done_frame_completes_instead_of_stopping() {
        let service = FramedService(vec![
            StreamChunk::text("{\"ids\": "),
            StreamChunk::text("[0]}"),
            StreamChunk::done(),
        ]);
        let config = config(JsonMode::Object);

        let output = StreamingSession::new(&config, None)
            .run(&service, "req-1")
            .await
            .unwrap();

        assert_eq!(output.end, SessionEnd::Completed);
        assert_eq!(output.text, "{\"ids\": [0]}");
        assert_eq!(output.chunks, 3);
    }

    #[test]
    fn json_complete_needs_blank_chunk_and_valid_json() {
        assert!(json_complete(" ", "[1,2]"));
        assert!(json_complete("", "{\"a\": 1}\n"));
        assert!(!json_complete("]", "[1,2]"));
        assert!(!json_complete(" ", "[1,2"));
        assert!(!json_complete("\n", ""));
    }
}

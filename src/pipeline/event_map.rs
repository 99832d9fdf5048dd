//! Frame → chunk mapping for chat-style NDJSON responses.

use crate::pipeline::{Mapper, PipelineError};
use crate::types::events::StreamChunk;
use crate::{BoxStream, PipeResult};
use futures::StreamExt;
use serde_json::Value;

/// Maps `{"message": {"content": ".."}, "done": bool}` frames to [`StreamChunk`]s.
///
/// Completion-style frames carrying `response` instead of `message.content` are
/// accepted too. A frame with an `error` field ends the attempt with an error.
#[derive(Debug, Default)]
pub struct ChatChunkMapper;

pub(crate) fn map_frame(frame: &Value) -> PipeResult<StreamChunk> {
    if let Some(err) = frame.get("error") {
        let reason = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(PipelineError::Execution {
            operator: "chat_chunk_mapper".to_string(),
            reason,
            hint: None,
        }
        .with_hint("the model service reported an error mid-stream")
        .into());
    }

    let content = frame
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| frame.get("response"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let done = frame.get("done").and_then(Value::as_bool).unwrap_or(false);

    Ok(StreamChunk { content, done })
}

#[async_trait::async_trait]
impl Mapper for ChatChunkMapper {
    async fn map(
        &self,
        input: BoxStream<'static, Value>,
    ) -> PipeResult<BoxStream<'static, StreamChunk>> {
        let stream = input.map(|item| item.and_then(|frame| map_frame(&frame)));
        Ok(Box::pin(stream))
    }
}

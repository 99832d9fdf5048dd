//! Streaming decoders (Bytes -> JSON Value)

use crate::pipeline::{Decoder, PipelineError};
use crate::{BoxStream, PipeResult};
use bytes::{Buf, Bytes, BytesMut};
use futures::{stream, StreamExt};
use serde_json::Value;
use tracing::debug;

/// NDJSON / JSONL decoder (one JSON object per line).
///
/// Lines are split on raw bytes before UTF-8 decoding, so a multi-byte character
/// straddling two network chunks is reassembled intact.
#[derive(Debug, Default)]
pub struct NdjsonDecoder;

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn parse_line(line: &[u8]) -> Option<PipeResult<Value>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => {
            return Some(Err(
                PipelineError::Decoder(format!("NDJSON frame is not valid UTF-8: {}", e)).into(),
            ))
        }
    };
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str::<Value>(trimmed).map_err(|e| {
        PipelineError::Decoder(format!("invalid NDJSON frame: {}", e))
            .into()
    }))
}

#[async_trait::async_trait]
impl Decoder for NdjsonDecoder {
    async fn decode_stream(
        &self,
        input: BoxStream<'static, Bytes>,
    ) -> PipeResult<BoxStream<'static, Value>> {
        let stream = stream::unfold(
            (input, BytesMut::new(), false),
            move |(mut input, mut buf, finished)| async move {
                loop {
                    if let Some(idx) = buf.iter().position(|b| *b == b'\n') {
                        let line = buf.split_to(idx);
                        buf.advance(1);
                        match parse_line(&line) {
                            Some(frame) => {
                                if let Ok(ref v) = frame {
                                    debug!(frame = %v, "decoded ndjson frame");
                                }
                                return Some((frame, (input, buf, finished)));
                            }
                            None => continue,
                        }
                    }

                    if finished {
                        return None;
                    }

                    match input.next().await {
                        Some(Ok(bytes)) => {
                            buf.extend_from_slice(&bytes);
                            continue;
                        }
                        Some(Err(e)) => return Some((Err(e), (input, buf, finished))),
                        None => {
                            // EOF: the last line may lack its newline
                            let rest = buf.split();
                            return parse_line(&rest).map(|frame| (frame, (input, buf, true)));
                        }
                    }
                }
            },
        );

        Ok(Box::pin(stream))
    }
}

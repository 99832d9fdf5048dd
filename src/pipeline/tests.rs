#[cfg(test)]
mod tests {
    use crate::pipeline::event_map::map_frame;
    use crate::pipeline::{Pipeline, PipelineError};
    use crate::types::events::StreamChunk;
    use crate::{BoxStream, Error};
    use bytes::Bytes;
    use futures::StreamExt;
    use serde_json::json;

    fn body(parts: Vec<&'static str>) -> BoxStream<'static, Bytes> {
        Box::pin(futures::stream::iter(
            parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))),
        ))
    }

    #[tokio::test]
    async fn test_ndjson_chat_pipeline() {
        // Frames split mid-object, as a real network body would be
        let input = body(vec![
            "{\"message\":{\"role\":\"assistant\",\"content\":\"[1\"},\"done\":false}\n{\"mess",
            "age\":{\"role\":\"assistant\",\"content\":\",2]\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true,\"eval_count\":4}\n",
        ]);

        let chunks: Vec<StreamChunk> = Pipeline::ndjson_chat()
            .process_stream(input)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                StreamChunk::text("[1"),
                StreamChunk::text(",2]"),
                StreamChunk::done()
            ]
        );
    }

    #[test]
    fn test_completion_style_frame() {
        let chunk = map_frame(&json!({"response": "hi", "done": false})).unwrap();
        assert_eq!(chunk, StreamChunk::text("hi"));

        let chunk = map_frame(&json!({"model": "llama3"})).unwrap();
        assert!(chunk.is_blank());
        assert!(!chunk.done);
    }

    #[test]
    fn test_error_frame() {
        let err = map_frame(&json!({"error": "model is loading"})).unwrap_err();
        match err {
            Error::Pipeline(PipelineError::Execution { reason, hint, .. }) => {
                assert_eq!(reason, "model is loading");
                assert!(hint.is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

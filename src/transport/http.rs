use crate::client::config::EngineConfig;
use crate::pipeline::Pipeline;
use crate::request::GenerationRequestConfig;
use crate::transport::{ModelService, ModelStream, TransportError};
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::Proxy;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Path of the streaming chat endpoint, relative to the base URL.
pub const CHAT_PATH: &str = "/api/chat";

/// Correlation header sent with every attempt of one `chat` call.
pub const REQUEST_ID_HEADER: &str = "x-ai-chat-request-id";

/// HTTP client for an Ollama-compatible chat service streaming NDJSON.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    pipeline: Pipeline,
}

impl HttpTransport {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &config.proxy {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            pipeline: Pipeline::ndjson_chat(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the wire body for one attempt.
    ///
    /// `format: "json"` is only sent for JSON object mode; grammar-constrained
    /// output is parsed client-side.
    pub fn request_body(request: &GenerationRequestConfig) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": true,
            "options": request.decoding,
        });
        if let Some(format) = request.json_mode.service_format() {
            body["format"] = json!(format);
        }
        if let Some(grammar) = &request.grammar {
            body["grammar"] = json!(grammar);
        }
        body
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.to_string())
    }
}

#[async_trait::async_trait]
impl ModelService for HttpTransport {
    async fn stream_chat(
        &self,
        request: &GenerationRequestConfig,
        request_id: &str,
    ) -> Result<ModelStream> {
        let url = format!("{}{}", self.base_url, CHAT_PATH);
        let start = std::time::Instant::now();

        let resp = self
            .client
            .post(&url)
            .json(&Self::request_body(request))
            .header("accept", "application/x-ndjson")
            .header(REQUEST_ID_HEADER, request_id)
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            info!(
                http_status = status,
                model = request.model.as_str(),
                request_id,
                duration_ms = start.elapsed().as_millis(),
                "chat request failed"
            );
            return Err(Error::Remote {
                status,
                message: Self::error_message(&body),
            });
        }

        let body_stream: BoxStream<'static, Bytes> = Box::pin(
            resp.bytes_stream()
                .map_err(|e| Error::Transport(TransportError::Http(e))),
        );
        let chunks = self.pipeline.process_stream(body_stream).await?;
        Ok(ModelStream::new(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DecodingOptions;
    use crate::structured::JsonMode;
    use crate::types::Message;

    fn request(json_mode: JsonMode, grammar: Option<&str>) -> GenerationRequestConfig {
        GenerationRequestConfig {
            model: "llama3".into(),
            messages: vec![Message::system("ids only"), Message::user("pick")],
            decoding: DecodingOptions {
                temperature: Some(0.2),
                stop: vec!["\n\n".into()],
                ..Default::default()
            },
            grammar: grammar.map(str::to_string),
            json_mode,
            max_length: Some(100),
            retries_remaining: 3,
        }
    }

    #[test]
    fn body_for_object_mode_requests_native_json() {
        let body = HttpTransport::request_body(&request(JsonMode::Object, None));
        assert_eq!(body["format"], "json");
        assert_eq!(body["stream"], true);
        assert!(body.get("grammar").is_none());
        assert_eq!(body["options"]["temperature"], 0.2);
        assert_eq!(body["options"]["stop"][0], "\n\n");
        assert_eq!(body["messages"][0]["role"], "system");
        // max_length is enforced client-side only
        assert!(body["options"].get("num_predict").is_none());
    }

    #[test]
    fn body_for_any_mode_carries_grammar_only() {
        let body = HttpTransport::request_body(&request(JsonMode::Any, Some("root ::= \"[]\"")));
        assert!(body.get("format").is_none());
        assert_eq!(body["grammar"], "root ::= \"[]\"");
    }

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            HttpTransport::error_message(r#"{"error":"model 'x' not found"}"#),
            "model 'x' not found"
        );
        assert_eq!(HttpTransport::error_message("boom"), "boom");
    }
}

//! Model chat service boundary.
//!
//! The engine only needs one operation from a backend: open a streamed chat
//! invocation that yields text chunks and can be aborted. [`ModelService`] is that
//! seam; [`HttpTransport`] talks to an Ollama-compatible server and
//! [`ScriptedService`] replays canned answers in memory.

pub mod http;
pub mod scripted;

pub use http::HttpTransport;
pub use scripted::ScriptedService;

use crate::client::types::{CancelHandle, ControlledStream};
use crate::request::GenerationRequestConfig;
use crate::types::events::StreamChunk;
use crate::{BoxStream, PipeResult, Result};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A backend able to stream one chat answer at a time.
///
/// Implementations must tolerate independent, interleaved calls from several
/// engines sharing one instance.
#[async_trait::async_trait]
pub trait ModelService: Send + Sync {
    /// Open a streamed invocation for `request`.
    ///
    /// `request_id` correlates every attempt of one logical `chat` call.
    async fn stream_chat(
        &self,
        request: &GenerationRequestConfig,
        request_id: &str,
    ) -> Result<ModelStream>;
}

/// Text chunks of one invocation, plus the means to abort it.
pub struct ModelStream {
    chunks: ControlledStream<StreamChunk>,
    cancel: CancelHandle,
}

impl ModelStream {
    pub fn new(inner: BoxStream<'static, StreamChunk>) -> Self {
        Self::with_cancel(inner, CancelHandle::new())
    }

    /// Use an existing handle, so the producer side can observe the abort.
    pub fn with_cancel(inner: BoxStream<'static, StreamChunk>, cancel: CancelHandle) -> Self {
        Self {
            chunks: ControlledStream::new(inner, cancel.clone()),
            cancel,
        }
    }

    /// Stop the invocation. No chunk is pulled from the producer afterwards.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

impl Stream for ModelStream {
    type Item = PipeResult<StreamChunk>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().chunks).poll_next(cx)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}

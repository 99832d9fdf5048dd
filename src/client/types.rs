//! Cancellation primitives and per-call statistics.

use crate::{BoxStream, PipeResult};
use futures::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Abort signal for one model invocation.
///
/// Clones share the same flag: the session holds one to abort, the stream wrapper
/// holds another to observe it.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Stream wrapper that stops yielding once its [`CancelHandle`] fires.
///
/// The flag is checked before every pull. On cancellation the inner stream is dropped,
/// which for HTTP closes the response body and with it the server-side generation.
pub struct ControlledStream<T> {
    inner: Option<BoxStream<'static, T>>,
    cancel: CancelHandle,
}

impl<T> ControlledStream<T> {
    pub fn new(inner: BoxStream<'static, T>, cancel: CancelHandle) -> Self {
        Self {
            inner: Some(inner),
            cancel,
        }
    }
}

impl<T> Stream for ControlledStream<T> {
    type Item = PipeResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.cancel.is_cancelled() {
            this.inner = None;
            return Poll::Ready(None);
        }
        match this.inner.as_mut() {
            Some(inner) => inner.as_mut().poll_next(cx),
            None => Poll::Ready(None),
        }
    }
}

/// Statistics for one `chat` call, across all of its attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatStats {
    pub model: String,
    pub request_id: String,
    /// Model invocations made, including the first one.
    pub attempts: u32,
    /// Chunks consumed across all attempts.
    pub chunks: usize,
    /// Attempts that ended on the stop predicate rather than end of stream.
    pub stopped_early: u32,
    pub duration_ms: u128,
}

impl ChatStats {
    pub fn new(model: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            request_id: request_id.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn cancelled_stream_yields_nothing_more() {
        let inner: BoxStream<'static, u32> = Box::pin(futures::stream::iter(vec![Ok(1), Ok(2), Ok(3)]));
        let cancel = CancelHandle::new();
        let mut stream = ControlledStream::new(inner, cancel.clone());

        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        cancel.cancel();
        assert!(stream.next().await.is_none());
        assert!(stream.next().await.is_none());
    }
}

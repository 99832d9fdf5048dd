//! In-memory model service replaying scripted answers.

use crate::client::types::CancelHandle;
use crate::request::GenerationRequestConfig;
use crate::transport::{ModelService, ModelStream, TransportError};
use crate::types::events::StreamChunk;
use crate::{Error, Result};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct ScriptState {
    queue: VecDeque<Vec<String>>,
    requests: Vec<GenerationRequestConfig>,
    cancels: Vec<CancelHandle>,
}

/// A [`ModelService`] that answers each invocation with the next scripted list of
/// chunks, and records what it was asked.
///
/// Once the queue is empty the `repeat` answer (if any) is served forever; without one
/// the invocation fails with a transport error.
#[derive(Default)]
pub struct ScriptedService {
    state: Mutex<ScriptState>,
    repeat: Option<Vec<String>>,
    pulled: Arc<AtomicUsize>,
}

impl ScriptedService {
    /// Serve `answers` in order, one per invocation.
    pub fn new<I, A, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queue = answers
            .into_iter()
            .map(|a| a.into_iter().map(Into::into).collect())
            .collect();
        Self {
            state: Mutex::new(ScriptState {
                queue,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Serve the same answer to every invocation.
    pub fn repeating<A, S>(answer: A) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            repeat: Some(answer.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of invocations made so far.
    pub fn invocations(&self) -> usize {
        self.state().requests.len()
    }

    /// Chunks actually pulled by consumers, across all invocations.
    pub fn chunks_pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    /// Invocations whose stream was aborted by the consumer.
    pub fn aborts(&self) -> usize {
        self.state().cancels.iter().filter(|c| c.is_cancelled()).count()
    }

    /// Configs received, in invocation order.
    pub fn requests(&self) -> Vec<GenerationRequestConfig> {
        self.state().requests.clone()
    }
}

#[async_trait::async_trait]
impl ModelService for ScriptedService {
    async fn stream_chat(
        &self,
        request: &GenerationRequestConfig,
        _request_id: &str,
    ) -> Result<ModelStream> {
        let cancel = CancelHandle::new();
        let answer = {
            let mut state = self.state();
            state.requests.push(request.clone());
            state.cancels.push(cancel.clone());
            state.queue.pop_front().or_else(|| self.repeat.clone())
        };
        let answer = answer.ok_or_else(|| {
            Error::Transport(TransportError::Other("no scripted answer left".to_string()))
        })?;

        let pulled = Arc::clone(&self.pulled);
        let chunks = futures::stream::iter(answer).map(move |content| {
            pulled.fetch_add(1, Ordering::SeqCst);
            Ok(StreamChunk::text(content))
        });
        Ok(ModelStream::with_cancel(Box::pin(chunks), cancel))
    }
}

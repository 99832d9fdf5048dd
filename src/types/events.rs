//! Stream chunks emitted by a model service.

use serde::{Deserialize, Serialize};

/// Incremental text fragment of a streamed answer.
///
/// Chunks may be empty: constrained decoders often emit empty or whitespace-only
/// fragments once the grammar has nothing left to produce.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    pub content: String,
    /// Set on the final chunk the service sends for a completed answer.
    #[serde(default)]
    pub done: bool,
}

impl StreamChunk {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            content: String::new(),
            done: true,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

impl From<&str> for StreamChunk {
    fn from(s: &str) -> Self {
        StreamChunk::text(s)
    }
}

impl From<String> for StreamChunk {
    fn from(s: String) -> Self {
        StreamChunk::text(s)
    }
}

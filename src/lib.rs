//! # ai-chat-extract
//!
//! Validated streaming chat engine for local language models.
//!
//! Model output is unreliable free-form text. This crate turns it into a typed value by
//! streaming one answer at a time, stopping early when the answer is complete, parsing
//! and validating it, and, when validation fails, replaying the bad answer together with
//! a diagnostic so the model can correct itself.
//!
//! ## Key Features
//!
//! - **Chat Engine**: [`ChatEngine`] runs the validated retry loop
//! - **Streaming Session**: early stop on complete JSON, hard length cap, explicit abort
//! - **Structured Output**: [`structured::JsonMode`] and the result extractor
//! - **Transports**: Ollama-compatible HTTP NDJSON client and a scripted in-memory service
//! - **ID Selection**: few-shot prompting, an ID-list grammar and a dedupe/bounds transform
//! - **Evaluation**: a catalog of test prompts with scoring functions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_chat_extract::{ChatEngineBuilder, ChatOptions, JsonMode, Message};
//!
//! #[tokio::main]
//! async fn main() -> ai_chat_extract::Result<()> {
//!     let engine = ChatEngineBuilder::new().build()?;
//!
//!     let options = ChatOptions::new(vec![Message::user("Give me three primes as a JSON object")])
//!         .json(JsonMode::Object)
//!         .retries(2);
//!
//!     let value = engine.chat(options).await?;
//!     println!("{value}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Engine, builder, configuration and the retry loop |
//! | [`request`] | Chat options and the per-attempt generation config |
//! | [`pipeline`] | NDJSON decoding, chunk mapping and the streaming session |
//! | [`structured`] | JSON modes and result extraction |
//! | [`transport`] | Model service trait and implementations |
//! | [`types`] | Messages and stream chunks |
//! | [`prompt`] | Few-shot conversation builder |
//! | [`selection`] | ID-list grammar, dataset and validation transform |
//! | [`eval`] | Test prompt catalog and scoring |

pub mod client;
pub mod eval;
pub mod pipeline;
pub mod prompt;
pub mod request;
pub mod selection;
pub mod structured;
pub mod transport;
pub mod types;

pub use client::{ChatEngine, ChatEngineBuilder, ChatStats, EngineConfig};
pub use request::{ChatOptions, GenerationRequestConfig};
pub use structured::JsonMode;
pub use types::{
    events::StreamChunk,
    message::{Message, MessageRole},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for pipeline operations
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

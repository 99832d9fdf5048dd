//! # Types Module
//!
//! Core data types exchanged with a model chat service.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`MessageRole`] | system, user or assistant |
//! | [`StreamChunk`] | Incremental text fragment of a streamed answer |
//!
//! ## Example
//!
//! ```rust
//! use ai_chat_extract::types::{Message, MessageRole};
//!
//! let system = Message::system("Answer with a JSON array of IDs");
//! let user = Message::user("Pick the red fruits");
//! assert_eq!(user.role, MessageRole::User);
//! # let _ = system;
//! ```

pub mod events;
pub mod message;

pub use events::StreamChunk;
pub use message::{Message, MessageRole};

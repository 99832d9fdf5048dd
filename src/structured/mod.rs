//! Structured output module.
//!
//! - [`JsonMode`]: how much JSON structure is expected from the model
//! - [`extract`]: parse the accumulated answer and apply the caller's transform
//!
//! # Examples
//!
//! ```
//! use ai_chat_extract::structured::{extract, JsonMode};
//! use serde_json::Value;
//!
//! let positive = |v: Value| match v.as_i64() {
//!     Some(n) if n > 0 => Ok(n),
//!     _ => Err("Answer with a positive integer.".to_string()),
//! };
//!
//! assert_eq!(extract("7", JsonMode::Any, &positive).unwrap(), 7);
//! assert!(extract("-1", JsonMode::Any, &positive).is_err());
//! ```

pub mod extract;
pub mod json_mode;

pub use extract::{candidate, extract, identity};
pub use json_mode::JsonMode;

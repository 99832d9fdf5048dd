//! Request construction: caller options, validation, and the immutable per-attempt
//! [`GenerationRequestConfig`].

pub mod config;
pub mod options;

pub use config::{repair_turn, DecodingOptions, GenerationRequestConfig};
pub use options::{ChatOptions, StopWhen};

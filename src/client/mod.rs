//! Chat engine: configuration, construction, and the validated retry loop.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod chat;
pub mod config;
pub mod core;
pub mod types;

pub use builder::ChatEngineBuilder;
pub use config::EngineConfig;
pub use core::ChatEngine;
pub use types::{CancelHandle, ChatStats, ControlledStream};

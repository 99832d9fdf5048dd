use crate::pipeline::PipelineError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or option that caused the error (e.g., "options.grammar", "config.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "option_validator", "id_list_transform")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the chat engine.
///
/// Only [`Error::Parse`] and [`Error::Validation`] are retryable: the retry loop replays
/// their diagnostic to the model. Everything else ends the call immediately.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Response length exceeded")]
    LengthExceeded { limit: usize },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("{message}")]
    RetriesExhausted { message: String, attempts: u32 },

    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("Pipeline processing error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse {
            message: msg.into(),
        }
    }

    /// Whether the retry loop may answer this failure with a repair turn.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Parse { .. } | Error::Validation { .. })
    }

    /// The raw diagnostic text, without the Display prefix.
    ///
    /// This is what gets replayed to the model as the user half of a repair turn.
    pub fn diagnostic(&self) -> String {
        match self {
            Error::Parse { message }
            | Error::Validation { message, .. }
            | Error::RetriesExhausted { message, .. }
            | Error::Configuration { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Validation { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_exceeded_message_is_fixed() {
        let err = Error::LengthExceeded { limit: 10 };
        assert_eq!(err.to_string(), "Response length exceeded");
        assert!(!err.is_retryable());
    }

    #[test]
    fn diagnostic_strips_display_prefix() {
        let err = Error::validation_with_context(
            "The list contains duplicate IDs: 1",
            ErrorContext::new().with_source("id_list_transform"),
        );
        assert!(err.is_retryable());
        assert_eq!(err.diagnostic(), "The list contains duplicate IDs: 1");
        assert!(err.to_string().starts_with("Validation error: "));
        assert!(err.to_string().contains("source: id_list_transform"));
    }

    #[test]
    fn exhausted_displays_last_diagnostic() {
        let err = Error::RetriesExhausted {
            message: "expected an array".into(),
            attempts: 4,
        };
        assert_eq!(err.to_string(), "expected an array");
        assert!(!err.is_retryable());
    }
}

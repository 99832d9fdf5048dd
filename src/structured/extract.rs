//! Result extraction: accumulated text → candidate value → caller transform.

use crate::structured::json_mode::JsonMode;
use crate::{Error, ErrorContext, Result};
use serde_json::Value;

/// Turn the accumulated answer into the candidate value.
///
/// With JSON enabled the text must parse as JSON; otherwise the raw text is wrapped
/// as [`Value::String`] unchanged.
pub fn candidate(text: &str, mode: JsonMode) -> Result<Value> {
    if !mode.is_enabled() {
        return Ok(Value::String(text.to_string()));
    }
    serde_json::from_str(text).map_err(|e| Error::parse(e.to_string()))
}

/// Run extraction for one attempt.
///
/// A parse failure short-circuits before the transform runs. A transform rejection
/// keeps its text verbatim so it can be replayed to the model.
pub fn extract<T, F>(text: &str, mode: JsonMode, transform: &F) -> Result<T>
where
    F: Fn(Value) -> std::result::Result<T, String> + ?Sized,
{
    let value = candidate(text, mode)?;
    transform(value).map_err(|diagnostic| {
        Error::validation_with_context(diagnostic, ErrorContext::new().with_source("transform"))
    })
}

/// Identity transform used when the caller does not supply one.
pub fn identity(value: Value) -> std::result::Result<Value, String> {
    Ok(value)
}

/// JSON formatter: the full report tree, pretty-printed.
use crate::error::EngineError;
use serde::Serialize;

/// Serialize any report value as pretty-printed JSON.
pub fn format_json<T: Serialize>(value: &T) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Error types for the tokstat crate.
use thiserror::Error;

/// Errors raised while loading and validating input documents.
///
/// These are unrecoverable for the run: analysis is whole-corpus
/// fail-fast, never per-document skip-and-continue.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("No JSON documents provided")]
    EmptyCorpus,

    #[error("No JSON files found under: {path}")]
    NoInputFiles { path: String },

    #[error("Top-level JSON must be an object ({source_id})")]
    NonObjectRoot { source_id: String },

    #[error("Invalid JSON in {source_id}: {source}")]
    InvalidJson {
        source_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to model pricing and configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown model: \"{model}\". Available: {available}")]
    UnknownModel { model: String, available: String },

    #[error("Invalid cost-per-1k value: {value}")]
    InvalidPrice { value: f64 },

    #[error("Failed to load pricing file {path}: {detail}")]
    PricingFileLoad { path: String, detail: String },
}

/// Errors that can occur inside a tokenizer adapter.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Failed to initialize tokenizer: {0}")]
    InitializationFailed(String),

    #[error("Unknown tokenizer encoding: {encoding} (supported: {supported})")]
    UnknownEncoding { encoding: String, supported: String },

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),
}

/// Top-level error for the analysis engine and CLI.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    /// A schema/document mismatch during measurement. The merge and traversal
    /// passes disagree about the corpus shape, which is a bug rather than a
    /// user error; it must surface instead of silently dropping tokens.
    #[error("Internal consistency error: {0}")]
    InternalConsistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_error_messages_name_the_source() {
        let err = InputError::NonObjectRoot {
            source_id: "records/17.json".into(),
        };
        assert!(err.to_string().contains("records/17.json"));
    }

    #[test]
    fn config_error_lists_available_models() {
        let err = ConfigError::UnknownModel {
            model: "gpt-99".into(),
            available: "gpt-4o, gpt-4o-mini".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("gpt-99"));
        assert!(msg.contains("gpt-4o-mini"));
    }

    #[test]
    fn engine_error_wraps_all_stages() {
        let _ = EngineError::from(InputError::EmptyCorpus);
        let _ = EngineError::from(ConfigError::InvalidPrice { value: -1.0 });
        let _ = EngineError::from(TokenizerError::EncodingFailed("boom".into()));
        let _ = EngineError::InternalConsistency("field mismatch".into());
    }
}

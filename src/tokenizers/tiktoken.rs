/// Tiktoken-based tokenizer adapter.
use crate::error::TokenizerError;
use crate::tokenizers::Tokenizer;
use tiktoken_rs::CoreBPE;

/// BPE tokenizer backed by `tiktoken-rs`.
///
/// Constructed per analysis run; there is deliberately no process-wide
/// encoding cache, so long-lived callers do not accumulate state across
/// invocations.
pub struct TiktokenTokenizer {
    bpe: CoreBPE,
    encoding: String,
}

/// Encodings this adapter knows how to construct.
pub const SUPPORTED_ENCODINGS: &[&str] = &["o200k_base", "cl100k_base", "p50k_base"];

impl TiktokenTokenizer {
    /// Create a tokenizer for a named encoding.
    ///
    /// # Errors
    ///
    /// Returns `TokenizerError::UnknownEncoding` for unrecognized names and
    /// `TokenizerError::InitializationFailed` if the BPE tables cannot load.
    pub fn new(encoding: &str) -> Result<Self, TokenizerError> {
        let bpe = match encoding {
            "o200k_base" => tiktoken_rs::o200k_base(),
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            other => {
                return Err(TokenizerError::UnknownEncoding {
                    encoding: other.to_string(),
                    supported: SUPPORTED_ENCODINGS.join(", "),
                })
            }
        }
        .map_err(|e| TokenizerError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            bpe,
            encoding: encoding.to_string(),
        })
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<usize>, TokenizerError> {
        Ok(self.bpe.encode_ordinary(text))
    }

    fn decode_token_bytes(&self, token: usize) -> Result<Vec<u8>, TokenizerError> {
        // Raw bytes, not text: a token may cover part of a multi-byte
        // character, so its bytes alone are not necessarily valid UTF-8.
        Ok(self.bpe._decode_native(&[token]))
    }

    fn name(&self) -> &str {
        &self.encoding
    }
}

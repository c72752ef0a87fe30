/// Core trait for tokenizer implementations.
use crate::error::TokenizerError;

/// Trait for encoding text into tokens and decoding individual tokens back.
///
/// The attribution stage relies on the decode side of this contract: decoding
/// a single token id must return the exact bytes that token covered in the
/// encoded string, so token boundaries can be mapped onto byte offsets. The
/// bytes are raw rather than a `String` because a BPE token is free to split
/// a multi-byte character; its bytes alone need not be valid UTF-8.
pub trait Tokenizer: Send + Sync {
    /// Encode text into token IDs.
    ///
    /// # Errors
    ///
    /// Returns `TokenizerError` if the text cannot be encoded.
    fn encode(&self, text: &str) -> Result<Vec<usize>, TokenizerError>;

    /// Decode a single token ID back to the exact bytes it covered.
    ///
    /// # Errors
    ///
    /// Returns `TokenizerError` if the id is not one this tokenizer can
    /// produce.
    fn decode_token_bytes(&self, token: usize) -> Result<Vec<u8>, TokenizerError>;

    /// Count tokens in text.
    ///
    /// Implementations may override this when they have a cheaper path than
    /// materializing the full ID vector.
    ///
    /// # Errors
    ///
    /// Returns `TokenizerError` if the text cannot be tokenized.
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        self.encode(text).map(|tokens| tokens.len())
    }

    /// The encoding name (e.g., "o200k_base").
    fn name(&self) -> &str;
}

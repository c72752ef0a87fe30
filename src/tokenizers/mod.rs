/// Tokenizer trait and adapters.
mod tiktoken;
mod trait_impl;

pub use tiktoken::{TiktokenTokenizer, SUPPORTED_ENCODINGS};
pub use trait_impl::Tokenizer;

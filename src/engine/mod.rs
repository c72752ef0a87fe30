/// The analysis engine: schema inference, token attribution, aggregation,
/// cohort detection, insight detection, and the pipeline composing them.
pub mod aggregate;
pub mod cohorts;
pub mod cost;
pub mod insights;
pub mod pipeline;
pub mod schema;
pub mod tokenize;

pub use aggregate::{aggregate, AnalysisNode, ArrayStats, Stats, StringStats};
pub use cohorts::{detect_cohorts, detect_cohorts_exact, fingerprint, Cohort};
pub use cost::apply_cost;
pub use insights::{detect_insights, Insight, InsightKind, Severity};
pub use pipeline::{analyze, run_cohorted, AnalysisOutput, CorpusBundle, SourceDocument};
pub use schema::{infer_schema, infer_schema_with, JsonType, SchemaNode, TypePolicy};
pub use tokenize::{collect_values, tokenize_document, FileTokens};

/// Deterministic tokenizers for engine tests. Real encodings make exact
/// token-count assertions brittle; these make conservation arithmetic exact.
#[cfg(test)]
pub(crate) mod testing {
    use crate::error::TokenizerError;
    use crate::tokenizers::Tokenizer;

    /// One token per byte.
    pub struct ByteTokenizer;

    impl Tokenizer for ByteTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<usize>, TokenizerError> {
            Ok(text.bytes().map(|b| b as usize).collect())
        }

        fn decode_token_bytes(&self, token: usize) -> Result<Vec<u8>, TokenizerError> {
            let byte = u8::try_from(token)
                .map_err(|_| TokenizerError::DecodingFailed(format!("bad token {token}")))?;
            Ok(vec![byte])
        }

        fn name(&self) -> &str {
            "byte_test"
        }
    }

    /// One token per byte pair, so tokens straddle tag boundaries.
    pub struct PairTokenizer;

    impl Tokenizer for PairTokenizer {
        fn encode(&self, text: &str) -> Result<Vec<usize>, TokenizerError> {
            let bytes = text.as_bytes();
            let mut tokens = Vec::with_capacity(bytes.len() / 2 + 1);
            for chunk in bytes.chunks(2) {
                match chunk {
                    [a, b] => tokens.push(*a as usize * 256 + *b as usize),
                    [a] => tokens.push(65536 + *a as usize),
                    _ => unreachable!(),
                }
            }
            Ok(tokens)
        }

        fn decode_token_bytes(&self, token: usize) -> Result<Vec<u8>, TokenizerError> {
            if token >= 65536 {
                Ok(vec![(token - 65536) as u8])
            } else {
                Ok(vec![(token / 256) as u8, (token % 256) as u8])
            }
        }

        fn name(&self) -> &str {
            "pair_test"
        }
    }
}

/// Tokstat - Token cost auditing for LLM-generated JSON.
///
/// Infers the union schema of a JSON corpus, attributes every output token
/// to schema overhead, value payload, or null waste, prices the result
/// against model output rates, and surfaces schema redesign opportunities.
pub mod cli;
pub mod engine;
pub mod error;
pub mod models;
pub mod output;
pub mod tokenizers;

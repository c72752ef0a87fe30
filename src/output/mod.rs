/// Output formatters for analysis reports.
pub mod json;
pub mod llm;
pub mod text;

pub use json::format_json;
pub use llm::LlmFormatter;
pub use text::TextFormatter;

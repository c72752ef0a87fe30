/// CLI argument parsing and command execution.
use crate::engine::pipeline::{analyze, run_cohorted, SourceDocument};
use crate::error::{EngineError, InputError};
use crate::models::{ModelPricing, PricingTable};
use crate::output::{format_json, LlmFormatter, TextFormatter};
use crate::tokenizers::TiktokenTokenizer;
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Tokstat - Audit the token cost of JSON output schemas.
#[derive(Parser, Debug)]
#[command(name = "tokstat")]
#[command(about = "Measure where generated-JSON token budgets actually go")]
#[command(
    long_about = "Tokstat - Token cost auditing for LLM-generated JSON\n\n\
Point it at a corpus of JSON documents sharing a schema and it reports\n\
where the token budget goes: structural overhead (field names, braces,\n\
punctuation), value payload, and null waste. It projects dollar costs at\n\
generation scale and surfaces concrete schema redesign opportunities.\n\n\
EXAMPLES:\n  \
  # Audit a directory of generated records\n  \
  tokstat ./outputs --model gpt-4o\n\n  \
  # Compact report for pasting into an LLM conversation\n  \
  tokstat ./outputs --format llm\n\n  \
  # Mixed-schema corpus: detect cohorts and report each separately\n  \
  tokstat ./outputs --cohorts\n\n  \
  # Use your own pricing\n  \
  tokstat ./outputs --cost-per-1k 0.002"
)]
#[command(version)]
pub struct Cli {
    /// JSON files or directories to analyze (directories are scanned
    /// recursively for .json files)
    #[arg(value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Model for pricing and tokenizer selection (e.g., gpt-4o)
    #[arg(short, long, default_value = "gpt-4o")]
    pub model: String,

    /// Tokenizer encoding override (e.g., o200k_base); defaults to the
    /// model's encoding
    #[arg(long, value_name = "ENCODING")]
    pub tokenizer: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Custom output price per 1K tokens in USD (overrides the model price)
    #[arg(long, value_name = "USD")]
    pub cost_per_1k: Option<f64>,

    /// Example values sampled per field
    #[arg(long, default_value = "5", value_name = "N")]
    pub sample_values: usize,

    /// Detect schema cohorts and report each one separately
    #[arg(long)]
    pub cohorts: bool,

    /// Path to a custom pricing configuration (TOML)
    #[arg(long, value_name = "FILE")]
    pub pricing_file: Option<PathBuf>,

    /// Number of insights shown in text output
    #[arg(long, default_value = "10", value_name = "N")]
    pub top_n: usize,
}

/// Available output formats.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal report
    Text,
    /// Full analysis tree as pretty-printed JSON
    Json,
    /// Compact format for pasting into an LLM conversation
    Llm,
}

impl Cli {
    /// Execute the analysis and print the report to stdout.
    pub fn run(&self) -> Result<(), EngineError> {
        let pricing = self.resolve_pricing()?;
        let encoding = self
            .tokenizer
            .as_deref()
            .unwrap_or(&pricing.tokenizer)
            .to_string();
        let tokenizer = TiktokenTokenizer::new(&encoding)?;

        let documents = load_documents(&self.inputs)?;

        let report = if self.cohorts {
            let bundle = run_cohorted(&documents, &pricing, &tokenizer, self.sample_values)?;
            match self.format {
                OutputFormat::Text => TextFormatter::format_bundle(&bundle, self.top_n),
                OutputFormat::Json => format_json(&bundle)?,
                OutputFormat::Llm => LlmFormatter::format_bundle(&bundle),
            }
        } else {
            let output = analyze(&documents, &pricing, &tokenizer, self.sample_values)?;
            match self.format {
                OutputFormat::Text => TextFormatter::format(&output, self.top_n),
                OutputFormat::Json => format_json(&output)?,
                OutputFormat::Llm => LlmFormatter::format(&output),
            }
        };

        println!("{report}");
        Ok(())
    }

    fn resolve_pricing(&self) -> Result<ModelPricing, EngineError> {
        let mut table = PricingTable::new();
        if let Some(path) = &self.pricing_file {
            table.merge_file(path)?;
        }

        let mut pricing = table.get(&self.model)?.clone();
        if let Some(price_per_1k) = self.cost_per_1k {
            pricing = pricing.with_custom_price(price_per_1k)?;
        }
        Ok(pricing)
    }
}

/// Collect and parse all .json files under the given paths.
///
/// Files are ordered by path so a run is reproducible regardless of
/// directory iteration order.
pub fn load_documents(inputs: &[PathBuf]) -> Result<Vec<SourceDocument>, EngineError> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    InputError::Io(e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::Other, "directory walk failed")
                    }))
                })?;
                if entry.file_type().is_file() && has_json_extension(entry.path()) {
                    files.push(entry.into_path());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files.dedup();

    if files.is_empty() {
        let shown = inputs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(InputError::NoInputFiles { path: shown }.into());
    }

    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let source_id = file.display().to_string();
        let content = std::fs::read_to_string(&file).map_err(InputError::Io)?;
        let value: Value =
            serde_json::from_str(&content).map_err(|e| InputError::InvalidJson {
                source_id: source_id.clone(),
                source: e,
            })?;
        documents.push(SourceDocument::new(source_id, value));
    }
    Ok(documents)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn directories_are_scanned_recursively_for_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), r#"{"x": 1}"#).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/b.json"), r#"{"x": 2}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not json").unwrap();

        let docs = load_documents(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].source.ends_with("a.json"));
        assert!(docs[1].source.ends_with("b.json"));
    }

    #[test]
    fn invalid_json_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_documents(&[path.clone()]).unwrap_err();
        match err {
            EngineError::Input(InputError::InvalidJson { source_id, .. }) => {
                assert!(source_id.ends_with("broken.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_directory_reports_no_input_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_documents(&[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Input(InputError::NoInputFiles { .. })
        ));
    }

    #[test]
    fn cli_defaults_are_stable() {
        let cli = Cli::parse_from(["tokstat", "corpus/"]);
        assert_eq!(cli.model, "gpt-4o");
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.sample_values, 5);
        assert_eq!(cli.top_n, 10);
        assert!(!cli.cohorts);
        assert!(cli.tokenizer.is_none());
    }
}

/// Model pricing: the built-in price table plus optional TOML overrides.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Pricing and tokenizer binding for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPricing {
    /// The model identifier (e.g., "gpt-4o").
    pub model_id: String,
    /// The provider name (e.g., "openai", "anthropic").
    pub provider: String,
    /// Output price per 1M tokens in USD.
    pub output_per_1m: f64,
    /// Tokenizer encoding name (e.g., "o200k_base").
    pub tokenizer: String,
}

impl ModelPricing {
    /// Replace the output price with a user-supplied per-1K-token price,
    /// keeping the tokenizer binding.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidPrice` if the price is negative, NaN, or
    /// infinite.
    pub fn with_custom_price(mut self, price_per_1k: f64) -> Result<Self, ConfigError> {
        if !price_per_1k.is_finite() || price_per_1k < 0.0 {
            return Err(ConfigError::InvalidPrice {
                value: price_per_1k,
            });
        }
        self.output_per_1m = price_per_1k * 1_000.0;
        self.provider = "custom".to_string();
        Ok(self)
    }
}

/// Per-model entry in a user pricing file. Provider and tokenizer fall back
/// to sensible defaults so a minimal override only needs a price.
#[derive(Debug, Clone, Deserialize)]
struct PricingFileEntry {
    #[serde(default = "default_provider")]
    provider: String,
    output_per_1m: f64,
    #[serde(default = "default_tokenizer")]
    tokenizer: String,
}

fn default_provider() -> String {
    "custom".to_string()
}

fn default_tokenizer() -> String {
    "o200k_base".to_string()
}

#[derive(Debug, Deserialize)]
struct PricingFile {
    #[serde(default)]
    models: BTreeMap<String, PricingFileEntry>,
}

/// The model table: built-in models, optionally extended or overridden from
/// a TOML file.
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: BTreeMap<String, ModelPricing>,
}

impl PricingTable {
    /// Create a table with the built-in models.
    pub fn new() -> Self {
        let mut models = BTreeMap::new();
        for (model_id, provider, output_per_1m) in [
            ("gpt-4o", "openai", 10.0),
            ("gpt-4o-mini", "openai", 0.6),
            // Anthropic uses its own tokenizer; o200k_base is a usable proxy.
            ("claude-sonnet-4-5", "anthropic", 15.0),
            ("claude-haiku-4-5", "anthropic", 5.0),
        ] {
            models.insert(
                model_id.to_string(),
                ModelPricing {
                    model_id: model_id.to_string(),
                    provider: provider.to_string(),
                    output_per_1m,
                    tokenizer: "o200k_base".to_string(),
                },
            );
        }
        Self { models }
    }

    /// Look up a model's pricing.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownModel` listing the available model ids.
    pub fn get(&self, model_id: &str) -> Result<&ModelPricing, ConfigError> {
        self.models.get(model_id).ok_or_else(|| ConfigError::UnknownModel {
            model: model_id.to_string(),
            available: self.models.keys().cloned().collect::<Vec<_>>().join(", "),
        })
    }

    /// All known models, ordered by id.
    pub fn all(&self) -> impl Iterator<Item = &ModelPricing> {
        self.models.values()
    }

    /// Merge model entries from a TOML pricing file. Entries with a known id
    /// replace the built-in pricing; new ids are added.
    ///
    /// Expected shape:
    ///
    /// ```toml
    /// [models.my-model]
    /// provider = "internal"
    /// output_per_1m = 2.5
    /// tokenizer = "o200k_base"
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PricingFileLoad` if the file cannot be read or
    /// parsed, and `ConfigError::InvalidPrice` for a negative or non-finite
    /// price.
    pub fn merge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PricingFileLoad {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        let file: PricingFile =
            toml::from_str(&content).map_err(|e| ConfigError::PricingFileLoad {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;

        for (model_id, entry) in file.models {
            if !entry.output_per_1m.is_finite() || entry.output_per_1m < 0.0 {
                return Err(ConfigError::InvalidPrice {
                    value: entry.output_per_1m,
                });
            }
            self.models.insert(
                model_id.clone(),
                ModelPricing {
                    model_id,
                    provider: entry.provider,
                    output_per_1m: entry.output_per_1m,
                    tokenizer: entry.tokenizer,
                },
            );
        }
        Ok(())
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_models_are_present() {
        let table = PricingTable::new();
        let gpt4o = table.get("gpt-4o").unwrap();
        assert_eq!(gpt4o.provider, "openai");
        assert_eq!(gpt4o.output_per_1m, 10.0);
        assert_eq!(gpt4o.tokenizer, "o200k_base");

        let haiku = table.get("claude-haiku-4-5").unwrap();
        assert_eq!(haiku.output_per_1m, 5.0);
    }

    #[test]
    fn unknown_model_lists_available_ids() {
        let table = PricingTable::new();
        let err = table.get("gpt-99").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("gpt-99"));
        assert!(message.contains("gpt-4o"));
        assert!(message.contains("claude-sonnet-4-5"));
    }

    #[test]
    fn custom_price_scales_to_per_million() {
        let table = PricingTable::new();
        let pricing = table
            .get("gpt-4o")
            .unwrap()
            .clone()
            .with_custom_price(0.002)
            .unwrap();
        assert_eq!(pricing.output_per_1m, 2.0);
        assert_eq!(pricing.provider, "custom");
        assert_eq!(pricing.tokenizer, "o200k_base");
    }

    #[test]
    fn custom_price_rejects_negative_and_non_finite() {
        let table = PricingTable::new();
        let base = table.get("gpt-4o").unwrap().clone();
        assert!(base.clone().with_custom_price(-0.5).is_err());
        assert!(base.clone().with_custom_price(f64::NAN).is_err());
        assert!(base.with_custom_price(f64::INFINITY).is_err());
    }

    #[test]
    fn pricing_file_overrides_and_extends() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[models.gpt-4o]
provider = "openai"
output_per_1m = 12.5
tokenizer = "o200k_base"

[models.in-house]
output_per_1m = 0.25
"#
        )
        .unwrap();

        let mut table = PricingTable::new();
        table.merge_file(file.path()).unwrap();

        assert_eq!(table.get("gpt-4o").unwrap().output_per_1m, 12.5);
        let custom = table.get("in-house").unwrap();
        assert_eq!(custom.output_per_1m, 0.25);
        assert_eq!(custom.provider, "custom");
        assert_eq!(custom.tokenizer, "o200k_base");
    }

    #[test]
    fn pricing_file_rejects_negative_prices() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[models.broken]
output_per_1m = -3.0
"#
        )
        .unwrap();

        let mut table = PricingTable::new();
        let err = table.merge_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrice { .. }));
    }

    #[test]
    fn missing_pricing_file_is_a_load_error() {
        let mut table = PricingTable::new();
        let err = table.merge_file("/nonexistent/pricing.toml").unwrap_err();
        assert!(matches!(err, ConfigError::PricingFileLoad { .. }));
    }
}

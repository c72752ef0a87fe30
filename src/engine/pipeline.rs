/// Pipeline composition: schema inference through insight detection, plus the
/// cohorted variant that runs the same pipeline per detected cohort.
use crate::engine::aggregate::{aggregate, AnalysisNode};
use crate::engine::cohorts::{detect_cohorts, Cohort, DEFAULT_SIMILARITY_THRESHOLD};
use crate::engine::cost::apply_cost;
use crate::engine::insights::{detect_insights, Insight};
use crate::engine::schema::infer_schema;
use crate::engine::tokenize::{collect_values, tokenize_document};
use crate::error::{EngineError, InputError};
use crate::models::ModelPricing;
use crate::tokenizers::Tokenizer;
use serde::Serialize;
use serde_json::Value;

/// Output format tag for a single analysis report.
pub const ANALYSIS_FORMAT: &str = "tokstat/v1";
/// Output format tag for a cohorted corpus bundle.
pub const BUNDLE_FORMAT: &str = "tokstat/corpus-bundle/v1";

/// Number of insights surfaced in the summary block.
const SUMMARY_INSIGHT_COUNT: usize = 5;

/// One parsed input document plus where it came from, for error reporting.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub source: String,
    pub value: Value,
}

impl SourceDocument {
    pub fn new(source: impl Into<String>, value: Value) -> Self {
        Self {
            source: source.into(),
            value,
        }
    }
}

/// Headline numbers for one analysis run.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub file_count: usize,
    pub model: String,
    pub tokenizer: String,
    pub output_price_per_1m: f64,
    pub corpus_total_tokens: f64,
    pub corpus_total_cost: f64,
    pub avg_tokens_per_instance: f64,
    pub cost_per_instance: f64,
    pub overhead_ratio: f64,
    pub null_waste_ratio: f64,
    pub cost_at_1k: f64,
    pub cost_at_10k: f64,
    pub cost_at_100k: f64,
    pub cost_at_1m: f64,
    pub top_insights: Vec<Insight>,
}

/// A complete single-corpus report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutput {
    pub format: &'static str,
    pub summary: AnalysisSummary,
    pub tree: AnalysisNode,
    pub insights: Vec<Insight>,
}

/// One cohort's membership plus its independent analysis.
#[derive(Debug, Clone, Serialize)]
pub struct CohortReport {
    pub cohort: Cohort,
    pub analysis: AnalysisOutput,
}

#[derive(Debug, Clone, Serialize)]
pub struct CohortingMeta {
    pub file_count: usize,
    pub cohort_count: usize,
    pub similarity_threshold: f64,
    pub mixed_schema_detected: bool,
}

/// Combined report plus per-cohort reports for a mixed-schema corpus.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusBundle {
    pub format: &'static str,
    pub combined: AnalysisOutput,
    pub cohorts: Vec<CohortReport>,
    pub cohorting: CohortingMeta,
}

/// Run the full pipeline over one corpus.
///
/// # Errors
///
/// `InputError::EmptyCorpus` for an empty document set,
/// `InputError::NonObjectRoot` naming the offending source, and tokenizer or
/// consistency failures from the attribution stage. Any failure aborts the
/// whole run; there is no partial output.
pub fn analyze(
    documents: &[SourceDocument],
    pricing: &ModelPricing,
    tokenizer: &dyn Tokenizer,
    sample_count: usize,
) -> Result<AnalysisOutput, EngineError> {
    if documents.is_empty() {
        return Err(InputError::EmptyCorpus.into());
    }
    for doc in documents {
        if !doc.value.is_object() {
            return Err(InputError::NonObjectRoot {
                source_id: doc.source.clone(),
            }
            .into());
        }
    }

    let values: Vec<Value> = documents.iter().map(|d| d.value.clone()).collect();
    let schema = infer_schema(&values)?;

    let mut per_file_tokens = Vec::with_capacity(documents.len());
    let mut per_file_values = Vec::with_capacity(documents.len());
    for doc in documents {
        per_file_tokens.push(tokenize_document(&doc.value, &schema, tokenizer)?);
        per_file_values.push(collect_values(&doc.value, &schema));
    }

    let mut tree = aggregate(&schema, &per_file_tokens, &per_file_values, sample_count);
    apply_cost(&mut tree, pricing, documents.len());

    let price_per_token = pricing.output_per_1m / 1_000_000.0;
    let insights = detect_insights(&tree, price_per_token);
    let summary = build_summary(&tree, &insights, pricing, tokenizer.name(), documents.len());

    Ok(AnalysisOutput {
        format: ANALYSIS_FORMAT,
        summary,
        tree,
        insights,
    })
}

/// Run the combined pipeline plus an independent run per detected cohort.
///
/// Documents are ordered by source identifier before clustering so cohort
/// membership does not depend on input order.
pub fn run_cohorted(
    documents: &[SourceDocument],
    pricing: &ModelPricing,
    tokenizer: &dyn Tokenizer,
    sample_count: usize,
) -> Result<CorpusBundle, EngineError> {
    let mut ordered: Vec<SourceDocument> = documents.to_vec();
    ordered.sort_by(|a, b| a.source.cmp(&b.source));

    let combined = analyze(&ordered, pricing, tokenizer, sample_count)?;

    let values: Vec<Value> = ordered.iter().map(|d| d.value.clone()).collect();
    let cohorts = detect_cohorts(&values);

    let mut reports = Vec::with_capacity(cohorts.len());
    for cohort in cohorts {
        let members: Vec<SourceDocument> = cohort
            .member_indices
            .iter()
            .map(|&i| ordered[i].clone())
            .collect();
        let analysis = analyze(&members, pricing, tokenizer, sample_count)?;
        reports.push(CohortReport { cohort, analysis });
    }

    let cohorting = CohortingMeta {
        file_count: ordered.len(),
        cohort_count: reports.len(),
        similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        mixed_schema_detected: reports.len() > 1,
    };

    Ok(CorpusBundle {
        format: BUNDLE_FORMAT,
        combined,
        cohorts: reports,
        cohorting,
    })
}

fn build_summary(
    tree: &AnalysisNode,
    insights: &[Insight],
    pricing: &ModelPricing,
    tokenizer_name: &str,
    file_count: usize,
) -> AnalysisSummary {
    let avg_total = tree.tokens.total.avg;
    let (overhead_ratio, null_waste_ratio) = if avg_total > 0.0 {
        (
            tree.tokens.schema_overhead / avg_total,
            tree.tokens.null_waste / avg_total,
        )
    } else {
        (0.0, 0.0)
    };

    let cost_per_instance = tree.cost.per_instance;

    AnalysisSummary {
        file_count,
        model: pricing.model_id.clone(),
        tokenizer: tokenizer_name.to_string(),
        output_price_per_1m: pricing.output_per_1m,
        corpus_total_tokens: avg_total * file_count as f64,
        corpus_total_cost: tree.cost.total_corpus,
        avg_tokens_per_instance: avg_total,
        cost_per_instance,
        overhead_ratio,
        null_waste_ratio,
        cost_at_1k: cost_per_instance * 1_000.0,
        cost_at_10k: cost_per_instance * 10_000.0,
        cost_at_100k: cost_per_instance * 100_000.0,
        cost_at_1m: cost_per_instance * 1_000_000.0,
        top_insights: insights.iter().take(SUMMARY_INSIGHT_COUNT).cloned().collect(),
    }
}

/// Human-readable terminal report.
use crate::engine::insights::Severity;
use crate::engine::pipeline::{AnalysisOutput, CorpusBundle};

/// Formatter for the default terminal output.
pub struct TextFormatter;

impl TextFormatter {
    /// Format a single analysis as a sectioned text report.
    pub fn format(output: &AnalysisOutput, top_n: usize) -> String {
        let summary = &output.summary;
        let mut lines = Vec::new();

        lines.push("Token Cost Analysis".to_string());
        lines.push("=".repeat(50));
        lines.push(String::new());

        lines.push("Summary".to_string());
        lines.push("-".repeat(50));
        lines.push(format!("Files Analyzed: {}", summary.file_count));
        lines.push(format!(
            "Model: {} (tokenizer: {})",
            summary.model, summary.tokenizer
        ));
        lines.push(format!(
            "Avg Tokens per Instance: {:.1}",
            summary.avg_tokens_per_instance
        ));
        lines.push(format!(
            "Cost per Instance: ${:.6}",
            summary.cost_per_instance
        ));
        lines.push(format!(
            "Corpus Total: {:.0} tokens (${:.4})",
            summary.corpus_total_tokens, summary.corpus_total_cost
        ));
        lines.push(format!(
            "Schema Overhead: {:.1}%",
            summary.overhead_ratio * 100.0
        ));
        lines.push(format!(
            "Null Waste: {:.1}%",
            summary.null_waste_ratio * 100.0
        ));
        lines.push(String::new());

        lines.push("Scale Projections".to_string());
        lines.push("-".repeat(50));
        lines.push(format!("1K generations:   ${:.2}", summary.cost_at_1k));
        lines.push(format!("10K generations:  ${:.2}", summary.cost_at_10k));
        lines.push(format!("100K generations: ${:.2}", summary.cost_at_100k));
        lines.push(format!("1M generations:   ${:.2}", summary.cost_at_1m));
        lines.push(String::new());

        if !output.insights.is_empty() {
            lines.push(format!(
                "Top {} Insights",
                output.insights.len().min(top_n)
            ));
            lines.push("-".repeat(50));
            for (i, insight) in output.insights.iter().take(top_n).enumerate() {
                lines.push(format!(
                    "{}. {} [{}] {}",
                    i + 1,
                    severity_marker(insight.severity),
                    insight.path,
                    insight.message
                ));
                lines.push(format!(
                    "   Saves {:.1} tok/instance (${:.2} per 10K generations)",
                    insight.savings_tokens, insight.savings_usd_per_10k
                ));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Format a cohorted bundle: the combined report, then each cohort.
    pub fn format_bundle(bundle: &CorpusBundle, top_n: usize) -> String {
        let mut sections = vec![Self::format(&bundle.combined, top_n)];

        if bundle.cohorting.mixed_schema_detected {
            let mut lines = Vec::new();
            lines.push(format!(
                "Mixed schemas detected: {} cohorts (similarity threshold {:.2})",
                bundle.cohorting.cohort_count, bundle.cohorting.similarity_threshold
            ));
            lines.push("=".repeat(50));
            lines.push(String::new());
            sections.push(lines.join("\n"));

            for report in &bundle.cohorts {
                sections.push(format!(
                    "Cohort {} [{}] ({} files)\n{}\n\n{}",
                    report.cohort.id,
                    report.cohort.label,
                    report.cohort.file_count,
                    "=".repeat(50),
                    Self::format(&report.analysis, top_n)
                ));
            }
        }

        sections.join("\n")
    }
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "HIGH",
        Severity::Medium => "MED ",
        Severity::Low => "LOW ",
    }
}

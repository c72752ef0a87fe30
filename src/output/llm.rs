/// Token-efficient text format meant to be pasted into an LLM conversation
/// for schema auditing.
use crate::engine::aggregate::AnalysisNode;
use crate::engine::insights::{Insight, InsightKind};
use crate::engine::pipeline::{AnalysisOutput, CorpusBundle};
use crate::engine::schema::JsonType;

/// Formatter producing the compact `llm` output format.
pub struct LlmFormatter;

impl LlmFormatter {
    pub fn format(output: &AnalysisOutput) -> String {
        let summary = &output.summary;
        let mut lines = Vec::new();

        lines.push(format!(
            "tokstat analysis: {} files, {} ({})",
            summary.file_count, summary.model, summary.tokenizer
        ));
        lines.push(String::new());

        lines.push(format!(
            "HEADLINE: ${:.4}/instance, {}% schema overhead, {}% null waste",
            summary.cost_per_instance,
            (summary.overhead_ratio * 100.0).round(),
            (summary.null_waste_ratio * 100.0).round()
        ));
        lines.push(String::new());

        lines.push("SCALE:".to_string());
        lines.push(format!("  1K: ${:.2}", summary.cost_at_1k));
        lines.push(format!("  10K: ${:.2}", summary.cost_at_10k));
        lines.push(format!("  100K: ${:.2}", summary.cost_at_100k));
        lines.push(format!("  1M: ${:.2}", summary.cost_at_1m));
        lines.push(String::new());

        if !output.insights.is_empty() {
            lines.push("TOP SAVINGS:".to_string());
            for (i, insight) in output.insights.iter().take(5).enumerate() {
                lines.push(format!("  {}. {}", i + 1, insight_line(insight)));
            }
            lines.push(String::new());
        }

        let hotspots = overhead_hotspots(&output.tree);
        if !hotspots.is_empty() {
            lines.push("SCHEMA OVERHEAD HOTSPOTS:".to_string());
            for hotspot in hotspots.iter().take(5) {
                lines.push(format!("  {hotspot}"));
            }
            lines.push(String::new());
        }

        let waste = high_waste_fields(&output.tree);
        if !waste.is_empty() {
            lines.push("HIGH WASTE (low fill, high cost):".to_string());
            for field in waste.iter().take(5) {
                lines.push(format!("  {field}"));
            }
            lines.push(String::new());
        }

        let boilerplate: Vec<&Insight> = output
            .insights
            .iter()
            .filter(|i| i.kind == InsightKind::Boilerplate)
            .collect();
        if !boilerplate.is_empty() {
            lines.push("BOILERPLATE:".to_string());
            for insight in boilerplate.iter().take(3) {
                lines.push(format!("  {}", insight.message));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }

    /// Combined report first, then one section per cohort.
    pub fn format_bundle(bundle: &CorpusBundle) -> String {
        let mut sections = vec![Self::format(&bundle.combined)];

        if bundle.cohorting.mixed_schema_detected {
            let mut lines = vec![format!(
                "COHORTS: {} detected (threshold {:.2})",
                bundle.cohorting.cohort_count, bundle.cohorting.similarity_threshold
            )];
            for report in &bundle.cohorts {
                lines.push(format!(
                    "  {} [{}]: {} files, ${:.4}/instance",
                    report.cohort.id,
                    report.cohort.label,
                    report.cohort.file_count,
                    report.analysis.summary.cost_per_instance
                ));
            }
            lines.push(String::new());
            sections.push(lines.join("\n"));

            for report in &bundle.cohorts {
                sections.push(format!(
                    "=== {} [{}] ===\n\n{}",
                    report.cohort.id,
                    report.cohort.label,
                    Self::format(&report.analysis)
                ));
            }
        }

        sections.join("\n")
    }
}

fn insight_line(insight: &Insight) -> String {
    let first_sentence = insight.message.split('.').next().unwrap_or(&insight.message);
    format!(
        "{} — {}, saves {} tok/inst (${:.2}/10K)",
        insight.path,
        first_sentence,
        insight.savings_tokens.round(),
        insight.savings_usd_per_10k
    )
}

/// Arrays with repeated key emissions and objects dominated by overhead,
/// sorted by overhead contribution.
fn overhead_hotspots(tree: &AnalysisNode) -> Vec<String> {
    let mut hotspots: Vec<(String, f64)> = Vec::new();
    walk_hotspots(tree, &mut hotspots);
    hotspots.sort_by(|a, b| b.1.total_cmp(&a.1));
    hotspots.into_iter().map(|(text, _)| text).collect()
}

fn walk_hotspots(node: &AnalysisNode, out: &mut Vec<(String, f64)>) {
    if node.node_type == JsonType::Array {
        if let Some(stats) = node.array_stats {
            if stats.avg_items > 1.0 {
                if let Some(item_node) = node.children.iter().find(|c| c.name == "[]") {
                    let field_count = item_node.children.len();
                    let emissions = field_count as f64 * stats.avg_items;
                    out.push((
                        format!(
                            "{} items: {} field names x {:.1} avg items = {:.1} key emissions/inst",
                            node.path, field_count, stats.avg_items, emissions
                        ),
                        emissions,
                    ));
                }
            }
        }
    }

    if node.node_type == JsonType::Object && node.tokens.total.avg > 0.0 {
        let ratio = node.tokens.schema_overhead / node.tokens.total.avg;
        if ratio > 0.6 && node.children.len() > 2 {
            out.push((
                format!(
                    "{} object: {} field names, {}% overhead ratio",
                    node.path,
                    node.children.len(),
                    (ratio * 100.0).round()
                ),
                node.tokens.schema_overhead,
            ));
        }
    }

    for child in &node.children {
        walk_hotspots(child, out);
    }
}

/// Fields that are mostly absent yet still cost tokens, sorted by wasted
/// token mass.
fn high_waste_fields(tree: &AnalysisNode) -> Vec<String> {
    let mut fields: Vec<(String, f64)> = Vec::new();
    walk_waste(tree, &mut fields);
    fields.sort_by(|a, b| b.1.total_cmp(&a.1));
    fields.into_iter().map(|(text, _)| text).collect()
}

fn walk_waste(node: &AnalysisNode, out: &mut Vec<(String, f64)>) {
    if node.fill_rate < 0.5
        && node.fill_rate > 0.0
        && node.tokens.total.avg > 0.0
        && node.name != "root"
    {
        out.push((
            format!(
                "{} — {} tok avg, {}% fill",
                node.path,
                node.tokens.total.avg.round(),
                (node.fill_rate * 100.0).round()
            ),
            node.tokens.total.avg * (1.0 - node.fill_rate),
        ));
    }
    for child in &node.children {
        walk_waste(child, out);
    }
}

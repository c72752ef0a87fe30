/// Insight detection: scan the aggregated tree for waste patterns worth a
/// schema redesign.
use crate::engine::aggregate::AnalysisNode;
use crate::engine::schema::JsonType;
use serde::Serialize;

/// The five waste patterns the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    NullTax,
    HollowObject,
    ArrayRepetitionTax,
    Boilerplate,
    LengthVariance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One actionable finding. Pure derived data, never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub path: String,
    pub severity: Severity,
    pub message: String,
    pub detail: String,
    /// Tokens saved per instance if acted on.
    pub savings_tokens: f64,
    /// Dollars saved per 10K generations.
    pub savings_usd_per_10k: f64,
}

/// Run all detectors against every node of the tree.
///
/// Each detector fires independently; findings with non-positive savings are
/// discarded and the rest are sorted non-increasing by `savings_tokens`.
pub fn detect_insights(tree: &AnalysisNode, price_per_token: f64) -> Vec<Insight> {
    let mut insights = Vec::new();
    walk(tree, price_per_token, &mut insights);

    insights.retain(|i| i.savings_tokens > 0.0);
    insights.sort_by(|a, b| b.savings_tokens.total_cmp(&a.savings_tokens));
    insights
}

fn walk(node: &AnalysisNode, price_per_token: f64, out: &mut Vec<Insight>) {
    detect_null_tax(node, price_per_token, out);
    detect_hollow_object(node, price_per_token, out);
    detect_array_repetition_tax(node, price_per_token, out);
    detect_boilerplate(node, price_per_token, out);
    detect_length_variance(node, price_per_token, out);

    for child in &node.children {
        walk(child, price_per_token, out);
    }
}

fn usd_per_10k(savings_tokens: f64, price_per_token: f64) -> f64 {
    savings_tokens * price_per_token * 10_000.0
}

/// A mostly-null field still pays structural overhead plus the null literal
/// on every empty instance.
fn detect_null_tax(node: &AnalysisNode, price_per_token: f64, out: &mut Vec<Insight>) {
    if node.fill_rate >= 0.5 || node.instance_count == 0 {
        return;
    }
    if node.name == "root" || node.name == "[]" {
        return;
    }

    let savings = node.tokens.schema_overhead * (1.0 - node.fill_rate) + node.tokens.null_waste;
    if savings < 1.0 {
        return;
    }

    let null_pct = ((1.0 - node.fill_rate) * 100.0).round();
    let severity = if savings > 20.0 {
        Severity::High
    } else if savings > 5.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    out.push(Insight {
        kind: InsightKind::NullTax,
        path: node.path.clone(),
        severity,
        message: format!(
            "{} is null {}% of the time. Making it optional saves {} tok/instance.",
            node.name,
            null_pct,
            savings.round()
        ),
        detail: format!(
            "This field exists in the schema but is null in {}% of instances. \
             Each null instance still costs {:.1} tokens in structural overhead \
             plus {:.1} tokens for the null literal. Making it optional would \
             eliminate these costs when the field has no value.",
            null_pct, node.tokens.schema_overhead, node.tokens.null_waste
        ),
        savings_tokens: savings,
        savings_usd_per_10k: usd_per_10k(savings, price_per_token),
    });
}

/// An object whose token budget is mostly field names and punctuation.
fn detect_hollow_object(node: &AnalysisNode, price_per_token: f64, out: &mut Vec<Insight>) {
    if node.node_type != JsonType::Object || node.tokens.total.avg < 5.0 {
        return;
    }

    let overhead_ratio = node.tokens.schema_overhead / node.tokens.total.avg;
    if overhead_ratio <= 0.7 {
        return;
    }

    let overhead_pct = (overhead_ratio * 100.0).round();
    let overhead_tokens = node.tokens.schema_overhead.round();
    let total_tokens = node.tokens.total.avg.round();

    // Exact achievable savings depend on the chosen restructuring; model a
    // conservative fraction of the overhead.
    let savings = node.tokens.schema_overhead * 0.3;

    let severity = if overhead_ratio > 0.85 {
        Severity::High
    } else if overhead_ratio > 0.75 {
        Severity::Medium
    } else {
        Severity::Low
    };

    out.push(Insight {
        kind: InsightKind::HollowObject,
        path: node.path.clone(),
        severity,
        message: format!(
            "{} is {}% structural overhead. {} of {} tokens are field names and braces.",
            node.name, overhead_pct, overhead_tokens, total_tokens
        ),
        detail: format!(
            "This object's structural elements (field names, braces, colons, commas) \
             consume {}% of its total token cost. The actual value payload is only \
             {} tokens. Consider flattening or restructuring to reduce overhead.",
            overhead_pct,
            total_tokens - overhead_tokens
        ),
        savings_tokens: savings,
        savings_usd_per_10k: usd_per_10k(savings, price_per_token),
    });
}

/// Arrays of objects re-emit the same keys on every element; the repetition
/// tax is the per-item key cost times every element after the first.
fn detect_array_repetition_tax(node: &AnalysisNode, price_per_token: f64, out: &mut Vec<Insight>) {
    if node.node_type != JsonType::Array {
        return;
    }
    let Some(array_stats) = node.array_stats else {
        return;
    };
    if array_stats.avg_items <= 1.0 {
        return;
    }

    let Some(item_node) = node.children.iter().find(|c| c.name == "[]") else {
        return;
    };
    let per_item_key_cost: f64 = item_node
        .children
        .iter()
        .map(|child| child.tokens.schema_overhead)
        .sum();
    if per_item_key_cost < 1.0 {
        return;
    }

    let avg_items = array_stats.avg_items;
    let repetition_tax = per_item_key_cost * (avg_items - 1.0);

    let severity = if repetition_tax > 50.0 {
        Severity::High
    } else if repetition_tax > 15.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    out.push(Insight {
        kind: InsightKind::ArrayRepetitionTax,
        path: node.path.clone(),
        severity,
        message: format!(
            "Field names in {} repeat {:.1}x per instance, costing {} tokens in repetition.",
            node.name,
            avg_items,
            repetition_tax.round()
        ),
        detail: format!(
            "Each item in this array repeats {} field names, costing ~{:.1} tokens per \
             item. With an average of {:.1} items, the first item's field names are \
             repeated {:.1} additional times. A header+values format would eliminate \
             this repetition.",
            item_node.children.len(),
            per_item_key_cost,
            avg_items,
            avg_items - 1.0
        ),
        savings_tokens: repetition_tax,
        savings_usd_per_10k: usd_per_10k(repetition_tax, price_per_token),
    });
}

/// A string field that almost always holds the same few values could be an
/// enum or a short code instead of free text.
fn detect_boilerplate(node: &AnalysisNode, price_per_token: f64, out: &mut Vec<Insight>) {
    if node.node_type != JsonType::String || node.fill_rate <= 0.5 {
        return;
    }
    let Some(string_stats) = node.string_stats else {
        return;
    };
    if string_stats.value_diversity >= 0.1 {
        return;
    }

    // An enum value costs roughly 30% of the full string.
    let savings = node.tokens.value_payload * 0.7;

    let severity = if savings > 10.0 {
        Severity::High
    } else if savings > 3.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    out.push(Insight {
        kind: InsightKind::Boilerplate,
        path: node.path.clone(),
        severity,
        message: format!(
            "{} has {} unique values across {} instances. Consider replacing with an enum.",
            node.name, string_stats.unique_count, node.instance_count
        ),
        detail: format!(
            "This string field has very low value diversity ({:.1}%). Only {} distinct \
             values appear across {} instances. The repetitive content costs ~{:.1} \
             tokens per instance. Replacing with an enum or shorter values would \
             significantly reduce cost.",
            string_stats.value_diversity * 100.0,
            string_stats.unique_count,
            node.instance_count,
            node.tokens.value_payload
        ),
        savings_tokens: savings,
        savings_usd_per_10k: usd_per_10k(savings, price_per_token),
    });
}

/// A string field whose p95 token cost dwarfs its median; only the tail is
/// expensive, so savings are discounted accordingly.
fn detect_length_variance(node: &AnalysisNode, price_per_token: f64, out: &mut Vec<Insight>) {
    if node.node_type != JsonType::String || node.tokens.total.p50 == 0.0 {
        return;
    }

    let ratio = node.tokens.total.p95 / node.tokens.total.p50;
    if ratio <= 5.0 {
        return;
    }

    let p50 = node.tokens.total.p50.round();
    let p95 = node.tokens.total.p95.round();
    let savings = (node.tokens.total.p95 - node.tokens.total.p50) * 0.05;

    let severity = if ratio > 20.0 {
        Severity::High
    } else if ratio > 10.0 {
        Severity::Medium
    } else {
        Severity::Low
    };

    out.push(Insight {
        kind: InsightKind::LengthVariance,
        path: node.path.clone(),
        severity,
        message: format!(
            "{} length varies {:.0}x (p50: {} tok, p95: {} tok). Consider adding length guidance.",
            node.name, ratio, p50, p95
        ),
        detail: format!(
            "This string field has high length variance with a {:.1}x spread between \
             median and 95th percentile. The median instance costs {} tokens but the \
             95th percentile costs {} tokens. Adding max_length guidance in your \
             schema description would reduce outlier costs.",
            ratio, p50, p95
        ),
        savings_tokens: savings,
        savings_usd_per_10k: usd_per_10k(savings, price_per_token),
    });
}

/// Cost calculation: price the analysis tree under a model's output rate.
use crate::engine::aggregate::{AnalysisNode, CostBlock};
use crate::models::ModelPricing;

/// Populate the cost block on every node, in place.
///
/// A pure multiplicative pass: `per_instance` is the node's average subtree
/// total priced at `output_per_1m / 1e6`, `total_corpus` scales that by the
/// file count. No error conditions.
pub fn apply_cost(tree: &mut AnalysisNode, pricing: &ModelPricing, file_count: usize) {
    let price_per_token = pricing.output_per_1m / 1_000_000.0;
    walk(tree, price_per_token, file_count as f64);
}

fn walk(node: &mut AnalysisNode, price_per_token: f64, file_count: f64) {
    let per_instance = node.tokens.total.avg * price_per_token;
    node.cost = CostBlock {
        per_instance,
        total_corpus: per_instance * file_count,
    };
    for child in &mut node.children {
        walk(child, price_per_token, file_count);
    }
}

/// Aggregation: fold per-file token maps and value maps into the analysis tree.
use crate::engine::schema::{JsonType, SchemaNode};
use crate::engine::tokenize::FileTokens;
use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Distribution statistics over per-file subtree token totals.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Stats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
}

/// Token statistics for one node: total distribution plus the three cost
/// components averaged independently across files.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TokenStats {
    pub total: Stats,
    pub schema_overhead: f64,
    pub value_payload: f64,
    pub null_waste: f64,
}

/// Item-count statistics, present only on array nodes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ArrayStats {
    pub avg_items: f64,
    pub min_items: f64,
    pub max_items: f64,
    pub p95_items: f64,
}

/// String-value statistics, present only on string nodes with observed values.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StringStats {
    pub avg_length: f64,
    /// unique values / present values, in [0, 1].
    pub value_diversity: f64,
    pub unique_count: usize,
}

/// Dollar costs, populated by [`crate::engine::cost::apply_cost`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CostBlock {
    pub per_instance: f64,
    pub total_corpus: f64,
}

/// The public result tree: isomorphic in shape to the schema tree, carrying
/// corpus-wide derived statistics. Immutable once returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisNode {
    pub name: String,
    pub path: String,
    pub depth: usize,
    #[serde(rename = "type")]
    pub node_type: JsonType,
    pub tokens: TokenStats,
    pub fill_rate: f64,
    pub instance_count: u64,
    pub array_stats: Option<ArrayStats>,
    pub string_stats: Option<StringStats>,
    pub examples: Vec<Value>,
    pub children: Vec<AnalysisNode>,
    pub cost: CostBlock,
}

impl AnalysisNode {
    /// Depth-first lookup by schema path.
    pub fn find(&self, path: &str) -> Option<&AnalysisNode> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(path))
    }
}

/// Aggregate per-file measurements into an [`AnalysisNode`] tree.
///
/// For every schema node the per-file subtree total (the node's own tokens
/// plus all descendants', once per file) drives the `Stats` block, while the
/// three components are averaged independently so they do not inherit
/// rounding drift from the total distribution.
pub fn aggregate(
    schema: &SchemaNode,
    per_file_tokens: &[BTreeMap<String, FileTokens>],
    per_file_values: &[BTreeMap<String, Vec<Value>>],
    sample_count: usize,
) -> AnalysisNode {
    // Flatten values per path across files.
    let mut all_values: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();
    for file_values in per_file_values {
        for (path, values) in file_values {
            all_values
                .entry(path.as_str())
                .or_default()
                .extend(values.iter());
        }
    }

    aggregate_node(schema, per_file_tokens, &all_values, sample_count)
}

fn aggregate_node(
    schema: &SchemaNode,
    per_file_tokens: &[BTreeMap<String, FileTokens>],
    all_values: &BTreeMap<&str, Vec<&Value>>,
    sample_count: usize,
) -> AnalysisNode {
    let mut file_totals = Vec::with_capacity(per_file_tokens.len());
    let mut file_overheads = Vec::with_capacity(per_file_tokens.len());
    let mut file_payloads = Vec::with_capacity(per_file_tokens.len());
    let mut file_null_wastes = Vec::with_capacity(per_file_tokens.len());

    for file_map in per_file_tokens {
        let subtree = sum_subtree(schema, file_map);
        file_totals.push(subtree.total as f64);
        file_overheads.push(subtree.schema_overhead as f64);
        file_payloads.push(subtree.value_payload as f64);
        file_null_wastes.push(subtree.null_waste as f64);
    }

    let fill_rate = if schema.instance_count > 0 {
        schema.present_count as f64 / schema.instance_count as f64
    } else {
        0.0
    };

    let array_stats = if schema.node_type == JsonType::Array && !schema.array_item_counts.is_empty()
    {
        let counts: Vec<f64> = schema.array_item_counts.iter().map(|&c| c as f64).collect();
        let stats = compute_stats(&counts);
        Some(ArrayStats {
            avg_items: stats.avg,
            min_items: stats.min,
            max_items: stats.max,
            p95_items: stats.p95,
        })
    } else {
        None
    };

    let values = all_values.get(schema.path.as_str());

    let string_stats = match (schema.node_type, values) {
        (JsonType::String, Some(values)) if !values.is_empty() => {
            let strings: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
            if strings.is_empty() {
                None
            } else {
                let unique: HashSet<&str> = strings.iter().copied().collect();
                let total_length: usize = strings.iter().map(|s| s.chars().count()).sum();
                Some(StringStats {
                    avg_length: total_length as f64 / strings.len() as f64,
                    value_diversity: unique.len() as f64 / strings.len() as f64,
                    unique_count: unique.len(),
                })
            }
        }
        _ => None,
    };

    let examples = sample_values(values.map(Vec::as_slice).unwrap_or(&[]), sample_count);

    let children = schema
        .children
        .values()
        .map(|child| aggregate_node(child, per_file_tokens, all_values, sample_count))
        .collect();

    AnalysisNode {
        name: schema.name.clone(),
        path: schema.path.clone(),
        depth: schema.depth,
        node_type: schema.node_type,
        tokens: TokenStats {
            total: compute_stats(&file_totals),
            schema_overhead: mean(&file_overheads),
            value_payload: mean(&file_payloads),
            null_waste: mean(&file_null_wastes),
        },
        fill_rate,
        instance_count: schema.instance_count,
        array_stats,
        string_stats,
        examples,
        children,
        cost: CostBlock::default(),
    }
}

/// Sum tokens for a node and all descendants from one file's token map.
fn sum_subtree(schema: &SchemaNode, file_map: &BTreeMap<String, FileTokens>) -> FileTokens {
    let mut acc = file_map.get(&schema.path).copied().unwrap_or_default();
    for child in schema.children.values() {
        let child_acc = sum_subtree(child, file_map);
        acc.total += child_acc.total;
        acc.schema_overhead += child_acc.schema_overhead;
        acc.value_payload += child_acc.value_payload;
        acc.null_waste += child_acc.null_waste;
    }
    acc
}

pub(crate) fn compute_stats(values: &[f64]) -> Stats {
    if values.is_empty() {
        return Stats::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let sum: f64 = sorted.iter().sum();
    Stats {
        avg: sum / sorted.len() as f64,
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        p50: percentile(&sorted, 50.0),
        p95: percentile(&sorted, 95.0),
    }
}

/// Linear-interpolation percentile over a sorted slice. A single value is
/// returned directly; an exact index returns that element.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let idx = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = idx.floor() as usize;
    let upper = idx.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    sorted[lower] + (sorted[upper] - sorted[lower]) * (idx - lower as f64)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Reservoir sampling: keep the first `max_count` values, then value `i`
/// replaces a uniformly random reservoir slot with probability
/// `max_count / (i + 1)`. Uniform without buffering the whole value set.
fn sample_values(values: &[&Value], max_count: usize) -> Vec<Value> {
    if values.is_empty() || max_count == 0 {
        return Vec::new();
    }
    if values.len() <= max_count {
        return values.iter().map(|v| (*v).clone()).collect();
    }

    let mut reservoir: Vec<Value> = values[..max_count].iter().map(|v| (*v).clone()).collect();
    let mut rng = rand::thread_rng();
    for (i, value) in values.iter().enumerate().skip(max_count) {
        let j = rng.gen_range(0..=i);
        if j < max_count {
            reservoir[j] = (*value).clone();
        }
    }
    reservoir
}

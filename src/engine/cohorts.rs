/// Cohort detection: partition a corpus into groups of comparable schema
/// shape, so mixed-schema corpora are not forced into one misleading merged
/// tree.
use crate::engine::schema::JsonType;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Blend weights and limits for the greedy similarity clustering.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.72;
const TOP_KEY_WEIGHT: f64 = 0.6;
const STRUCTURE_WEIGHT: f64 = 0.4;
const DEPTH_PENALTY_PER_LEVEL: f64 = 0.04;
const DEPTH_PENALTY_CAP: f64 = 0.2;
const ARRAY_SAMPLE_LIMIT: usize = 3;

/// One group of structurally comparable documents. Cohorts partition the
/// input index set exhaustively and disjointly.
#[derive(Debug, Clone, Serialize)]
pub struct Cohort {
    pub id: String,
    /// Derived from the group's top-level keys, e.g. "cast, rating, title +2".
    pub label: String,
    pub file_count: usize,
    /// Indices into the input document slice, in encounter order.
    pub member_indices: Vec<usize>,
    pub top_level_keys: Vec<String>,
}

/// Compute the exact schema fingerprint of a document: its sorted top-level
/// key names joined with `|`. Key presence only — types and values are
/// ignored so null/non-null variation does not fragment the corpus.
pub fn fingerprint(doc: &Value) -> String {
    match doc.as_object() {
        Some(fields) => {
            let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
            keys.sort_unstable();
            keys.join("|")
        }
        None => format!("_root:{}", JsonType::of(doc).as_str()),
    }
}

/// Exact-fingerprint cohorting: group by identical top-level key sets.
///
/// Fast fallback for when speed matters more than recall; a single optional
/// field splits otherwise-identical documents into separate cohorts.
pub fn detect_cohorts_exact(documents: &[Value]) -> Vec<Cohort> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();

    for (index, doc) in documents.iter().enumerate() {
        let fp = fingerprint(doc);
        groups
            .entry(fp.clone())
            .or_insert_with(|| {
                order.push(fp);
                Vec::new()
            })
            .push(index);
    }

    let mut cohorts: Vec<Cohort> = order
        .into_iter()
        .map(|fp| {
            let member_indices = groups.remove(&fp).expect("group recorded in order");
            let keys: Vec<String> = fp.split('|').map(str::to_string).collect();
            Cohort {
                id: fp,
                label: label_from_keys(&keys),
                file_count: member_indices.len(),
                member_indices,
                top_level_keys: keys,
            }
        })
        .collect();

    cohorts.sort_by(|a, b| b.file_count.cmp(&a.file_count));
    renumber(&mut cohorts);
    cohorts
}

/// Weighted greedy similarity clustering, the canonical strategy.
///
/// Each document gets a structural fingerprint: a weighted feature multiset
/// with one feature per (path, type), one per object's full sorted key set,
/// and depth-decaying weights so shallow structure dominates. Documents are
/// assigned online to the best-scoring existing group, with a new group
/// opened when the best blended score falls below the threshold.
///
/// The greedy pass is order-sensitive, so members are visited in the order
/// given; callers wanting reproducible output should sort documents by a
/// stable identifier first (the pipeline sorts by source).
pub fn detect_cohorts(documents: &[Value]) -> Vec<Cohort> {
    detect_cohorts_with_threshold(documents, DEFAULT_SIMILARITY_THRESHOLD)
}

pub fn detect_cohorts_with_threshold(documents: &[Value], threshold: f64) -> Vec<Cohort> {
    let mut groups: Vec<Group> = Vec::new();

    for (index, doc) in documents.iter().enumerate() {
        let profile = DocumentProfile::of(doc);

        let mut best: Option<(usize, f64)> = None;
        for (group_index, group) in groups.iter().enumerate() {
            let score = group.similarity(&profile);
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((group_index, score));
            }
        }

        match best {
            Some((group_index, score)) if score >= threshold => {
                groups[group_index].add(index, profile);
            }
            _ => groups.push(Group::seed(index, profile)),
        }
    }

    let mut cohorts: Vec<Cohort> = groups
        .into_iter()
        .map(|group| {
            let keys: Vec<String> = group.top_keys.iter().cloned().collect();
            Cohort {
                id: String::new(),
                label: label_from_keys(&keys),
                file_count: group.members.len(),
                member_indices: group.members,
                top_level_keys: keys,
            }
        })
        .collect();

    cohorts.sort_by(|a, b| b.file_count.cmp(&a.file_count));
    renumber(&mut cohorts);
    cohorts
}

fn renumber(cohorts: &mut [Cohort]) {
    for (i, cohort) in cohorts.iter_mut().enumerate() {
        cohort.id = format!("cohort-{}", i + 1);
    }
}

fn label_from_keys(keys: &[String]) -> String {
    if keys.len() <= 3 {
        keys.join(", ")
    } else {
        format!("{} +{}", keys[..3].join(", "), keys.len() - 3)
    }
}

/// A weighted structural fingerprint of one document.
struct DocumentProfile {
    features: HashMap<String, f64>,
    top_keys: BTreeSet<String>,
    max_depth: usize,
}

impl DocumentProfile {
    fn of(doc: &Value) -> Self {
        let mut profile = Self {
            features: HashMap::new(),
            top_keys: doc
                .as_object()
                .map(|fields| fields.keys().cloned().collect())
                .unwrap_or_default(),
            max_depth: 0,
        };
        profile.walk(doc, "root", 0);
        profile
    }

    fn walk(&mut self, value: &Value, path: &str, depth: usize) {
        self.max_depth = self.max_depth.max(depth);
        self.add_feature(
            format!("{}:{}", path, JsonType::of(value).as_str()),
            depth,
            1.2,
        );

        match value {
            Value::Null => {}
            Value::Array(items) => {
                self.add_feature(format!("{path}:array_items"), depth, 0.8);
                // Sample a few elements; large arrays add no new shape signal.
                let item_path = format!("{path}[]");
                for item in items.iter().take(ARRAY_SAMPLE_LIMIT) {
                    self.walk(item, &item_path, depth + 1);
                }
            }
            Value::Object(fields) => {
                let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
                let scale = if depth <= 1 { 1.5 } else { 0.5 };
                self.add_feature(format!("{}:{{{}}}", path, keys.join("|")), depth, scale);
                for (key, child) in fields {
                    self.walk(child, &format!("{path}.{key}"), depth + 1);
                }
            }
            _ => {}
        }
    }

    /// Base weight decays 4/3/2/1 by depth; repeats keep the max.
    fn add_feature(&mut self, feature: String, depth: usize, scale: f64) {
        let base = match depth {
            0 => 4.0,
            1 => 3.0,
            2 => 2.0,
            _ => 1.0,
        };
        let weight = base * scale;
        let entry = self.features.entry(feature).or_insert(0.0);
        if weight > *entry {
            *entry = weight;
        }
    }
}

/// An open cluster: its members, the max-merged feature union, the union of
/// top-level keys, and the member depth history for the median penalty.
struct Group {
    members: Vec<usize>,
    union_features: HashMap<String, f64>,
    top_keys: BTreeSet<String>,
    depths: Vec<usize>,
}

impl Group {
    fn seed(index: usize, profile: DocumentProfile) -> Self {
        Self {
            members: vec![index],
            union_features: profile.features,
            top_keys: profile.top_keys,
            depths: vec![profile.max_depth],
        }
    }

    fn add(&mut self, index: usize, profile: DocumentProfile) {
        self.members.push(index);
        for (feature, weight) in profile.features {
            let entry = self.union_features.entry(feature).or_insert(0.0);
            if weight > *entry {
                *entry = weight;
            }
        }
        self.top_keys.extend(profile.top_keys);
        self.depths.push(profile.max_depth);
    }

    /// Blend of top-level key Jaccard and weighted structural Jaccard,
    /// penalized by nesting-depth distance from the group median.
    fn similarity(&self, profile: &DocumentProfile) -> f64 {
        let top = jaccard(&profile.top_keys, &self.top_keys);
        let structure = weighted_jaccard(&profile.features, &self.union_features);
        let depth_delta = (profile.max_depth as f64 - median(&self.depths)).abs();
        let depth_penalty = (depth_delta * DEPTH_PENALTY_PER_LEVEL).min(DEPTH_PENALTY_CAP);
        TOP_KEY_WEIGHT * top + STRUCTURE_WEIGHT * structure - depth_penalty
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn weighted_jaccard(a: &HashMap<String, f64>, b: &HashMap<String, f64>) -> f64 {
    let mut min_sum = 0.0;
    let mut max_sum = 0.0;
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    for key in keys {
        let av = a.get(key.as_str()).copied().unwrap_or(0.0);
        let bv = b.get(key.as_str()).copied().unwrap_or(0.0);
        min_sum += av.min(bv);
        max_sum += av.max(bv);
    }
    if max_sum > 0.0 {
        min_sum / max_sum
    } else {
        1.0
    }
}

fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

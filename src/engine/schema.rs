/// Schema inference: merge a corpus of JSON documents into one typed tree.
use crate::error::{EngineError, InputError};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The six JSON value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Null => "null",
        }
    }
}

/// Policy for resolving a node's type when multiple non-null types were
/// observed at the same path.
///
/// `FirstSeen` mirrors the behavior of picking whichever type registered
/// first during the merge. `MostFrequent` picks the mode of the observation
/// counts, breaking ties toward the earlier-registered type. Both are exposed
/// so the choice is auditable rather than implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypePolicy {
    #[default]
    FirstSeen,
    MostFrequent,
}

/// One inferred field position in the union schema.
///
/// `instance_count` counts opportunities to be present (the parent existed);
/// `present_count` counts non-null occurrences. After [`infer_schema`]
/// finishes, `present_count <= instance_count` holds on every node and a
/// child's `instance_count` equals its object parent's `present_count`.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaNode {
    pub name: String,
    pub path: String,
    pub depth: usize,
    #[serde(rename = "type")]
    pub node_type: JsonType,
    /// Observed (type, occurrence count) pairs in first-seen order.
    pub observed_types: Vec<(JsonType, u64)>,
    pub instance_count: u64,
    pub present_count: u64,
    /// Per-occurrence element counts; populated only on array nodes.
    pub array_item_counts: Vec<u64>,
    /// Child nodes keyed by field name, or the literal `"[]"` for the single
    /// unioned array-element node.
    pub children: BTreeMap<String, SchemaNode>,
}

impl SchemaNode {
    fn new(name: &str, path: String, depth: usize) -> Self {
        Self {
            name: name.to_string(),
            path,
            depth,
            node_type: JsonType::Null,
            observed_types: Vec::new(),
            instance_count: 0,
            present_count: 0,
            array_item_counts: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }

    pub fn has_observed(&self, json_type: JsonType) -> bool {
        self.observed_types.iter().any(|(t, _)| *t == json_type)
    }

    fn observe(&mut self, json_type: JsonType) {
        match self.observed_types.iter_mut().find(|(t, _)| *t == json_type) {
            Some((_, count)) => *count += 1,
            None => self.observed_types.push((json_type, 1)),
        }
    }
}

/// Infer the union schema of a document corpus with the default
/// first-seen type policy.
///
/// # Errors
///
/// Returns `InputError::EmptyCorpus` for an empty slice and
/// `InputError::NonObjectRoot` when any document's top-level value is not
/// an object.
pub fn infer_schema(documents: &[Value]) -> Result<SchemaNode, EngineError> {
    infer_schema_with(documents, TypePolicy::FirstSeen)
}

/// Infer the union schema under an explicit type-resolution policy.
pub fn infer_schema_with(
    documents: &[Value],
    policy: TypePolicy,
) -> Result<SchemaNode, EngineError> {
    if documents.is_empty() {
        return Err(InputError::EmptyCorpus.into());
    }

    for (index, doc) in documents.iter().enumerate() {
        if !doc.is_object() {
            return Err(InputError::NonObjectRoot {
                source_id: format!("document {}", index + 1),
            }
            .into());
        }
    }

    let mut root = SchemaNode::new("root", "root".to_string(), 0);
    for doc in documents {
        merge_value(&mut root, doc);
    }

    resolve_types(&mut root, policy);
    repair_instance_counts(&mut root);

    Ok(root)
}

/// Fold one value into a node: the instance counter moves unconditionally,
/// presence and type only for non-null values.
fn merge_value(node: &mut SchemaNode, value: &Value) {
    node.instance_count += 1;

    if value.is_null() {
        node.observe(JsonType::Null);
        return;
    }

    node.present_count += 1;
    let json_type = JsonType::of(value);
    node.observe(json_type);

    match value {
        Value::Object(fields) => {
            for (key, child_value) in fields {
                if !node.children.contains_key(key) {
                    let child_path = format!("{}.{}", node.path, key);
                    let depth = node.depth + 1;
                    node.children
                        .insert(key.clone(), SchemaNode::new(key, child_path, depth));
                }
                let child = node.children.get_mut(key).expect("child just ensured");
                merge_value(child, child_value);
            }
        }
        Value::Array(items) => {
            node.array_item_counts.push(items.len() as u64);

            // All elements fold into a single "[]" child, created even for
            // empty arrays so downstream traversals always find it.
            if !node.children.contains_key("[]") {
                let item_path = format!("{}[]", node.path);
                let depth = node.depth + 1;
                node.children
                    .insert("[]".to_string(), SchemaNode::new("[]", item_path, depth));
            }
            let item_node = node.children.get_mut("[]").expect("item child ensured");
            for item in items {
                merge_value(item_node, item);
            }
        }
        _ => {}
    }
}

/// Resolve every node's `type` to one non-null observed type under the given
/// policy. A node that only ever held null stays `null`.
fn resolve_types(node: &mut SchemaNode, policy: TypePolicy) {
    let resolved = match policy {
        TypePolicy::FirstSeen => node
            .observed_types
            .iter()
            .find(|(t, _)| *t != JsonType::Null)
            .map(|(t, _)| *t),
        TypePolicy::MostFrequent => {
            // Ties break toward the earlier-registered type.
            let mut best: Option<(JsonType, u64)> = None;
            for &(t, count) in &node.observed_types {
                if t == JsonType::Null {
                    continue;
                }
                if best.map_or(true, |(_, best_count)| count > best_count) {
                    best = Some((t, count));
                }
            }
            best.map(|(t, _)| t)
        }
    };

    if let Some(json_type) = resolved {
        node.node_type = json_type;
    } else if node.has_observed(JsonType::Null) {
        node.node_type = JsonType::Null;
    }

    for child in node.children.values_mut() {
        resolve_types(child, policy);
    }
}

/// Raise each object child's `instance_count` to its parent's
/// `present_count`. A field absent from some instances of an existing parent
/// still counts as available-but-missing, never lowered.
fn repair_instance_counts(node: &mut SchemaNode) {
    let parent_present = node.present_count;
    let is_object = node.node_type == JsonType::Object;

    for child in node.children.values_mut() {
        if is_object && child.instance_count < parent_present {
            child.instance_count = parent_present;
        }
        repair_instance_counts(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_root_object_node_from_simple_document() {
        let schema = infer_schema(&[json!({"a": 1, "b": "hello"})]).unwrap();

        assert_eq!(schema.name, "root");
        assert_eq!(schema.path, "root");
        assert_eq!(schema.depth, 0);
        assert_eq!(schema.node_type, JsonType::Object);
        assert_eq!(schema.instance_count, 1);
        assert_eq!(schema.present_count, 1);
        assert_eq!(schema.children.len(), 2);

        let a = schema.child("a").unwrap();
        assert_eq!(a.node_type, JsonType::Number);
        assert_eq!(a.path, "root.a");
        assert_eq!(a.depth, 1);
        assert_eq!(a.instance_count, 1);
        assert_eq!(a.present_count, 1);

        assert_eq!(schema.child("b").unwrap().node_type, JsonType::String);
    }

    #[test]
    fn merges_union_of_different_shapes() {
        let schema = infer_schema(&[json!({"a": 1, "b": 2}), json!({"b": 3, "c": 4})]).unwrap();

        assert_eq!(schema.children.len(), 3);
        let a = schema.child("a").unwrap();
        assert_eq!(a.present_count, 1);
        // repair pass bumps the absent field up to the parent's present_count
        assert_eq!(a.instance_count, 2);
        assert_eq!(schema.child("b").unwrap().present_count, 2);
        assert_eq!(schema.child("c").unwrap().present_count, 1);
    }

    #[test]
    fn null_increments_instances_but_not_presence() {
        let schema = infer_schema(&[
            json!({"x": "hello"}),
            json!({"x": null}),
            json!({"x": null}),
        ])
        .unwrap();

        let x = schema.child("x").unwrap();
        assert_eq!(x.instance_count, 3);
        assert_eq!(x.present_count, 1);
        assert!(x.has_observed(JsonType::Null));
        assert!(x.has_observed(JsonType::String));
        assert_eq!(x.node_type, JsonType::String);
    }

    #[test]
    fn array_items_union_into_one_child() {
        let schema = infer_schema(&[
            json!({"items": [{"a": 1}, {"a": 2, "b": "extra"}]}),
            json!({"items": [{"a": 3}]}),
        ])
        .unwrap();

        let items = schema.child("items").unwrap();
        assert_eq!(items.node_type, JsonType::Array);
        assert_eq!(items.array_item_counts, vec![2, 1]);

        let item = items.child("[]").unwrap();
        assert_eq!(item.children.len(), 2);
        assert_eq!(item.child("a").unwrap().present_count, 3);
        let b = item.child("b").unwrap();
        assert_eq!(b.present_count, 1);
        assert_eq!(b.instance_count, 3);
    }

    #[test]
    fn nested_objects_inside_arrays_get_bracketed_paths() {
        let schema = infer_schema(&[json!({"arr": [{"nested": {"x": 1}}]})]).unwrap();

        let nested = schema
            .child("arr")
            .and_then(|n| n.child("[]"))
            .and_then(|n| n.child("nested"))
            .unwrap();
        assert_eq!(nested.node_type, JsonType::Object);
        assert_eq!(nested.path, "root.arr[].nested");
        assert_eq!(nested.child("x").unwrap().path, "root.arr[].nested.x");
    }

    #[test]
    fn type_conflicts_record_all_observations() {
        let schema = infer_schema(&[json!({"x": "hello"}), json!({"x": 42})]).unwrap();

        let x = schema.child("x").unwrap();
        assert!(x.has_observed(JsonType::String));
        assert!(x.has_observed(JsonType::Number));
        // first-seen policy resolves to the earliest registration
        assert_eq!(x.node_type, JsonType::String);
    }

    #[test]
    fn most_frequent_policy_picks_the_mode() {
        let docs = [json!({"x": "a"}), json!({"x": 1}), json!({"x": 2})];
        let schema = infer_schema_with(&docs, TypePolicy::MostFrequent).unwrap();
        assert_eq!(schema.child("x").unwrap().node_type, JsonType::Number);

        let first_seen = infer_schema_with(&docs, TypePolicy::FirstSeen).unwrap();
        assert_eq!(first_seen.child("x").unwrap().node_type, JsonType::String);
    }

    #[test]
    fn empty_arrays_still_create_the_item_child() {
        let schema = infer_schema(&[json!({"items": []}), json!({"items": [{"a": 1}]})]).unwrap();

        let items = schema.child("items").unwrap();
        assert_eq!(items.array_item_counts, vec![0, 1]);
        assert!(items.child("[]").is_some());
    }

    #[test]
    fn deep_nesting_tracks_path_and_depth() {
        let schema = infer_schema(&[json!({"a": {"b": {"c": {"d": 1}}}})]).unwrap();

        let d = schema
            .child("a")
            .and_then(|n| n.child("b"))
            .and_then(|n| n.child("c"))
            .and_then(|n| n.child("d"))
            .unwrap();
        assert_eq!(d.path, "root.a.b.c.d");
        assert_eq!(d.depth, 4);
        assert_eq!(d.node_type, JsonType::Number);
    }

    #[test]
    fn presence_never_exceeds_instances() {
        let schema = infer_schema(&[
            json!({"a": {"b": null}, "c": [1, null, 3]}),
            json!({"a": {}, "c": []}),
        ])
        .unwrap();

        fn check(node: &SchemaNode) {
            assert!(
                node.present_count <= node.instance_count,
                "{} violates presence bound",
                node.path
            );
            for child in node.children.values() {
                check(child);
            }
        }
        check(&schema);
    }

    #[test]
    fn empty_corpus_is_an_input_error() {
        let err = infer_schema(&[]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Input(InputError::EmptyCorpus)
        ));
    }

    #[test]
    fn non_object_root_is_an_input_error() {
        let err = infer_schema(&[json!([1, 2, 3])]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Input(InputError::NonObjectRoot { .. })
        ));
    }
}

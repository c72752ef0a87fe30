/// Span tagging and token attribution.
///
/// A document is re-serialized to canonical minified JSON while a parallel
/// per-byte tag array records which schema path and cost category each byte
/// belongs to. The full string is then tokenized once, each token is decoded
/// to its raw bytes to learn its length, and the whole token is attributed
/// to the (path, category) pair covering the plurality of its bytes.
use crate::engine::schema::SchemaNode;
use crate::error::EngineError;
use crate::tokenizers::Tokenizer;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Cost category of a byte in the canonical serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SpanCategory {
    /// Quoted field key plus its trailing colon, charged to the child path.
    Key,
    /// A primitive payload value.
    Value,
    /// The literal `null`.
    NullValue,
    /// Braces, brackets, and separating commas, charged to the container.
    Structural,
}

/// Token counts attributed to one schema path for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileTokens {
    pub total: u64,
    pub schema_overhead: u64,
    pub value_payload: u64,
    pub null_waste: u64,
}

/// Minified serialization plus its per-byte tags. Paths are interned so the
/// tag array stays one small entry per byte.
struct OffsetMap {
    json: String,
    tags: Vec<(u32, SpanCategory)>,
    paths: Vec<String>,
    path_ids: HashMap<String, u32>,
}

impl OffsetMap {
    fn new() -> Self {
        Self {
            json: String::new(),
            tags: Vec::new(),
            paths: Vec::new(),
            path_ids: HashMap::new(),
        }
    }

    fn path_id(&mut self, path: &str) -> u32 {
        if let Some(&id) = self.path_ids.get(path) {
            return id;
        }
        let id = self.paths.len() as u32;
        self.paths.push(path.to_string());
        self.path_ids.insert(path.to_string(), id);
        id
    }

    fn emit(&mut self, text: &str, path: &str, category: SpanCategory) {
        let id = self.path_id(path);
        self.json.push_str(text);
        self.tags
            .extend(std::iter::repeat((id, category)).take(text.len()));
    }

    fn walk(&mut self, value: &Value, node: &SchemaNode) -> Result<(), EngineError> {
        match value {
            Value::Null => {
                self.emit("null", &node.path, SpanCategory::NullValue);
                Ok(())
            }
            Value::Array(items) => {
                self.emit("[", &node.path, SpanCategory::Structural);
                let item_node = node.child("[]").ok_or_else(|| {
                    EngineError::InternalConsistency(format!(
                        "array at {} has no item node in the inferred schema",
                        node.path
                    ))
                })?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.emit(",", &node.path, SpanCategory::Structural);
                    }
                    self.walk(item, item_node)?;
                }
                self.emit("]", &node.path, SpanCategory::Structural);
                Ok(())
            }
            Value::Object(fields) => {
                self.emit("{", &node.path, SpanCategory::Structural);
                for (i, (key, child_value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.emit(",", &node.path, SpanCategory::Structural);
                    }
                    let child = node.child(key).ok_or_else(|| {
                        EngineError::InternalConsistency(format!(
                            "field \"{}\" under {} was never observed during schema inference",
                            key, node.path
                        ))
                    })?;
                    // "key": through the colon belongs to the child's path.
                    let quoted = serde_json::to_string(key)?;
                    self.emit(&quoted, &child.path, SpanCategory::Key);
                    self.emit(":", &child.path, SpanCategory::Key);
                    self.walk(child_value, child)?;
                }
                self.emit("}", &node.path, SpanCategory::Structural);
                Ok(())
            }
            primitive => {
                let serialized = serde_json::to_string(primitive)?;
                self.emit(&serialized, &node.path, SpanCategory::Value);
                Ok(())
            }
        }
    }
}

/// Tokenize one document and attribute every token to a schema path.
///
/// The attribution is a true partition: the summed `total` across all
/// returned paths equals the tokenizer's direct count of the canonical
/// serialization. Plurality ties break toward the lowest byte offset within
/// the token's span (deterministic and documented).
///
/// # Errors
///
/// Returns `EngineError::InternalConsistency` when the document contains a
/// field the schema never observed, or when decoded token lengths do not
/// cover the serialization exactly; tokenizer failures propagate as
/// `EngineError::Tokenizer`.
pub fn tokenize_document(
    document: &Value,
    schema: &SchemaNode,
    tokenizer: &dyn Tokenizer,
) -> Result<BTreeMap<String, FileTokens>, EngineError> {
    let mut map = OffsetMap::new();
    map.walk(document, schema)?;

    let tokens = tokenizer.encode(&map.json)?;
    let mut accumulators: HashMap<u32, FileTokens> = HashMap::new();

    let mut byte_pos = 0usize;
    for token in tokens {
        let token_len = tokenizer.decode_token_bytes(token)?.len();
        let span_end = (byte_pos + token_len).min(map.tags.len());

        // Plurality vote over the bytes this token covers. The vote list is
        // in first-encountered order and a strictly-greater comparison keeps
        // the earliest pair on ties.
        let mut votes: Vec<((u32, SpanCategory), u64)> = Vec::new();
        for tag in &map.tags[byte_pos..span_end] {
            match votes.iter_mut().find(|(key, _)| key == tag) {
                Some((_, count)) => *count += 1,
                None => votes.push((*tag, 1)),
            }
        }

        let mut winner: Option<(u32, SpanCategory)> = None;
        let mut max_count = 0u64;
        for ((path_id, category), count) in votes {
            if count > max_count {
                max_count = count;
                winner = Some((path_id, category));
            }
        }

        if let Some((path_id, category)) = winner {
            let acc = accumulators.entry(path_id).or_default();
            match category {
                SpanCategory::Key | SpanCategory::Structural => acc.schema_overhead += 1,
                SpanCategory::NullValue => acc.null_waste += 1,
                SpanCategory::Value => acc.value_payload += 1,
            }
        }

        byte_pos += token_len;
    }

    if byte_pos != map.json.len() {
        return Err(EngineError::InternalConsistency(format!(
            "decoded token lengths cover {} bytes but the serialization has {}",
            byte_pos,
            map.json.len()
        )));
    }

    let mut result = BTreeMap::new();
    for (path_id, mut acc) in accumulators {
        acc.total = acc.schema_overhead + acc.value_payload + acc.null_waste;
        result.insert(map.paths[path_id as usize].clone(), acc);
    }
    Ok(result)
}

/// Walk a document against the schema and collect raw leaf values per path.
///
/// Nulls are skipped (they feed fill-rate accounting, not value samples);
/// array elements are visited one by one against the shared `"[]"` child.
/// Keys missing from the schema are skipped: collection is best-effort
/// sampling, not a consistency check.
pub fn collect_values(document: &Value, schema: &SchemaNode) -> BTreeMap<String, Vec<Value>> {
    let mut result = BTreeMap::new();
    walk_values(document, schema, &mut result);
    result
}

fn walk_values(value: &Value, node: &SchemaNode, out: &mut BTreeMap<String, Vec<Value>>) {
    match value {
        Value::Null => {}
        Value::Array(items) => {
            if let Some(item_node) = node.child("[]") {
                for item in items {
                    walk_values(item, item_node, out);
                }
            }
        }
        Value::Object(fields) => {
            for (key, child_value) in fields {
                if let Some(child) = node.child(key) {
                    walk_values(child_value, child, out);
                }
            }
        }
        primitive => {
            out.entry(node.path.clone())
                .or_insert_with(Vec::new)
                .push(primitive.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::schema::infer_schema;
    use crate::engine::testing::{ByteTokenizer, PairTokenizer};
    use serde_json::json;

    fn total_tokens(result: &BTreeMap<String, FileTokens>) -> u64 {
        result.values().map(|ft| ft.total).sum()
    }

    #[test]
    fn attribution_partitions_every_token() {
        let doc = json!({
            "pmid": "12345",
            "title": "Test Study",
            "year": 2024,
            "endpoints": [
                {"name": "primary", "value": 0.5},
                {"name": "secondary", "value": 1.2}
            ]
        });
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let tokenizer = ByteTokenizer;
        let result = tokenize_document(&doc, &schema, &tokenizer).unwrap();

        let direct = tokenizer.encode(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(total_tokens(&result), direct.len() as u64);
    }

    #[test]
    fn conservation_holds_for_multibyte_tokens() {
        let doc = json!({"items": [1, 2, 3], "status": null, "label": "xy"});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let tokenizer = PairTokenizer;
        let result = tokenize_document(&doc, &schema, &tokenizer).unwrap();

        let serialized = serde_json::to_string(&doc).unwrap();
        let direct = tokenizer.encode(&serialized).unwrap();
        assert_eq!(total_tokens(&result), direct.len() as u64);
    }

    #[test]
    fn non_ascii_payloads_are_attributed_not_rejected() {
        // Every byte of a multi-byte character becomes its own token here, so
        // no single token is valid UTF-8 on its own. Attribution must still
        // succeed and conserve the count.
        let doc = json!({"msg": "launch 🚀 ready", "note": "café"});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let tokenizer = ByteTokenizer;
        let result = tokenize_document(&doc, &schema, &tokenizer).unwrap();

        let direct = tokenizer
            .encode(&serde_json::to_string(&doc).unwrap())
            .unwrap();
        assert_eq!(total_tokens(&result), direct.len() as u64);
        assert!(result["root.msg"].value_payload > 0);
    }

    #[test]
    fn nulls_are_attributed_as_null_waste() {
        let doc = json!({"x": null});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let result = tokenize_document(&doc, &schema, &ByteTokenizer).unwrap();

        let waste: u64 = result.values().map(|ft| ft.null_waste).sum();
        // "null" is 4 bytes, each its own token under ByteTokenizer
        assert_eq!(waste, 4);
        let x = &result["root.x"];
        assert_eq!(x.null_waste, 4);
    }

    #[test]
    fn keys_are_overhead_on_the_child_path() {
        let doc = json!({"field_name": "v"});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let result = tokenize_document(&doc, &schema, &ByteTokenizer).unwrap();

        let child = &result["root.field_name"];
        // "field_name": is 13 bytes of key overhead on the child path
        assert_eq!(child.schema_overhead, 13);
        // the value "v" is 3 bytes of payload
        assert_eq!(child.value_payload, 3);
        // the braces land on the root
        assert_eq!(result["root"].schema_overhead, 2);
    }

    #[test]
    fn nested_objects_produce_entries_per_path() {
        let doc = json!({"outer": {"inner": 42}});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let result = tokenize_document(&doc, &schema, &ByteTokenizer).unwrap();

        assert!(result.contains_key("root"));
        assert!(result.contains_key("root.outer"));
        assert!(result.contains_key("root.outer.inner"));
    }

    #[test]
    fn plurality_tie_keeps_lowest_offset() {
        // {"a":1} serialized; PairTokenizer pairs bytes, so the token
        // `:1` splits 1/1 between key (child) and value (child). Both bytes
        // carry the same path, categories tie, and the earlier Key byte wins.
        let doc = json!({"a": 1});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let result = tokenize_document(&doc, &schema, &PairTokenizer).unwrap();

        let serialized = serde_json::to_string(&doc).unwrap();
        assert_eq!(serialized, r#"{"a":1}"#);
        // tokens: {" | a" | :1 | }  — the :1 token ties and goes to Key
        let a = &result["root.a"];
        assert_eq!(a.schema_overhead + a.value_payload, 2);
        assert_eq!(a.value_payload, 0);
    }

    #[test]
    fn unknown_field_fails_loudly() {
        let known = json!({"a": 1});
        let schema = infer_schema(std::slice::from_ref(&known)).unwrap();
        let stray = json!({"a": 1, "b": 2});
        let err = tokenize_document(&stray, &schema, &ByteTokenizer).unwrap_err();
        assert!(matches!(err, EngineError::InternalConsistency(_)));
    }

    #[test]
    fn collect_gathers_leaf_values() {
        let doc = json!({"name": "Alice", "age": 30});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let values = collect_values(&doc, &schema);

        assert_eq!(values["root.name"], vec![json!("Alice")]);
        assert_eq!(values["root.age"], vec![json!(30)]);
    }

    #[test]
    fn collect_visits_array_items() {
        let doc = json!({"items": [{"x": 1}, {"x": 2}]});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let values = collect_values(&doc, &schema);

        assert_eq!(values["root.items[].x"], vec![json!(1), json!(2)]);
    }

    #[test]
    fn collect_skips_nulls() {
        let doc = json!({"x": null, "y": "present"});
        let schema = infer_schema(std::slice::from_ref(&doc)).unwrap();
        let values = collect_values(&doc, &schema);

        assert!(!values.contains_key("root.x"));
        assert_eq!(values["root.y"], vec![json!("present")]);
    }
}

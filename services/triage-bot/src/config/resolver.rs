//! Reference resolution
//!
//! Rewrites scalar strings of the exact form `${var.<key>}` with the value
//! stored under `<key>` in the document's data section. Lookups always read
//! the data section of the input document, so substituted values are never
//! resolved a second time.

use super::loader::Document;
use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};

/// Prefix marking a reference token
pub const REFERENCE_PREFIX: &str = "${var.";

/// Terminator of a reference token
pub const REFERENCE_SUFFIX: char = '}';

/// Extract the lookup key from a reference token.
///
/// Returns `None` unless the whole string is a token: it must start with
/// `${var.` and end with `}`. Nothing is interpolated inside larger strings.
pub fn reference_key(value: &str) -> Option<&str> {
    value
        .strip_prefix(REFERENCE_PREFIX)?
        .strip_suffix(REFERENCE_SUFFIX)
}

/// Resolve every reference token in `document` against its `data_key` section.
///
/// Missing keys leave the token in place. A missing or non-mapping data
/// section behaves like an empty one.
pub fn resolve(document: &Document, data_key: &str) -> Document {
    let data = match document.get(data_key) {
        Some(Value::Mapping(data)) => data.clone(),
        _ => Mapping::new(),
    };

    resolve_node(document, &data)
}

fn resolve_node(node: &Value, data: &Mapping) -> Value {
    match node {
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(key, value)| (key.clone(), resolve_node(value, data)))
                .collect(),
        ),
        Value::Sequence(items) => {
            Value::Sequence(items.iter().map(|item| resolve_node(item, data)).collect())
        }
        Value::String(text) => match reference_key(text).and_then(|key| data.get(key)) {
            Some(value) => value.clone(),
            None => node.clone(),
        },
        Value::Tagged(tagged) => Value::Tagged(Box::new(TaggedValue {
            tag: tagged.tag.clone(),
            value: resolve_node(&tagged.value, data),
        })),
        Value::Null | Value::Bool(_) | Value::Number(_) => node.clone(),
    }
}

/// List the reference tokens still present in `document`, in walk order
pub fn unresolved_references(document: &Document) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(document, &mut found);
    found
}

fn collect_references(node: &Value, found: &mut Vec<String>) {
    match node {
        Value::Mapping(map) => map.values().for_each(|value| collect_references(value, found)),
        Value::Sequence(items) => items.iter().for_each(|item| collect_references(item, found)),
        Value::String(text) if reference_key(text).is_some() => found.push(text.clone()),
        Value::Tagged(tagged) => collect_references(&tagged.value, found),
        _ => {}
    }
}

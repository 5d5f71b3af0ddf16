//! JSON content helpers.
//!
//! Persisted content and request bodies are carried as opaque strings; this
//! module gives the rest of the crate a uniform view over them: document
//! tests, the recursive merge used by append actions, dotted-path property
//! lookup (falling back to query-string parsing for non-JSON bodies), and
//! the envelope used to carry non-JSON items inside collection arrays.

use serde_json::Value;
use thiserror::Error;

/// Key wrapping non-JSON items when they are assembled into an array.
pub const NON_JSON_KEY: &str = "non_json_content";

/// Property lookup failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    /// The dotted path does not resolve inside the document
    #[error("no such property in the document")]
    Missing,
}

/// Whether a string parses as a JSON document (object or array). Scalar
/// parses do not count: appending `5` to `5` concatenates, it does not merge.
pub fn is_json_document(input: &str) -> bool {
    matches!(
        serde_json::from_str::<Value>(input),
        Ok(Value::Object(_)) | Ok(Value::Array(_))
    )
}

/// Merge two JSON values. Objects merge key-by-key and arrays merge
/// index-by-index, recursing while both sides stay objects (or both arrays);
/// any other combination takes the later value.
pub fn merge(base: &Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(base), Value::Object(patch)) => {
            let mut result = base.clone();
            for (key, value) in patch {
                let merged = match result.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                result.insert(key.clone(), merged);
            }
            Value::Object(result)
        }
        (Value::Array(base), Value::Array(patch)) => {
            let mut result = Vec::with_capacity(base.len().max(patch.len()));
            for i in 0..base.len().max(patch.len()) {
                let merged = match (base.get(i), patch.get(i)) {
                    (Some(existing), Some(value)) => merge(existing, value),
                    (Some(existing), None) => existing.clone(),
                    (None, Some(value)) => value.clone(),
                    (None, None) => break,
                };
                result.push(merged);
            }
            Value::Array(result)
        }
        _ => patch.clone(),
    }
}

/// Merge a sequence of JSON values, later documents winning conflicts.
pub fn merge_all<'a, I>(documents: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut iter = documents.into_iter();
    let Some(first) = iter.next() else {
        return Value::Null;
    };
    iter.fold(first.clone(), |acc, doc| merge(&acc, doc))
}

/// Resolve a dotted property path inside a body. JSON objects are descended
/// key-by-key; non-JSON input is parsed as a query string and the property
/// is looked up as a whole key. String leaves come back unquoted, everything
/// else as compact JSON.
pub fn get_property_value(input: &str, property: &str) -> Result<String, PropertyError> {
    if let Ok(value) = serde_json::from_str::<Value>(input) {
        if value.is_object() {
            return lookup(&value, property).map(render);
        }
    }

    let params = crate::matcher::parse_query_string(input);
    params
        .get(property)
        .and_then(|values| values.first())
        .cloned()
        .ok_or(PropertyError::Missing)
}

fn lookup<'a>(value: &'a Value, property: &str) -> Result<&'a Value, PropertyError> {
    let mut current = value;
    for key in property.split('.') {
        current = current
            .as_object()
            .and_then(|obj| obj.get(key))
            .ok_or(PropertyError::Missing)?;
    }
    Ok(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Wrap a non-JSON string in the `non_json_content` envelope so it can live
/// inside a collection array; JSON documents pass through.
pub fn wrap_non_json(input: &str) -> String {
    if is_json_document(input) {
        input.to_string()
    } else {
        serde_json::json!({ NON_JSON_KEY: input }).to_string()
    }
}

/// Undo [`wrap_non_json`]. Anything that is not a recognizable envelope
/// passes through unchanged.
pub fn unwrap_non_json(input: &str) -> String {
    if input.contains(NON_JSON_KEY) {
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(input) {
            if let Some(Value::String(content)) = obj.get(NON_JSON_KEY) {
                if !content.is_empty() {
                    return content.clone();
                }
            }
        }
    }
    input.to_string()
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Small helpers over [`Value`]: type predicates, a deep-copy merge and
//! whitespace normalisation.
//!
//! [`SequencerConfig`](crate::SequencerConfig) uses them to layer
//! configuration documents.

use serde_json::{Map, Value};

/// Returns the lowercase type name of `data`.
///
/// # Examples
///
/// ```
/// use sequencer_rs::tool::type_of;
/// use serde_json::json;
///
/// assert_eq!(type_of(&json!({})), "object");
/// assert_eq!(type_of(&json!([1])), "array");
/// assert_eq!(type_of(&json!(null)), "null");
/// ```
#[must_use]
pub fn type_of(data: &Value) -> &'static str {
    match data {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns `true` if the type of `data` is one of `types`.
#[must_use]
pub fn type_in(data: &Value, types: &[&str]) -> bool {
    types.contains(&type_of(data))
}

/// Returns `true` if `data` is a boolean.
#[inline]
#[must_use]
pub fn is_boolean(data: &Value) -> bool {
    data.is_boolean()
}

/// Returns `true` if `data` is a number.
#[inline]
#[must_use]
pub fn is_number(data: &Value) -> bool {
    data.is_number()
}

/// Returns `true` if `data` is a string.
#[inline]
#[must_use]
pub fn is_string(data: &Value) -> bool {
    data.is_string()
}

/// Returns `true` if `data` is an array.
#[inline]
#[must_use]
pub fn is_array(data: &Value) -> bool {
    data.is_array()
}

/// Returns `true` if `data` is an object.
#[inline]
#[must_use]
pub fn is_object(data: &Value) -> bool {
    data.is_object()
}

/// Merges every source into `target` and returns the result.
///
/// Merge rules, applied source by source:
/// - an object source turns a non-container target into an object, then each
///   of its keys is assigned a deep copy of the source value
/// - an array source turns a non-container target into an array, then its
///   elements are appended (or assigned by index key when the target is an
///   object)
/// - any other source replaces the target
///
/// Nested values are copied, not merged: a key present in both sides takes
/// the source value wholesale.
///
/// # Examples
///
/// ```
/// use sequencer_rs::tool::extend;
/// use serde_json::json;
///
/// let merged = extend(json!({ "a": 0 }), [json!({ "b": 1 }), json!({ "c": 2 })]);
/// assert_eq!(merged, json!({ "a": 0, "b": 1, "c": 2 }));
///
/// let merged = extend(json!(["a"]), [json!(["b"]), json!(["c", "d"])]);
/// assert_eq!(merged, json!(["a", "b", "c", "d"]));
/// ```
#[must_use]
pub fn extend<I>(target: Value, sources: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    sources.into_iter().fold(target, merge_one)
}

fn merge_one(target: Value, source: Value) -> Value {
    match source {
        Value::Object(entries) => {
            let mut map = match target {
                Value::Object(map) => map,
                Value::Array(items) => indexed(items),
                _ => Map::new(),
            };
            for (key, value) in entries {
                map.insert(key, extend(Value::Null, [value]));
            }
            Value::Object(map)
        }
        Value::Array(items) => match target {
            Value::Object(mut map) => {
                for (index, value) in items.into_iter().enumerate() {
                    map.insert(index.to_string(), extend(Value::Null, [value]));
                }
                Value::Object(map)
            }
            Value::Array(mut existing) => {
                existing.extend(items.into_iter().map(|v| extend(Value::Null, [v])));
                Value::Array(existing)
            }
            _ => Value::Array(items.into_iter().map(|v| extend(Value::Null, [v])).collect()),
        },
        scalar => scalar,
    }
}

fn indexed(items: Vec<Value>) -> Map<String, Value> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i.to_string(), v))
        .collect()
}

/// Collapses runs of whitespace into one space and strips both ends.
///
/// ```
/// use sequencer_rs::tool::trim;
///
/// assert_eq!(trim("  a   b c  "), "a b c");
/// ```
#[must_use]
pub fn trim(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Splits `s` on `sep` and trims every part with [`trim`].
///
/// Empty parts are dropped when `skip_empty` is set.
///
/// ```
/// use sequencer_rs::tool::split;
///
/// assert_eq!(split("  a ,   , c  ", ",", true), vec!["a", "c"]);
/// assert_eq!(split("  a ,   , c  ", ",", false), vec!["a", "", "c"]);
/// ```
#[must_use]
pub fn split(s: &str, sep: &str, skip_empty: bool) -> Vec<String> {
    s.split(sep)
        .map(trim)
        .filter(|part| !skip_empty || !part.is_empty())
        .collect()
}

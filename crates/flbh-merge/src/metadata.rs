//! Merging of replay `metadata.json` documents.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::MetadataError;

/// Key holding the list of recorded dimensions.
pub const DIMENSIONS_KEY: &str = "dimensions";

/// Key holding the human-readable description.
pub const DESCRIPTION_KEY: &str = "description";

/// Suffix appended to the merged description.
pub const MERGED_DESCRIPTION_SUFFIX: &str = " (merged replay)";

/// Merge `incoming` into a copy of `base` with the default description suffix.
///
/// See [`merge_metadata_with_suffix`].
pub fn merge_metadata(base: &Value, incoming: &Value) -> Result<Value, MetadataError> {
    merge_metadata_with_suffix(base, incoming, MERGED_DESCRIPTION_SUFFIX)
}

/// Merge `incoming` into a copy of `base`.
///
/// - `dimensions` arrays are unioned: base entries first, then incoming
///   entries not yet present, in first-seen order.
/// - If only `incoming` has `dimensions`, it is copied over.
/// - A string `description` gets `suffix` appended once.
/// - Every other field comes from `base`. `incoming` is never modified.
///
/// Fields of an unexpected type are left as they are, with a warning.
pub fn merge_metadata_with_suffix(
    base: &Value,
    incoming: &Value,
    suffix: &str,
) -> Result<Value, MetadataError> {
    let mut merged = base
        .as_object()
        .cloned()
        .ok_or(MetadataError::NotAnObject {
            found: json_kind(base),
        })?;

    if let Some(extra) = incoming.get(DIMENSIONS_KEY) {
        merge_dimensions(&mut merged, extra);
    }

    match merged.get_mut(DESCRIPTION_KEY) {
        Some(Value::String(description)) => description.push_str(suffix),
        Some(other) => {
            tracing::warn!(
                kind = json_kind(other),
                "description is not a string; left unchanged"
            );
        }
        None => {}
    }

    Ok(Value::Object(merged))
}

fn merge_dimensions(merged: &mut Map<String, Value>, extra: &Value) {
    if !merged.contains_key(DIMENSIONS_KEY) {
        merged.insert(DIMENSIONS_KEY.to_owned(), extra.clone());
        return;
    }
    match (merged.get_mut(DIMENSIONS_KEY), extra) {
        (Some(Value::Array(dims)), Value::Array(extra)) => {
            let mut seen: HashSet<String> = dims.iter().map(dimension_key).collect();
            for dim in extra {
                if seen.insert(dimension_key(dim)) {
                    dims.push(dim.clone());
                }
            }
        }
        _ => {
            tracing::warn!("dimensions is not an array in both documents; keeping base value");
        }
    }
}

/// Identity used for de-duplication: the string itself for string entries,
/// compact JSON text otherwise.
fn dimension_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

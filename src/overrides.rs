//! Deep merge of hand-written override fragments onto derived schemas.
//!
//! Overrides are merged last and win over derived values for the same key.
//! Scalar keys replace, `properties` and `additionalProperties` merge
//! key-wise recursively, and every other composite key (`oneOf`,
//! `required`, arrays in general) is replaced wholesale. The merge is
//! idempotent, so re-applying the same fragment changes nothing.

use crate::error::{Error, Result};
use crate::schema_generator::Schema;
use log::debug;
use serde_json::Value;

/// Apply an override fragment to a derived schema.
///
/// A fragment that is not a JSON object, or that merges into something no
/// longer recognizable as a schema, is a structural error and aborts the
/// pass.
pub fn apply_override(derived: Schema, fragment: &Value) -> Result<Schema> {
    if !fragment.is_object() {
        return Err(Error::StructuralError(format!(
            "override fragment must be a JSON object, got: {}",
            fragment
        )));
    }

    debug!("Applying override fragment onto derived schema");
    let derived_value = serde_json::to_value(&derived)?;
    let merged = merge_fragment(&derived_value, fragment);
    serde_json::from_value(merged).map_err(|e| {
        Error::StructuralError(format!("override produced an invalid schema: {}", e))
    })
}

/// Merge an override value over a derived value.
///
/// Only object-over-object merges recurse; any other pairing is a plain
/// replacement by the override.
pub fn merge_fragment(derived: &Value, overlay: &Value) -> Value {
    match (derived, overlay) {
        (Value::Object(derived_map), Value::Object(overlay_map)) => {
            let mut merged = derived_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match key.as_str() {
                    "properties" => merge_properties(derived_map.get(key), overlay_value),
                    "additionalProperties" => match derived_map.get(key) {
                        Some(derived_value) => merge_fragment(derived_value, overlay_value),
                        None => overlay_value.clone(),
                    },
                    _ => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

/// Merge two `properties` maps per property name, recursing into each
fn merge_properties(derived: Option<&Value>, overlay: &Value) -> Value {
    match (derived.and_then(Value::as_object), overlay.as_object()) {
        (Some(derived_map), Some(overlay_map)) => {
            let mut merged = derived_map.clone();
            for (name, overlay_value) in overlay_map {
                let value = match derived_map.get(name) {
                    Some(derived_value) => merge_fragment(derived_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(name.clone(), value);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

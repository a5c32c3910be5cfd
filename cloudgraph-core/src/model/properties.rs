//! Projection of decoded entities to flat node property maps.
//!
//! Graph stores only hold scalars and flat lists of scalars, so:
//! - membership collections in [`EXCLUDED_PROPERTIES`] are dropped (they become edges),
//! - nested key/value fields become a sorted `[k1, v1, k2, v2, ..]` list with
//!   empty values removed,
//! - nulls are dropped, and non-scalar list elements are stored as JSON text.

use serde::Serialize;
use serde_json::{Map, Value};

/// Flat property map persisted on a node or edge.
pub type Properties = Map<String, Value>;

/// Fields expressed as relationships rather than node attributes.
pub const EXCLUDED_PROPERTIES: &[&str] = &["members", "owners", "appRoles", "registeredUsers"];

/// Flatten a serializable entity into a node property map.
///
/// Returns `None` if the entity does not serialize to a JSON object.
pub fn project<T: Serialize>(entity: &T) -> Result<Option<Properties>, serde_json::Error> {
    let fields = match serde_json::to_value(entity)? {
        Value::Object(fields) => fields,
        _ => return Ok(None),
    };

    let mut properties = Properties::new();
    for (key, value) in fields {
        if EXCLUDED_PROPERTIES.contains(&key.as_str()) {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Object(map) => {
                properties.insert(key, Value::Array(flatten_map(map)));
            }
            Value::Array(items) => {
                let items = items
                    .into_iter()
                    .filter(|item| !item.is_null())
                    .map(scalarize)
                    .collect();
                properties.insert(key, Value::Array(items));
            }
            scalar => {
                properties.insert(key, scalar);
            }
        }
    }
    Ok(Some(properties))
}

/// Flatten a key/value structure to an alternating key/value sequence,
/// keys ascending, entries with empty (or null) values dropped.
pub fn flatten_map(map: Map<String, Value>) -> Vec<Value> {
    let mut entries: Vec<(String, String)> = map
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                other => other.to_string(),
            };
            (!text.is_empty()).then_some((key, text))
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    entries
        .into_iter()
        .flat_map(|(key, value)| [Value::String(key), Value::String(value)])
        .collect()
}

fn scalarize(value: Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => Value::String(value.to_string()),
        scalar => scalar,
    }
}

//! Optimistic patches over list and detail payloads
//!
//! Backend list endpoints return JSON arrays of objects carrying an `id`.
//! A key of the form `[resource, filter]` (e.g. `["tasks", "open"]`) is a
//! status-filtered list, so an item whose new status no longer matches the
//! filter is removed from it.

use std::sync::Arc;

use afasa_domain::{KeyPart, QueryKey};
use serde_json::{Map, Value};

use crate::sync::Patch;

fn item_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn status_filter(key: &QueryKey) -> Option<&str> {
    match key.parts().get(1) {
        Some(KeyPart::Str(filter)) => Some(filter.as_str()),
        _ => None,
    }
}

/// Apply `update` to the item with `id`, whether `value` is a list or a
/// single object. Items for which `update` returns `false` are removed from
/// lists; a single object is always kept.
fn update_item<F>(value: &Value, id: &str, update: F) -> Value
where
    F: Fn(&mut Map<String, Value>) -> bool,
{
    let apply = |item: &Value| -> (Value, bool) {
        let mut item = item.clone();
        let keep = match &mut item {
            Value::Object(fields) => update(fields),
            _ => true,
        };
        (item, keep)
    };

    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter_map(|item| {
                    if item_id(item).as_deref() == Some(id) {
                        let (item, keep) = apply(item);
                        keep.then_some(item)
                    } else {
                        Some(item.clone())
                    }
                })
                .collect(),
        ),
        Value::Object(_) if item_id(value).as_deref() == Some(id) => apply(value).0,
        other => other.clone(),
    }
}

/// Move item `id` to `status`
pub fn transition_status(id: impl Into<String>, status: impl Into<String>) -> Patch {
    let id = id.into();
    let status = status.into();
    Arc::new(move |key, value| {
        let keep = status_filter(key).is_none_or(|filter| filter == status);
        update_item(value, &id, |fields| {
            fields.insert("status".to_string(), Value::String(status.clone()));
            keep
        })
    })
}

/// Set one field on item `id`
pub fn set_field(id: impl Into<String>, field: impl Into<String>, new_value: Value) -> Patch {
    let id = id.into();
    let field = field.into();
    Arc::new(move |_, value| {
        update_item(value, &id, |fields| {
            fields.insert(field.clone(), new_value.clone());
            true
        })
    })
}

/// Shallow-merge `changes` into an object payload such as settings
pub fn merge_object(changes: Value) -> Patch {
    Arc::new(move |_, value| match (value, &changes) {
        (Value::Object(current), Value::Object(changes)) => {
            let mut merged = current.clone();
            merged.extend(changes.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(merged)
        }
        _ => value.clone(),
    })
}

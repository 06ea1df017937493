//! Helpers for reading and writing nested JSON trees the way the realtime
//! database stores them: writing `null` deletes, and objects left empty by a
//! deletion disappear.

use serde_json::{Map, Value};

pub(crate) fn read_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(segment)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Direct children of the node at `segments`, empty when absent or a leaf.
pub(crate) fn children_at(root: &Value, segments: &[String]) -> Map<String, Value> {
    read_at(root, segments)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn write_at(root: &mut Value, segments: &[String], value: Value) {
    let value = prune(value);
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    if value.is_null() {
        remove_at(root, parents, last);
        return;
    }

    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    ensure_object(node).insert(last.clone(), value);
}

fn remove_at(root: &mut Value, parents: &[String], last: &str) {
    let Some(object) = object_at_mut(root, parents) else {
        return;
    };
    object.remove(last);
    if !object.is_empty() {
        return;
    }
    if let Some((parent_last, grand_parents)) = parents.split_last() {
        remove_at(root, grand_parents, parent_last);
    }
}

fn object_at_mut<'a>(root: &'a mut Value, segments: &[String]) -> Option<&'a mut Map<String, Value>> {
    let mut node = root;
    for segment in segments {
        node = node.as_object_mut()?.get_mut(segment)?;
    }
    node.as_object_mut()
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

/// Drops `null` members and empty objects, which the database never stores.
fn prune(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, prune(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if pruned.is_empty() {
                Value::Null
            } else {
                Value::Object(pruned)
            }
        }
        other => other,
    }
}

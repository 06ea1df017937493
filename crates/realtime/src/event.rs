use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of change reported for a direct child of a listened location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildEventKind {
    Added,
    Changed,
    Removed,
}

impl ChildEventKind {
    /// Added and changed, the kinds an upsert-style listener cares about.
    pub const UPSERTS: [ChildEventKind; 2] = [ChildEventKind::Added, ChildEventKind::Changed];
}

impl std::fmt::Display for ChildEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChildEventKind::Added => "child_added",
            ChildEventKind::Changed => "child_changed",
            ChildEventKind::Removed => "child_removed",
        };
        write!(f, "{}", s)
    }
}

/// A change to one direct child of a listened location. `value` is the full
/// snapshot of the child after the change (the previous value for removals).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildEvent {
    pub kind: ChildEventKind,
    pub key: String,
    pub value: Value,
}

/// Payload of a `put` or `patch` frame on the Firebase event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamMessage {
    pub path: String,
    pub data: Value,
}

/// Child events needed to go from `before` to `after`, in key order of
/// `after` followed by removals.
pub fn diff_children(before: &Map<String, Value>, after: &Map<String, Value>) -> Vec<ChildEvent> {
    let mut events = Vec::new();
    for (key, value) in after {
        match before.get(key) {
            None => events.push(ChildEvent {
                kind: ChildEventKind::Added,
                key: key.clone(),
                value: value.clone(),
            }),
            Some(previous) if previous != value => events.push(ChildEvent {
                kind: ChildEventKind::Changed,
                key: key.clone(),
                value: value.clone(),
            }),
            Some(_) => {}
        }
    }
    for (key, previous) in before {
        if !after.contains_key(key) {
            events.push(ChildEvent {
                kind: ChildEventKind::Removed,
                key: key.clone(),
                value: previous.clone(),
            });
        }
    }
    events
}

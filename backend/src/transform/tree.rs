//! Output tree construction.
//!
//! Trees are plain `serde_json` objects owned by one record's
//! transformation. Containers are only created by these writers, never as a
//! side effect of reading.

use serde_json::{Map, Value};

use crate::mapping::FieldPath;

/// What a write had to destroy to make room for containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeWrite {
    /// Slash paths of non-object values replaced by objects.
    pub overwritten: Vec<String>,
}

impl TreeWrite {
    pub fn is_clean(&self) -> bool {
        self.overwritten.is_empty()
    }
}

/// Merge `key: value` into the object at `path`, creating objects along the
/// way. Other keys already in that object are kept.
pub fn insert_scalar(tree: &mut Map<String, Value>, path: &FieldPath, key: &str, value: Value) -> TreeWrite {
    let mut write = TreeWrite::default();
    let container = descend(tree, path.segments(), &mut write);
    container.insert(key.to_string(), value);
    write
}

/// Replace whatever is at `path` with the array `items`.
pub fn insert_list(tree: &mut Map<String, Value>, path: &FieldPath, items: Vec<Value>) -> TreeWrite {
    let mut write = TreeWrite::default();
    let parent = descend(tree, path.parents(), &mut write);
    parent.insert(path.leaf().to_string(), Value::Array(items));
    write
}

fn descend<'t>(
    mut node: &'t mut Map<String, Value>,
    segments: &[String],
    write: &mut TreeWrite,
) -> &'t mut Map<String, Value> {
    for (depth, segment) in segments.iter().enumerate() {
        let slot = node
            .entry(segment.as_str())
            .or_insert_with(|| Value::Object(Map::new()));

        if !slot.is_object() {
            write.overwritten.push(segments[..=depth].join("/"));
            *slot = Value::Object(Map::new());
        }

        node = match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot holds an object after the check above"),
        };
    }
    node
}

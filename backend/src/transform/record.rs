//! Per-record transformation.
//!
//! One pass over the mapping rules in table order, then one finishing pass
//! over list groups. No state survives between records.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::ops::AddAssign;
use tracing::{debug, trace, warn};

use super::coerce::{coerce, Fallback, ValueSource};
use super::resolve::{resolve_list, resolve_scalar};
use super::tree::{insert_list, insert_scalar, TreeWrite};
use crate::mapping::{MappingTable, RuleKind};
use crate::models::Record;

/// How the fields of one or more records were resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    /// Values converted from a cell.
    pub raw: usize,
    /// Values taken from a mapping default.
    pub mapping_default: usize,
    /// Values that fell back to the datatype default.
    pub datatype_default: usize,
    /// Cells or mapping defaults that failed conversion (subset of `datatype_default`).
    pub unconvertible: usize,
    /// Tree nodes clobbered by path conflicts.
    pub overwritten_nodes: usize,
}

impl ResolutionStats {
    fn count(&mut self, source: ValueSource) {
        match source {
            ValueSource::Raw => self.raw += 1,
            ValueSource::MappingDefault => self.mapping_default += 1,
            ValueSource::DatatypeDefault(why) => {
                self.datatype_default += 1;
                if why != Fallback::Absent {
                    self.unconvertible += 1;
                }
            }
        }
    }

    fn note(&mut self, write: TreeWrite) {
        for node in &write.overwritten {
            warn!(node = %node, "overwrote a non-object value to make room for a container");
        }
        self.overwritten_nodes += write.overwritten.len();
    }
}

impl AddAssign for ResolutionStats {
    fn add_assign(&mut self, other: Self) {
        self.raw += other.raw;
        self.mapping_default += other.mapping_default;
        self.datatype_default += other.datatype_default;
        self.unconvertible += other.unconvertible;
        self.overwritten_nodes += other.overwritten_nodes;
    }
}

/// One transformed document.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutput {
    pub document: Value,
    pub stats: ResolutionStats,
}

/// Values collected for one list group before items are assembled.
#[derive(Default)]
struct ListAccumulator {
    max_index: usize,
    values: HashMap<(usize, String), Value>,
}

/// Transform a single record into its output document.
pub fn transform_record(table: &MappingTable, record: &Record) -> RecordOutput {
    let mut tree = Map::new();
    let mut stats = ResolutionStats::default();
    let mut lists: Vec<ListAccumulator> = table.groups().iter().map(|_| ListAccumulator::default()).collect();

    for entry in table.entries() {
        let rule = entry.rule();
        match (rule.kind, entry.group()) {
            (RuleKind::List, Some(group)) => {
                let acc = &mut lists[group];
                for hit in resolve_list(entry, record, table.max_list_len()) {
                    acc.max_index = acc.max_index.max(hit.index);

                    let Some(column) = hit.column else {
                        continue;
                    };
                    let slot = (hit.index, hit.key);
                    if acc.values.contains_key(&slot) {
                        debug!(column = %column.name, index = slot.0, key = %slot.1, "duplicate list column ignored");
                        continue;
                    }

                    let coerced = coerce(Some(&column.value), &rule.datatype, rule.default.as_deref());
                    trace!(column = %column.name, index = slot.0, source = ?coerced.source, "list value");
                    stats.count(coerced.source);
                    acc.values.insert(slot, coerced.value);
                }
            }
            _ => {
                let hit = resolve_scalar(rule, record);
                let coerced = coerce(hit.map(|h| &h.column.value), &rule.datatype, rule.default.as_deref());
                trace!(
                    column = hit.map(|h| h.column.name.as_str()).unwrap_or("<none>"),
                    path = %rule.path,
                    source = ?coerced.source,
                    "scalar value"
                );
                stats.count(coerced.source);
                stats.note(insert_scalar(&mut tree, &rule.path, &rule.variable, coerced.value));
            }
        }
    }

    for (group, mut acc) in table.groups().iter().zip(lists) {
        let mut items = Vec::with_capacity(acc.max_index + 1);

        for index in 0..=acc.max_index {
            let mut item = Map::new();
            for &rule_idx in &group.rules {
                let rule = table.entries()[rule_idx].rule();
                let key = rule.item_key(index + 1);
                if item.contains_key(&key) {
                    continue;
                }

                let value = match acc.values.remove(&(index, key.clone())) {
                    Some(value) => value,
                    None => {
                        let coerced = coerce(None, &rule.datatype, rule.default.as_deref());
                        stats.count(coerced.source);
                        coerced.value
                    }
                };
                item.insert(key, value);
            }
            items.push(Value::Object(item));
        }

        stats.note(insert_list(&mut tree, &group.path, items));
    }

    RecordOutput {
        document: Value::Object(tree),
        stats,
    }
}

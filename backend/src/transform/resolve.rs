//! Column resolution: which cells of a record feed which rule.

use tracing::warn;

use crate::mapping::{ColumnPattern, MappingRule, RuleEntry};
use crate::models::{Column, Record};

/// The column a scalar rule resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalarHit<'r> {
    pub column: &'r Column,
    /// Found through the rule's alias rather than `prefix + variable`.
    pub via_alias: bool,
}

/// Find the column for a scalar rule: exact `prefix + variable`, else the
/// alias. Matching ignores case. A present-but-blank primary column still
/// counts as found.
pub fn resolve_scalar<'r>(rule: &MappingRule, record: &'r Record) -> Option<ScalarHit<'r>> {
    let primary = rule.column_name();
    if !primary.is_empty() {
        if let Some(column) = record.column(&primary) {
            return Some(ScalarHit {
                column,
                via_alias: false,
            });
        }
    }

    rule.alias
        .as_deref()
        .and_then(|alias| record.column(alias))
        .map(|column| ScalarHit {
            column,
            via_alias: true,
        })
}

/// One list position a list rule resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ListHit<'r> {
    /// 0-based list index.
    pub index: usize,
    /// Item field key at this index.
    pub key: String,
    /// Backing column; `None` for the synthetic "use default" hit.
    pub column: Option<&'r Column>,
}

/// Find every numbered column of a list rule.
///
/// The primary pattern is tried first; the alias pattern only when the
/// primary matches no column at all. Position 0 and positions above
/// `max_len` are then dropped with a warning. With no hit left a single
/// synthetic hit at index 0 is returned, so a list is never empty.
pub fn resolve_list<'r>(entry: &RuleEntry, record: &'r Record, max_len: usize) -> Vec<ListHit<'r>> {
    let rule = entry.rule();

    let matches = match entry.patterns() {
        Some(patterns) => {
            let primary = matching_columns(&patterns.primary, record);
            match &patterns.alias {
                Some(alias) if primary.is_empty() => matching_columns(alias, record),
                _ => primary,
            }
        }
        None => Vec::new(),
    };

    let mut hits: Vec<ListHit<'r>> = matches
        .into_iter()
        .filter_map(|(position, column)| {
            if position == 0 || position > max_len {
                warn!(
                    column = %column.name,
                    position,
                    max_len,
                    "ignoring list column outside 1..=max_list_len"
                );
                return None;
            }
            Some(ListHit {
                index: position - 1,
                key: rule.item_key(position),
                column: Some(column),
            })
        })
        .collect();

    if hits.is_empty() {
        hits.push(ListHit {
            index: 0,
            key: rule.item_key(1),
            column: None,
        });
    }

    hits
}

fn matching_columns<'r>(pattern: &ColumnPattern, record: &'r Record) -> Vec<(usize, &'r Column)> {
    record
        .columns()
        .filter_map(|column| pattern.position(&column.name).map(|position| (position, column)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{FieldPath, MappingTable};

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    fn table(rule: MappingRule) -> MappingTable {
        MappingTable::new(vec![rule]).unwrap()
    }

    fn indices(hits: &[ListHit<'_>]) -> Vec<usize> {
        hits.iter().map(|h| h.index).collect()
    }

    #[test]
    fn test_scalar_exact_match_ignores_case() {
        let rule = MappingRule::scalar("Name", path("customer"));
        let record = Record::new().with("NAME", "Acme").with("name2", "x");

        let hit = resolve_scalar(&rule, &record).unwrap();
        assert_eq!(hit.column.name, "NAME");
        assert!(!hit.via_alias);
    }

    #[test]
    fn test_scalar_uses_prefix() {
        let rule = MappingRule::scalar("name", path("customer")).with_prefix("cust_");
        let record = Record::new().with("name", "wrong").with("Cust_Name", "Acme");

        assert_eq!(resolve_scalar(&rule, &record).unwrap().column.name, "Cust_Name");
    }

    #[test]
    fn test_scalar_alias_only_when_primary_absent() {
        let rule = MappingRule::scalar("name", path("customer")).with_alias("client");

        let record = Record::new().with("client", "Acme");
        let hit = resolve_scalar(&rule, &record).unwrap();
        assert!(hit.via_alias);

        let record = Record::new().with("name", "").with("client", "Acme");
        let hit = resolve_scalar(&rule, &record).unwrap();
        assert!(!hit.via_alias);

        assert!(resolve_scalar(&rule, &Record::new().with("other", "x")).is_none());
    }

    #[test]
    fn test_list_hits_positions() {
        let table = table(MappingRule::list("item", "amt", path("cart/items")));
        let record = Record::new()
            .with("item1amt", "10")
            .with("item3amt", "30")
            .with("item2qty", "7")
            .with("name", "Acme");

        let hits = resolve_list(&table.entries()[0], &record, 100);
        assert_eq!(indices(&hits), vec![0, 2]);
        assert!(hits.iter().all(|h| h.key == "itemamt"));
        assert_eq!(hits[1].column.unwrap().name, "item3amt");
    }

    #[test]
    fn test_list_no_match_gives_synthetic_hit() {
        let table = table(MappingRule::list("item", "amt", path("cart/items")));
        let record = Record::new().with("name", "Acme");
        let hits = resolve_list(&table.entries()[0], &record, 100);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index, 0);
        assert_eq!(hits[0].key, "itemamt");
        assert!(hits[0].column.is_none());
    }

    #[test]
    fn test_list_alias_when_primary_empty() {
        let table = table(MappingRule::list("item", "amt", path("cart/items")).with_alias("line"));

        let record = Record::new().with("line1amt", "5").with("line2", "6");
        let hits = resolve_list(&table.entries()[0], &record, 100);
        assert_eq!(indices(&hits), vec![0, 1]);

        // primary wins outright once it matches anything
        let record = Record::new().with("item2amt", "5").with("line1amt", "6");
        let hits = resolve_list(&table.entries()[0], &record, 100);
        assert_eq!(indices(&hits), vec![1]);
    }

    #[test]
    fn test_positional_keys() {
        let table = table(MappingRule::list("Driver", "", path("quote/drivers")));
        let record = Record::new().with("driver1", "Ann").with("driver_2", "Bob");

        let hits = resolve_list(&table.entries()[0], &record, 100);
        let keys: Vec<&str> = hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["driver1", "driver2"]);
    }

    #[test]
    fn test_out_of_range_positions_ignored() {
        let table = table(MappingRule::list("item", "", path("cart/items")));
        let record = Record::new().with("item0", "a").with("item2", "b").with("item500", "c");

        let hits = resolve_list(&table.entries()[0], &record, 10);
        assert_eq!(indices(&hits), vec![1]);
    }

    #[test]
    fn test_column_above_max_len_dropped() {
        let table = table(MappingRule::list("item", "amt", path("cart/items")));
        let record = Record::new().with("item1amt", "10").with("item1001amt", "99");

        let hits = resolve_list(&table.entries()[0], &record, 1000);
        assert_eq!(indices(&hits), vec![0]);
        assert_eq!(hits[0].column.unwrap().name, "item1amt");
    }

    #[test]
    fn test_out_of_range_primary_still_blocks_alias() {
        let table = table(MappingRule::list("item", "amt", path("cart/items")).with_alias("line"));
        let record = Record::new().with("item50amt", "5").with("line1amt", "6");

        let hits = resolve_list(&table.entries()[0], &record, 10);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].column.is_none());
    }
}

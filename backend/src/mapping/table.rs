//! The compiled, immutable mapping table shared by every record.

use serde::Serialize;
use std::fmt;

use super::pattern::ListPatterns;
use super::rule::{FieldPath, MappingRule, RuleKind};
use crate::error::{MappingError, MappingResult};

/// Default cap on list length derived from column numbers.
pub const DEFAULT_MAX_LIST_LEN: usize = 1000;

/// A rule plus everything precomputed for it at load time.
#[derive(Debug, Clone)]
pub struct RuleEntry {
    rule: MappingRule,
    /// 1-based mapping row this rule came from.
    row: usize,
    patterns: Option<ListPatterns>,
    group: Option<usize>,
}

impl RuleEntry {
    pub fn rule(&self) -> &MappingRule {
        &self.rule
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// Compiled column patterns (list rules only).
    pub fn patterns(&self) -> Option<&ListPatterns> {
        self.patterns.as_ref()
    }

    /// Index of this rule's list group (list rules only).
    pub fn group(&self) -> Option<usize> {
        self.group
    }
}

/// All list rules that share one path.
#[derive(Debug, Clone)]
pub struct ListGroup {
    pub path: FieldPath,
    /// Indices into [`MappingTable::entries`], in table order.
    pub rules: Vec<usize>,
}

/// How two rules' paths collide in the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The path walks through a value written by a scalar rule.
    ThroughScalar,
    /// The path walks into a container that a list rule replaces.
    ThroughList,
    /// A scalar container that a list rule at the same path replaces.
    ShadowedByList,
}

/// Two rules whose writes overwrite each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathConflict {
    /// Row of the rule whose output is lost or clobbered.
    pub row: usize,
    pub path: String,
    /// Row of the rule it collides with.
    pub other_row: usize,
    pub other_path: String,
    pub kind: ConflictKind,
}

impl fmt::Display for PathConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            ConflictKind::ThroughScalar => "walks through the scalar value written by",
            ConflictKind::ThroughList => "walks into the list written by",
            ConflictKind::ShadowedByList => "is replaced by the list written by",
        };
        write!(
            f,
            "row {} ('{}') {} row {} ('{}')",
            self.row, self.path, what, self.other_row, self.other_path
        )
    }
}

/// Ordered mapping rules with compiled patterns and list groups.
#[derive(Debug, Clone)]
pub struct MappingTable {
    entries: Vec<RuleEntry>,
    groups: Vec<ListGroup>,
    max_list_len: usize,
}

impl MappingTable {
    /// Build a table from rules in mapping order. Rows are numbered from 1.
    pub fn new(rules: Vec<MappingRule>) -> MappingResult<Self> {
        Self::from_numbered(rules.into_iter().enumerate().map(|(i, r)| (i + 1, r)))
    }

    /// Build a table from `(row, rule)` pairs.
    pub fn from_numbered(rules: impl IntoIterator<Item = (usize, MappingRule)>) -> MappingResult<Self> {
        let mut entries = Vec::new();
        let mut groups: Vec<ListGroup> = Vec::new();

        for (row, rule) in rules {
            let (patterns, group) = match rule.kind {
                RuleKind::Scalar => (None, None),
                RuleKind::List => {
                    let patterns = ListPatterns::compile(&rule.prefix, &rule.variable, rule.alias.as_deref())
                        .map_err(|source| MappingError::Pattern { row, source })?;

                    let group = match groups.iter().position(|g| g.path == rule.path) {
                        Some(pos) => pos,
                        None => {
                            groups.push(ListGroup {
                                path: rule.path.clone(),
                                rules: Vec::new(),
                            });
                            groups.len() - 1
                        }
                    };
                    groups[group].rules.push(entries.len());
                    (Some(patterns), Some(group))
                }
            };

            entries.push(RuleEntry {
                rule,
                row,
                patterns,
                group,
            });
        }

        if entries.is_empty() {
            return Err(MappingError::NoRules);
        }

        Ok(Self {
            entries,
            groups,
            max_list_len: DEFAULT_MAX_LIST_LEN,
        })
    }

    /// Cap list positions; columns numbered above `max` are ignored.
    pub fn with_max_list_len(mut self, max: usize) -> Self {
        self.max_list_len = max.max(1);
        self
    }

    pub fn entries(&self) -> &[RuleEntry] {
        &self.entries
    }

    pub fn rules(&self) -> impl Iterator<Item = &MappingRule> {
        self.entries.iter().map(|e| &e.rule)
    }

    pub fn groups(&self) -> &[ListGroup] {
        &self.groups
    }

    pub fn max_list_len(&self) -> usize {
        self.max_list_len
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs of rules whose writes clobber each other.
    ///
    /// The transformer still resolves these by overwriting; this is the
    /// load-time report of that.
    pub fn path_conflicts(&self) -> Vec<PathConflict> {
        let mut conflicts = Vec::new();

        for blocker in &self.entries {
            let b = &blocker.rule;
            for victim in &self.entries {
                if std::ptr::eq(blocker, victim) {
                    continue;
                }
                let v = &victim.rule;

                let kind = match b.kind {
                    RuleKind::Scalar => {
                        // the scalar lives at b.path + [variable]
                        let mut scalar_at = b.path.segments().to_vec();
                        scalar_at.push(b.variable.clone());
                        v.path.starts_with(&scalar_at).then_some(ConflictKind::ThroughScalar)
                    }
                    RuleKind::List => {
                        if v.path.len() > b.path.len() && v.path.starts_with(b.path.segments()) {
                            Some(ConflictKind::ThroughList)
                        } else if v.kind == RuleKind::Scalar && v.path == b.path {
                            Some(ConflictKind::ShadowedByList)
                        } else {
                            None
                        }
                    }
                };

                if let Some(kind) = kind {
                    conflicts.push(PathConflict {
                        row: victim.row,
                        path: v.path.to_string(),
                        other_row: blocker.row,
                        other_path: b.path.to_string(),
                        kind,
                    });
                }
            }
        }

        conflicts.sort_by_key(|c| (c.row, c.other_row));
        // several list rules in one group report the same victim once
        conflicts.dedup_by(|a, b| a.row == b.row && a.other_path == b.other_path && a.kind == b.kind);
        conflicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::rule::DataType;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn test_groups_by_path_in_first_seen_order() {
        let table = MappingTable::new(vec![
            MappingRule::list("drv", "name", path("quote/drivers")),
            MappingRule::scalar("ref", path("quote")),
            MappingRule::list("veh", "make", path("quote/vehicles")),
            MappingRule::list("drv", "age", path("quote/drivers")).with_datatype(DataType::Number),
        ])
        .unwrap();

        assert_eq!(table.groups().len(), 2);
        assert_eq!(table.groups()[0].path.to_string(), "quote/drivers");
        assert_eq!(table.groups()[0].rules, vec![0, 3]);
        assert_eq!(table.groups()[1].rules, vec![2]);
        assert_eq!(table.entries()[1].group(), None);
        assert!(table.entries()[1].patterns().is_none());
        assert_eq!(table.entries()[3].row(), 4);
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(MappingTable::new(vec![]), Err(MappingError::NoRules)));
    }

    #[test]
    fn test_no_conflicts_for_sibling_paths() {
        let table = MappingTable::new(vec![
            MappingRule::scalar("name", path("customer")),
            MappingRule::scalar("city", path("customer/address")),
            MappingRule::list("item", "amt", path("cart/items")),
        ])
        .unwrap();
        assert!(table.path_conflicts().is_empty());
    }

    #[test]
    fn test_conflict_through_scalar() {
        let table = MappingTable::new(vec![
            MappingRule::scalar("name", path("customer")),
            MappingRule::scalar("first", path("customer/name")),
        ])
        .unwrap();

        let conflicts = table.path_conflicts();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].row, 2);
        assert_eq!(conflicts[0].other_row, 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ThroughScalar);
        assert!(conflicts[0].to_string().contains("row 2 ('customer/name')"));
    }

    #[test]
    fn test_conflicts_with_lists() {
        let table = MappingTable::new(vec![
            MappingRule::scalar("total", path("cart/items")),
            MappingRule::list("item", "amt", path("cart/items")),
            MappingRule::list("item", "qty", path("cart/items")),
            MappingRule::scalar("note", path("cart/items/meta")),
        ])
        .unwrap();

        let conflicts = table.path_conflicts();
        assert_eq!(conflicts.len(), 2);
        assert_eq!(conflicts[0].row, 1);
        assert_eq!(conflicts[0].kind, ConflictKind::ShadowedByList);
        assert_eq!(conflicts[1].row, 4);
        assert_eq!(conflicts[1].kind, ConflictKind::ThroughList);
    }

    #[test]
    fn test_max_list_len_floor() {
        let table = MappingTable::new(vec![MappingRule::scalar("a", path("x"))])
            .unwrap()
            .with_max_list_len(0);
        assert_eq!(table.max_list_len(), 1);
    }
}

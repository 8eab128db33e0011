//! Mapping rule definition.
//!
//! A rule says where a value comes from (column name or indexed column
//! pattern) and where it goes (a slash-delimited path in the output tree).

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Whether a rule maps one column or a family of numbered columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    /// One column, one value.
    Scalar,
    /// Numbered columns (`item1`, `item_2`, ...) forming a list.
    List,
}

impl RuleKind {
    /// `list` (any case) is a list rule; anything else is scalar.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("list") {
            RuleKind::List
        } else {
            RuleKind::Scalar
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Scalar => "scalar",
            RuleKind::List => "list",
        }
    }
}

/// Declared datatype of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    String,
    Number,
    Boolean,
    Date,
    /// Unrecognized type name: values pass through untouched.
    Untyped(String),
}

impl DataType {
    /// Parse a mapping-table datatype name (trimmed, case-insensitive).
    pub fn parse(raw: &str) -> Self {
        let name = raw.trim().to_lowercase();
        match name.as_str() {
            "string" => DataType::String,
            "number" => DataType::Number,
            "boolean" => DataType::Boolean,
            "date" => DataType::Date,
            _ => DataType::Untyped(name),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Untyped(name) => name,
        }
    }

    /// Value used when neither the cell nor the mapping default yields one.
    pub fn default_value(&self) -> Value {
        match self {
            DataType::String | DataType::Date => Value::String(String::new()),
            DataType::Number => Value::from(0),
            DataType::Boolean => Value::Bool(false),
            DataType::Untyped(_) => Value::Null,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a path string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,
    #[error("path '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// A non-empty, slash-delimited location in the output tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse `a/b/c`. Segments are trimmed; empty paths and empty segments
    /// are rejected.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments: Vec<String> = raw.split('/').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(PathError::EmptySegment(raw.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Every segment but the last.
    pub fn parents(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// The last segment: the container this path's rules write into.
    pub fn leaf(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Never true for a parsed path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True if `prefix`'s segments are a leading run of this path's segments.
    pub fn starts_with(&self, prefix: &[String]) -> bool {
        self.segments.len() >= prefix.len() && self.segments[..prefix.len()] == *prefix
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// One mapping-table row.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRule {
    pub kind: RuleKind,
    /// Base field name. May be empty for positional list rules.
    pub variable: String,
    /// Prepended to `variable` for both column matching and list item keys.
    pub prefix: String,
    /// Container location in the output tree.
    pub path: FieldPath,
    pub datatype: DataType,
    /// Secondary column name ("samed") tried when the primary finds nothing.
    pub alias: Option<String>,
    /// Literal fallback used when the cell is absent or blank.
    pub default: Option<String>,
}

impl MappingRule {
    /// A scalar string rule reading column `variable`.
    pub fn scalar(variable: &str, path: FieldPath) -> Self {
        Self {
            kind: RuleKind::Scalar,
            variable: variable.to_string(),
            prefix: String::new(),
            path,
            datatype: DataType::String,
            alias: None,
            default: None,
        }
    }

    /// A list string rule matching columns `<prefix><n><variable>`.
    pub fn list(prefix: &str, variable: &str, path: FieldPath) -> Self {
        Self {
            kind: RuleKind::List,
            prefix: prefix.to_string(),
            ..Self::scalar(variable, path)
        }
    }

    pub fn with_datatype(mut self, datatype: DataType) -> Self {
        self.datatype = datatype;
        self
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = non_blank(alias);
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = non_blank(default);
        self
    }

    /// Column a scalar rule reads: `prefix + variable`.
    pub fn column_name(&self) -> String {
        format!("{}{}", self.prefix, self.variable)
    }

    /// Output key of a list item field at 1-based `position`.
    ///
    /// Constant `prefix + variable` when a variable is set, otherwise
    /// positional `prefix + position`. Always lower-case.
    pub fn item_key(&self, position: usize) -> String {
        if self.variable.trim().is_empty() {
            format!("{}{}", self.prefix, position).to_lowercase()
        } else {
            format!("{}{}", self.prefix, self.variable).to_lowercase()
        }
    }
}

pub(crate) fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_parsing() {
        let path = FieldPath::parse(" cart / items ").unwrap();
        assert_eq!(path.segments(), ["cart", "items"]);
        assert_eq!(path.parents(), ["cart"]);
        assert_eq!(path.leaf(), "items");
        assert_eq!(path.to_string(), "cart/items");

        assert_eq!(FieldPath::parse("  "), Err(PathError::Empty));
        assert!(matches!(FieldPath::parse("a//b"), Err(PathError::EmptySegment(_))));
        assert!(matches!(FieldPath::parse("a/"), Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn test_datatype_parsing() {
        assert_eq!(DataType::parse(" Number "), DataType::Number);
        assert_eq!(DataType::parse("BOOLEAN"), DataType::Boolean);
        assert_eq!(DataType::parse("currency"), DataType::Untyped("currency".into()));
        assert_eq!(DataType::Number.default_value(), Value::from(0));
        assert_eq!(DataType::Date.default_value(), Value::String(String::new()));
        assert_eq!(DataType::Untyped("x".into()).default_value(), Value::Null);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(RuleKind::parse("List"), RuleKind::List);
        assert_eq!(RuleKind::parse(""), RuleKind::Scalar);
        assert_eq!(RuleKind::parse("single"), RuleKind::Scalar);
    }

    #[test]
    fn test_item_keys() {
        let path = FieldPath::parse("cart/items").unwrap();
        let named = MappingRule::list("Item", "Amt", path.clone());
        assert_eq!(named.item_key(1), "itemamt");
        assert_eq!(named.item_key(7), "itemamt");

        let positional = MappingRule::list("Driver", "", path);
        assert_eq!(positional.item_key(3), "driver3");
    }

    #[test]
    fn test_blank_alias_and_default_are_unset() {
        let rule = MappingRule::scalar("name", FieldPath::parse("customer").unwrap())
            .with_alias("  ")
            .with_default("");
        assert!(rule.alias.is_none());
        assert!(rule.default.is_none());
    }
}

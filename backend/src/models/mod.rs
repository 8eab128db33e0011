//! Input-side domain models.
//!
//! - [`CellValue`] - a raw cell: text, number, or nothing
//! - [`Record`] - one input row with case-insensitive column lookup
//!
//! Column names are lower-cased once when a record is built, so the
//! transformer never re-normalizes names per mapping rule.

use serde_json::{Map, Number, Value};
use std::collections::HashMap;

// =============================================================================
// Cell Value
// =============================================================================

/// A raw cell value as read from the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Textual cell (CSV cells are always text).
    Text(String),
    /// Numeric cell (JSON inputs may carry numbers).
    Number(f64),
    /// Missing cell.
    Empty,
}

impl CellValue {
    /// Build a cell from a JSON scalar.
    ///
    /// Booleans become their text form; nested arrays/objects are kept as
    /// their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Empty,
            Value::String(s) => CellValue::Text(s.clone()),
            Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            Value::Bool(b) => CellValue::Text(b.to_string()),
            other => CellValue::Text(other.to_string()),
        }
    }

    /// True for missing cells, whitespace-only text and NaN.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
        }
    }

    /// Text form of the cell. Integral numbers render without a fraction.
    pub fn as_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Empty => String::new(),
        }
    }

    /// JSON form of the cell (used by `nestmap parse`).
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
            CellValue::Empty => Value::Null,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// =============================================================================
// Record
// =============================================================================

/// A single column of a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name as it appeared in the source.
    pub name: String,
    /// Lower-cased name used for matching.
    pub key: String,
    /// Raw cell value.
    pub value: CellValue,
}

/// One input row: an ordered set of columns with case-insensitive lookup.
///
/// Two source columns whose names differ only by case collapse into one; the
/// later value wins and the first position is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a column.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<CellValue>) {
        let name = name.into();
        let key = name.to_lowercase();
        let value = value.into();

        match self.index.get(&key) {
            Some(&pos) => self.columns[pos].value = value,
            None => {
                self.index.insert(key.clone(), self.columns.len());
                self.columns.push(Column { name, key, value });
            }
        }
    }

    /// Builder-style [`Record::push`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.push(name, value);
        self
    }

    /// Build a record from a flat JSON object. Returns `None` for non-objects.
    pub fn from_json(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(
            obj.iter()
                .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                .collect(),
        )
    }

    /// Look up a column value by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&CellValue> {
        self.column(name).map(|c| &c.value)
    }

    /// Look up a column by name, ignoring case.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index
            .get(&name.to_lowercase())
            .map(|&pos| &self.columns[pos])
    }

    /// Columns in source order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// JSON object form, keyed by the original column names.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.value.to_json()))
            .collect();
        Value::Object(map)
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.push(name, value);
        }
        record
    }
}

//! Value coercion with layered defaults.
//!
//! Resolution order for one field:
//!
//! 1. the raw cell, if present and non-blank, converted to the datatype;
//! 2. otherwise the mapping default, if non-blank, converted the same way;
//! 3. otherwise the datatype default (`""`, `0`, `false`, or `null`).
//!
//! A raw value that fails conversion goes straight to step 3, never to the
//! mapping default. [`coerce`] cannot fail; [`convert`] is the fallible core.

use serde::Serialize;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::mapping::DataType;
use crate::models::CellValue;

/// Strings accepted as boolean true (after trim + lower-case).
pub const TRUE_VALUES: [&str; 3] = ["true", "1", "yes"];

/// Why a non-blank value could not be converted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("'{0}' is not a finite number")]
    NotANumber(String),
}

/// Why the datatype default was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// No raw value and no mapping default.
    Absent,
    /// The raw value did not convert.
    RawUnconvertible,
    /// No raw value and the mapping default did not convert.
    DefaultUnconvertible,
}

/// Where a coerced value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Raw,
    MappingDefault,
    DatatypeDefault(Fallback),
}

/// A typed value plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    pub value: Value,
    pub source: ValueSource,
}

/// Convert a non-blank cell to `datatype`.
pub fn convert(cell: &CellValue, datatype: &DataType) -> Result<Value, CoercionError> {
    match datatype {
        DataType::Number => match cell {
            CellValue::Number(n) => finite(*n).ok_or_else(|| CoercionError::NotANumber(n.to_string())),
            other => {
                let text = other.as_text();
                text.trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(finite)
                    .ok_or(CoercionError::NotANumber(text))
            }
        },
        DataType::Boolean => {
            let text = cell.as_text().trim().to_lowercase();
            Ok(Value::Bool(TRUE_VALUES.contains(&text.as_str())))
        }
        DataType::String | DataType::Date => Ok(Value::String(cell.as_text())),
        DataType::Untyped(_) => Ok(match cell {
            CellValue::Number(n) => finite(*n).unwrap_or(Value::Null),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Empty => Value::Null,
        }),
    }
}

fn finite(n: f64) -> Option<Value> {
    Number::from_f64(n).map(Value::Number)
}

/// Resolve a field value through the three-level default chain.
pub fn coerce(raw: Option<&CellValue>, datatype: &DataType, mapping_default: Option<&str>) -> Coercion {
    if let Some(cell) = raw.filter(|c| !c.is_blank()) {
        return match convert(cell, datatype) {
            Ok(value) => Coercion {
                value,
                source: ValueSource::Raw,
            },
            Err(_) => datatype_default(datatype, Fallback::RawUnconvertible),
        };
    }

    match mapping_default.filter(|d| !d.trim().is_empty()) {
        Some(default) => match convert(&CellValue::Text(default.to_string()), datatype) {
            Ok(value) => Coercion {
                value,
                source: ValueSource::MappingDefault,
            },
            Err(_) => datatype_default(datatype, Fallback::DefaultUnconvertible),
        },
        None => datatype_default(datatype, Fallback::Absent),
    }
}

fn datatype_default(datatype: &DataType, why: Fallback) -> Coercion {
    Coercion {
        value: datatype.default_value(),
        source: ValueSource::DatatypeDefault(why),
    }
}

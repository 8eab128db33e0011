//! Mapping table loading from CSV or JSON.
//!
//! Recognized columns (trimmed, case-insensitive): `Type`, `Variable`,
//! `prefix`, `Path`, `DataType`, `samed`, `Default`. Only `Path` is required;
//! blank or missing cells normalize to the empty string.
//!
//! Loading fails fast on configuration errors (empty paths, malformed
//! paths); path conflicts are logged, or rejected in strict mode.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

use super::rule::{non_blank, DataType, FieldPath, MappingRule, PathError, RuleKind};
use super::table::MappingTable;
use crate::config::EngineConfig;
use crate::error::{MappingError, MappingResult};
use crate::parser::{decode_content, detect_delimiter, detect_encoding};

const COL_TYPE: &str = "type";
const COL_VARIABLE: &str = "variable";
const COL_PREFIX: &str = "prefix";
const COL_PATH: &str = "path";
const COL_DATATYPE: &str = "datatype";
const COL_ALIAS: &str = "samed";
const COL_DEFAULT: &str = "default";

/// One raw mapping-table row, every cell as a trimmed string.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MappingRow {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Variable")]
    pub variable: String,
    #[serde(rename = "prefix")]
    pub prefix: String,
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "DataType")]
    pub datatype: String,
    #[serde(rename = "samed")]
    pub alias: String,
    #[serde(rename = "Default")]
    pub default: String,
}

impl MappingRow {
    fn from_lookup(get: impl Fn(&str) -> String) -> Self {
        Self {
            kind: get(COL_TYPE),
            variable: get(COL_VARIABLE),
            prefix: get(COL_PREFIX),
            path: get(COL_PATH),
            datatype: get(COL_DATATYPE),
            alias: get(COL_ALIAS),
            default: get(COL_DEFAULT),
        }
    }

    /// The row back in mapping-table form.
    pub fn from_rule(rule: &MappingRule) -> Self {
        Self {
            kind: rule.kind.as_str().to_string(),
            variable: rule.variable.clone(),
            prefix: rule.prefix.clone(),
            path: rule.path.to_string(),
            datatype: rule.datatype.name().to_string(),
            alias: rule.alias.clone().unwrap_or_default(),
            default: rule.default.clone().unwrap_or_default(),
        }
    }

    fn is_blank(&self) -> bool {
        [
            &self.kind,
            &self.variable,
            &self.prefix,
            &self.path,
            &self.datatype,
            &self.alias,
            &self.default,
        ]
        .iter()
        .all(|c| c.is_empty())
    }

    /// Validate and convert into a rule. `row` is used in error messages.
    pub fn into_rule(self, row: usize) -> MappingResult<MappingRule> {
        let path = FieldPath::parse(&self.path).map_err(|e| match e {
            PathError::Empty => MappingError::EmptyPath { row },
            PathError::EmptySegment(path) => MappingError::InvalidPath { row, path },
        })?;

        Ok(MappingRule {
            kind: RuleKind::parse(&self.kind),
            variable: self.variable,
            prefix: self.prefix,
            path,
            datatype: DataType::parse(&self.datatype),
            alias: non_blank(&self.alias),
            default: non_blank(&self.default),
        })
    }
}

/// Read mapping rows from CSV text (delimiter auto-detected).
pub fn read_mapping_csv(content: &str) -> MappingResult<Vec<MappingRow>> {
    let content = content.trim_start_matches('\u{feff}');
    let delimiter = detect_delimiter(content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect();

    if !columns.contains_key(COL_PATH) {
        return Err(MappingError::MissingColumn("Path"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(MappingRow::from_lookup(|name| {
            columns
                .get(name)
                .and_then(|&i| record.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        }));
    }

    Ok(rows)
}

/// Read mapping rows from a JSON array of objects.
///
/// Keys are matched like CSV headers; numbers and booleans are stringified.
pub fn read_mapping_json(content: &str) -> MappingResult<Vec<MappingRow>> {
    let objects: Vec<serde_json::Map<String, Value>> = serde_json::from_str(content)?;

    let rows: Vec<MappingRow> = objects
        .iter()
        .map(|obj| {
            let normalized: HashMap<String, &Value> =
                obj.iter().map(|(k, v)| (k.trim().to_lowercase(), v)).collect();
            MappingRow::from_lookup(|name| normalized.get(name).map(|v| cell_text(v)).unwrap_or_default())
        })
        .collect();

    if !objects.is_empty() && objects.iter().all(|o| !o.keys().any(|k| k.trim().eq_ignore_ascii_case(COL_PATH))) {
        return Err(MappingError::MissingColumn("Path"));
    }

    Ok(rows)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Read mapping rows from a file: `.json` as JSON, anything else as CSV.
pub fn read_mapping_file(path: impl AsRef<Path>) -> MappingResult<Vec<MappingRow>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    read_mapping_bytes(&bytes, is_json_path(path))
}

/// Read mapping rows from raw bytes (encoding auto-detected for CSV).
pub fn read_mapping_bytes(bytes: &[u8], json: bool) -> MappingResult<Vec<MappingRow>> {
    let content = decode_content(bytes, &detect_encoding(bytes));
    if json {
        read_mapping_json(&content)
    } else {
        read_mapping_csv(&content)
    }
}

pub(crate) fn is_json_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Validate rows and compile them into a [`MappingTable`].
///
/// Fully blank rows are skipped; row numbers still count them so errors
/// point at the right line of the source table.
pub fn build_table(rows: Vec<MappingRow>, config: &EngineConfig) -> MappingResult<MappingTable> {
    let mut rules = Vec::with_capacity(rows.len());
    for (i, row) in rows.into_iter().enumerate() {
        let number = i + 1;
        if row.is_blank() {
            debug!(row = number, "skipping blank mapping row");
            continue;
        }
        rules.push((number, row.into_rule(number)?));
    }

    let table = MappingTable::from_numbered(rules)?.with_max_list_len(config.max_list_len);

    let conflicts = table.path_conflicts();
    if !conflicts.is_empty() {
        if config.strict_paths {
            return Err(MappingError::PathConflicts(conflicts));
        }
        for conflict in &conflicts {
            warn!(%conflict, "mapping path conflict; later writes overwrite earlier ones");
        }
    }

    info!(
        rules = table.len(),
        list_groups = table.groups().len(),
        conflicts = conflicts.len(),
        "mapping table loaded"
    );

    Ok(table)
}

/// Read and compile a mapping file in one step.
pub fn load_mapping_file(path: impl AsRef<Path>, config: &EngineConfig) -> MappingResult<MappingTable> {
    build_table(read_mapping_file(path)?, config)
}

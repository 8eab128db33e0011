//! Mapping table: what to read, where to put it, and how to type it.
//!
//! - `rule`: a single mapping rule and its path/datatype types
//! - `pattern`: compiled column patterns for list rules
//! - `table`: the immutable, compiled rule set shared by all records
//! - `loader`: reading mapping tables from CSV or JSON
//!
//! ## Usage Flow
//!
//! ```text
//! mapping.csv → loader::read_mapping_file → MappingRow[] → loader::build_table → MappingTable
//! ```

pub mod loader;
pub mod pattern;
pub mod rule;
pub mod table;

pub(crate) use loader::is_json_path;

pub use loader::{
    build_table, load_mapping_file, read_mapping_bytes, read_mapping_csv, read_mapping_file,
    read_mapping_json, MappingRow,
};
pub use pattern::{ColumnPattern, ListPatterns};
pub use rule::{DataType, FieldPath, MappingRule, PathError, RuleKind};
pub use table::{ConflictKind, ListGroup, MappingTable, PathConflict, RuleEntry, DEFAULT_MAX_LIST_LEN};

//! # nestmap - mapping-driven flat records to nested JSON
//!
//! nestmap turns flat tabular records (one CSV row per output document) into
//! nested JSON documents. A mapping table declares, for every output field,
//! the source column, the slash-delimited target path, the datatype, and
//! fallback values. Numbered column families (`item1amt`, `item2amt`, ...)
//! become arrays of objects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Mapping CSV │────▶│  Mapping    │     │  Transform  │────▶│  Envelope   │
//! │  or JSON    │     │   table     │────▶│ (per record │     │ {"Quote":[ ]│
//! └─────────────┘     └─────────────┘     │  parallel)  │     │   JSON }    │
//! ┌─────────────┐     ┌─────────────┐     │             │     └─────────────┘
//! │ Input CSV   │────▶│   Parser    │────▶│             │
//! │  (ISO/UTF8) │     │  (auto-enc) │     └─────────────┘
//! └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nestmap::{transform_files, EngineConfig};
//! use std::path::Path;
//!
//! let config = EngineConfig::default();
//! let result = transform_files(Path::new("mapping.csv"), Path::new("input.csv"), &config).unwrap();
//! println!("Transformed {} records", result.documents);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Input records and cell values
//! - [`mapping`] - Mapping rules, column patterns, table loading
//! - [`parser`] - CSV/JSON input parsing with auto-detection
//! - [`transform`] - Coercion, resolution, tree building, batch, pipeline
//! - [`config`] - Engine configuration from the environment
//! - [`logging`] - tracing subscriber setup
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Mapping table
pub mod mapping;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Logging
pub mod logging;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Errors and config
// =============================================================================

pub use config::EngineConfig;
pub use error::{ConfigError, CsvError, MappingError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{CellValue, Column, Record};

// =============================================================================
// Re-exports - Mapping
// =============================================================================

pub use mapping::{
    build_table, load_mapping_file, read_mapping_bytes, read_mapping_csv, read_mapping_file, read_mapping_json,
    DataType, FieldPath, MappingRow, MappingRule, MappingTable, PathConflict, RuleKind,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    csv_to_records, decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_str,
    parse_file_auto, parse_json_records, ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    coerce, transform_batch, transform_record, BatchOptions, BatchOutput, Coercion, RecordOutput, ResolutionStats,
    ValueSource,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    to_json_pretty, transform_bytes, transform_files, transform_parsed, write_output, CsvInfo, PipelineOutput,
};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, CsvMetadata, ResponseMetadata, StatsMetadata, TransformResponse};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}

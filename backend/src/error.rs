//! Error types for the nestmap pipeline.
//!
//! Configuration problems fail fast, data problems fail soft:
//!
//! - [`CsvError`] - reading and decoding input tables
//! - [`MappingError`] - loading the mapping table (rejected eagerly)
//! - [`ConfigError`] - engine configuration from the environment
//! - [`PipelineError`] - top-level file/bytes orchestration
//! - [`ServerError`] - HTTP API failures
//!
//! Cell-level conversion failures never reach this module: the coercer
//! resolves them to defaults (see [`crate::transform::coerce`]).
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::mapping::PathConflict;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading an input table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV format.
    #[error("Invalid CSV at line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// JSON input that is not an array of flat objects.
    #[error("Invalid JSON records: {0}")]
    InvalidJson(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Mapping Errors
// =============================================================================

/// Errors while loading a mapping table.
///
/// Row numbers are 1-based and count data rows only (the header is not a row).
#[derive(Debug, Error)]
pub enum MappingError {
    /// Failed to read the mapping file.
    #[error("Failed to read mapping: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed CSV mapping table.
    #[error("Invalid mapping CSV: {0}")]
    CsvError(#[from] csv::Error),

    /// Malformed JSON mapping table.
    #[error("Invalid mapping JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A required column is missing from the mapping header.
    #[error("Mapping table has no '{0}' column")]
    MissingColumn(&'static str),

    /// The mapping table contains no rules.
    #[error("Mapping table has no rules")]
    NoRules,

    /// A rule with a blank path.
    #[error("Mapping row {row}: path is empty")]
    EmptyPath { row: usize },

    /// A rule whose path contains an empty segment (e.g. `a//b`).
    #[error("Mapping row {row}: path '{path}' contains an empty segment")]
    InvalidPath { row: usize, path: String },

    /// A list rule whose column pattern could not be compiled.
    #[error("Mapping row {row}: cannot build column pattern: {source}")]
    Pattern {
        row: usize,
        #[source]
        source: regex::Error,
    },

    /// Rules whose paths overwrite each other (strict mode only).
    #[error("{} path conflict(s) in mapping: {}", .0.len(), format_conflicts(.0))]
    PathConflicts(Vec<PathConflict>),
}

fn format_conflicts(conflicts: &[PathConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors in engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable with an unusable value.
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the main error type returned by [`crate::transform::pipeline`].
/// It wraps all lower-level errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input table error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Mapping table error.
    #[error("Mapping error: {0}")]
    Mapping(#[from] MappingError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Output IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

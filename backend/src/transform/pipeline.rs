//! High-level pipeline API: mapping + input table to the output envelope.
//!
//! This module combines all steps: loading the mapping, parsing the input,
//! the batch transformation, and writing the JSON text.
//!
//! # Example
//!
//! ```rust,ignore
//! use nestmap::{transform_files, write_output, EngineConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env()?;
//!     let result = transform_files(Path::new("mapping.csv"), Path::new("quotes.csv"), &config)?;
//!
//!     println!("Transformed {} records", result.documents);
//!     write_output(&result.envelope, Some(Path::new("quotes.json")))?;
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use super::batch::{transform_batch, BatchOptions};
use super::record::ResolutionStats;
use crate::config::EngineConfig;
use crate::error::PipelineResult;
use crate::mapping::{build_table, load_mapping_file, read_mapping_bytes, MappingTable};
use crate::parser::{parse_bytes_auto, parse_file_auto, parse_json_records, ParseResult};

/// Input table information
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    /// `None` for JSON input
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl CsvInfo {
    fn from_parsed(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.records.len(),
        }
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// `{ <envelope_key>: [doc, ...] }`
    pub envelope: Value,
    /// Number of documents produced (one per input record)
    pub documents: usize,
    /// Resolution counts over the whole batch
    pub stats: ResolutionStats,
    /// Input parsing metadata
    pub csv_info: CsvInfo,
}

/// Transform an input file with a mapping file.
///
/// Both formats are chosen by extension: `.json` is read as JSON, anything
/// else as CSV with encoding and delimiter detection.
pub fn transform_files(mapping: &Path, input: &Path, config: &EngineConfig) -> PipelineResult<PipelineOutput> {
    info!(mapping = %mapping.display(), "loading mapping");
    let table = load_mapping_file(mapping, config)?;

    info!(input = %input.display(), "reading input");
    let parsed = parse_file_auto(input)?;

    Ok(transform_parsed(&table, parsed, config))
}

/// Transform raw bytes, e.g. from an upload.
///
/// The `*_json` flags select the JSON readers instead of CSV.
pub fn transform_bytes(
    mapping: &[u8],
    mapping_json: bool,
    input: &[u8],
    input_json: bool,
    config: &EngineConfig,
) -> PipelineResult<PipelineOutput> {
    let table = build_table(read_mapping_bytes(mapping, mapping_json)?, config)?;

    let parsed = if input_json {
        parse_json_records(&String::from_utf8_lossy(input))?
    } else {
        parse_bytes_auto(input)?
    };

    Ok(transform_parsed(&table, parsed, config))
}

/// Transform already-parsed records with a compiled table.
pub fn transform_parsed(table: &MappingTable, parsed: ParseResult, config: &EngineConfig) -> PipelineOutput {
    let csv_info = CsvInfo::from_parsed(&parsed);
    info!(
        encoding = %csv_info.encoding,
        delimiter = ?csv_info.delimiter,
        columns = csv_info.headers.len(),
        rows = csv_info.row_count,
        "input parsed"
    );
    if parsed.records.is_empty() {
        warn!("input has no data rows; the envelope will be empty");
    }

    let batch = transform_batch(table, &parsed.records, &BatchOptions::from(config));

    PipelineOutput {
        envelope: batch.envelope,
        documents: batch.documents,
        stats: batch.stats,
        csv_info,
    }
}

/// Serialize with 4-space indentation.
pub fn to_json_pretty<T: Serialize + ?Sized>(value: &T) -> PipelineResult<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write pretty JSON to `path`, or to stdout when `path` is `None`.
pub fn write_output<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> PipelineResult<()> {
    let mut text = to_json_pretty(value)?;
    text.push('\n');

    match path {
        Some(path) => {
            std::fs::write(path, text)?;
            info!(output = %path.display(), "output written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            lock.write_all(text.as_bytes())?;
            lock.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MappingError, PipelineError};
    use serde_json::json;
    use tempfile::TempDir;

    const MAPPING: &str = "\
Type;Variable;prefix;Path;DataType;samed;Default
;name;;customer;string;client;
;age;;customer;number;;18
list;amt;item;cart/items;number;;
";

    const INPUT: &str = "\
name;age;item1amt;item3amt
Acme;42;10;30
Globex;;;
";

    fn sequential() -> EngineConfig {
        EngineConfig {
            parallel: false,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_transform_files() {
        let dir = TempDir::new().unwrap();
        let mapping = dir.path().join("mapping.csv");
        let input = dir.path().join("input.csv");
        std::fs::write(&mapping, MAPPING).unwrap();
        std::fs::write(&input, INPUT).unwrap();

        let out = transform_files(&mapping, &input, &sequential()).unwrap();

        assert_eq!(out.documents, 2);
        assert_eq!(out.csv_info.delimiter, Some(';'));
        assert_eq!(out.csv_info.row_count, 2);
        assert_eq!(
            out.envelope["Quote"][0],
            json!({
                "customer": {"name": "Acme", "age": 42.0},
                "cart": {"items": [{"itemamt": 10.0}, {"itemamt": 0}, {"itemamt": 30.0}]}
            })
        );
        // blank cells still count as present columns, so the list keeps length 3
        assert_eq!(
            out.envelope["Quote"][1],
            json!({
                "customer": {"name": "Globex", "age": 18.0},
                "cart": {"items": [{"itemamt": 0}, {"itemamt": 0}, {"itemamt": 0}]}
            })
        );
    }

    #[test]
    fn test_transform_bytes_with_json_input() {
        let input = br#"[{"client": "Initech", "item2amt": 5}]"#;
        let out = transform_bytes(MAPPING.as_bytes(), false, input, true, &sequential()).unwrap();

        assert_eq!(out.csv_info.delimiter, None);
        assert_eq!(out.envelope["Quote"][0]["customer"]["name"], json!("Initech"));
        assert_eq!(out.envelope["Quote"][0]["cart"]["items"], json!([{"itemamt": 0}, {"itemamt": 5.0}]));
    }

    #[test]
    fn test_envelope_key_from_config() {
        let config = EngineConfig {
            envelope_key: "Policies".to_string(),
            ..sequential()
        };
        let out = transform_bytes(MAPPING.as_bytes(), false, INPUT.as_bytes(), false, &config).unwrap();
        assert_eq!(out.envelope["Policies"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_bad_mapping_fails_before_input() {
        let mapping = "Variable,Path\nname,\n";
        let err = transform_bytes(mapping.as_bytes(), false, b"garbage", false, &sequential()).unwrap_err();
        assert!(matches!(err, PipelineError::Mapping(MappingError::EmptyPath { row: 1 })));
    }

    #[test]
    fn test_pretty_output_uses_four_spaces() {
        let text = to_json_pretty(&json!({"Quote": [{"a": 1}]})).unwrap();
        assert_eq!(text, "{\n    \"Quote\": [\n        {\n            \"a\": 1\n        }\n    ]\n}");
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_output(&json!({"Quote": []}), Some(&path)).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n    \"Quote\": []\n}\n");
    }

    #[test]
    fn test_missing_input_file_is_csv_io_error() {
        let dir = TempDir::new().unwrap();
        let mapping = dir.path().join("mapping.csv");
        std::fs::write(&mapping, MAPPING).unwrap();

        let err = transform_files(&mapping, &dir.path().join("nope.csv"), &sequential()).unwrap_err();
        assert!(matches!(err, PipelineError::Csv(_)));
    }
}

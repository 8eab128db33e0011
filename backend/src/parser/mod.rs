//! Input table reader with encoding and delimiter auto-detection.
//!
//! Produces [`Record`]s for the transformer. CSV is read with the `csv`
//! crate after decoding; JSON inputs are arrays of flat objects.

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::error::{CsvError, CsvResult};
use crate::mapping::is_json_path;
use crate::models::{CellValue, Record};

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed records in input order
    pub records: Vec<Record>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected delimiter (`None` for JSON input)
    pub delimiter: Option<char>,
    /// Column headers in source order
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ';';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into records with an explicit delimiter.
///
/// # Example
/// ```ignore
/// use nestmap::csv_to_records;
///
/// let csv = "name;age\nAlice;30\nBob;25";
/// let rows = csv_to_records(csv, ';').unwrap();
///
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].get("NAME").unwrap().as_text(), "Alice");
/// ```
pub fn csv_to_records(csv: &str, delimiter: char) -> CsvResult<Vec<Record>> {
    parse_csv_str(csv, delimiter).map(|(_, records)| records)
}

/// Parse CSV text into headers and records.
///
/// Short rows are padded with empty cells; extra cells are ignored.
/// Blank lines are skipped. Empty cells become [`CellValue::Empty`].
/// Headers are trimmed; cell text is kept as written.
pub fn parse_csv_str(content: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<Record>)> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = match row.get(i) {
                    Some(s) if !s.is_empty() => CellValue::Text(s.to_string()),
                    _ => CellValue::Empty,
                };
                (header.clone(), cell)
            })
            .collect();
        records.push(record);
    }

    Ok((headers, records))
}

/// Parse a JSON array of flat objects into records.
///
/// Headers are the union of object keys in first-seen order.
pub fn parse_json_records(content: &str) -> CsvResult<ParseResult> {
    let value: Value =
        serde_json::from_str(content.trim_start_matches('\u{feff}')).map_err(|e| CsvError::InvalidJson(e.to_string()))?;

    let items = value
        .as_array()
        .ok_or_else(|| CsvError::InvalidJson("expected an array of objects".to_string()))?;

    let mut headers: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let record = Record::from_json(item)
            .ok_or_else(|| CsvError::InvalidJson(format!("element {} is not an object", i)))?;
        for column in record.columns() {
            if !headers.iter().any(|h| h.eq_ignore_ascii_case(&column.name)) {
                headers.push(column.name.clone());
            }
        }
        records.push(record);
    }

    Ok(ParseResult {
        records,
        encoding: "utf-8".to_string(),
        delimiter: None,
        headers,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    // Detect encoding
    let encoding = detect_encoding(bytes);

    // Decode content
    let content = decode_content(bytes, &encoding);

    // Detect delimiter
    let delimiter = detect_delimiter(&content);
    debug!(%encoding, ?delimiter, "detected CSV format");

    let (headers, records) = parse_csv_str(&content, delimiter)?;

    Ok(ParseResult {
        records,
        encoding,
        delimiter: Some(delimiter),
        headers,
    })
}

/// Parse an input file: `.json` as JSON records, anything else as CSV
/// with auto-detection.
///
/// # Example
/// ```ignore
/// let result = parse_file_auto("/path/to/file.csv")?;
/// println!("Encoding: {}, Delimiter: {:?}", result.encoding, result.delimiter);
/// println!("Records: {}", result.records.len());
/// ```
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    if is_json_path(path) {
        parse_json_records(&String::from_utf8_lossy(&bytes))
    } else {
        parse_bytes_auto(&bytes)
    }
}

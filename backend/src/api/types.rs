//! REST API types.
//!
//! The transformed envelope is returned as-is under `document`; metadata
//! sits next to it so clients never have to unwrap the documents.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::pipeline::{CsvInfo, PipelineOutput};
use crate::transform::record::ResolutionStats;

/// Response sent after a successful transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Unique job identifier
    pub job_id: String,

    /// `{ <envelope_key>: [doc, ...] }`
    pub document: Value,

    /// Metadata about the transformation
    pub metadata: ResponseMetadata,
}

/// Metadata about the transformation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    /// Number of documents produced
    pub records: usize,

    /// Input file info
    pub csv_info: CsvMetadata,

    /// How field values were resolved
    pub stats: StatsMetadata,
}

/// Input file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    /// `"json"` for JSON input
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

/// Resolution counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsMetadata {
    pub raw: usize,
    pub mapping_default: usize,
    pub datatype_default: usize,
    pub unconvertible: usize,
    pub overwritten_nodes: usize,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        CsvMetadata {
            encoding: info.encoding,
            delimiter: info.delimiter.map(format_delimiter).unwrap_or_else(|| "json".to_string()),
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

impl From<ResolutionStats> for StatsMetadata {
    fn from(stats: ResolutionStats) -> Self {
        StatsMetadata {
            raw: stats.raw,
            mapping_default: stats.mapping_default,
            datatype_default: stats.datatype_default,
            unconvertible: stats.unconvertible,
            overwritten_nodes: stats.overwritten_nodes,
        }
    }
}

impl From<PipelineOutput> for TransformResponse {
    fn from(result: PipelineOutput) -> Self {
        TransformResponse {
            job_id: Uuid::new_v4().to_string(),
            document: result.envelope,
            metadata: ResponseMetadata {
                records: result.documents,
                csv_info: result.csv_info.into(),
                stats: result.stats.into(),
            },
        }
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> PipelineOutput {
        PipelineOutput {
            envelope: json!({"Quote": [{"customer": {"name": "Acme"}}]}),
            documents: 1,
            stats: ResolutionStats {
                raw: 1,
                ..ResolutionStats::default()
            },
            csv_info: CsvInfo {
                encoding: "utf-8".to_string(),
                delimiter: Some('\t'),
                headers: vec!["name".to_string()],
                row_count: 1,
            },
        }
    }

    #[test]
    fn test_response_shape() {
        let response = TransformResponse::from(output());
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["document"]["Quote"][0]["customer"]["name"], "Acme");
        assert_eq!(json["metadata"]["records"], 1);
        assert_eq!(json["metadata"]["csvInfo"]["delimiter"], "\\t");
        assert_eq!(json["metadata"]["csvInfo"]["columns"][0], "name");
        assert_eq!(json["metadata"]["stats"]["raw"], 1);
        assert_eq!(json["metadata"]["stats"]["mappingDefault"], 0);
        assert_eq!(json["jobId"].as_str().map(str::len), Some(36));
    }

    #[test]
    fn test_json_input_has_no_delimiter() {
        let mut out = output();
        out.csv_info.delimiter = None;
        let response = TransformResponse::from(out);
        assert_eq!(response.metadata.csv_info.delimiter, "json");
    }

    #[test]
    fn test_error_response() {
        let body = error_response("boom");
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "boom");
    }
}

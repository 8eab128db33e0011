//! Batch transformation: every record, in input order, wrapped in the
//! output envelope.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::record::{transform_record, RecordOutput, ResolutionStats};
use crate::config::EngineConfig;
use crate::mapping::MappingTable;
use crate::models::Record;

/// Options for [`transform_batch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOptions {
    /// Key holding the document array in the envelope.
    pub envelope_key: String,
    /// Use the rayon thread pool.
    pub parallel: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for BatchOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            envelope_key: config.envelope_key.clone(),
            parallel: config.parallel,
        }
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// `{ <envelope_key>: [doc, ...] }`
    pub envelope: Value,
    /// Number of documents in the envelope.
    pub documents: usize,
    /// Resolution counts summed over all records.
    pub stats: ResolutionStats,
}

/// Transform all records. Output order always equals input order, with or
/// without parallelism.
pub fn transform_batch(table: &MappingTable, records: &[Record], options: &BatchOptions) -> BatchOutput {
    let outputs: Vec<RecordOutput> = if options.parallel {
        records.par_iter().map(|r| transform_record(table, r)).collect()
    } else {
        records.iter().map(|r| transform_record(table, r)).collect()
    };

    let mut stats = ResolutionStats::default();
    let documents: Vec<Value> = outputs
        .into_iter()
        .map(|output| {
            stats += output.stats;
            output.document
        })
        .collect();

    info!(
        documents = documents.len(),
        parallel = options.parallel,
        raw = stats.raw,
        mapping_defaults = stats.mapping_default,
        datatype_defaults = stats.datatype_default,
        unconvertible = stats.unconvertible,
        "batch transformed"
    );

    let count = documents.len();
    let mut envelope = Map::new();
    envelope.insert(options.envelope_key.clone(), Value::Array(documents));

    BatchOutput {
        envelope: Value::Object(envelope),
        documents: count,
        stats,
    }
}

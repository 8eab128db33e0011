//! Transformation module.
//!
//! This module turns flat records into nested documents:
//! - Coerce: typed values with the three-level default chain
//! - Resolve: which columns feed which rule
//! - Tree: inserting values and lists into the output tree
//! - Record: one record to one document
//! - Batch: all records, in order, inside the envelope
//! - Pipeline: file/bytes orchestration and JSON output

pub mod batch;
pub mod coerce;
pub mod pipeline;
pub mod record;
pub mod resolve;
pub mod tree;

pub use batch::{transform_batch, BatchOptions, BatchOutput};
pub use coerce::{coerce, convert, Coercion, CoercionError, Fallback, ValueSource, TRUE_VALUES};
pub use pipeline::{
    to_json_pretty, transform_bytes, transform_files, transform_parsed, write_output, CsvInfo, PipelineOutput,
};
pub use record::{transform_record, RecordOutput, ResolutionStats};
pub use resolve::{resolve_list, resolve_scalar, ListHit, ScalarHit};
pub use tree::{insert_list, insert_scalar, TreeWrite};

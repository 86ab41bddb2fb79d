//! hashmatch-pipeline: record-stream workflows over the keyed hasher
//!
//! - `batch`:   identifiers → digests, in input order
//! - `matcher`: identifiers × digest list → identifiers whose digest is listed
//!
//! Both read whole CSV streams up front (`records`), report per-record
//! problems without aborting unless asked to (`report`), and write their
//! single-column output atomically.

pub mod batch;
pub mod matcher;
pub mod records;
pub mod report;

pub use batch::{hash_all, hash_file, BatchOutcome};
pub use matcher::{find_matches, match_files, DigestSet, MatchOutcome};
pub use records::{read_column, write_column, ColumnRecords, RawRecord};
pub use report::{IssueKind, RecordIssue, RecordReport};

use hashmatch_core::config::{HashmatchConfig, RecordErrorMode};

/// Progress callback: (records done, records total, message)
pub type ProgressFn = Box<dyn Fn(u64, u64, &str) + Send + Sync>;

/// How often (in records) the progress callback fires.
const PROGRESS_INTERVAL: u64 = 1024;

/// Per-operation knobs resolved from config and CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Identifier column in plaintext inputs
    pub column: usize,
    /// Digest column in hashed inputs
    pub digest_column: usize,
    /// Header of the output column
    pub header: String,
    pub on_error: RecordErrorMode,
    pub atomic: bool,
}

impl PipelineOptions {
    /// Options for `hash`, writing the `hash_header` column.
    pub fn for_hash(config: &HashmatchConfig) -> Self {
        Self::from_config(config, &config.records.hash_header)
    }

    /// Options for `match`, writing the `match_header` column.
    pub fn for_match(config: &HashmatchConfig) -> Self {
        Self::from_config(config, &config.records.match_header)
    }

    fn from_config(config: &HashmatchConfig, header: &str) -> Self {
        Self {
            column: config.records.column,
            digest_column: config.records.digest_column,
            header: header.to_string(),
            on_error: config.records.on_record_error,
            atomic: config.output.atomic,
        }
    }
}

pub(crate) fn report_progress(progress: Option<&ProgressFn>, done: u64, total: u64, msg: &str) {
    if let Some(cb) = progress {
        if done == total || done % PROGRESS_INTERVAL == 0 {
            cb(done, total, msg);
        }
    }
}

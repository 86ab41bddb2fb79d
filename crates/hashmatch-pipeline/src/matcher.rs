//! Plaintext-to-digest matching.
//!
//! The digest list is loaded into a hash set; each plaintext identifier is
//! hashed under the same key and kept if its digest is a member. Output keeps
//! input order and duplicates.

use hashmatch_core::config::RecordErrorMode;
use hashmatch_core::{Digest, HashmatchResult};
use hashmatch_crypto::Hasher;
use std::collections::HashSet;
use std::path::Path;

use crate::records::{read_column, write_column, ColumnRecords};
use crate::report::{IssueKind, RecordIssue, RecordReport};
use crate::{report_progress, PipelineOptions, ProgressFn};

/// Membership set over a digest list. Duplicate digests collapse.
#[derive(Debug, Clone, Default)]
pub struct DigestSet {
    digests: HashSet<Digest>,
}

impl DigestSet {
    /// Parse every record of `stream` as a digest.
    ///
    /// Values that are not 64-char hex are reported as `InvalidDigest`.
    pub fn from_records(
        stream: &ColumnRecords,
        on_error: RecordErrorMode,
    ) -> HashmatchResult<(Self, RecordReport)> {
        let mut digests = HashSet::with_capacity(stream.len());
        let mut report = RecordReport {
            read: stream.len() as u64,
            blank: stream.blank,
            issues: Vec::new(),
        };

        for record in &stream.records {
            let parsed = match &record.value {
                Ok(raw) => std::str::from_utf8(raw)
                    .ok()
                    .and_then(Digest::parse)
                    .ok_or_else(|| {
                        RecordIssue::new(
                            record.line,
                            IssueKind::InvalidDigest,
                            "expected 64 hex characters",
                        )
                    }),
                Err(issue) => Err(issue.clone()),
            };
            match parsed {
                Ok(digest) => {
                    digests.insert(digest);
                }
                Err(issue) => report.record(&stream.source, issue, on_error)?,
            }
        }

        Ok((Self { digests }, report))
    }

    pub fn contains(&self, digest: &Digest) -> bool {
        self.digests.contains(digest)
    }

    /// Number of distinct digests
    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

impl FromIterator<Digest> for DigestSet {
    fn from_iter<T: IntoIterator<Item = Digest>>(iter: T) -> Self {
        Self {
            digests: iter.into_iter().collect(),
        }
    }
}

/// Result of one match run
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Plaintext identifiers whose digest is listed, in input order
    pub matched: Vec<String>,
    /// Report for the plaintext stream
    pub identifiers: RecordReport,
    /// Report for the digest stream (empty when matching against an in-memory set)
    pub digests: RecordReport,
    /// Distinct digests available for lookup
    pub distinct_digests: usize,
}

/// Return every identifier in `identifiers` whose digest is in `digests`.
pub fn find_matches(
    hasher: &Hasher,
    identifiers: &ColumnRecords,
    digests: &DigestSet,
    on_error: RecordErrorMode,
    progress: Option<&ProgressFn>,
) -> HashmatchResult<MatchOutcome> {
    let total = identifiers.len() as u64;
    let mut matched = Vec::new();
    let mut report = RecordReport {
        read: total,
        blank: identifiers.blank,
        issues: Vec::new(),
    };

    for (done, record) in identifiers.records.iter().enumerate() {
        let identifier = match &record.value {
            Ok(raw) => std::str::from_utf8(raw).map_err(|e| {
                RecordIssue::new(
                    record.line,
                    IssueKind::Encoding,
                    format!("identifier is not valid UTF-8: {e}"),
                )
            }),
            Err(issue) => Err(issue.clone()),
        };
        match identifier {
            Ok(id) => {
                if digests.contains(&hasher.digest(id)) {
                    matched.push(id.to_string());
                }
            }
            Err(issue) => report.record(&identifiers.source, issue, on_error)?,
        }
        report_progress(progress, done as u64 + 1, total, "matching");
    }

    Ok(MatchOutcome {
        matched,
        identifiers: report,
        digests: RecordReport::default(),
        distinct_digests: digests.len(),
    })
}

/// Match the plaintext file `addresses` against the digest file `hashed`,
/// writing matched identifiers to `output`.
///
/// Both inputs are loaded in full before anything is written; a stream-level
/// failure on either side leaves no output.
pub fn match_files(
    hasher: &Hasher,
    addresses: &Path,
    hashed: &Path,
    output: &Path,
    opts: &PipelineOptions,
    progress: Option<&ProgressFn>,
) -> HashmatchResult<MatchOutcome> {
    let identifiers = read_column(addresses, opts.column)?;
    tracing::info!(
        source = %identifiers.source,
        records = identifiers.len(),
        "loaded addresses"
    );

    let digest_stream = read_column(hashed, opts.digest_column)?;
    let (set, digest_report) = DigestSet::from_records(&digest_stream, opts.on_error)?;
    tracing::info!(
        source = %digest_stream.source,
        records = digest_stream.len(),
        distinct = set.len(),
        "loaded hashed addresses"
    );

    let mut outcome = find_matches(hasher, &identifiers, &set, opts.on_error, progress)?;
    outcome.digests = digest_report;

    write_column(output, &opts.header, &outcome.matched, opts.atomic)?;
    tracing::info!(
        output = %output.display(),
        matched = outcome.matched.len(),
        "matched addresses"
    );
    Ok(outcome)
}

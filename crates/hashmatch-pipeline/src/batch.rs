//! Batch hashing: one digest per valid identifier, in input order.

use hashmatch_core::config::RecordErrorMode;
use hashmatch_core::{Digest, HashmatchResult};
use hashmatch_crypto::Hasher;
use std::path::Path;

use crate::records::{read_column, write_column, ColumnRecords};
use crate::report::{IssueKind, RecordIssue, RecordReport};
use crate::{report_progress, PipelineOptions, ProgressFn};

/// Result of hashing one identifier stream
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Digests in input order, one per hashed record
    pub digests: Vec<Digest>,
    pub report: RecordReport,
}

/// Hash every non-blank record of `identifiers`.
///
/// Records that cannot be hashed are reported and skipped, or abort the
/// batch when `on_error` is `Abort`.
pub fn hash_all(
    hasher: &Hasher,
    identifiers: &ColumnRecords,
    on_error: RecordErrorMode,
    progress: Option<&ProgressFn>,
) -> HashmatchResult<BatchOutcome> {
    let total = identifiers.len() as u64;
    let mut digests = Vec::with_capacity(identifiers.len());
    let mut report = RecordReport {
        read: total,
        blank: identifiers.blank,
        issues: Vec::new(),
    };

    for (done, record) in identifiers.records.iter().enumerate() {
        let outcome = match &record.value {
            Ok(raw) => hasher.digest_bytes(raw).map_err(|e| {
                RecordIssue::new(record.line, IssueKind::Encoding, e.to_string())
            }),
            Err(issue) => Err(issue.clone()),
        };
        match outcome {
            Ok(digest) => digests.push(digest),
            Err(issue) => report.record(&identifiers.source, issue, on_error)?,
        }
        report_progress(progress, done as u64 + 1, total, "hashing");
    }

    Ok(BatchOutcome { digests, report })
}

/// Read identifiers from `input`, hash them, and write the digest column to `output`.
///
/// Nothing is written if reading fails or the batch aborts.
pub fn hash_file(
    hasher: &Hasher,
    input: &Path,
    output: &Path,
    opts: &PipelineOptions,
    progress: Option<&ProgressFn>,
) -> HashmatchResult<BatchOutcome> {
    let identifiers = read_column(input, opts.column)?;
    tracing::info!(
        source = %identifiers.source,
        records = identifiers.len(),
        blank = identifiers.blank,
        "loaded addresses"
    );

    let outcome = hash_all(hasher, &identifiers, opts.on_error, progress)?;
    let written = write_column(
        output,
        &opts.header,
        outcome.digests.iter().map(|d| d.as_str()),
        opts.atomic,
    )?;

    tracing::info!(
        output = %output.display(),
        hashed = written,
        skipped = outcome.report.skipped(),
        "processed addresses"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashmatch_core::HashmatchError;
    use hashmatch_crypto::SecretKey;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn test_hasher() -> Hasher {
        Hasher::new(SecretKey::from_bytes(b"testkey".to_vec()))
    }

    #[test]
    fn test_hash_all_preserves_order_and_skips_blanks() {
        let hasher = test_hasher();
        let input = ColumnRecords::from_values("mem", ["123 Main St", "", "456 Oak Ave", "  "]);

        let out = hash_all(&hasher, &input, RecordErrorMode::Skip, None).unwrap();

        assert_eq!(
            out.digests,
            vec![hasher.digest("123 Main St"), hasher.digest("456 Oak Ave")]
        );
        assert_eq!(out.report.read, 2);
        assert_eq!(out.report.blank, 2);
        assert!(out.report.is_clean());
    }

    #[test]
    fn test_hash_all_keeps_duplicates() {
        let hasher = test_hasher();
        let input = ColumnRecords::from_values("mem", ["a", "a"]);
        let out = hash_all(&hasher, &input, RecordErrorMode::Skip, None).unwrap();
        assert_eq!(out.digests.len(), 2);
        assert_eq!(out.digests[0], out.digests[1]);
    }

    #[test]
    fn test_hash_all_skips_invalid_utf8() {
        let hasher = test_hasher();
        let input = ColumnRecords::from_values(
            "mem",
            [&b"123 Main St"[..], &b"Stra\xdfe 1"[..], &b"456 Oak Ave"[..]],
        );

        let out = hash_all(&hasher, &input, RecordErrorMode::Skip, None).unwrap();

        assert_eq!(out.digests.len(), 2);
        assert_eq!(out.report.skipped(), 1);
        assert_eq!(out.report.issues[0].kind, IssueKind::Encoding);
        assert_eq!(out.report.issues[0].line, 3);
    }

    #[test]
    fn test_hash_all_abort_policy() {
        let hasher = test_hasher();
        let input = ColumnRecords::from_values("mem", [&b"ok"[..], &b"\xff"[..]]);

        let result = hash_all(&hasher, &input, RecordErrorMode::Abort, None);
        assert!(matches!(
            result,
            Err(HashmatchError::RecordAborted { line: 3, .. })
        ));
    }

    #[test]
    fn test_hash_all_reports_progress() {
        let hasher = test_hasher();
        let input = ColumnRecords::from_values("mem", ["a", "b", "c"]);
        let last = Arc::new(AtomicU64::new(0));
        let seen = last.clone();
        let progress: ProgressFn = Box::new(move |done, total, _| {
            assert_eq!(total, 3);
            seen.store(done, Ordering::SeqCst);
        });

        hash_all(&hasher, &input, RecordErrorMode::Skip, Some(&progress)).unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    proptest! {
        #[test]
        fn prop_output_order_matches_input(ids in proptest::collection::vec("[a-zA-Z0-9 ]{1,24}", 0..32)) {
            let hasher = test_hasher();
            let input = ColumnRecords::from_values("mem", &ids);
            let out = hash_all(&hasher, &input, RecordErrorMode::Skip, None).unwrap();

            let expected: Vec<Digest> = ids
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| hasher.digest(s))
                .collect();
            prop_assert_eq!(out.digests, expected);
        }
    }
}

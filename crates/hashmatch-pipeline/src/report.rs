//! Per-record outcome reporting
//!
//! A record that cannot be processed is either skipped (logged at warn and
//! kept in the report) or aborts the operation, depending on the policy.
//! Record values are never logged; only line numbers and the failure kind.

use hashmatch_core::config::RecordErrorMode;
use hashmatch_core::{HashmatchError, HashmatchResult};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Value bytes are not valid UTF-8
    Encoding,
    /// Row has fewer fields than the configured column
    MissingColumn,
    /// Value in a hashed input is not a 64-char hex digest
    InvalidDigest,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueKind::Encoding => "encoding",
            IssueKind::MissingColumn => "missing column",
            IssueKind::InvalidDigest => "invalid digest",
        };
        f.write_str(s)
    }
}

/// One skipped record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordIssue {
    /// 1-based line in the source file (the header is line 1)
    pub line: u64,
    pub kind: IssueKind,
    pub detail: String,
}

impl RecordIssue {
    pub fn new(line: u64, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            line,
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({})", self.line, self.kind, self.detail)
    }
}

/// Counts and skipped records for one input stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordReport {
    /// Non-blank records read from the stream
    pub read: u64,
    /// Blank records excluded before processing
    pub blank: u64,
    pub issues: Vec<RecordIssue>,
}

impl RecordReport {
    pub fn skipped(&self) -> usize {
        self.issues.len()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Apply the record policy to `issue`: abort, or log and keep it.
    pub(crate) fn record(
        &mut self,
        stream: &str,
        issue: RecordIssue,
        on_error: RecordErrorMode,
    ) -> HashmatchResult<()> {
        if on_error == RecordErrorMode::Abort {
            return Err(HashmatchError::RecordAborted {
                line: issue.line,
                reason: format!("{stream}: {} ({})", issue.kind, issue.detail),
            });
        }
        tracing::warn!(
            stream,
            line = issue.line,
            kind = %issue.kind,
            detail = %issue.detail,
            "skipping record"
        );
        self.issues.push(issue);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_policy_keeps_issue() {
        let mut report = RecordReport::default();
        report
            .record(
                "input.csv",
                RecordIssue::new(4, IssueKind::Encoding, "invalid utf-8"),
                RecordErrorMode::Skip,
            )
            .unwrap();

        assert_eq!(report.skipped(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.issues[0].line, 4);
    }

    #[test]
    fn test_abort_policy_fails() {
        let mut report = RecordReport::default();
        let err = report
            .record(
                "hashed.csv",
                RecordIssue::new(9, IssueKind::InvalidDigest, "expected 64 hex chars"),
                RecordErrorMode::Abort,
            )
            .unwrap_err();

        match err {
            HashmatchError::RecordAborted { line, reason } => {
                assert_eq!(line, 9);
                assert!(reason.contains("hashed.csv"));
                assert!(reason.contains("invalid digest"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(report.is_clean());
    }

    #[test]
    fn test_issue_display() {
        let issue = RecordIssue::new(2, IssueKind::MissingColumn, "row has 1 field");
        assert_eq!(issue.to_string(), "line 2: missing column (row has 1 field)");
    }
}

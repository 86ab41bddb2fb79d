//! CSV record streams: one value column in, one value column out.
//!
//! Inputs must start with a header row. Rows are read as raw bytes so that a
//! single badly-encoded value is a per-record problem, not a stream failure.
//! Outputs are written to a temp file beside the destination and renamed into
//! place once complete, so a failed run never leaves a complete-looking file.

use hashmatch_core::{HashmatchError, HashmatchResult};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::report::{IssueKind, RecordIssue};

/// One non-blank data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// 1-based source line (the header is line 1)
    pub line: u64,
    /// The value cell, or the reason the row has none
    pub value: Result<Vec<u8>, RecordIssue>,
}

/// All data rows of one column, in file order.
#[derive(Debug, Clone, Default)]
pub struct ColumnRecords {
    /// Source label used in logs and reports
    pub source: String,
    pub records: Vec<RawRecord>,
    /// Rows whose value cell was empty or whitespace
    pub blank: u64,
}

impl ColumnRecords {
    /// Build a stream from in-memory values (line numbers start at 2, after a notional header).
    pub fn from_values<I, S>(source: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut out = ColumnRecords {
            source: source.to_string(),
            ..Default::default()
        };
        for (idx, value) in values.into_iter().enumerate() {
            out.push_value(idx as u64 + 2, value.as_ref());
        }
        out
    }

    fn push_value(&mut self, line: u64, value: &[u8]) {
        if is_blank(value) {
            self.blank += 1;
        } else {
            self.records.push(RawRecord {
                line,
                value: Ok(value.to_vec()),
            });
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn is_blank(value: &[u8]) -> bool {
    value.iter().all(u8::is_ascii_whitespace)
}

/// Read column `column` of the CSV file at `path`.
///
/// Missing or unreadable files, a missing header row, or a header without
/// the requested column are `InputFormat` errors.
pub fn read_column(path: &Path, column: usize) -> HashmatchResult<ColumnRecords> {
    let file = std::fs::File::open(path)
        .map_err(|e| HashmatchError::InputFormat(format!("opening {}: {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header_len = reader
        .byte_headers()
        .map_err(|e| {
            HashmatchError::InputFormat(format!("reading header of {}: {e}", path.display()))
        })?
        .len();
    if header_len == 0 {
        return Err(HashmatchError::InputFormat(format!(
            "missing header row: {}",
            path.display()
        )));
    }
    if column >= header_len {
        return Err(HashmatchError::InputFormat(format!(
            "{}: column {column} requested but header has {header_len} column(s)",
            path.display()
        )));
    }

    let mut out = ColumnRecords {
        source: path.display().to_string(),
        ..Default::default()
    };

    for (idx, result) in reader.byte_records().enumerate() {
        let record = result
            .map_err(|e| HashmatchError::InputFormat(format!("reading {}: {e}", path.display())))?;
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);

        match record.get(column) {
            Some(value) => out.push_value(line, value),
            None => out.records.push(RawRecord {
                line,
                value: Err(RecordIssue::new(
                    line,
                    IssueKind::MissingColumn,
                    format!("row has {} field(s), need column {column}", record.len()),
                )),
            }),
        }
    }

    tracing::debug!(
        source = %out.source,
        records = out.records.len(),
        blank = out.blank,
        "read column"
    );
    Ok(out)
}

/// Write `header` then one row per value to `path`, returning the number of values written.
///
/// With `atomic`, the data goes to a temp file in the destination directory
/// that is renamed over `path` only after a successful flush and fsync.
pub fn write_column<I, S>(path: &Path, header: &str, values: I, atomic: bool) -> HashmatchResult<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let output_err =
        |e: &dyn std::fmt::Display| HashmatchError::OutputWrite(format!("{}: {e}", path.display()));

    if !atomic {
        let file = std::fs::File::create(path).map_err(|e| output_err(&e))?;
        return write_rows(std::io::BufWriter::new(file), header, values).map_err(|e| output_err(&e));
    }

    let dir = parent_dir(path);
    let mut tmp = tempfile::Builder::new()
        .prefix(".hashmatch-")
        .suffix(".tmp")
        .tempfile_in(&dir)
        .map_err(|e| output_err(&e))?;

    let written = write_rows(&mut tmp, header, values).map_err(|e| output_err(&e))?;
    tmp.as_file().sync_all().map_err(|e| output_err(&e))?;
    tmp.persist(path).map_err(|e| output_err(&e.error))?;
    Ok(written)
}

fn write_rows<W, I, S>(writer: W, header: &str, values: I) -> csv::Result<u64>
where
    W: Write,
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([header])?;
    let mut written = 0u64;
    for value in values {
        writer.write_record([value.as_ref()])?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

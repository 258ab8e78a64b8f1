// src/repair/mod.rs
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::RepairError;

pub mod row;

pub use row::{normalize_row, RowOutcome};

/// Column whose populated value is followed by the spurious empty field.
pub const TARGET_COLUMN: &str = "address2";

/// Progress is redrawn once per this many data rows.
pub const PROGRESS_EVERY: u64 = 100;

/// Width and repair position derived from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub expected_columns: usize,
    pub target_index: usize,
}

impl ColumnLayout {
    /// Locate `column` in `header`. The match is exact and case-sensitive.
    pub fn from_header<S: AsRef<str>>(header: &[S], column: &str) -> Result<Self, RepairError> {
        let target_index = header
            .iter()
            .position(|h| h.as_ref() == column)
            .ok_or_else(|| RepairError::MissingColumn {
                column: column.to_string(),
            })?;
        Ok(Self {
            expected_columns: header.len(),
            target_index,
        })
    }
}

/// Summary of one repair run.
#[derive(Debug, Clone, Serialize)]
pub struct RepairReport {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Data rows read, header excluded.
    pub rows_processed: u64,
    /// Rows that matched the shifted-`address2` pattern, whether or not they
    /// were written.
    pub rows_repaired: u64,
    /// Long rows cut down to the header width.
    pub rows_truncated: u64,
    /// Rows that could not be brought to the header width and were not written.
    pub rows_dropped: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub processing_start: DateTime<Utc>,
    pub processing_end: DateTime<Utc>,
}

impl RepairReport {
    pub fn rows_written(&self) -> u64 {
        self.rows_processed - self.rows_dropped
    }

    pub fn input_mb(&self) -> f64 {
        self.input_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn output_mb(&self) -> f64 {
        self.output_bytes as f64 / (1024.0 * 1024.0)
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, RepairError> {
    let file = File::open(path).map_err(|source| RepairError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // malformed rows are the whole point
        .from_reader(file))
}

fn record_to_vec(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_owned).collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
}

/// Count empty lines after the header that sit outside quoted fields.
///
/// The CSV reader skips these without yielding a record. They are still data
/// rows of width zero, so they count as processed and dropped.
pub fn count_blank_lines<P: AsRef<Path>>(path: P) -> Result<u64, RepairError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| RepairError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut state = ScanState::FieldStart;
    let (mut line_has_content, mut header_done) = (false, false);
    let mut blanks = 0u64;
    for byte in BufReader::new(file).bytes() {
        let b = byte?;
        if state == ScanState::Quoted {
            if b == b'"' {
                state = ScanState::QuoteInQuoted;
            }
            continue;
        }
        match b {
            b'\n' => {
                if !line_has_content && header_done {
                    blanks += 1;
                }
                header_done |= line_has_content;
                line_has_content = false;
                state = ScanState::FieldStart;
            }
            b'\r' => {}
            b'"' if state == ScanState::FieldStart || state == ScanState::QuoteInQuoted => {
                // opening quote, or the second half of an escaped `""`
                line_has_content = true;
                state = ScanState::Quoted;
            }
            b',' => {
                line_has_content = true;
                state = ScanState::FieldStart;
            }
            _ => {
                line_has_content = true;
                state = ScanState::Unquoted;
            }
        }
    }
    Ok(blanks)
}

/// Count data rows (header excluded) for progress reporting. Blank lines
/// count as rows.
pub fn count_data_rows<P: AsRef<Path>>(path: P) -> Result<u64, RepairError> {
    let mut rdr = open_reader(path.as_ref())?;
    let mut record = StringRecord::new();
    let mut total = 0u64;
    while rdr.read_record(&mut record)? {
        total += 1;
    }
    Ok(total + count_blank_lines(path)?)
}

/// Progress bar sized to `total` rows, drawn on stderr.
pub fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("Processing records: {pos}/{len} ({percent}%)")
            .expect("progress template should parse"),
    );
    pb
}

/// Repair `input` into `output` without drawing progress.
pub fn repair_csv<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> Result<RepairReport, RepairError> {
    repair_csv_with_progress(input, output, &ProgressBar::hidden())
}

/// Read `input`, normalize every data row to the header width and write the
/// header plus all accepted rows, in input order, to `output`.
///
/// Fails with [`RepairError::MissingColumn`] before `output` is created when
/// the header has no `address2` column.
#[tracing::instrument(
    level = "info",
    skip(input, output, pb),
    fields(src = %input.as_ref().display(), dst = %output.as_ref().display())
)]
pub fn repair_csv_with_progress<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    pb: &ProgressBar,
) -> Result<RepairReport, RepairError> {
    let input = input.as_ref();
    let output = output.as_ref();
    let processing_start = Utc::now();

    // 1) header and layout
    let mut rdr = open_reader(input)?;
    let header = record_to_vec(rdr.headers()?);
    let layout = ColumnLayout::from_header(&header, TARGET_COLUMN)?;
    debug!(
        columns = layout.expected_columns,
        target_index = layout.target_index,
        "header parsed"
    );

    // 2) pre-scan, only for the progress denominator
    let total_rows = count_data_rows(input)?;
    pb.set_length(total_rows);

    // 3) normalize in order
    let mut accepted: Vec<Vec<String>> = Vec::with_capacity(total_rows as usize);
    let (mut processed, mut repaired, mut truncated, mut dropped) = (0u64, 0u64, 0u64, 0u64);
    let mut record = StringRecord::new();
    while rdr.read_record(&mut record)? {
        processed += 1;
        match normalize_row(record_to_vec(&record), &layout) {
            RowOutcome::Kept(r) => accepted.push(r),
            RowOutcome::Repaired(r) => {
                repaired += 1;
                accepted.push(r);
            }
            RowOutcome::Truncated(r) => {
                truncated += 1;
                debug!(row = processed, fields = record.len(), "truncated long row");
                accepted.push(r);
            }
            RowOutcome::RepairedButDropped => {
                repaired += 1;
                dropped += 1;
                debug!(
                    row = processed,
                    fields = record.len(),
                    "dropped row still too wide after repair"
                );
            }
            RowOutcome::Dropped => {
                dropped += 1;
                debug!(row = processed, fields = record.len(), "dropped row");
            }
        }

        if processed % PROGRESS_EVERY == 0 {
            pb.set_position(processed);
        }
    }

    // blank lines never reach the reader loop; they are zero-width rows
    let blanks = count_blank_lines(input)?;
    processed += blanks;
    dropped += blanks;
    if blanks > 0 {
        debug!(blanks, "dropped blank lines");
    }
    pb.set_position(processed);
    pb.finish();

    // 4) write header + accepted rows
    let mut wtr = WriterBuilder::new().from_path(output)?;
    wtr.write_record(&header)?;
    for r in &accepted {
        wtr.write_record(r)?;
    }
    wtr.flush()?;
    drop(wtr);

    let report = RepairReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows_processed: processed,
        rows_repaired: repaired,
        rows_truncated: truncated,
        rows_dropped: dropped,
        input_bytes: fs::metadata(input)?.len(),
        output_bytes: fs::metadata(output)?.len(),
        processing_start,
        processing_end: Utc::now(),
    };
    info!(processed, repaired, truncated, dropped, "repair complete");
    Ok(report)
}

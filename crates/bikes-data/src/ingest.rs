//! Land a source export in the raw area under a dated name.
//!
//! The source is decoded once (UTF-8, Latin-1 fallback) and re-written as
//! UTF-8 so every later stage reads a single encoding.

use std::fs;
use std::path::{Path, PathBuf};

use bikes_core::error::{PipelineError, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::reader::{decode_file, parse_csv_text, SourceEncoding};

/// Traffic columns whose presence is reported after ingest.
pub const EXPECTED_COLUMNS: &[&str] = &[
    "timestamp",
    "count",
    "counter_id",
    "location",
    "bike",
    "car",
    "vehicle",
];

/// Outcome of one ingest.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub output_path: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
    /// Subset of [`EXPECTED_COLUMNS`] present in the source.
    pub found_expected: Vec<String>,
    pub encoding: SourceEncoding,
}

/// `<prefix>YYYYMMDD.csv`
pub fn raw_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}{}.csv", prefix, date.format("%Y%m%d"))
}

/// Copy `source` into `raw_dir` as `<prefix><date>.csv`, re-encoded as
/// UTF-8. An existing file for the same date is replaced.
pub fn ingest_file(source: &Path, raw_dir: &Path, prefix: &str, date: NaiveDate) -> Result<IngestReport> {
    info!("Fetching data from: {}", source.display());

    let decoded = decode_file(source)?;
    let table = parse_csv_text(&decoded.text)?;

    info!(
        "Successfully loaded {} rows with columns: {:?}",
        table.len(),
        table.headers
    );

    let found_expected: Vec<String> = EXPECTED_COLUMNS
        .iter()
        .filter(|c| table.has_column(c))
        .map(|c| c.to_string())
        .collect();
    info!("Found expected columns: {:?}", found_expected);

    fs::create_dir_all(raw_dir).map_err(|source| PipelineError::FileWrite {
        path: raw_dir.to_path_buf(),
        source,
    })?;
    let output_path = raw_dir.join(raw_file_name(prefix, date));
    let tmp_path = output_path.with_extension("csv.tmp");
    fs::write(&tmp_path, decoded.text.as_bytes()).map_err(|source| PipelineError::FileWrite {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, &output_path).map_err(|source| PipelineError::FileWrite {
        path: output_path.clone(),
        source,
    })?;

    info!("Wrote {} ({} rows)", output_path.display(), table.len());

    Ok(IngestReport {
        output_path,
        rows: table.len(),
        columns: table.headers,
        found_expected,
        encoding: decoded.encoding,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

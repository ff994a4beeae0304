//! CSV discovery and loading.
//!
//! Source exports arrive as UTF-8 or Latin-1; bytes are decoded once with a
//! single Latin-1 fallback and then parsed into a [`RawTable`].

use std::path::{Path, PathBuf};

use bikes_core::error::{PipelineError, Result};
use bikes_core::models::RawTable;
use regex::Regex;
use tracing::{debug, info, warn};

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encoding a source file was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Latin1,
}

/// A source file decoded to text.
#[derive(Debug, Clone)]
pub struct DecodedSource {
    pub text: String,
    pub encoding: SourceEncoding,
}

/// Decode raw bytes as UTF-8, falling back to Latin-1.
///
/// A leading UTF-8 byte-order mark is stripped. The Latin-1 fallback is
/// rejected when it yields C0 control characters other than tab, CR and LF,
/// which marks the input as binary rather than text.
pub fn decode_bytes(bytes: &[u8]) -> Option<DecodedSource> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(DecodedSource {
            text: text.to_string(),
            encoding: SourceEncoding::Utf8,
        });
    }

    let binary = bytes
        .iter()
        .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'));
    if binary {
        return None;
    }

    // Latin-1 maps every byte to the code point of the same value.
    Some(DecodedSource {
        text: bytes.iter().map(|&b| b as char).collect(),
        encoding: SourceEncoding::Latin1,
    })
}

/// Read and decode a source file.
pub fn decode_file(path: &Path) -> Result<DecodedSource> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    let bytes = std::fs::read(path).map_err(|source| PipelineError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded = decode_bytes(&bytes).ok_or_else(|| PipelineError::Encoding {
        path: path.to_path_buf(),
    })?;
    if decoded.encoding == SourceEncoding::Latin1 {
        warn!(
            "{} is not valid UTF-8; decoded as Latin-1",
            path.display()
        );
    }
    Ok(decoded)
}

// ── CSV parsing ───────────────────────────────────────────────────────────────

/// Parse header-led CSV text into a [`RawTable`].
///
/// Cells are trimmed and rows may have fewer or more cells than the header.
pub fn parse_csv_text(text: &str) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut cells: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        // A blank line inside the file yields a single empty field.
        if record.len() == 1 && record.get(0).map(str::is_empty).unwrap_or(true) {
            continue;
        }
        cells.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable::from_cells(headers, cells))
}

/// Read a source export from disk into a [`RawTable`].
pub fn read_raw_table(path: &Path) -> Result<RawTable> {
    let decoded = decode_file(path)?;
    let table = parse_csv_text(&decoded.text)?;
    info!(
        rows = table.len(),
        "Input columns for {}: {:?}",
        path.display(),
        table.headers
    );
    Ok(table)
}

// ── File discovery ────────────────────────────────────────────────────────────

/// Find the most recent dated export `<prefix>YYYYMMDD.<extension>` directly
/// inside `dir`.
///
/// Dates are compared lexicographically, which matches chronological order
/// for the fixed-width stamp.
pub fn find_latest_file(dir: &Path, prefix: &str, extension: &str) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(PipelineError::NoRawFiles(dir.to_path_buf()));
    }

    let pattern = format!(
        r"^{}(\d{{8}})\.{}$",
        regex::escape(prefix),
        regex::escape(extension)
    );
    let re = Regex::new(&pattern).map_err(|e| PipelineError::Config(e.to_string()))?;

    let latest = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let stamp = re.captures(&name)?.get(1)?.as_str().to_string();
            Some((stamp, entry.into_path()))
        })
        .max_by(|a, b| a.0.cmp(&b.0));

    match latest {
        Some((stamp, path)) => {
            debug!("latest raw export {} (stamp {})", path.display(), stamp);
            Ok(path)
        }
        None => Err(PipelineError::NoRawFiles(dir.to_path_buf())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! CSV output and the dashboard-side table loader.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use bikes_core::error::{PipelineError, Result};
use bikes_core::models::{DailyAggregate, DashboardRecord};
use bikes_core::time_utils::parse_day;
use serde::Serialize;
use tracing::{info, warn};

use crate::reader::decode_file;

// ── Writing ───────────────────────────────────────────────────────────────────

/// Serialize `rows` as CSV to `out_dir/file_name`, replacing any existing
/// file.
pub fn write_records<T: Serialize>(out_dir: &Path, file_name: &str, rows: &[T]) -> Result<PathBuf> {
    write_atomic(out_dir, file_name, |writer| {
        for row in rows {
            writer.serialize(row)?;
        }
        Ok(())
    })
}

/// Write the `day,counter_key,total` output table.
pub fn write_daily_aggregates(
    out_dir: &Path,
    file_name: &str,
    rows: &[DailyAggregate],
) -> Result<PathBuf> {
    let path = write_atomic(out_dir, file_name, |writer| {
        // `serialize` only emits the header with the first row.
        if rows.is_empty() {
            writer.write_record(["day", "counter_key", "total"])?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        Ok(())
    })?;
    info!(rows = rows.len(), "Processed data saved to {}", path.display());
    Ok(path)
}

/// Fill a sibling temp file and rename it into place so a reader never sees
/// a half-written table.
fn write_atomic<F>(out_dir: &Path, file_name: &str, fill: F) -> Result<PathBuf>
where
    F: FnOnce(&mut csv::Writer<fs::File>) -> Result<()>,
{
    fs::create_dir_all(out_dir).map_err(|source| PipelineError::FileWrite {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let path = out_dir.join(file_name);
    let tmp_path = path.with_extension("csv.tmp");

    let filled = csv::Writer::from_path(&tmp_path)
        .map_err(PipelineError::from)
        .and_then(|mut writer| {
            fill(&mut writer)?;
            writer.flush().map_err(|source| PipelineError::FileWrite {
                path: tmp_path.clone(),
                source,
            })
        });
    if let Err(err) = filled {
        // The temp file may be missing if creating it was what failed.
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }

    fs::rename(&tmp_path, &path).map_err(|source| PipelineError::FileWrite {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

// ── Dashboard loading ─────────────────────────────────────────────────────────

/// Load an aggregate table, with whatever enrichment columns it carries, for
/// the dashboard.
///
/// `day` (or `date`), `counter_key` (or `location`) and `total` (or
/// `count`) are required. Rows whose required cells do not parse are
/// skipped with a warning; the optional columns become `None` when absent or
/// unparsable.
pub fn read_dashboard_records(path: &Path) -> Result<Vec<DashboardRecord>> {
    let decoded = decode_file(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(decoded.text.as_bytes());

    let index: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_lowercase(), i))
        .collect();
    let col = |names: &[&str]| names.iter().find_map(|n| index.get(*n).copied());

    let (day_idx, key_idx, total_idx) = match (
        col(&["day", "date"]),
        col(&["counter_key", "location"]),
        col(&["total", "count"]),
    ) {
        (Some(d), Some(k), Some(t)) => (d, k, t),
        _ => {
            let mut columns: Vec<String> = index.keys().cloned().collect();
            columns.sort();
            return Err(PipelineError::UnresolvableSchema { columns });
        }
    };
    let year_idx = col(&["year"]);
    let month_idx = col(&["month"]);
    let month_name_idx = col(&["month_name"]);
    let weekday_idx = col(&["weekday"]);
    let season_idx = col(&["season"]);
    let temperature_idx = col(&["temperature"]);
    let condition_idx = col(&["weather_condition"]);
    let precipitation_idx = col(&["precipitation"]);
    let wind_idx = col(&["wind_speed"]);

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for record in reader.records() {
        let record = record?;
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
        };
        let text = |idx: Option<usize>| cell(idx).map(str::to_string);
        let float = |idx: Option<usize>| {
            cell(idx)
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|f| f.is_finite())
        };

        let day = cell(Some(day_idx)).and_then(parse_day);
        let key = text(Some(key_idx));
        let total = cell(Some(total_idx)).and_then(parse_total);

        let (day, counter_key, total) = match (day, key, total) {
            (Some(d), Some(k), Some(t)) => (d, k, t),
            _ => {
                skipped += 1;
                continue;
            }
        };

        records.push(DashboardRecord {
            day,
            counter_key,
            total,
            year: cell(year_idx).and_then(|s| s.parse().ok()),
            month: cell(month_idx).and_then(|s| s.parse().ok()),
            month_name: text(month_name_idx),
            weekday: text(weekday_idx),
            season: text(season_idx),
            temperature: float(temperature_idx),
            weather_condition: text(condition_idx),
            precipitation: float(precipitation_idx),
            wind_speed: float(wind_idx),
        });
    }

    if skipped > 0 {
        warn!(
            skipped,
            "skipped unparsable rows in {}",
            path.display()
        );
    }
    info!(rows = records.len(), "Loaded {}", path.display());
    Ok(records)
}

/// Totals may have been written as floats by other tools.
fn parse_total(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Schema-branch normalization to [`CanonicalRecord`]s.
//!
//! The time-series branch parses observed timestamps; the snapshot branch
//! stamps every AADT row with one synthetic calendar day. In both branches a
//! row whose timestamp or count cannot be parsed is dropped and counted,
//! never treated as a file-level failure.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use bikes_core::error::{PipelineError, Result};
use bikes_core::models::{
    CanonicalRecord, DropReason, DropSummary, RawRecord, RawTable, RawValue, SchemaKind, UNKNOWN,
};
use bikes_core::time_utils::{parse_timestamp, start_of_day};

use crate::inference::{InferredColumns, SnapshotCount};

// ── Public types ──────────────────────────────────────────────────────────────

/// Knobs for normalization that come from the pipeline config.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Calendar day assigned to every snapshot row.
    pub snapshot_date: NaiveDate,
}

/// Result of one normalization pass.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    pub schema: SchemaKind,
    /// Column the counts were read from.
    pub count_column: String,
    pub records: Vec<CanonicalRecord>,
    pub drops: DropSummary,
    pub rows_read: usize,
}

// ── normalize ─────────────────────────────────────────────────────────────────

/// Normalize `table` along the branch selected by `inferred`.
///
/// Fails only when no schema can be resolved; row-level failures are
/// reported through [`NormalizedBatch::drops`].
pub fn normalize(
    table: &RawTable,
    inferred: &InferredColumns,
    options: &NormalizeOptions,
) -> Result<NormalizedBatch> {
    let batch = match inferred.schema()? {
        SchemaKind::Snapshot => normalize_snapshot(table, inferred, options)?,
        SchemaKind::TimeSeries => normalize_time_series(table, inferred)?,
    };

    if !batch.drops.is_empty() {
        warn!(
            dropped = batch.drops.total(),
            rows = batch.rows_read,
            "dropped rows during normalization: {}",
            batch.drops
        );
    }
    debug!(
        "normalized {} of {} rows ({})",
        batch.records.len(),
        batch.rows_read,
        batch.schema
    );
    Ok(batch)
}

// ── Snapshot branch ───────────────────────────────────────────────────────────

fn normalize_snapshot(
    table: &RawTable,
    inferred: &InferredColumns,
    options: &NormalizeOptions,
) -> Result<NormalizedBatch> {
    info!("Processing AADT data...");

    let (count_col, source) =
        inferred
            .snapshot_count()
            .ok_or_else(|| PipelineError::UnresolvableSchema {
                columns: inferred.available.clone(),
            })?;
    if source == SnapshotCount::NumericFallback {
        info!("Using numeric column as count: {}", count_col);
    }

    warn!(
        "AADT rows carry no observation date; assigning synthetic day {}",
        options.snapshot_date
    );
    let timestamp = start_of_day(options.snapshot_date);

    let street = inferred.street_name.as_deref();
    let id_fallback = [street, inferred.secondary_id.as_deref()];
    let name_fallback = [inferred.description.as_deref(), street];

    let mut records = Vec::with_capacity(table.len());
    let mut drops = DropSummary::default();

    for row in &table.rows {
        let count = match cast_count(row.get(count_col)) {
            Ok(c) => c,
            Err(reason) => {
                drops.record(reason);
                continue;
            }
        };
        records.push(CanonicalRecord {
            timestamp,
            counter_id: coalesce_text(row, &id_fallback),
            counter_name: coalesce_text(row, &name_fallback),
            count,
        });
    }

    Ok(NormalizedBatch {
        schema: SchemaKind::Snapshot,
        count_column: count_col.to_string(),
        records,
        drops,
        rows_read: table.len(),
    })
}

// ── Time-series branch ────────────────────────────────────────────────────────

fn normalize_time_series(table: &RawTable, inferred: &InferredColumns) -> Result<NormalizedBatch> {
    let (ts_col, count_col) = match (inferred.timestamp.as_deref(), inferred.count.as_deref()) {
        (Some(ts), Some(cnt)) => (ts, cnt),
        _ => {
            return Err(PipelineError::UnresolvableSchema {
                columns: inferred.available.clone(),
            })
        }
    };
    let id_col = [inferred.counter_id.as_deref()];
    let name_col = [inferred.counter_name.as_deref()];

    let mut records = Vec::with_capacity(table.len());
    let mut drops = DropSummary::default();

    for row in &table.rows {
        let timestamp: DateTime<Utc> = match row.get(ts_col).and_then(parse_timestamp) {
            Some(ts) => ts,
            None => {
                drops.record(DropReason::UnparsableTimestamp);
                continue;
            }
        };
        let count = match cast_count(row.get(count_col)) {
            Ok(c) => c,
            Err(reason) => {
                drops.record(reason);
                continue;
            }
        };
        records.push(CanonicalRecord {
            timestamp,
            counter_id: coalesce_text(row, &id_col),
            counter_name: coalesce_text(row, &name_col),
            count,
        });
    }

    Ok(NormalizedBatch {
        schema: SchemaKind::TimeSeries,
        count_column: count_col.to_string(),
        records,
        drops,
        rows_read: table.len(),
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Cast a count cell, classifying the failure.
fn cast_count(value: Option<&RawValue>) -> std::result::Result<i64, DropReason> {
    match value {
        None | Some(RawValue::Null) => Err(DropReason::MissingCount),
        Some(v) => v.as_count().ok_or(DropReason::UnparsableCount),
    }
}

/// First non-null text among `columns` (skipping unmatched ones), else
/// [`UNKNOWN`].
fn coalesce_text(row: &RawRecord, columns: &[Option<&str>]) -> String {
    columns
        .iter()
        .flatten()
        .find_map(|col| row.get(*col).and_then(RawValue::as_text))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::infer_columns;
    use bikes_core::columns::ColumnCandidates;
    use chrono::TimeZone;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::from_cells(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn options() -> NormalizeOptions {
        NormalizeOptions {
            snapshot_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    fn run(t: &RawTable) -> Result<NormalizedBatch> {
        let inferred = infer_columns(t, &ColumnCandidates::default());
        normalize(t, &inferred, &options())
    }

    // ── time-series ───────────────────────────────────────────────────────────

    #[test]
    fn test_time_series_defaults_to_unknown_identity() {
        let t = table(
            &["date", "bike"],
            &[&["2024-01-01", "10"], &["2024-01-01", "15"], &["2024-01-02", "7"]],
        );
        let batch = run(&t).unwrap();
        assert_eq!(batch.schema, SchemaKind::TimeSeries);
        assert_eq!(batch.count_column, "bike");
        assert_eq!(batch.records.len(), 3);
        assert!(batch.drops.is_empty());
        for r in &batch.records {
            assert_eq!(r.counter_id, UNKNOWN);
            assert_eq!(r.counter_name, UNKNOWN);
        }
        assert_eq!(batch.records[2].count, 7);
    }

    #[test]
    fn test_time_series_uses_id_and_name_verbatim() {
        let t = table(
            &["timestamp", "count", "counter_id", "counter_name"],
            &[&["2024-05-01T07:15:00Z", "42", "007", "Dronning Louises Bro"]],
        );
        let batch = run(&t).unwrap();
        let r = &batch.records[0];
        assert_eq!(r.counter_id, "007");
        assert_eq!(r.counter_name, "Dronning Louises Bro");
        assert_eq!(r.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 7, 15, 0).unwrap());
        assert_eq!(r.count, 42);
    }

    #[test]
    fn test_time_series_drops_bad_rows_with_reasons() {
        let t = table(
            &["timestamp", "count"],
            &[
                &["2024-01-01 08:00:00", "5"],
                &["yesterday", "5"],
                &["", "5"],
                &["2024-01-01 09:00:00", "many"],
                &["2024-01-01 10:00:00", ""],
                &["2024-01-01 11:00:00", "2.9"],
            ],
        );
        let batch = run(&t).unwrap();
        assert_eq!(batch.rows_read, 6);
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.records[1].count, 2);
        assert_eq!(batch.drops.get(DropReason::UnparsableTimestamp), 2);
        assert_eq!(batch.drops.get(DropReason::UnparsableCount), 1);
        assert_eq!(batch.drops.get(DropReason::MissingCount), 1);
        assert_eq!(batch.drops.total(), 4);
    }

    #[test]
    fn test_time_series_empty_id_cell_is_unknown() {
        let t = table(
            &["timestamp", "count", "site_id", "location"],
            &[&["2024-01-01", "3", "", "Langebro"]],
        );
        let batch = run(&t).unwrap();
        assert_eq!(batch.records[0].counter_id, UNKNOWN);
        assert_eq!(batch.records[0].counter_key(), "Langebro");
    }

    #[test]
    fn test_time_series_compact_date_cells_are_calendar_days() {
        let t = table(&["dato", "antal"], &[&["20240101", "10"], &["20240102", "7"]]);
        let batch = run(&t).unwrap();
        assert_eq!(batch.schema, SchemaKind::TimeSeries);
        assert!(batch.drops.is_empty());
        let days: Vec<NaiveDate> = batch.records.iter().map(|r| r.day()).collect();
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            ]
        );
        assert_eq!(batch.records[0].count, 10);
        assert_eq!(batch.records[1].count, 7);
    }

    #[test]
    fn test_time_series_drops_integer_timestamps_that_are_not_dates() {
        let t = table(
            &["dato", "antal"],
            &[
                &["17", "5"],
                &["900000000", "5"],
                &["20241301", "5"],
                &["1704067200", "5"],
            ],
        );
        let batch = run(&t).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(
            batch.records[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(batch.drops.get(DropReason::UnparsableTimestamp), 3);
        assert_eq!(batch.drops.total(), 3);
    }

    #[test]
    fn test_time_series_numeric_looking_ids_stay_verbatim() {
        let t = table(
            &["timestamp", "count", "counter_id"],
            &[
                &["2024-01-01", "1", "12.10"],
                &["2024-01-01", "2", "12.1"],
                &["2024-01-01", "3", "12345678901234567891"],
                &["2024-01-01", "4", "1e3"],
                &["2024-01-01", "5", "1000"],
            ],
        );
        let batch = run(&t).unwrap();
        let keys: Vec<&str> = batch.records.iter().map(|r| r.counter_key()).collect();
        assert_eq!(
            keys,
            vec!["12.10", "12.1", "12345678901234567891", "1e3", "1000"]
        );
        let distinct: std::collections::BTreeSet<&str> = keys.iter().copied().collect();
        assert_eq!(distinct.len(), 5);
    }

    // ── snapshot ──────────────────────────────────────────────────────────────

    #[test]
    fn test_snapshot_uses_synthetic_date_and_street_name() {
        let t = table(&["vejnavn", "aadt_bike"], &[&["Nørrebrogade", "500"]]);
        let batch = run(&t).unwrap();
        assert_eq!(batch.schema, SchemaKind::Snapshot);
        let r = &batch.records[0];
        assert_eq!(r.timestamp, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(r.counter_id, "Nørrebrogade");
        assert_eq!(r.counter_name, "Nørrebrogade");
        assert_eq!(r.count, 500);
    }

    #[test]
    fn test_snapshot_identity_fallbacks() {
        let t = table(
            &["t_nr", "vejnavn", "beskrivelse", "aadt_total"],
            &[
                &["101", "Amagerbrogade", "ved Lergravsvej", "900"],
                &["102", "", "", "800"],
                &["", "", "", "700"],
            ],
        );
        let batch = run(&t).unwrap();
        let ids: Vec<&str> = batch.records.iter().map(|r| r.counter_id.as_str()).collect();
        let names: Vec<&str> = batch
            .records
            .iter()
            .map(|r| r.counter_name.as_str())
            .collect();
        assert_eq!(ids, vec!["Amagerbrogade", "102", UNKNOWN]);
        assert_eq!(names, vec!["ved Lergravsvej", UNKNOWN, UNKNOWN]);
    }

    #[test]
    fn test_snapshot_keeps_only_non_null_counts() {
        let t = table(
            &["vejnavn", "aadt_bike", "aadt_car"],
            &[&["A", "10", "1"], &["B", "", "2"], &["C", "n/a", "3"], &["D", "40", ""]],
        );
        let batch = run(&t).unwrap();
        // bike outranks car, so car values never fill a missing bike count.
        assert_eq!(batch.count_column, "aadt_bike");
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.drops.get(DropReason::MissingCount), 1);
        assert_eq!(batch.drops.get(DropReason::UnparsableCount), 1);
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(batch.records.iter().all(|r| r.day() == day));
    }

    #[test]
    fn test_snapshot_numeric_fallback() {
        let t = table(
            &["vejnavn", "hverdagsdøgn"],
            &[&["Gothersgade", "3100"], &["Bredgade", "1250.6"]],
        );
        let batch = run(&t).unwrap();
        assert_eq!(batch.schema, SchemaKind::Snapshot);
        assert_eq!(batch.count_column, "hverdagsdøgn");
        assert_eq!(batch.records[1].count, 1250);
    }

    #[test]
    fn test_snapshot_date_is_configurable() {
        let t = table(&["vejnavn", "aadt_bike"], &[&["Nørrebrogade", "500"]]);
        let inferred = infer_columns(&t, &ColumnCandidates::default());
        let opts = NormalizeOptions {
            snapshot_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        };
        let batch = normalize(&t, &inferred, &opts).unwrap();
        assert_eq!(
            batch.records[0].day(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );
    }

    // ── unresolvable ──────────────────────────────────────────────────────────

    #[test]
    fn test_unresolvable_schema_is_fatal() {
        let t = table(&["notes", "comment"], &[&["a", "b"]]);
        assert!(matches!(
            run(&t),
            Err(PipelineError::UnresolvableSchema { .. })
        ));
    }
}

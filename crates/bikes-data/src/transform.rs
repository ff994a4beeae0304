//! One batch run: read → infer → normalize → aggregate → write.

use std::path::{Path, PathBuf};

use bikes_core::error::Result;
use bikes_core::models::{DropSummary, SchemaKind};
use bikes_core::settings::PipelineConfig;
use tracing::info;

use crate::aggregator::DailyAggregator;
use crate::inference::infer_columns;
use crate::normalizer::{normalize, NormalizeOptions};
use crate::reader::read_raw_table;
use crate::writer::write_daily_aggregates;

/// What a transform run produced.
#[derive(Debug, Clone)]
pub struct TransformReport {
    pub output_path: PathBuf,
    pub schema: SchemaKind,
    pub rows_read: usize,
    /// Rows that survived normalization.
    pub records: usize,
    /// Rows written to the output table.
    pub aggregates: usize,
    pub grand_total: i64,
    pub drops: DropSummary,
}

/// Transform `input` into `out_dir/<output_file_name>`.
///
/// Every fatal condition (missing input, undecodable bytes, unresolvable
/// schema) surfaces before the writer runs, so a failed run leaves no output
/// behind.
pub fn run_transform(input: &Path, out_dir: &Path, config: &PipelineConfig) -> Result<TransformReport> {
    info!("Transforming {}", input.display());

    let table = read_raw_table(input)?;
    let inferred = infer_columns(&table, &config.columns);
    let options = NormalizeOptions {
        snapshot_date: config.snapshot_date,
    };
    let batch = normalize(&table, &inferred, &options)?;

    let rows = DailyAggregator::aggregate(&batch.records);
    let totals = DailyAggregator::totals(&rows);
    let output_path = write_daily_aggregates(out_dir, &config.output_file_name, &rows)?;

    info!(
        schema = %batch.schema,
        rows_read = batch.rows_read,
        dropped = batch.drops.total(),
        days = totals.days,
        counters = totals.counters,
        "Transform complete: {} daily rows, total {}",
        rows.len(),
        totals.grand_total
    );

    Ok(TransformReport {
        output_path,
        schema: batch.schema,
        rows_read: batch.rows_read,
        records: batch.records.len(),
        aggregates: rows.len(),
        grand_total: totals.grand_total,
        drops: batch.drops,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use bikes_core::error::PipelineError;
    use tempfile::TempDir;

    fn write_input(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_time_series_scenario() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(
            tmp.path(),
            "in.csv",
            "date,bike\n2024-01-01,10\n2024-01-01,15\n2024-01-02,7\n",
        );
        let out = tmp.path().join("curated");

        let report = run_transform(&input, &out, &PipelineConfig::default()).unwrap();
        assert_eq!(report.schema, SchemaKind::TimeSeries);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.aggregates, 2);
        assert_eq!(report.grand_total, 32);
        assert_eq!(report.output_path, out.join("daily_counts.csv"));

        let content = std::fs::read_to_string(&report.output_path).unwrap();
        assert_eq!(
            content,
            "day,counter_key,total\n2024-01-01,unknown,25\n2024-01-02,unknown,7\n"
        );
    }

    #[test]
    fn test_snapshot_scenario() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "aadt.csv", "vejnavn,aadt_bike\nNørrebrogade,500\n");
        let out = tmp.path().join("curated");

        let report = run_transform(&input, &out, &PipelineConfig::default()).unwrap();
        assert_eq!(report.schema, SchemaKind::Snapshot);

        let content = std::fs::read_to_string(&report.output_path).unwrap();
        assert_eq!(content, "day,counter_key,total\n2024-01-01,Nørrebrogade,500\n");
    }

    #[test]
    fn test_unresolvable_schema_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(tmp.path(), "notes.csv", "notes,comment\na,b\n");
        let out = tmp.path().join("curated");

        let err = run_transform(&input, &out, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::UnresolvableSchema { .. }));
        assert!(err.to_string().contains("notes, comment"));
        assert!(!out.join("daily_counts.csv").exists());
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = run_transform(
            &tmp.path().join("absent.csv"),
            tmp.path(),
            &PipelineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_dropped_rows_are_reported() {
        let tmp = TempDir::new().unwrap();
        let input = write_input(
            tmp.path(),
            "in.csv",
            "timestamp,count,counter_id\n\
             2024-01-01 08:00:00,5,C1\n\
             garbage,5,C1\n\
             2024-01-01 09:00:00,,C1\n",
        );
        let report = run_transform(&input, tmp.path(), &PipelineConfig::default()).unwrap();
        assert_eq!(report.records, 1);
        assert_eq!(report.drops.total(), 2);
        assert_eq!(report.grand_total, 5);
    }
}

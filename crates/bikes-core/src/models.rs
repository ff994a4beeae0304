use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Sentinel used for counter identifiers and names that cannot be recovered
/// from the source export.
pub const UNKNOWN: &str = "unknown";

// ── RawValue ──────────────────────────────────────────────────────────────────

/// A single cell of a source export, typed on read.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Empty (or whitespace-only) cell.
    Null,
    /// Whole number whose canonical rendering matches the source text.
    Integer(i64),
    /// Finite floating-point number, with the trimmed source text so
    /// identifiers such as `12.10` survive unchanged.
    Float { value: f64, raw: String },
    /// Anything else, kept verbatim (trimmed).
    Text(String),
}

impl RawValue {
    /// Type a raw CSV cell.
    ///
    /// Integers are only recognised when they round-trip unchanged, so
    /// identifiers such as `"007"` stay textual.
    pub fn parse(cell: &str) -> Self {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return RawValue::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return if i.to_string() == trimmed {
                RawValue::Integer(i)
            } else {
                RawValue::Text(trimmed.to_string())
            };
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return RawValue::Float {
                    value: f,
                    raw: trimmed.to_string(),
                };
            }
        }
        RawValue::Text(trimmed.to_string())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Source text of the value, `None` for nulls.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Float { raw, .. } => Some(raw.clone()),
            RawValue::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric view of the value, parsing text where possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Null => None,
            RawValue::Integer(i) => Some(*i as f64),
            RawValue::Float { value, .. } => Some(*value),
            RawValue::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        }
    }

    /// Cast to an integer count.
    ///
    /// Floats are truncated toward zero; text is parsed as integer first and
    /// then as float. Values outside the `i64` range yield `None`.
    pub fn as_count(&self) -> Option<i64> {
        match self {
            RawValue::Null => None,
            RawValue::Integer(i) => Some(*i),
            RawValue::Float { value, .. } => truncate_to_i64(*value),
            RawValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate_to_i64))
            }
        }
    }
}

fn truncate_to_i64(f: f64) -> Option<i64> {
    if !f.is_finite() {
        return None;
    }
    let t = f.trunc();
    if t < i64::MIN as f64 || t > i64::MAX as f64 {
        return None;
    }
    Some(t as i64)
}

// ── ColumnType ────────────────────────────────────────────────────────────────

/// Declared type of a column, inferred from all of its non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Every value is null.
    Empty,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

// ── RawRecord / RawTable ──────────────────────────────────────────────────────

/// One row of a source export keyed by lower-cased column name.
pub type RawRecord = HashMap<String, RawValue>;

/// A fully-read source export with an unknown column set.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Header names as they appear in the file.
    pub headers: Vec<String>,
    /// Lower-cased header names, same order as `headers`.
    pub columns: Vec<String>,
    pub rows: Vec<RawRecord>,
}

impl RawTable {
    /// Build a table from header names and rows of cell strings.
    ///
    /// Header names are lower-cased; when two headers collide after
    /// lower-casing, the first one wins. Rows shorter than the header are
    /// padded with nulls and extra cells are ignored.
    pub fn from_cells(headers: Vec<String>, cells: Vec<Vec<String>>) -> Self {
        let mut columns: Vec<String> = Vec::with_capacity(headers.len());
        let mut keep: Vec<bool> = Vec::with_capacity(headers.len());
        let mut seen: HashSet<String> = HashSet::new();

        for header in &headers {
            let lower = header.trim().to_lowercase();
            if seen.insert(lower.clone()) {
                columns.push(lower);
                keep.push(true);
            } else {
                tracing::warn!("duplicate column \"{}\" ignored", header);
                keep.push(false);
            }
        }

        let rows = cells
            .into_iter()
            .map(|row| {
                let mut record = RawRecord::with_capacity(columns.len());
                let mut col_idx = 0;
                for (i, kept) in keep.iter().enumerate() {
                    if !kept {
                        continue;
                    }
                    let value = row
                        .get(i)
                        .map(|cell| RawValue::parse(cell))
                        .unwrap_or(RawValue::Null);
                    record.insert(columns[col_idx].clone(), value);
                    col_idx += 1;
                }
                record
            })
            .collect();

        Self {
            headers,
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `true` when `column` (lower-cased) is part of the table.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Declared type of `column`, widening Integer → Float → Text as values
    /// are seen.
    pub fn column_type(&self, column: &str) -> ColumnType {
        let mut ty = ColumnType::Empty;
        for row in &self.rows {
            let cell = match row.get(column) {
                Some(v) => v,
                None => continue,
            };
            let cell_ty = match cell {
                RawValue::Null => continue,
                RawValue::Integer(_) => ColumnType::Integer,
                RawValue::Float { .. } => ColumnType::Float,
                RawValue::Text(_) => return ColumnType::Text,
            };
            ty = match (ty, cell_ty) {
                (ColumnType::Empty, t) => t,
                (ColumnType::Integer, ColumnType::Integer) => ColumnType::Integer,
                _ => ColumnType::Float,
            };
        }
        ty
    }
}

// ── SchemaKind ────────────────────────────────────────────────────────────────

/// The two source schemas a traffic export may follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Time-stamped observations (one row per counter reading).
    TimeSeries,
    /// Annual-average-daily-traffic snapshot (one row per location).
    Snapshot,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::TimeSeries => write!(f, "time-series"),
            SchemaKind::Snapshot => write!(f, "aadt-snapshot"),
        }
    }
}

// ── CanonicalRecord ───────────────────────────────────────────────────────────

/// A normalized observation ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRecord {
    pub timestamp: DateTime<Utc>,
    /// Counter identifier, [`UNKNOWN`] when not recoverable.
    pub counter_id: String,
    /// Human-readable counter name, [`UNKNOWN`] when not recoverable.
    pub counter_name: String,
    pub count: i64,
}

impl CanonicalRecord {
    /// Grouping key: the identifier when it was recovered from the source,
    /// otherwise the name, otherwise [`UNKNOWN`].
    pub fn counter_key(&self) -> &str {
        if self.counter_id != UNKNOWN {
            &self.counter_id
        } else if self.counter_name != UNKNOWN {
            &self.counter_name
        } else {
            UNKNOWN
        }
    }

    /// Calendar day (UTC) of the observation.
    pub fn day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

// ── DailyAggregate ────────────────────────────────────────────────────────────

/// One row of the persisted output: total count per day per counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub day: NaiveDate,
    pub counter_key: String,
    pub total: i64,
}

// ── Drop accounting ───────────────────────────────────────────────────────────

/// Why a row was excluded from normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    /// Timestamp cell empty or not parseable.
    UnparsableTimestamp,
    /// Count cell present but not castable to an integer.
    UnparsableCount,
    /// Count cell empty.
    MissingCount,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DropReason::UnparsableTimestamp => "unparsable timestamp",
            DropReason::UnparsableCount => "unparsable count",
            DropReason::MissingCount => "missing count",
        };
        f.write_str(s)
    }
}

/// Number of dropped rows per [`DropReason`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropSummary {
    counts: BTreeMap<DropReason, usize>,
}

impl DropSummary {
    pub fn record(&mut self, reason: DropReason) {
        *self.counts.entry(reason).or_insert(0) += 1;
    }

    pub fn get(&self, reason: DropReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (DropReason, usize)> + '_ {
        self.counts.iter().map(|(r, n)| (*r, *n))
    }
}

impl fmt::Display for DropSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no rows dropped");
        }
        let parts: Vec<String> = self.iter().map(|(r, n)| format!("{n} {r}")).collect();
        write!(f, "{}", parts.join(", "))
    }
}

// ── DashboardRecord ───────────────────────────────────────────────────────────

/// A daily aggregate row as consumed by the dashboard, with the optional
/// enrichment columns the richer datasets carry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardRecord {
    pub day: NaiveDate,
    pub counter_key: String,
    pub total: i64,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub month_name: Option<String>,
    pub weekday: Option<String>,
    pub season: Option<String>,
    pub temperature: Option<f64>,
    pub weather_condition: Option<String>,
    pub precipitation: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl DashboardRecord {
    /// Year of the row, from the enrichment column or derived from `day`.
    pub fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| self.day.year())
    }

    /// Month (1-12), from the enrichment column or derived from `day`.
    pub fn month(&self) -> u32 {
        self.month.unwrap_or_else(|| self.day.month())
    }
}

impl From<DailyAggregate> for DashboardRecord {
    fn from(agg: DailyAggregate) -> Self {
        Self {
            day: agg.day,
            counter_key: agg.counter_key,
            total: agg.total,
            ..Default::default()
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn cells(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    // ── RawValue::parse ───────────────────────────────────────────────────────

    #[test]
    fn test_raw_value_parse_variants() {
        assert_eq!(RawValue::parse(""), RawValue::Null);
        assert_eq!(RawValue::parse("   "), RawValue::Null);
        assert_eq!(RawValue::parse("42"), RawValue::Integer(42));
        assert_eq!(RawValue::parse(" -7 "), RawValue::Integer(-7));
        assert_eq!(RawValue::parse("12.5").as_f64(), Some(12.5));
        assert!(matches!(RawValue::parse("1e3"), RawValue::Float { .. }));
        assert_eq!(
            RawValue::parse("Nørrebrogade"),
            RawValue::Text("Nørrebrogade".to_string())
        );
    }

    #[test]
    fn test_raw_value_keeps_leading_zero_identifiers() {
        assert_eq!(RawValue::parse("007"), RawValue::Text("007".to_string()));
        assert_eq!(RawValue::parse("007").as_text().as_deref(), Some("007"));
    }

    #[test]
    fn test_raw_value_rejects_non_finite_floats() {
        assert_eq!(RawValue::parse("NaN"), RawValue::Text("NaN".to_string()));
        assert_eq!(RawValue::parse("inf"), RawValue::Text("inf".to_string()));
    }

    #[test]
    fn test_as_text_keeps_numeric_looking_source_text() {
        for id in ["12.10", "12.1", "1e3", "12345678901234567891", "-0.0"] {
            assert_eq!(RawValue::parse(id).as_text().as_deref(), Some(id));
        }
        assert_ne!(
            RawValue::parse("12.10").as_text(),
            RawValue::parse("12.1").as_text()
        );
        assert_eq!(RawValue::parse(" 42 ").as_text().as_deref(), Some("42"));
    }

    // ── RawValue::as_count ────────────────────────────────────────────────────

    #[test]
    fn test_as_count_casts() {
        assert_eq!(RawValue::Integer(10).as_count(), Some(10));
        assert_eq!(RawValue::parse("12.9").as_count(), Some(12));
        assert_eq!(RawValue::parse("-3.7").as_count(), Some(-3));
        assert_eq!(RawValue::Text("007".to_string()).as_count(), Some(7));
        assert_eq!(RawValue::Text("lots".to_string()).as_count(), None);
        assert_eq!(RawValue::Null.as_count(), None);
        assert_eq!(RawValue::parse("1e300").as_count(), None);
    }

    // ── RawTable ──────────────────────────────────────────────────────────────

    #[test]
    fn test_raw_table_lowercases_and_pads() {
        let table = RawTable::from_cells(
            vec!["Date".to_string(), "Bike".to_string()],
            cells(&[&["2024-01-01", "10"], &["2024-01-02"]]),
        );
        assert_eq!(table.columns, vec!["date", "bike"]);
        assert_eq!(table.headers, vec!["Date", "Bike"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0]["bike"], RawValue::Integer(10));
        assert_eq!(table.rows[1]["bike"], RawValue::Null);
    }

    #[test]
    fn test_raw_table_duplicate_columns_first_wins() {
        let table = RawTable::from_cells(
            vec!["Count".to_string(), "count".to_string()],
            cells(&[&["1", "2"]]),
        );
        assert_eq!(table.columns, vec!["count"]);
        assert_eq!(table.rows[0]["count"], RawValue::Integer(1));
    }

    #[test]
    fn test_column_type_widening() {
        let table = RawTable::from_cells(
            vec![
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
            cells(&[&["1", "1", "x", ""], &["2", "2.5", "3", ""], &["", "3", "4", ""]]),
        );
        assert_eq!(table.column_type("a"), ColumnType::Integer);
        assert_eq!(table.column_type("b"), ColumnType::Float);
        assert_eq!(table.column_type("c"), ColumnType::Text);
        assert_eq!(table.column_type("d"), ColumnType::Empty);
        assert!(!ColumnType::Empty.is_numeric());
        assert!(ColumnType::Float.is_numeric());
    }

    // ── CanonicalRecord ───────────────────────────────────────────────────────

    fn record(id: &str, name: &str) -> CanonicalRecord {
        CanonicalRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 17, 45, 0).unwrap(),
            counter_id: id.to_string(),
            counter_name: name.to_string(),
            count: 1,
        }
    }

    #[test]
    fn test_counter_key_prefers_id() {
        assert_eq!(record("c-1", "Dronning Louises Bro").counter_key(), "c-1");
        assert_eq!(
            record(UNKNOWN, "Dronning Louises Bro").counter_key(),
            "Dronning Louises Bro"
        );
        assert_eq!(record(UNKNOWN, UNKNOWN).counter_key(), UNKNOWN);
    }

    #[test]
    fn test_canonical_record_day() {
        let r = record("c-1", UNKNOWN);
        assert_eq!(r.day(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    // ── DropSummary ───────────────────────────────────────────────────────────

    #[test]
    fn test_drop_summary_counts() {
        let mut drops = DropSummary::default();
        assert!(drops.is_empty());
        assert_eq!(drops.to_string(), "no rows dropped");

        drops.record(DropReason::UnparsableTimestamp);
        drops.record(DropReason::UnparsableTimestamp);
        drops.record(DropReason::MissingCount);

        assert_eq!(drops.total(), 3);
        assert_eq!(drops.get(DropReason::UnparsableTimestamp), 2);
        assert_eq!(drops.get(DropReason::UnparsableCount), 0);
        assert_eq!(
            drops.to_string(),
            "2 unparsable timestamp, 1 missing count"
        );
    }

    // ── DashboardRecord ───────────────────────────────────────────────────────

    #[test]
    fn test_dashboard_record_derives_calendar_fields() {
        let rec = DashboardRecord::from(DailyAggregate {
            day: NaiveDate::from_ymd_opt(2014, 7, 2).unwrap(),
            counter_key: "Nørrebrogade".to_string(),
            total: 900,
        });
        assert_eq!(rec.year(), 2014);
        assert_eq!(rec.month(), 7);
        assert!(rec.season.is_none());
    }
}

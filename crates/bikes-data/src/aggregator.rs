//! Group-by-sum of canonical records per UTC day and counter.

use std::collections::{BTreeMap, BTreeSet};

use bikes_core::models::{CanonicalRecord, DailyAggregate};
use chrono::NaiveDate;
use tracing::debug;

/// Row-level totals over an aggregate table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateTotals {
    pub rows: usize,
    pub days: usize,
    pub counters: usize,
    pub grand_total: i64,
}

/// Stateless daily aggregation.
///
/// Output rows are sorted by `(day, counter_key)`, which keeps files
/// reproducible; callers should still treat the order as unspecified.
pub struct DailyAggregator;

impl DailyAggregator {
    /// Sum `records` per `(UTC day, counter_key)`.
    pub fn aggregate(records: &[CanonicalRecord]) -> Vec<DailyAggregate> {
        let grouped = group(
            records
                .iter()
                .map(|r| (r.day(), r.counter_key(), r.count)),
        );
        debug!(
            "aggregated {} records into {} daily rows",
            records.len(),
            grouped.len()
        );
        grouped
    }

    /// Re-group an already aggregated table.
    ///
    /// Applying this to the output of [`aggregate`](Self::aggregate) returns
    /// the same rows.
    pub fn regroup(rows: &[DailyAggregate]) -> Vec<DailyAggregate> {
        group(
            rows.iter()
                .map(|r| (r.day, r.counter_key.as_str(), r.total)),
        )
    }

    pub fn totals(rows: &[DailyAggregate]) -> AggregateTotals {
        let days: BTreeSet<NaiveDate> = rows.iter().map(|r| r.day).collect();
        let counters: BTreeSet<&str> = rows.iter().map(|r| r.counter_key.as_str()).collect();
        AggregateTotals {
            rows: rows.len(),
            days: days.len(),
            counters: counters.len(),
            grand_total: rows.iter().fold(0i64, |acc, r| acc.saturating_add(r.total)),
        }
    }
}

fn group<'a, I>(items: I) -> Vec<DailyAggregate>
where
    I: IntoIterator<Item = (NaiveDate, &'a str, i64)>,
{
    let mut sums: BTreeMap<(NaiveDate, String), i64> = BTreeMap::new();
    for (day, key, count) in items {
        let slot = sums.entry((day, key.to_string())).or_insert(0);
        *slot = slot.saturating_add(count);
    }
    sums.into_iter()
        .map(|((day, counter_key), total)| DailyAggregate {
            day,
            counter_key,
            total,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Read-only views over a daily table, as rendered by the dashboard.
//!
//! Everything here is a pure function of `&[DashboardRecord]`. Views that
//! need an enrichment column return `None` when no row carries it so the
//! caller can hide them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bikes_core::models::DashboardRecord;
use bikes_core::time_utils::month_name;
use chrono::NaiveDate;

// ── Summary ───────────────────────────────────────────────────────────────────

/// Headline numbers for the whole dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryMetrics {
    pub records: usize,
    pub counters: usize,
    pub first_day: Option<NaiveDate>,
    pub last_day: Option<NaiveDate>,
    pub grand_total: i64,
    /// Mean over days of the per-day total across all counters.
    pub avg_daily_total: f64,
    pub years: usize,
    /// Distinct `(year, month)` pairs.
    pub months: usize,
    /// Distinct seasons, `None` when the column is absent.
    pub seasons: Option<usize>,
}

pub fn summary(records: &[DashboardRecord]) -> SummaryMetrics {
    if records.is_empty() {
        return SummaryMetrics::default();
    }

    let counters: BTreeSet<&str> = records.iter().map(|r| r.counter_key.as_str()).collect();
    let years: BTreeSet<i32> = records.iter().map(DashboardRecord::year).collect();
    let seasons: BTreeSet<&str> = records.iter().filter_map(|r| r.season.as_deref()).collect();
    let daily = daily_totals(records);

    SummaryMetrics {
        records: records.len(),
        counters: counters.len(),
        first_day: daily.first().map(|(d, _)| *d),
        last_day: daily.last().map(|(d, _)| *d),
        grand_total: sum_totals(records.iter()),
        avg_daily_total: mean(daily.iter().map(|(_, t)| *t as f64)).unwrap_or(0.0),
        years: years.len(),
        months: available_months(records).len(),
        seasons: (!seasons.is_empty()).then_some(seasons.len()),
    }
}

/// Total across counters per day, in day order.
pub fn daily_totals(records: &[DashboardRecord]) -> Vec<(NaiveDate, i64)> {
    let mut by_day: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for r in records {
        let slot = by_day.entry(r.day).or_insert(0);
        *slot = slot.saturating_add(r.total);
    }
    by_day.into_iter().collect()
}

/// Sorted `(year, month)` pairs present in the data.
pub fn available_months(records: &[DashboardRecord]) -> Vec<(i32, u32)> {
    let months: BTreeSet<(i32, u32)> = records.iter().map(|r| (r.year(), r.month())).collect();
    months.into_iter().collect()
}

// ── Monthly ───────────────────────────────────────────────────────────────────

/// Per-counter statistics over the rows of one month.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationStats {
    pub counter_key: String,
    pub sum: i64,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two rows.
    pub std_dev: Option<f64>,
    pub count: usize,
}

/// Everything the monthly view shows for one `(year, month)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthBreakdown {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub total: i64,
    pub avg_daily: f64,
    pub days: usize,
    /// Busiest counter of the month with its total.
    pub top_location: Option<(String, i64)>,
    pub daily: Vec<(NaiveDate, i64)>,
    pub top_locations: Vec<(String, i64)>,
    /// Sorted by descending sum.
    pub locations: Vec<LocationStats>,
}

/// Break down one month; `None` when the month has no rows.
pub fn month_breakdown(
    records: &[DashboardRecord],
    year: i32,
    month: u32,
    top_n: usize,
) -> Option<MonthBreakdown> {
    let rows: Vec<DashboardRecord> = records
        .iter()
        .filter(|r| r.year() == year && r.month() == month)
        .cloned()
        .collect();
    if rows.is_empty() {
        return None;
    }

    let daily = daily_totals(&rows);
    let ranking = top_locations(&rows, usize::MAX);
    let label = rows
        .iter()
        .find_map(|r| r.month_name.clone())
        .unwrap_or_else(|| month_name(month).to_string());

    Some(MonthBreakdown {
        year,
        month,
        month_name: label,
        total: sum_totals(rows.iter()),
        avg_daily: mean(daily.iter().map(|(_, t)| *t as f64)).unwrap_or(0.0),
        days: daily.len(),
        top_location: ranking.first().cloned(),
        daily,
        top_locations: ranking.iter().take(top_n).cloned().collect(),
        locations: location_stats(&rows),
    })
}

fn location_stats(rows: &[DashboardRecord]) -> Vec<LocationStats> {
    let mut by_key: HashMap<&str, Vec<i64>> = HashMap::new();
    for r in rows {
        by_key.entry(r.counter_key.as_str()).or_default().push(r.total);
    }

    let mut stats: Vec<LocationStats> = by_key
        .into_iter()
        .map(|(key, totals)| {
            let values = || totals.iter().map(|t| *t as f64);
            LocationStats {
                counter_key: key.to_string(),
                sum: totals.iter().fold(0i64, |acc, t| acc.saturating_add(*t)),
                mean: mean(values()).unwrap_or(0.0),
                std_dev: sample_std_dev(values()),
                count: totals.len(),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.sum.cmp(&a.sum).then_with(|| a.counter_key.cmp(&b.counter_key)));
    stats
}

/// Total for one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub month_name: &'static str,
    pub total: i64,
    pub days: usize,
}

/// Totals per `(year, month)`, in calendar order.
pub fn monthly_trend(records: &[DashboardRecord]) -> Vec<MonthlyTotal> {
    let mut by_month: BTreeMap<(i32, u32), (i64, BTreeSet<NaiveDate>)> = BTreeMap::new();
    for r in records {
        let slot = by_month.entry((r.year(), r.month())).or_default();
        slot.0 = slot.0.saturating_add(r.total);
        slot.1.insert(r.day);
    }
    by_month
        .into_iter()
        .map(|((year, month), (total, days))| MonthlyTotal {
            year,
            month,
            month_name: month_name(month),
            total,
            days: days.len(),
        })
        .collect()
}

// ── Grouped views ─────────────────────────────────────────────────────────────

/// Categorical enrichment column to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Season,
    Weather,
}

impl GroupBy {
    fn label<'a>(&self, r: &'a DashboardRecord) -> Option<&'a str> {
        match self {
            GroupBy::Season => r.season.as_deref(),
            GroupBy::Weather => r.weather_condition.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub label: String,
    pub total: i64,
    /// Distinct days in the group.
    pub days: usize,
    /// `total / days`.
    pub avg_daily: f64,
}

/// Totals and average daily totals per season or weather condition.
///
/// Seasons come out in calendar order starting with spring, other labels
/// alphabetically. `None` when no row carries the column.
pub fn group_breakdown(records: &[DashboardRecord], by: GroupBy) -> Option<Vec<GroupRow>> {
    let mut groups: BTreeMap<&str, (i64, BTreeSet<NaiveDate>)> = BTreeMap::new();
    for r in records {
        if let Some(label) = by.label(r) {
            let slot = groups.entry(label).or_default();
            slot.0 = slot.0.saturating_add(r.total);
            slot.1.insert(r.day);
        }
    }
    if groups.is_empty() {
        return None;
    }

    let mut rows: Vec<GroupRow> = groups
        .into_iter()
        .map(|(label, (total, days))| GroupRow {
            label: label.to_string(),
            total,
            days: days.len(),
            avg_daily: total as f64 / days.len().max(1) as f64,
        })
        .collect();
    if by == GroupBy::Season {
        rows.sort_by_key(|r| season_rank(&r.label));
    }
    Some(rows)
}

fn season_rank(label: &str) -> usize {
    ["spring", "summer", "autumn", "winter"]
        .iter()
        .position(|s| s.eq_ignore_ascii_case(label))
        .unwrap_or(usize::MAX)
}

/// Continuous weather column cut into equal-width bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Temperature,
    Precipitation,
}

impl Band {
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Band::Temperature => &["Very Cold", "Cold", "Mild", "Warm", "Hot"],
            Band::Precipitation => &["No Rain", "Light Rain", "Moderate Rain", "Heavy Rain"],
        }
    }

    fn value(&self, r: &DashboardRecord) -> Option<f64> {
        match self {
            Band::Temperature => r.temperature,
            Band::Precipitation => r.precipitation,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandRow {
    pub label: &'static str,
    /// Mean row total within the band.
    pub avg_total: f64,
    pub rows: usize,
}

/// Mean row total per equal-width band of `band`'s column, spanning the
/// observed min..max. Empty bands are omitted; `None` when the column is
/// absent.
pub fn band_breakdown(records: &[DashboardRecord], band: Band) -> Option<Vec<BandRow>> {
    let values: Vec<(f64, i64)> = records
        .iter()
        .filter_map(|r| band.value(r).map(|v| (v, r.total)))
        .collect();
    if values.is_empty() {
        return None;
    }

    let labels = band.labels();
    let (lo, hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (v, _)| {
            (lo.min(*v), hi.max(*v))
        });
    let width = (hi - lo) / labels.len() as f64;

    let mut sums = vec![(0i64, 0usize); labels.len()];
    for (v, total) in &values {
        let idx = if width > 0.0 {
            (((v - lo) / width).floor() as usize).min(labels.len() - 1)
        } else {
            0
        };
        sums[idx].0 = sums[idx].0.saturating_add(*total);
        sums[idx].1 += 1;
    }

    Some(
        labels
            .iter()
            .zip(sums)
            .filter(|(_, (_, n))| *n > 0)
            .map(|(label, (sum, n))| BandRow {
                label: *label,
                avg_total: sum as f64 / n as f64,
                rows: n,
            })
            .collect(),
    )
}

// ── Rankings ──────────────────────────────────────────────────────────────────

/// Counters ranked by summed total, ties broken by key.
pub fn top_locations(records: &[DashboardRecord], n: usize) -> Vec<(String, i64)> {
    let mut sums: HashMap<&str, i64> = HashMap::new();
    for r in records {
        let slot = sums.entry(r.counter_key.as_str()).or_insert(0);
        *slot = slot.saturating_add(r.total);
    }
    let mut ranked: Vec<(String, i64)> = sums
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn sum_totals<'a>(rows: impl Iterator<Item = &'a DashboardRecord>) -> i64 {
    rows.fold(0i64, |acc, r| acc.saturating_add(r.total))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

fn sample_std_dev(values: impl Iterator<Item = f64> + Clone) -> Option<f64> {
    let n = values.clone().count();
    if n < 2 {
        return None;
    }
    let m = mean(values.clone())?;
    let ss: f64 = values.map(|v| (v - m).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

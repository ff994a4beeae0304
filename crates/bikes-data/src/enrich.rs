//! Calendar and synthetic-weather enrichment of the daily table.
//!
//! The weather columns are placeholders drawn from a seeded RNG with
//! month-dependent ranges. They are not observations; the fixed seed only
//! makes dashboards reproducible.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use bikes_core::error::Result;
use bikes_core::models::{DailyAggregate, DashboardRecord};
use bikes_core::time_utils::{month_name, season_for_month, weekday_name};
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregator::DailyAggregator;
use crate::writer::{read_dashboard_records, write_records};

/// File name of the enriched dataset the dashboard prefers.
pub const ENRICHED_FILE_NAME: &str = "real_copenhagen_data_with_weather_fixed.csv";

// ── Types ─────────────────────────────────────────────────────────────────────

/// Synthetic weather for one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weather {
    pub temperature: f64,
    pub precipitation: f64,
    pub wind_speed: f64,
}

/// One enriched output row. Field order is the column order on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedDay {
    pub day: NaiveDate,
    pub counter_key: String,
    pub total: i64,
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub weekday: String,
    pub season: String,
    pub temperature: f64,
    pub weather_condition: String,
    pub precipitation: f64,
    pub wind_speed: f64,
}

impl From<EnrichedDay> for DashboardRecord {
    fn from(e: EnrichedDay) -> Self {
        Self {
            day: e.day,
            counter_key: e.counter_key,
            total: e.total,
            year: Some(e.year),
            month: Some(e.month),
            month_name: Some(e.month_name),
            weekday: Some(e.weekday),
            season: Some(e.season),
            temperature: Some(e.temperature),
            weather_condition: Some(e.weather_condition),
            precipitation: Some(e.precipitation),
            wind_speed: Some(e.wind_speed),
        }
    }
}

/// Outcome of [`enrich_file`].
#[derive(Debug, Clone)]
pub struct EnrichReport {
    pub output_path: PathBuf,
    pub rows: usize,
    pub days: usize,
    pub grand_total: i64,
}

// ── Weather ───────────────────────────────────────────────────────────────────

/// Draw one day of weather for `month` (1-12).
///
/// Temperature is U(5, 20) April through September, else U(0, 10).
/// Precipitation is U(0, 5) September through February, else U(0, 2).
/// Wind is U(3, 10) March through August, else U(5, 15).
pub fn synthetic_weather<R: Rng>(rng: &mut R, month: u32) -> Weather {
    let temperature = if (4..=9).contains(&month) {
        rng.gen_range(5.0..20.0)
    } else {
        rng.gen_range(0.0..10.0)
    };
    let precipitation = if month >= 9 || month <= 2 {
        rng.gen_range(0.0..5.0)
    } else {
        rng.gen_range(0.0..2.0)
    };
    let wind_speed = if (3..=8).contains(&month) {
        rng.gen_range(3.0..10.0)
    } else {
        rng.gen_range(5.0..15.0)
    };
    Weather {
        temperature,
        precipitation,
        wind_speed,
    }
}

/// Label a day's weather. Rain wins over cold, cold over sun.
pub fn weather_condition(w: &Weather) -> &'static str {
    if w.precipitation > 5.0 {
        "rainy"
    } else if w.temperature < 5.0 {
        "cold"
    } else if w.temperature > 20.0 && w.wind_speed < 10.0 {
        "sunny"
    } else {
        "cloudy"
    }
}

// ── enrich ────────────────────────────────────────────────────────────────────

/// Add calendar and weather columns to `rows`.
///
/// Weather is drawn once per distinct day, in day order, so every counter
/// sees the same weather on a given day and the result does not depend on
/// row order.
pub fn enrich(rows: &[DailyAggregate], seed: u64) -> Vec<EnrichedDay> {
    let mut rng = StdRng::seed_from_u64(seed);

    let days: BTreeSet<NaiveDate> = rows.iter().map(|r| r.day).collect();
    let weather: BTreeMap<NaiveDate, Weather> = days
        .into_iter()
        .map(|day| (day, synthetic_weather(&mut rng, day.month())))
        .collect();

    rows.iter()
        .filter_map(|row| {
            let w = weather.get(&row.day)?;
            let month = row.day.month();
            Some(EnrichedDay {
                day: row.day,
                counter_key: row.counter_key.clone(),
                total: row.total,
                year: row.day.year(),
                month,
                month_name: month_name(month).to_string(),
                weekday: weekday_name(row.day).to_string(),
                season: season_for_month(month).to_string(),
                temperature: w.temperature,
                weather_condition: weather_condition(w).to_string(),
                precipitation: w.precipitation,
                wind_speed: w.wind_speed,
            })
        })
        .collect()
}

/// Enrich a daily aggregate file and write [`ENRICHED_FILE_NAME`] to
/// `out_dir`.
pub fn enrich_file(input: &Path, out_dir: &Path, seed: u64) -> Result<EnrichReport> {
    info!("Processing: {}", input.display());

    let loaded: Vec<DailyAggregate> = read_dashboard_records(input)?
        .into_iter()
        .map(|r| DailyAggregate {
            day: r.day,
            counter_key: r.counter_key,
            total: r.total,
        })
        .collect();
    let rows = DailyAggregator::regroup(&loaded);
    let totals = DailyAggregator::totals(&rows);

    let enriched = enrich(&rows, seed);
    let output_path = write_records(out_dir, ENRICHED_FILE_NAME, &enriched)?;

    if let (Some(first), Some(last)) = (rows.first(), rows.last()) {
        info!("Date range: {} to {}", first.day, last.day);
    }
    info!(
        rows = enriched.len(),
        locations = totals.counters,
        "Processed data saved: {} (total rides {})",
        output_path.display(),
        totals.grand_total
    );

    Ok(EnrichReport {
        output_path,
        rows: enriched.len(),
        days: totals.days,
        grand_total: totals.grand_total,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

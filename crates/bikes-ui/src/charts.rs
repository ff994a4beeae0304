//! Trend and ranking charts.

use chrono::NaiveDate;
use ratatui::{
    layout::{Direction, Rect},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Sparkline},
    Frame,
};

use bikes_core::formatting::format_count;
use bikes_data::analysis::MonthlyTotal;

use crate::components::metric_card::truncate_to_width;
use crate::themes::Theme;

/// Clamp totals to the non-negative range a sparkline can show.
pub fn sparkline_values(series: &[(NaiveDate, i64)]) -> Vec<u64> {
    series.iter().map(|(_, t)| (*t).max(0) as u64).collect()
}

/// Daily totals as a sparkline. The title carries the covered date range and
/// the peak day.
pub fn render_daily_trend(
    frame: &mut Frame,
    area: Rect,
    series: &[(NaiveDate, i64)],
    theme: &Theme,
) {
    let data = sparkline_values(series);
    let title = match (series.first(), series.last(), peak(series)) {
        (Some((first, _)), Some((last, _)), Some((peak_day, peak_total))) => format!(
            " Daily total {} → {} (peak {} on {}) ",
            first,
            last,
            format_count(peak_total),
            peak_day
        ),
        _ => " Daily total ".to_string(),
    };

    let sparkline = Sparkline::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(title),
        )
        .data(data)
        .style(theme.chart_line);
    frame.render_widget(sparkline, area);
}

fn peak(series: &[(NaiveDate, i64)]) -> Option<(NaiveDate, i64)> {
    series
        .iter()
        .copied()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
}

/// Horizontal bar chart of ranked counters.
pub fn render_top_locations(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    ranking: &[(String, i64)],
    theme: &Theme,
) {
    let bars: Vec<Bar> = ranking
        .iter()
        .map(|(key, total)| {
            Bar::default()
                .value((*total).max(0) as u64)
                .label(Line::from(truncate_to_width(key, 18)))
                .text_value(format_count(*total))
                .style(theme.chart_bar)
                .value_style(theme.chart_bar_value)
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", title)),
        )
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

/// Vertical bars, one per calendar month.
pub fn render_monthly_trend(
    frame: &mut Frame,
    area: Rect,
    months: &[MonthlyTotal],
    theme: &Theme,
) {
    let bars: Vec<Bar> = months
        .iter()
        .map(|m| {
            Bar::default()
                .value(m.total.max(0) as u64)
                .label(Line::from(format!(
                    "{} {:02}",
                    m.month_name.get(..3).unwrap_or(m.month_name),
                    m.year % 100
                )))
                .text_value(String::new())
                .style(theme.chart_bar)
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Monthly totals "),
        )
        .bar_width(6)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

// ── Tests ──────────────────────────────────────────────────────────────────────

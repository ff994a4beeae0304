//! Breakdown tables for the bike-counter dashboard.
//!
//! Each view renders a bordered [`ratatui::widgets::Table`] with one row per
//! group, location or band, plus a highlighted totals row where a sum makes
//! sense.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use bikes_core::formatting::{format_count, format_number};
use bikes_data::analysis::{BandRow, GroupBy, GroupRow, LocationStats};

use crate::components::metric_card::truncate_to_width;
use crate::components::share_bar::ShareBar;
use crate::themes::Theme;

fn header_row<'a>(titles: &[&'a str], theme: &Theme) -> Row<'a> {
    Row::new(
        titles
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1)
}

fn bordered(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.table_border)
        .title(format!(" {} ", title))
}

/// Render season or weather totals. Labels take the matching season/weather
/// colour.
pub fn render_group_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    by: GroupBy,
    rows: &[GroupRow],
    theme: &Theme,
) {
    let label_header = match by {
        GroupBy::Season => "Season",
        GroupBy::Weather => "Weather",
    };
    let header = header_row(&[label_header, "Total", "Days", "Avg/day"], theme);

    let mut all_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let label_style = match by {
                GroupBy::Season => theme.season_style(&row.label),
                GroupBy::Weather => theme.weather_style(&row.label),
            };
            Row::new(vec![
                Cell::from(capitalize(&row.label)).style(label_style),
                Cell::from(format_count(row.total)),
                Cell::from(row.days.to_string()),
                Cell::from(format_number(row.avg_daily, 1)),
            ])
            .style(theme.row_style(i))
        })
        .collect();

    let total: i64 = rows.iter().fold(0i64, |acc, r| acc.saturating_add(r.total));
    all_rows.push(
        Row::new(vec![
            Cell::from("TOTAL"),
            Cell::from(format_count(total)),
            Cell::from(format!("{} groups", rows.len())),
            Cell::from(""),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Length(10),
        Constraint::Length(12),
    ];
    let table = Table::new(all_rows, widths)
        .header(header)
        .block(bordered(title, theme))
        .style(theme.text);
    frame.render_widget(table, area);
}

/// Render per-location statistics for one month.
pub fn render_location_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    stats: &[LocationStats],
    theme: &Theme,
) {
    let header = header_row(&["Location", "Sum", "Mean", "Std", "Days"], theme);

    let mut all_rows: Vec<Row> = stats
        .iter()
        .enumerate()
        .map(|(i, s)| {
            Row::new(vec![
                Cell::from(truncate_to_width(&s.counter_key, 28)),
                Cell::from(format_count(s.sum)),
                Cell::from(format_number(s.mean, 1)),
                Cell::from(
                    s.std_dev
                        .map(|sd| format_number(sd, 1))
                        .unwrap_or_else(|| "-".to_string()),
                ),
                Cell::from(s.count.to_string()),
            ])
            .style(theme.row_style(i))
        })
        .collect();

    let sum: i64 = stats.iter().fold(0i64, |acc, s| acc.saturating_add(s.sum));
    let days: usize = stats.iter().map(|s| s.count).sum();
    all_rows.push(
        Row::new(vec![
            Cell::from("TOTAL"),
            Cell::from(format_count(sum)),
            Cell::from(""),
            Cell::from(""),
            Cell::from(days.to_string()),
        ])
        .style(theme.table_total),
    );

    let widths = [
        Constraint::Length(30),
        Constraint::Length(14),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(6),
    ];
    let table = Table::new(all_rows, widths)
        .header(header)
        .block(bordered(title, theme))
        .style(theme.text);
    frame.render_widget(table, area);
}

/// Render counters ranked by total with a share-of-total bar each.
pub fn render_ranking_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    ranking: &[(String, i64)],
    grand_total: i64,
    theme: &Theme,
) {
    let header = header_row(&["#", "Location", "Total", "Share"], theme);

    let rows: Vec<Row> = ranking
        .iter()
        .enumerate()
        .map(|(i, (key, total))| {
            Row::new(vec![
                Cell::from(format!("{}", i + 1)),
                Cell::from(truncate_to_width(key, 28)),
                Cell::from(format_count(*total)),
                Cell::from(ShareBar::new(*total, grand_total, theme).width(20).to_line()),
            ])
            .style(theme.row_style(i))
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Length(30),
        Constraint::Length(14),
        Constraint::Min(36),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(bordered(title, theme))
        .style(theme.text);
    frame.render_widget(table, area);
}

/// Render mean daily counts per temperature or precipitation band.
pub fn render_band_table(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: &[BandRow],
    theme: &Theme,
) {
    let header = header_row(&["Band", "Avg count", "Rows"], theme);
    let rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, b)| {
            Row::new(vec![
                Cell::from(b.label),
                Cell::from(format_number(b.avg_total, 1)),
                Cell::from(b.rows.to_string()),
            ])
            .style(theme.row_style(i))
        })
        .collect();

    let widths = [
        Constraint::Length(16),
        Constraint::Length(12),
        Constraint::Length(8),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(bordered(title, theme))
        .style(theme.text);
    frame.render_widget(table, area);
}

/// Render a placeholder when no dataset could be loaded.
pub fn render_no_data(frame: &mut Frame, area: Rect, reason: Option<&str>, theme: &Theme) {
    let mut text = vec![
        Line::from(""),
        Line::from(Span::styled("No dataset found", theme.warning)),
        Line::from(""),
        Line::from(Span::styled(
            "Run `cph-bikes transform` (and optionally `cph-bikes enrich`) first.",
            theme.dim,
        )),
    ];
    if let Some(reason) = reason {
        text.push(Line::from(Span::styled(reason.to_string(), theme.error)));
    }
    text.push(Line::from(Span::styled(
        "Press 'r' to retry, 'q' or Ctrl+C to exit",
        theme.dim,
    )));
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Copenhagen Bike Counters "),
        ),
        area,
    );
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn rendered(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn season_rows() -> Vec<GroupRow> {
        vec![
            GroupRow {
                label: "spring".to_string(),
                total: 12_000,
                days: 3,
                avg_daily: 4_000.0,
            },
            GroupRow {
                label: "winter".to_string(),
                total: 3_000,
                days: 2,
                avg_daily: 1_500.0,
            },
        ]
    }

    // ── capitalize ────────────────────────────────────────────────────────────

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("sunny"), "Sunny");
        assert_eq!(capitalize("ørsted"), "Ørsted");
        assert_eq!(capitalize(""), "");
    }

    // ── render_group_table ────────────────────────────────────────────────────

    #[test]
    fn test_render_group_table_shows_rows_and_total() {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        let theme = Theme::dark();
        let rows = season_rows();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_group_table(frame, area, "By season", GroupBy::Season, &rows, &theme);
            })
            .unwrap();

        let text = rendered(&terminal);
        assert!(text.contains("Spring"));
        assert!(text.contains("Winter"));
        assert!(text.contains("15,000"));
        assert!(text.contains("TOTAL"));
    }

    #[test]
    fn test_render_group_table_empty_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        let theme = Theme::light();
        terminal
            .draw(|frame| {
                let area = frame.area();
                render_group_table(frame, area, "By weather", GroupBy::Weather, &[], &theme);
            })
            .unwrap();
    }

    // ── render_location_table ─────────────────────────────────────────────────

    #[test]
    fn test_render_location_table_single_day_std() {
        let mut terminal = Terminal::new(TestBackend::new(100, 10)).unwrap();
        let theme = Theme::dark();
        let stats = vec![LocationStats {
            counter_key: "Dronning Louises Bro".to_string(),
            sum: 40_000,
            mean: 40_000.0,
            std_dev: None,
            count: 1,
        }];

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_location_table(frame, area, "Locations", &stats, &theme);
            })
            .unwrap();

        let text = rendered(&terminal);
        assert!(text.contains("Dronning Louises Bro"));
        assert!(text.contains("40,000"));
    }

    // ── render_ranking_table ──────────────────────────────────────────────────

    #[test]
    fn test_render_ranking_table() {
        let mut terminal = Terminal::new(TestBackend::new(110, 10)).unwrap();
        let theme = Theme::dark();
        let ranking = vec![
            ("Nørrebrogade".to_string(), 750),
            ("Langebro".to_string(), 250),
        ];

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_ranking_table(frame, area, "Top locations", &ranking, 1_000, &theme);
            })
            .unwrap();

        let text = rendered(&terminal);
        assert!(text.contains("Langebro"));
        assert!(text.contains("75.0%"));
        assert!(text.contains("25.0%"));
    }

    // ── render_band_table ─────────────────────────────────────────────────────

    #[test]
    fn test_render_band_table() {
        let mut terminal = Terminal::new(TestBackend::new(60, 8)).unwrap();
        let theme = Theme::classic();
        let bands = vec![BandRow {
            label: "Mild",
            avg_total: 1_234.5,
            rows: 4,
        }];

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_band_table(frame, area, "Temperature", &bands, &theme);
            })
            .unwrap();

        assert!(rendered(&terminal).contains("1,234.5"));
    }

    // ── render_no_data ────────────────────────────────────────────────────────

    #[test]
    fn test_render_no_data_with_reason() {
        let mut terminal = Terminal::new(TestBackend::new(90, 12)).unwrap();
        let theme = Theme::dark();

        terminal
            .draw(|frame| {
                let area = frame.area();
                render_no_data(frame, area, Some("no dataset under /tmp/x"), &theme);
            })
            .unwrap();

        let text = rendered(&terminal);
        assert!(text.contains("No dataset found"));
        assert!(text.contains("/tmp/x"));
    }
}

//! Dashboard application state and TUI event loop.
//!
//! [`App`] owns the theme, the dataset loader and the current navigation
//! state (tab, selected month). Views are recomputed from the loaded records
//! on every draw.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};
use tracing::debug;

use bikes_core::formatting::{format_count, format_number};
use bikes_core::models::DashboardRecord;
use bikes_data::analysis::{self, Band, GroupBy};
use bikes_runtime::data_manager::{Dataset, DatasetManager};

use crate::charts;
use crate::components::header::Header;
use crate::components::metric_card::MetricCard;
use crate::table_view;
use crate::themes::Theme;

/// Ticks between automatic dataset refreshes (20 × 250 ms).
const REFRESH_TICKS: u32 = 20;
const TOP_N: usize = 10;
const RANKING_N: usize = 25;

// ── Tab ───────────────────────────────────────────────────────────────────────

/// Dashboard sections, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Monthly,
    /// Needs the `season` column.
    Seasonal,
    /// Needs the `weather_condition` column.
    Weather,
    Rankings,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::Overview,
        Tab::Monthly,
        Tab::Seasonal,
        Tab::Weather,
        Tab::Rankings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Monthly => "Monthly",
            Tab::Seasonal => "Seasonal",
            Tab::Weather => "Weather",
            Tab::Rankings => "Rankings",
        }
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard.
pub struct App {
    pub theme: Theme,
    manager: DatasetManager,
    dataset: Option<Dataset>,
    tab: Tab,
    /// Explicitly selected `(year, month)`; `None` means the latest one.
    month: Option<(i32, u32)>,
    all_months: bool,
    pub should_quit: bool,
}

impl App {
    /// Build the app and attempt a first load from `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, theme_name: &str) -> Self {
        let mut app = Self {
            theme: Theme::from_name(theme_name),
            manager: DatasetManager::new(data_dir),
            dataset: None,
            tab: Tab::Overview,
            month: None,
            all_months: false,
            should_quit: false,
        };
        app.reload();
        app
    }

    /// Re-check the dataset on disk. Unchanged files are served from cache.
    pub fn reload(&mut self) {
        match self.manager.load() {
            Ok(dataset) => self.dataset = Some(dataset),
            Err(e) => {
                debug!(error = %e, "no dataset available");
                self.dataset = None;
            }
        }
        if !self.visible_tabs().contains(&self.tab) {
            self.tab = Tab::Overview;
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn records(&self) -> &[DashboardRecord] {
        self.dataset
            .as_ref()
            .map(|d| d.records.as_slice())
            .unwrap_or(&[])
    }

    pub fn current_tab(&self) -> Tab {
        self.tab
    }

    pub fn all_months(&self) -> bool {
        self.all_months
    }

    /// Tabs whose data is present in the loaded dataset.
    pub fn visible_tabs(&self) -> Vec<Tab> {
        let records = self.records();
        let has_season = records.iter().any(|r| r.season.is_some());
        let has_weather = records.iter().any(|r| r.weather_condition.is_some());
        Tab::ALL
            .into_iter()
            .filter(|t| match t {
                Tab::Seasonal => has_season,
                Tab::Weather => has_weather,
                _ => true,
            })
            .collect()
    }

    /// The month shown on the Monthly tab: the explicit choice when it is
    /// still present, otherwise the most recent month.
    pub fn selected_month(&self) -> Option<(i32, u32)> {
        let months = analysis::available_months(self.records());
        match self.month {
            Some(m) if months.contains(&m) => Some(m),
            _ => months.last().copied(),
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab => self.step_tab(1),
            KeyCode::BackTab => self.step_tab(-1),
            KeyCode::Left if self.tab == Tab::Monthly => self.step_month(-1),
            KeyCode::Right if self.tab == Tab::Monthly => self.step_month(1),
            KeyCode::Char('a') if self.tab == Tab::Monthly => self.all_months = !self.all_months,
            KeyCode::Char('r') => {
                self.manager.invalidate();
                self.reload();
            }
            _ => {}
        }
    }

    fn step_tab(&mut self, delta: isize) {
        let tabs = self.visible_tabs();
        let pos = tabs.iter().position(|t| *t == self.tab).unwrap_or(0) as isize;
        let next = (pos + delta).rem_euclid(tabs.len() as isize) as usize;
        self.tab = tabs[next];
    }

    fn step_month(&mut self, delta: isize) {
        let months = analysis::available_months(self.records());
        let Some(current) = self.selected_month() else {
            return;
        };
        let pos = months.iter().position(|m| *m == current).unwrap_or(0) as isize;
        let next = (pos + delta).clamp(0, months.len() as isize - 1) as usize;
        self.month = Some(months[next]);
        self.all_months = false;
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the dashboard until `q` or `Ctrl+C`.
    ///
    /// Polls the terminal with a 250 ms timeout and re-checks the dataset
    /// every few seconds so a pipeline run in the background shows up
    /// without a restart.
    pub async fn run(mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);
        let mut ticks = 0u32;

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if self.should_quit {
                break Ok(());
            }

            ticks += 1;
            if ticks >= REFRESH_TICKS {
                ticks = 0;
                self.reload();
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let Some(dataset) = &self.dataset else {
            table_view::render_no_data(frame, area, self.manager.last_error(), &self.theme);
            return;
        };
        let records = dataset.records.as_slice();

        let [header_area, tabs_area, body, footer] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(area);

        let summary = analysis::summary(records);
        let period = match (summary.first_day, summary.last_day) {
            (Some(first), Some(last)) => format!("{} → {}", first, last),
            _ => "no rows".to_string(),
        };
        frame.render_widget(
            Paragraph::new(Header::new(dataset.kind.label(), &period, &self.theme).to_lines()),
            header_area,
        );

        let tabs = self.visible_tabs();
        let selected = tabs.iter().position(|t| *t == self.tab).unwrap_or(0);
        frame.render_widget(
            Tabs::new(tabs.iter().map(|t| t.title()))
                .select(selected)
                .style(self.theme.tab_inactive)
                .highlight_style(self.theme.tab_active)
                .divider(Span::styled("|", self.theme.separator)),
            tabs_area,
        );

        match self.tab {
            Tab::Overview => self.render_overview(frame, body, records),
            Tab::Monthly => self.render_monthly(frame, body, records),
            Tab::Seasonal => self.render_seasonal(frame, body, records),
            Tab::Weather => self.render_weather(frame, body, records),
            Tab::Rankings => {
                let ranking = analysis::top_locations(records, RANKING_N);
                table_view::render_ranking_table(
                    frame,
                    body,
                    &format!("Top {} locations", RANKING_N),
                    &ranking,
                    summary.grand_total,
                    &self.theme,
                );
            }
        }

        self.render_footer(frame, footer);
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect, cards: Vec<MetricCard>) {
        let constraints = vec![Constraint::Ratio(1, cards.len().max(1) as u32); cards.len()];
        let slots = Layout::horizontal(constraints).split(area);
        for (card, slot) in cards.into_iter().zip(slots.iter()) {
            frame.render_widget(card, *slot);
        }
    }

    fn render_overview(&self, frame: &mut Frame, area: Rect, records: &[DashboardRecord]) {
        let summary = analysis::summary(records);
        let [cards, trend, top] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(8),
            Constraint::Min(0),
        ])
        .areas(area);

        let theme = &self.theme;
        self.render_cards(
            frame,
            cards,
            vec![
                MetricCard::new("Total count", format_count(summary.grand_total), theme)
                    .caption(format!("{} rows", format_count(summary.records as i64))),
                MetricCard::new("Locations", summary.counters.to_string(), theme),
                MetricCard::new("Avg daily", format_number(summary.avg_daily_total, 0), theme),
                MetricCard::new("Months", summary.months.to_string(), theme)
                    .caption(format!("{} years", summary.years)),
            ],
        );
        charts::render_daily_trend(frame, trend, &analysis::daily_totals(records), theme);
        charts::render_top_locations(
            frame,
            top,
            &format!("Top {} locations", TOP_N),
            &analysis::top_locations(records, TOP_N),
            theme,
        );
    }

    fn render_monthly(&self, frame: &mut Frame, area: Rect, records: &[DashboardRecord]) {
        if self.all_months {
            let [chart, table] =
                Layout::vertical([Constraint::Percentage(50), Constraint::Min(0)]).areas(area);
            charts::render_monthly_trend(frame, chart, &analysis::monthly_trend(records), &self.theme);
            table_view::render_ranking_table(
                frame,
                table,
                "All months: top locations",
                &analysis::top_locations(records, TOP_N),
                analysis::summary(records).grand_total,
                &self.theme,
            );
            return;
        }

        let Some(breakdown) = self
            .selected_month()
            .and_then(|(y, m)| analysis::month_breakdown(records, y, m, TOP_N))
        else {
            table_view::render_no_data(frame, area, None, &self.theme);
            return;
        };

        let [cards, trend, table] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(7),
            Constraint::Min(0),
        ])
        .areas(area);

        let theme = &self.theme;
        let top = breakdown
            .top_location
            .as_ref()
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| "-".to_string());
        self.render_cards(
            frame,
            cards,
            vec![
                MetricCard::new(
                    "Month",
                    format!("{} {}", breakdown.month_name, breakdown.year),
                    theme,
                ),
                MetricCard::new("Total", format_count(breakdown.total), theme)
                    .caption(format!("{} days", breakdown.days)),
                MetricCard::new("Avg daily", format_number(breakdown.avg_daily, 0), theme),
                MetricCard::new("Top location", top, theme),
            ],
        );
        charts::render_daily_trend(frame, trend, &breakdown.daily, theme);
        table_view::render_location_table(
            frame,
            table,
            "Locations (←/→ month, a: all months)",
            &breakdown.locations,
            theme,
        );
    }

    fn render_seasonal(&self, frame: &mut Frame, area: Rect, records: &[DashboardRecord]) {
        let rows = analysis::group_breakdown(records, GroupBy::Season).unwrap_or_default();
        table_view::render_group_table(frame, area, "By season", GroupBy::Season, &rows, &self.theme);
    }

    fn render_weather(&self, frame: &mut Frame, area: Rect, records: &[DashboardRecord]) {
        let [groups, bands] =
            Layout::vertical([Constraint::Percentage(50), Constraint::Min(0)]).areas(area);
        let rows = analysis::group_breakdown(records, GroupBy::Weather).unwrap_or_default();
        table_view::render_group_table(
            frame,
            groups,
            "By weather condition",
            GroupBy::Weather,
            &rows,
            &self.theme,
        );

        let [temp, precip] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(bands);
        if let Some(rows) = analysis::band_breakdown(records, Band::Temperature) {
            table_view::render_band_table(frame, temp, "Temperature", &rows, &self.theme);
        }
        if let Some(rows) = analysis::band_breakdown(records, Band::Precipitation) {
            table_view::render_band_table(frame, precip, "Precipitation", &rows, &self.theme);
        }
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled(
            "Tab/Shift-Tab switch · r reload · q quit",
            self.theme.dim,
        )];
        if let Some(err) = self.manager.last_error() {
            spans.push(Span::styled(format!("  reload failed: {}", err), self.theme.error));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

/// Open the dashboard over the datasets under `data_dir`.
pub async fn run_dashboard(data_dir: impl Into<PathBuf>, theme_name: &str) -> io::Result<()> {
    App::new(data_dir, theme_name).run().await
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::path::Path;
    use tempfile::TempDir;

    const DAILY: &str = "day,counter_key,total\n\
        2024-01-30,Langebro,100\n\
        2024-01-31,Langebro,120\n\
        2024-02-01,Langebro,90\n\
        2024-02-01,Nørrebrogade,300\n";

    const ENRICHED: &str = "day,counter_key,total,year,month,month_name,weekday,season,temperature,weather_condition,precipitation,wind_speed\n\
        2024-01-31,Langebro,120,2024,1,January,Wednesday,winter,1.5,cold,0.2,7.0\n\
        2024-06-01,Langebro,400,2024,6,June,Saturday,summer,22.0,sunny,0.0,4.0\n\
        2024-06-02,Nørrebrogade,500,2024,6,June,Sunday,summer,18.0,rainy,7.5,9.0\n";

    fn write(dir: &Path, name: &str, content: &str) {
        let curated = dir.join("curated");
        std::fs::create_dir_all(&curated).unwrap();
        std::fs::write(curated.join(name), content).unwrap();
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn draw(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    // ── visible_tabs ──────────────────────────────────────────────────────────

    #[test]
    fn test_plain_dataset_hides_season_and_weather() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "daily_counts.csv", DAILY);
        let app = App::new(tmp.path(), "dark");
        assert_eq!(
            app.visible_tabs(),
            vec![Tab::Overview, Tab::Monthly, Tab::Rankings]
        );
    }

    #[test]
    fn test_enriched_dataset_shows_all_tabs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "real_copenhagen_data_with_weather_fixed.csv", ENRICHED);
        let app = App::new(tmp.path(), "dark");
        assert_eq!(app.visible_tabs(), Tab::ALL.to_vec());
    }

    // ── handle_key ────────────────────────────────────────────────────────────

    #[test]
    fn test_tab_cycles_over_visible_tabs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "daily_counts.csv", DAILY);
        let mut app = App::new(tmp.path(), "dark");

        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.current_tab(), Tab::Monthly);
        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.current_tab(), Tab::Rankings);
        app.handle_key(press(KeyCode::Tab));
        assert_eq!(app.current_tab(), Tab::Overview);
        app.handle_key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT));
        assert_eq!(app.current_tab(), Tab::Rankings);
    }

    #[test]
    fn test_month_navigation() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "daily_counts.csv", DAILY);
        let mut app = App::new(tmp.path(), "dark");
        app.handle_key(press(KeyCode::Tab));

        assert_eq!(app.selected_month(), Some((2024, 2)));
        app.handle_key(press(KeyCode::Left));
        assert_eq!(app.selected_month(), Some((2024, 1)));
        // Clamped at the first month.
        app.handle_key(press(KeyCode::Left));
        assert_eq!(app.selected_month(), Some((2024, 1)));
        app.handle_key(press(KeyCode::Right));
        assert_eq!(app.selected_month(), Some((2024, 2)));
    }

    #[test]
    fn test_all_months_toggle_only_on_monthly_tab() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "daily_counts.csv", DAILY);
        let mut app = App::new(tmp.path(), "dark");

        app.handle_key(press(KeyCode::Char('a')));
        assert!(!app.all_months());
        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Char('a')));
        assert!(app.all_months());
        app.handle_key(press(KeyCode::Left));
        assert!(!app.all_months());
    }

    #[test]
    fn test_quit_keys() {
        let tmp = TempDir::new().unwrap();
        let mut app = App::new(tmp.path(), "dark");
        app.handle_key(press(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = App::new(tmp.path(), "dark");
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_reload_key_picks_up_new_dataset() {
        let tmp = TempDir::new().unwrap();
        let mut app = App::new(tmp.path(), "dark");
        assert!(app.dataset().is_none());

        write(tmp.path(), "daily_counts.csv", DAILY);
        app.handle_key(press(KeyCode::Char('r')));
        assert_eq!(app.records().len(), 4);
    }

    // ── render ────────────────────────────────────────────────────────────────

    #[test]
    fn test_render_without_dataset() {
        let tmp = TempDir::new().unwrap();
        let app = App::new(tmp.path(), "dark");
        assert!(draw(&app, 100, 20).contains("No dataset found"));
    }

    #[test]
    fn test_render_overview_header() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "daily_counts.csv", DAILY);
        let app = App::new(tmp.path(), "dark");

        let text = draw(&app, 120, 40);
        assert!(text.contains("COPENHAGEN BIKE COUNTERS"));
        assert!(text.contains("pipeline output"));
        assert!(text.contains("610"));
    }

    #[test]
    fn test_render_every_tab_does_not_panic() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "real_copenhagen_data_with_weather_fixed.csv", ENRICHED);
        let mut app = App::new(tmp.path(), "light");

        for _ in 0..Tab::ALL.len() {
            draw(&app, 120, 40);
            app.handle_key(press(KeyCode::Tab));
        }
        assert_eq!(app.current_tab(), Tab::Overview);

        app.handle_key(press(KeyCode::Tab));
        app.handle_key(press(KeyCode::Char('a')));
        assert!(draw(&app, 120, 40).contains("Monthly totals"));
    }

    #[test]
    fn test_render_weather_tab_shows_conditions() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "real_copenhagen_data_with_weather_fixed.csv", ENRICHED);
        let mut app = App::new(tmp.path(), "dark");
        for _ in 0..3 {
            app.handle_key(press(KeyCode::Tab));
        }
        assert_eq!(app.current_tab(), Tab::Weather);

        let text = draw(&app, 120, 40);
        assert!(text.contains("Sunny"));
        assert!(text.contains("Rainy"));
    }
}

use ratatui::style::{Color, Modifier, Style};

/// Whether the terminal reports a light background.
///
/// Reads `COLORFGBG` (`"fg;bg"`, sometimes `"fg;default;bg"`); background
/// indices above 6 are light. Absent or unparsable values count as dark.
pub fn light_background() -> bool {
    std::env::var("COLORFGBG")
        .map(|v| is_light_colorfgbg(&v))
        .unwrap_or(false)
}

fn is_light_colorfgbg(value: &str) -> bool {
    value
        .rsplit(';')
        .next()
        .and_then(|bg| bg.trim().parse::<u8>().ok())
        .is_some_and(|bg| bg > 6)
}

/// All styles used by the dashboard components.
#[derive(Debug, Clone)]
pub struct Theme {
    // ── Header ───────────────────────────────────────────────────────────────
    pub header: Style,
    pub header_accent: Style,
    pub separator: Style,

    // ── Text ─────────────────────────────────────────────────────────────────
    pub text: Style,
    pub dim: Style,
    pub bold: Style,
    pub label: Style,
    pub value: Style,

    // ── Status ───────────────────────────────────────────────────────────────
    pub info: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,

    // ── Tabs ─────────────────────────────────────────────────────────────────
    pub tab_active: Style,
    pub tab_inactive: Style,

    // ── Charts ───────────────────────────────────────────────────────────────
    pub chart_line: Style,
    pub chart_bar: Style,
    pub chart_bar_value: Style,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: Style,
    pub table_border: Style,
    pub table_row: Style,
    pub table_row_alt: Style,
    pub table_total: Style,

    // ── Seasons ──────────────────────────────────────────────────────────────
    pub season_spring: Style,
    pub season_summer: Style,
    pub season_autumn: Style,
    pub season_winter: Style,

    // ── Weather ──────────────────────────────────────────────────────────────
    pub weather_sunny: Style,
    pub weather_cloudy: Style,
    pub weather_rainy: Style,
    pub weather_cold: Style,
}

impl Theme {
    // ── Constructors ─────────────────────────────────────────────────────────

    /// Theme for dark terminals; the default.
    pub fn dark() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            header_accent: Style::default().fg(Color::Yellow),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            bold: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::Gray),
            value: Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),

            info: Style::default().fg(Color::Cyan),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            tab_active: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),

            chart_line: Style::default().fg(Color::Cyan),
            chart_bar: Style::default().fg(Color::Green),
            chart_bar_value: Style::default().fg(Color::Black).bg(Color::Green),

            table_header: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),
            table_total: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),

            season_spring: Style::default().fg(Color::LightGreen),
            season_summer: Style::default().fg(Color::Yellow),
            season_autumn: Style::default().fg(Color::LightRed),
            season_winter: Style::default().fg(Color::LightBlue),

            weather_sunny: Style::default().fg(Color::Yellow),
            weather_cloudy: Style::default().fg(Color::Gray),
            weather_rainy: Style::default().fg(Color::Blue),
            weather_cold: Style::default().fg(Color::Cyan),
        }
    }

    /// Theme for light terminals, with dark text colours.
    pub fn light() -> Self {
        Self {
            header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            header_accent: Style::default().fg(Color::Magenta),
            separator: Style::default().fg(Color::Gray),

            text: Style::default().fg(Color::Black),
            dim: Style::default().fg(Color::Gray),
            bold: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::DarkGray),
            value: Style::default()
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),

            info: Style::default().fg(Color::Blue),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            tab_active: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),

            chart_line: Style::default().fg(Color::Blue),
            chart_bar: Style::default().fg(Color::Blue),
            chart_bar_value: Style::default().fg(Color::White).bg(Color::Blue),

            table_header: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            table_border: Style::default().fg(Color::Gray),
            table_row: Style::default().fg(Color::Black),
            table_row_alt: Style::default().fg(Color::DarkGray),
            table_total: Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),

            season_spring: Style::default().fg(Color::Green),
            season_summer: Style::default().fg(Color::Magenta),
            season_autumn: Style::default().fg(Color::Red),
            season_winter: Style::default().fg(Color::Blue),

            weather_sunny: Style::default().fg(Color::Magenta),
            weather_cloudy: Style::default().fg(Color::DarkGray),
            weather_rainy: Style::default().fg(Color::Blue),
            weather_cold: Style::default().fg(Color::Cyan),
        }
    }

    /// Basic 8-colour ANSI palette without bold modifiers.
    pub fn classic() -> Self {
        Self {
            header: Style::default().fg(Color::Cyan),
            header_accent: Style::default().fg(Color::White),
            separator: Style::default().fg(Color::DarkGray),

            text: Style::default().fg(Color::White),
            dim: Style::default().fg(Color::DarkGray),
            bold: Style::default().fg(Color::White),
            label: Style::default().fg(Color::Gray),
            value: Style::default().fg(Color::White),

            info: Style::default().fg(Color::Cyan),
            success: Style::default().fg(Color::Green),
            warning: Style::default().fg(Color::Yellow),
            error: Style::default().fg(Color::Red),

            tab_active: Style::default().fg(Color::Yellow),
            tab_inactive: Style::default().fg(Color::White),

            chart_line: Style::default().fg(Color::Cyan),
            chart_bar: Style::default().fg(Color::Green),
            chart_bar_value: Style::default().fg(Color::Black).bg(Color::Green),

            table_header: Style::default().fg(Color::Cyan),
            table_border: Style::default().fg(Color::DarkGray),
            table_row: Style::default().fg(Color::White),
            table_row_alt: Style::default().fg(Color::Gray),
            table_total: Style::default().fg(Color::Yellow),

            season_spring: Style::default().fg(Color::Green),
            season_summer: Style::default().fg(Color::Yellow),
            season_autumn: Style::default().fg(Color::Red),
            season_winter: Style::default().fg(Color::Cyan),

            weather_sunny: Style::default().fg(Color::Yellow),
            weather_cloudy: Style::default().fg(Color::White),
            weather_rainy: Style::default().fg(Color::Blue),
            weather_cold: Style::default().fg(Color::Cyan),
        }
    }

    /// Light theme on light terminals, dark otherwise.
    pub fn auto_detect() -> Self {
        if light_background() {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Construct a theme by name. Falls back to `auto_detect` for unknown
    /// names.
    pub fn from_name(name: &str) -> Self {
        match name {
            "light" => Self::light(),
            "dark" => Self::dark(),
            "classic" => Self::classic(),
            _ => Self::auto_detect(),
        }
    }

    // ── Style helpers ────────────────────────────────────────────────────────

    /// Style for a season label; unknown labels use `text`.
    pub fn season_style(&self, season: &str) -> Style {
        match season.to_lowercase().as_str() {
            "spring" => self.season_spring,
            "summer" => self.season_summer,
            "autumn" | "fall" => self.season_autumn,
            "winter" => self.season_winter,
            _ => self.text,
        }
    }

    /// Style for a weather-condition label; unknown labels use `text`.
    pub fn weather_style(&self, condition: &str) -> Style {
        match condition.to_lowercase().as_str() {
            "sunny" => self.weather_sunny,
            "cloudy" => self.weather_cloudy,
            "rainy" => self.weather_rainy,
            "cold" => self.weather_cold,
            _ => self.text,
        }
    }

    /// Row style for zebra striping.
    pub fn row_style(&self, index: usize) -> Style {
        if index % 2 == 0 {
            self.table_row
        } else {
            self.table_row_alt
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

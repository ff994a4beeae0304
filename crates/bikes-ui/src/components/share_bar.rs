use crate::themes::Theme;
use bikes_core::formatting::{format_count, percentage};
use ratatui::text::{Line, Span};

/// Configuration controlling visual appearance of a share bar.
pub struct ShareBarConfig {
    /// Width in terminal columns of the bar portion (excluding label).
    pub width: u16,
    pub filled_char: char,
    pub empty_char: char,
}

impl Default for ShareBarConfig {
    fn default() -> Self {
        Self {
            width: 30,
            filled_char: '\u{2588}', // █  FULL BLOCK
            empty_char: '\u{2591}',  // ░  LIGHT SHADE
        }
    }
}

/// Horizontal bar showing one counter's share of the overall total, followed
/// by `" 12.3% (1,234)"`.
pub struct ShareBar<'a> {
    /// Share of the whole, clamped to `[0.0, 100.0]`.
    pub percentage: f64,
    pub value: i64,
    pub theme: &'a Theme,
    pub config: ShareBarConfig,
}

impl<'a> ShareBar<'a> {
    /// Construct a bar for `value` out of `whole`.
    pub fn new(value: i64, whole: i64, theme: &'a Theme) -> Self {
        Self {
            percentage: percentage(value as f64, whole as f64, 1).clamp(0.0, 100.0),
            value,
            theme,
            config: ShareBarConfig::default(),
        }
    }

    pub fn width(mut self, width: u16) -> Self {
        self.config.width = width;
        self
    }

    pub fn to_line(&self) -> Line<'a> {
        let filled = ((self.percentage / 100.0) * self.config.width as f64).round() as u16;
        let filled = filled.min(self.config.width);
        let empty = self.config.width - filled;

        let filled_str: String = std::iter::repeat(self.config.filled_char)
            .take(filled as usize)
            .collect();
        let empty_str: String = std::iter::repeat(self.config.empty_char)
            .take(empty as usize)
            .collect();

        Line::from(vec![
            Span::styled(filled_str, self.theme.chart_bar),
            Span::styled(empty_str, self.theme.dim),
            Span::styled(
                format!(" {:.1}% ({})", self.percentage, format_count(self.value)),
                self.theme.label,
            ),
        ])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Decorative accent placed either side of the dashboard title.
pub const ACCENT: &str = "✦ ✧ ✦ ✧";

/// Dashboard header rendering four lines:
///
/// 1. Title with accent decorations.
/// 2. A 60-column `=` separator.
/// 3. Dataset kind and covered period in `[ kind | period ]` format.
/// 4. An empty line.
pub struct Header<'a> {
    /// Provenance label of the loaded dataset (e.g. "pipeline output").
    pub dataset: &'a str,
    /// Covered date range, already formatted.
    pub period: &'a str,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(dataset: &'a str, period: &'a str, theme: &'a Theme) -> Self {
        Self {
            dataset,
            period,
            theme,
        }
    }

    /// Render the header as exactly four lines.
    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let separator = "=".repeat(60);

        vec![
            Line::from(vec![
                Span::styled(ACCENT, self.theme.header_accent),
                Span::styled(" COPENHAGEN BIKE COUNTERS ", self.theme.header),
                Span::styled(ACCENT, self.theme.header_accent),
            ]),
            Line::from(Span::styled(separator, self.theme.separator)),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.dataset, self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(self.period, self.theme.value),
                Span::styled(" ]", self.theme.label),
            ]),
            Line::from(""),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

use crate::themes::Theme;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A bordered box showing one headline number with its label.
pub struct MetricCard<'a> {
    pub label: &'a str,
    pub value: String,
    /// Optional dim line under the value (e.g. "over 31 days").
    pub caption: Option<String>,
    pub theme: &'a Theme,
}

impl<'a> MetricCard<'a> {
    pub fn new(label: &'a str, value: impl Into<String>, theme: &'a Theme) -> Self {
        Self {
            label,
            value: value.into(),
            caption: None,
            theme,
        }
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Content lines fitted to `width` display columns.
    pub fn to_lines(&self, width: usize) -> Vec<Line<'static>> {
        let mut lines = vec![Line::from(Span::styled(
            truncate_to_width(&self.value, width),
            self.theme.value,
        ))];
        if let Some(caption) = &self.caption {
            lines.push(Line::from(Span::styled(
                truncate_to_width(caption, width),
                self.theme.dim,
            )));
        }
        lines
    }
}

impl Widget for MetricCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(self.theme.table_border)
            .title(Span::styled(format!(" {} ", self.label), self.theme.label));
        let inner_width = area.width.saturating_sub(2) as usize;
        Paragraph::new(self.to_lines(inner_width))
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
    }
}

/// Cut `s` to at most `width` display columns, ending in `…` when shortened.
///
/// Wide characters (CJK, most emoji) count as two columns.
///
/// # Examples
///
/// ```
/// use bikes_ui::components::metric_card::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Nørrebrogade", 20), "Nørrebrogade");
/// assert_eq!(truncate_to_width("Nørrebrogade", 6), "Nørre…");
/// ```
pub fn truncate_to_width(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    // ── truncate_to_width ────────────────────────────────────────────────────

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate_to_width("1,234", 10), "1,234");
    }

    #[test]
    fn test_truncate_shortens_with_ellipsis() {
        let out = truncate_to_width("Frederiksberg Allé", 10);
        assert_eq!(out, "Frederiks…");
        assert_eq!(out.width(), 10);
    }

    #[test]
    fn test_truncate_wide_chars() {
        // Each CJK char is two columns wide.
        let out = truncate_to_width("自転車自転車", 5);
        assert_eq!(out, "自転…");
        assert!(out.width() <= 5);
    }

    #[test]
    fn test_truncate_zero_width() {
        assert_eq!(truncate_to_width("abc", 0), "");
    }

    // ── to_lines ─────────────────────────────────────────────────────────────

    #[test]
    fn test_card_lines_with_caption() {
        let theme = Theme::dark();
        let card = MetricCard::new("Total rides", "1,234,567", &theme).caption("31 days");
        let lines = card.to_lines(20);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].spans[0].content, "1,234,567");
        assert_eq!(lines[1].spans[0].content, "31 days");
    }

    // ── render ───────────────────────────────────────────────────────────────

    #[test]
    fn test_card_renders_label_and_value() {
        let theme = Theme::dark();
        let backend = TestBackend::new(24, 4);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                f.render_widget(MetricCard::new("Locations", "12", &theme), f.area());
            })
            .unwrap();

        let buffer = terminal.backend().buffer();
        let rendered: String = buffer.content().iter().map(|c| c.symbol()).collect();
        assert!(rendered.contains("Locations"));
        assert!(rendered.contains("12"));
    }
}

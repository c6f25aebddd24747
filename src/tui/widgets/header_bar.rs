//! Top header bar showing the scan window, mode and counts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::present::format_date;
use crate::tui::app::App;
use crate::tui::theme::current_theme;

/// Render the top header bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();
    let session = &app.session;

    let source = if session.dev_mode() { "samples" } else { "gmail" };
    let total = session.candidates().len();
    let visible = app.view.item_count();
    let suppressed = session.suppressed().len();

    let mut spans = vec![
        Span::styled(" refundscan", theme.header_bar),
        Span::styled(format!(" | {} days", session.period_days()), theme.header_bar),
        Span::styled(format!(" | {source}"), theme.header_bar),
        Span::styled(format!(" | {} view", session.mode().label()), theme.header_bar),
        Span::styled(format!(" | {visible} / {total} messages"), theme.header_bar),
    ];

    if suppressed > 0 {
        spans.push(Span::styled(
            format!(" | {suppressed} suppressed"),
            theme.header_bar,
        ));
    }

    let cached = format_date(session.fetched_at(), &app.date_format);
    if !cached.is_empty() {
        spans.push(Span::styled(format!(" | cached {cached}"), theme.header_bar));
    }

    // Right-aligned help hint
    let left_len: usize = spans.iter().map(|s| s.content.len()).sum();
    let right_text = " [?] Help ";
    let width = area.width as usize;
    if width > left_len + right_text.len() {
        let padding = width - left_len - right_text.len();
        spans.push(Span::styled(" ".repeat(padding), theme.header_bar));
    }
    spans.push(Span::styled(right_text, theme.header_bar));

    let bar = Paragraph::new(Line::from(spans)).style(theme.header_bar);
    frame.render_widget(bar, area);
}

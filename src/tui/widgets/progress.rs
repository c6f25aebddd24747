//! Progress gauge drawn while a fetch is running.

use ratatui::widgets::{Block, Borders, Clear, Gauge};
use ratatui::Frame;

use crate::fetch::FetchProgress;
use crate::tui::theme::current_theme;
use crate::tui::widgets::help_popup::centered_rect_exact;

/// Render a centered gauge for `progress`. Draws over an empty frame.
pub fn render(frame: &mut Frame, progress: FetchProgress) {
    let theme = current_theme();
    let screen = frame.area();
    let width = (screen.width * 60 / 100).max(30).min(screen.width);
    let area = centered_rect_exact(width, 3, screen);

    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.popup_title)
        .title(" Scanning ")
        .style(theme.popup);

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(theme.gauge)
        .ratio(ratio(progress))
        .label(format!("{} / {}", progress.done, progress.total));

    frame.render_widget(gauge, area);
}

/// Fraction done, clamped to `0.0..=1.0`; an empty scan is 0.
fn ratio(progress: FetchProgress) -> f64 {
    if progress.total == 0 {
        return 0.0;
    }
    (progress.done as f64 / progress.total as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(FetchProgress { done: 0, total: 0 }), 0.0);
        assert_eq!(ratio(FetchProgress { done: 1, total: 4 }), 0.25);
        assert_eq!(ratio(FetchProgress { done: 5, total: 4 }), 1.0);
    }
}

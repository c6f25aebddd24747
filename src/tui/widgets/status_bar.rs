//! Bottom status bar showing transient messages or keyboard hints.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::present::ViewMode;
use crate::tui::app::App;
use crate::tui::theme::current_theme;

/// Version string shown at the right edge of the status bar.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Render the status bar at the bottom with hints and version.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();

    let version_text = format!("v{VERSION} ");
    let version_width = version_text.len() as u16;

    // Split: hints (flexible) | version (fixed)
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(10), Constraint::Length(version_width)])
        .split(area);

    let content = if let Some((msg, _)) = &app.status_message {
        Line::from(Span::styled(format!(" {msg}"), theme.status_bar))
    } else {
        let mut spans = Vec::new();
        for (i, (key, desc)) in build_hints(app).iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" ", theme.status_bar));
            }
            spans.push(Span::styled(format!(" {key}"), theme.key_hint));
            spans.push(Span::styled(format!(":{desc}"), theme.status_bar));
        }
        Line::from(spans)
    };

    frame.render_widget(Paragraph::new(content).style(theme.status_bar), chunks[0]);

    let version = Paragraph::new(Line::from(Span::styled(version_text, theme.border)))
        .alignment(Alignment::Right)
        .style(theme.status_bar);
    frame.render_widget(version, chunks[1]);
}

/// Hint pairs (key, description) for the current view.
fn build_hints(app: &App) -> Vec<(&'static str, &'static str)> {
    let mut hints = vec![("j/k", "move"), ("Space", "fold")];
    if app.view.all_collapsed {
        hints.push(("c", "expand all"));
    } else {
        hints.push(("c", "collapse all"));
    }
    match app.session.mode() {
        ViewMode::Active => {
            hints.push(("x", "suppress"));
            hints.push(("v", "suppressed"));
        }
        ViewMode::Suppressed => {
            hints.push(("x", "restore"));
            hints.push(("v", "active"));
        }
    }
    hints.push(("o", "open"));
    hints.push(("r", "refresh"));
    hints.push(("p", "period"));
    hints.push(("?", "help"));
    hints.push(("q", "quit"));
    hints
}

//! Preview pane for the selected item: sender, status, date and snippet.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use crate::present::format_date;
use crate::tui::app::App;
use crate::tui::theme::current_theme;

/// Render the preview of the selected item, or the selected group's email.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = current_theme();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(" Preview ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();

    match (app.selected_candidate(), app.selected_group()) {
        (Some(c), _) => {
            let from = match (&c.from_name, &c.from_email) {
                (Some(name), Some(email)) => format!("{name} <{email}>"),
                (None, Some(email)) => email.clone(),
                _ => c.from.clone(),
            };
            lines.push(Line::from(vec![
                Span::styled(c.status.label(), theme.status(c.status)),
                Span::styled(
                    format!("  {}", format_date(c.date, &app.date_format)),
                    theme.dim,
                ),
                Span::styled(format!("  {from}"), theme.group_meta),
            ]));
            lines.push(Line::from(Span::styled(c.snippet.clone(), theme.snippet)));
        }
        (None, Some(group)) => {
            lines.push(Line::from(vec![
                Span::styled(group.email.clone(), theme.group_header),
                Span::styled(format!("  {}", group.count_label()), theme.group_meta),
            ]));
        }
        (None, None) => {}
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, inner);
}

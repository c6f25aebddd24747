//! Grouped refund list with virtual scrolling.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::present::{format_date, format_timestamp_ms, ViewMode};
use crate::tui::app::{App, ListRow};
use crate::tui::theme::current_theme;

const DATE_W: usize = 17;
const STATUS_W: usize = 16;

/// Render the list of sender groups and their items.
pub fn render(frame: &mut Frame, app: &mut App, area: Rect) {
    let theme = current_theme();

    let title = match app.session.mode() {
        ViewMode::Active => " Returns & refunds ",
        ViewMode::Suppressed => " Suppressed ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border)
        .title(title);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();

    if let Some(err) = app.session.last_error() {
        lines.push(Line::from(Span::styled(format!("Error: {err}"), theme.error)));
    }

    if let Some(message) = app.view.empty_message {
        lines.push(Line::from(Span::styled(message, theme.list_normal)));
        frame.render_widget(Paragraph::new(lines), inner);
        return;
    }
    if app.rows.is_empty() {
        lines.push(Line::from(Span::styled("Nothing to show here.", theme.dim)));
        frame.render_widget(Paragraph::new(lines), inner);
        return;
    }

    let viewport_height = (inner.height as usize).saturating_sub(lines.len());
    app.list_viewport_height = viewport_height;
    app.ensure_selected_visible();

    let width = inner.width as usize;
    let start = app.list_scroll_offset;
    let end = (start + viewport_height).min(app.rows.len());

    for (idx, row) in app.rows[start..end].iter().enumerate() {
        let is_selected = start + idx == app.selected;
        let line = match row {
            ListRow::Group { group } => {
                let g = &app.view.groups[*group];
                let caret = if g.collapsed { "\u{25b8}" } else { "\u{25be}" };
                let mut meta = g.count_label();
                let when = format_timestamp_ms(g.most_recent, &app.date_format);
                if !when.is_empty() {
                    meta.push_str(&format!(" \u{00b7} {when}"));
                }
                let name = format!("{caret} {}", g.display_name);
                let gap = width.saturating_sub(name.width() + meta.width() + 1).max(1);
                Line::from(vec![
                    Span::styled(name, theme.group_header),
                    Span::raw(" ".repeat(gap)),
                    Span::styled(meta, theme.group_meta),
                ])
            }
            ListRow::Item { group, item } => {
                let c = &app.view.groups[*group].items[*item];
                let date = format_date(c.date, &app.date_format);
                let subject_w = width.saturating_sub(2 + STATUS_W + DATE_W + 2);
                let subject = if c.subject.is_empty() {
                    "(no subject)"
                } else {
                    c.subject.as_str()
                };
                Line::from(vec![
                    Span::raw("  "),
                    Span::styled(
                        format!("{:<w$}", c.status.label(), w = STATUS_W),
                        theme.status(c.status),
                    ),
                    Span::styled(pad(&truncate_str(subject, subject_w), subject_w), theme.list_normal),
                    Span::raw("  "),
                    Span::styled(format!("{date:>w$}", w = DATE_W), theme.dim),
                ])
            }
        };
        lines.push(if is_selected {
            line.style(theme.list_selected)
        } else {
            line
        });
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Pad `s` with spaces to `width` columns.
fn pad(s: &str, width: usize) -> String {
    let w = s.width();
    if w >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - w))
    }
}

/// Truncate a string to fit within `max_width` columns, adding "..." if needed.
fn truncate_str(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        s.to_string()
    } else if max_width <= 3 {
        s.chars().take(max_width).collect()
    } else {
        let mut result = String::new();
        let mut current_width = 0;
        for ch in s.chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width + ch_width + 3 > max_width {
                break;
            }
            result.push(ch);
            current_width += ch_width;
        }
        result.push_str("...");
        result
    }
}

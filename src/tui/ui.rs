//! Main render function that dispatches to widgets.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

use super::app::App;
use super::widgets;

/// Height of the preview pane under the list.
const PREVIEW_HEIGHT: u16 = 8;

/// Render the entire TUI frame.
pub fn render(frame: &mut Frame, app: &mut App) {
    let size = frame.area();

    // Vertical layout: header (1) + list (flex) + preview + status (1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(PREVIEW_HEIGHT),
            Constraint::Length(1),
        ])
        .split(size);

    widgets::header_bar::render(frame, app, vertical[0]);
    widgets::refund_list::render(frame, app, vertical[1]);
    widgets::preview::render(frame, app, vertical[2]);
    widgets::status_bar::render(frame, app, vertical[3]);

    if app.show_help {
        widgets::help_popup::render(frame, app);
    }
}

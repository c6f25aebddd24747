//! Keyboard and input event handling.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::app::{App, ListRow};
use crate::present::session::Progress;

/// Process a key event and update the application state.
///
/// `progress` is handed to any fetch the key triggers.
pub fn handle_key_event(app: &mut App, key: KeyEvent, progress: Progress<'_>) -> anyhow::Result<()> {
    // ── Popup handling (captures all keys) ────────────────
    if app.show_help {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => app.show_help = false,
            _ => {}
        }
        return Ok(());
    }

    let page = app.list_viewport_height.max(1);

    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) | (_, KeyCode::Char('q')) | (_, KeyCode::Esc) => {
            app.should_quit = true;
        }
        (_, KeyCode::Char('?')) => app.show_help = true,

        // ── Navigation ────────────────────────
        (_, KeyCode::Char('j')) | (_, KeyCode::Down) => app.move_down(1),
        (_, KeyCode::Char('k')) | (_, KeyCode::Up) => app.move_up(1),
        (_, KeyCode::Char('g')) | (_, KeyCode::Home) => app.select_first(),
        (_, KeyCode::Char('G')) | (_, KeyCode::End) => app.select_last(),
        (_, KeyCode::PageDown) => app.move_down(page),
        (_, KeyCode::PageUp) => app.move_up(page),

        // ── Groups ────────────────────────────
        (_, KeyCode::Char(' ')) => app.toggle_selected_group(),
        (_, KeyCode::Char('c')) => app.toggle_all_groups(),

        // ── Items ─────────────────────────────
        (_, KeyCode::Char('x')) | (_, KeyCode::Delete) => app.toggle_selected_suppression(progress),
        (_, KeyCode::Char('o')) => app.open_selected(),
        (_, KeyCode::Enter) => match app.selected_row() {
            Some(ListRow::Group { .. }) => app.toggle_selected_group(),
            Some(ListRow::Item { .. }) => app.open_selected(),
            None => {}
        },

        // ── Scan ──────────────────────────────
        (_, KeyCode::Char('v')) => app.toggle_view(progress),
        (_, KeyCode::Char('r')) => app.refresh(progress),
        (_, KeyCode::Char('p')) => app.cycle_period(progress),
        (_, KeyCode::Char('d')) => app.toggle_dev_mode(progress),

        _ => {}
    }

    Ok(())
}

//! Global application state for the TUI (the "Model" in Elm architecture).

use std::time::Instant;

use crate::config::Config;
use crate::fetch::RefundSource;
use crate::model::candidate::Candidate;
use crate::present::session::{Progress, Session};
use crate::present::{message_url, RenderedGroup, RenderedView, ViewMode};

/// One line of the grouped list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRow {
    /// Sender header; index into `view.groups`.
    Group { group: usize },
    /// Item of an expanded group.
    Item { group: usize, item: usize },
}

/// Complete TUI state.
pub struct App {
    // ── Data ──────────────────────────────────
    pub session: Session<Box<dyn RefundSource>>,
    /// Last render of the session.
    pub view: RenderedView,
    /// Flattened rows of `view`.
    pub rows: Vec<ListRow>,

    // ── Navigation ────────────────────────────
    /// Index into `rows` of the selected line.
    pub selected: usize,
    pub list_scroll_offset: usize,
    /// Cached viewport height for the list (set during render).
    pub list_viewport_height: usize,

    // ── Display settings ──────────────────────
    pub web_base_url: String,
    pub date_format: String,
    pub period_choices: Vec<u32>,

    // ── UI state / lifecycle ──────────────────
    pub show_help: bool,
    pub should_quit: bool,
    /// Transient status message and the instant it was set.
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(session: Session<Box<dyn RefundSource>>, config: &Config) -> Self {
        let mut app = Self {
            session,
            view: RenderedView::default(),
            rows: Vec::new(),
            selected: 0,
            list_scroll_offset: 0,
            list_viewport_height: 20,
            web_base_url: config.gmail.web_base_url.clone(),
            date_format: config.display.date_format.clone(),
            period_choices: config
                .display
                .period_choices
                .iter()
                .copied()
                .filter(|&d| d > 0)
                .collect(),
            show_help: false,
            should_quit: false,
            status_message: None,
        };
        app.refresh_view();
        app
    }

    /// Load persisted state and the cached (or freshly fetched) window.
    pub fn open(&mut self, progress: Progress<'_>) {
        self.session.open(progress);
        self.after_fetch();
    }

    /// Re-render the session and rebuild the row list, keeping the
    /// selection in range.
    pub fn refresh_view(&mut self) {
        self.view = self.session.view();
        self.rows = flatten(&self.view);
        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
        self.ensure_selected_visible();
    }

    pub fn selected_row(&self) -> Option<&ListRow> {
        self.rows.get(self.selected)
    }

    /// Group the selected row belongs to.
    pub fn selected_group(&self) -> Option<&RenderedGroup> {
        match self.selected_row()? {
            ListRow::Group { group } | ListRow::Item { group, .. } => self.view.groups.get(*group),
        }
    }

    /// Candidate under the cursor, if the cursor is on an item row.
    pub fn selected_candidate(&self) -> Option<&Candidate> {
        match self.selected_row()? {
            ListRow::Item { group, item } => self.view.groups.get(*group)?.items.get(*item),
            ListRow::Group { .. } => None,
        }
    }

    // ── Navigation ────────────────────────────

    pub fn move_down(&mut self, n: usize) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + n).min(self.rows.len() - 1);
            self.ensure_selected_visible();
        }
    }

    pub fn move_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
        self.ensure_selected_visible();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.ensure_selected_visible();
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
        self.ensure_selected_visible();
    }

    /// Ensure the selected row is visible given the current scroll offset.
    pub fn ensure_selected_visible(&mut self) {
        let vp = self.list_viewport_height.max(1);
        if self.selected < self.list_scroll_offset {
            self.list_scroll_offset = self.selected;
        } else if self.selected >= self.list_scroll_offset + vp {
            self.list_scroll_offset = self.selected.saturating_sub(vp - 1);
        }
    }

    // ── Actions ───────────────────────────────

    /// Fold or unfold the group of the selected row and move the cursor to
    /// its header.
    pub fn toggle_selected_group(&mut self) {
        let Some(group) = self.selected_group() else {
            return;
        };
        let key = group.key.clone();
        self.session.toggle_group(&key);
        self.refresh_view();
        self.select_group(&key);
    }

    pub fn toggle_all_groups(&mut self) {
        self.session.toggle_all();
        self.refresh_view();
        if self.view.all_collapsed {
            self.set_status("All senders collapsed");
        } else {
            self.set_status("All senders expanded");
        }
    }

    /// Suppress the selected item in the active view, restore it in the
    /// suppressed view.
    pub fn toggle_selected_suppression(&mut self, progress: Progress<'_>) {
        let Some(id) = self.selected_candidate().map(|c| c.id.clone()) else {
            self.set_status("Select a message first");
            return;
        };
        match self.session.mode() {
            ViewMode::Active => {
                self.session.suppress(&id);
                self.refresh_view();
                self.set_status("Message suppressed");
            }
            ViewMode::Suppressed => {
                self.session.restore(&id, progress);
                if self.session.mode() == ViewMode::Active {
                    self.after_fetch();
                } else {
                    self.refresh_view();
                    self.set_status("Message restored");
                }
            }
        }
    }

    pub fn toggle_view(&mut self, progress: Progress<'_>) {
        self.session.toggle_view(progress);
        self.selected = 0;
        self.list_scroll_offset = 0;
        match self.session.mode() {
            ViewMode::Active => self.after_fetch(),
            ViewMode::Suppressed => {
                self.refresh_view();
                self.set_status("Showing suppressed messages");
            }
        }
    }

    pub fn refresh(&mut self, progress: Progress<'_>) {
        self.session.refresh(progress);
        self.after_fetch();
    }

    /// Move to the next scan window of the configured choices.
    pub fn cycle_period(&mut self, progress: Progress<'_>) {
        let days = next_period(&self.period_choices, self.session.period_days());
        self.session.set_period(days, progress);
        self.selected = 0;
        self.list_scroll_offset = 0;
        self.after_fetch();
    }

    pub fn toggle_dev_mode(&mut self, progress: Progress<'_>) {
        let on = !self.session.dev_mode();
        self.session.set_dev_mode(on, progress);
        self.after_fetch();
    }

    /// Open the selected message in the system browser.
    pub fn open_selected(&mut self) {
        let Some(id) = self.selected_candidate().map(|c| c.id.clone()) else {
            return;
        };
        if id.is_empty() {
            self.set_status("This message has no id");
            return;
        }
        let url = message_url(&self.web_base_url, &id);
        match open::that(&url) {
            Ok(()) => self.set_status(&format!("Opened {url}")),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open browser");
                self.set_status(&format!("Could not open browser: {e}"));
            }
        }
    }

    fn after_fetch(&mut self) {
        self.refresh_view();
        match self.session.last_error() {
            Some(err) => {
                let msg = format!("Error: {err}");
                self.set_status(&msg);
            }
            None => {
                let count = self.view.item_count();
                self.set_status(&format!(
                    "{count} message(s) in the last {} days",
                    self.session.period_days()
                ));
            }
        }
    }

    fn select_group(&mut self, key: &str) {
        let groups = &self.view.groups;
        let pos = self
            .rows
            .iter()
            .position(|row| matches!(row, ListRow::Group { group } if groups[*group].key == key));
        if let Some(pos) = pos {
            self.selected = pos;
            self.ensure_selected_visible();
        }
    }

    /// Set a transient status message that auto-clears after a few seconds.
    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some((msg.to_string(), Instant::now()));
    }

    /// Called every tick: clears expired status messages.
    pub fn tick(&mut self) {
        if let Some((_, when)) = &self.status_message {
            if when.elapsed().as_secs() >= 5 {
                self.status_message = None;
            }
        }
    }
}

/// Header row per group, followed by its items unless collapsed.
fn flatten(view: &RenderedView) -> Vec<ListRow> {
    let mut rows = Vec::new();
    for (g, group) in view.groups.iter().enumerate() {
        rows.push(ListRow::Group { group: g });
        if !group.collapsed {
            rows.extend((0..group.items.len()).map(|i| ListRow::Item { group: g, item: i }));
        }
    }
    rows
}

/// The choice after `current`, wrapping around. Unknown values restart the
/// cycle.
fn next_period(choices: &[u32], current: u32) -> u32 {
    match choices.iter().position(|&d| d == current) {
        Some(i) => choices[(i + 1) % choices.len()],
        None => choices.first().copied().unwrap_or(current),
    }
}

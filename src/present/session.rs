//! Session state of the popup and the operations the user can trigger.
//!
//! Every operation either re-renders from the in-memory candidates or runs
//! exactly one fetch through the [`RefundSource`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{render, RenderedView, ViewInput, ViewMode, DEFAULT_SENDER_NAME_MAX};
use crate::command::error_message;
use crate::fetch::{FetchProgress, RefundSource};
use crate::model::candidate::Candidate;
use crate::store::results::ResultStore;

/// Progress listener handed through to fetches.
pub type Progress<'a> = Option<&'a dyn Fn(FetchProgress)>;

pub struct Session<S: RefundSource> {
    store: ResultStore,
    source: S,
    candidates: Vec<Candidate>,
    suppressed: BTreeSet<String>,
    collapsed: BTreeSet<String>,
    mode: ViewMode,
    period_days: u32,
    dev_mode: bool,
    last_error: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
    sender_name_max: usize,
}

impl<S: RefundSource> Session<S> {
    /// A session with the stored window and mode; call [`Session::open`] to
    /// populate it.
    pub fn new(store: ResultStore, source: S) -> Self {
        let period_days = store.period_days();
        let dev_mode = store.dev_mode();
        Self {
            store,
            source,
            candidates: Vec::new(),
            suppressed: BTreeSet::new(),
            collapsed: BTreeSet::new(),
            mode: ViewMode::Active,
            period_days,
            dev_mode,
            last_error: None,
            fetched_at: None,
            sender_name_max: DEFAULT_SENDER_NAME_MAX,
        }
    }

    pub fn with_sender_name_max(mut self, max: usize) -> Self {
        self.sender_name_max = max;
        self
    }

    /// Load persisted state and show the cached window, fetching only when
    /// the cache entry is missing or empty.
    pub fn open(&mut self, progress: Progress<'_>) {
        self.suppressed = self.store.suppressed();
        self.collapsed = self.store.collapsed();
        self.period_days = self.store.period_days();
        self.dev_mode = self.store.dev_mode();
        self.load_window(progress);
    }

    /// Hide an item from the active view. Never fetches.
    pub fn suppress(&mut self, id: &str) {
        if self.suppressed.insert(id.to_string()) {
            self.store.set_suppressed(&self.suppressed);
            debug!(id, "Suppressed message");
        }
    }

    /// Bring an item back. Restoring the last suppressed item while looking
    /// at the suppressed view switches to the active view and fetches.
    pub fn restore(&mut self, id: &str, progress: Progress<'_>) {
        self.suppressed.remove(id);
        self.store.set_suppressed(&self.suppressed);
        debug!(id, "Restored message");

        if self.suppressed.is_empty() && self.mode == ViewMode::Suppressed {
            self.mode = ViewMode::Active;
            self.fetch(progress);
        }
    }

    /// Flip between active and suppressed view. Going back to the active
    /// view fetches.
    pub fn toggle_view(&mut self, progress: Progress<'_>) {
        self.mode = self.mode.toggled();
        if self.mode == ViewMode::Active {
            self.fetch(progress);
        }
    }

    /// Change the scan window.
    pub fn set_period(&mut self, days: u32, progress: Progress<'_>) {
        if days == 0 {
            return;
        }
        self.period_days = days;
        self.store.set_period_days(days);
        self.load_window(progress);
    }

    /// Switch between sample replay and live scanning, then fetch.
    pub fn set_dev_mode(&mut self, on: bool, progress: Progress<'_>) {
        self.dev_mode = on;
        self.store.set_dev_mode(on);
        self.fetch(progress);
    }

    /// Fold or unfold one sender group.
    pub fn toggle_group(&mut self, key: &str) {
        if !self.collapsed.remove(key) {
            self.collapsed.insert(key.to_string());
        }
        self.store.set_collapsed(&self.collapsed);
    }

    /// Collapse every rendered group if any is expanded, else expand all.
    pub fn toggle_all(&mut self) {
        let view = self.view();
        self.collapsed = if view.all_collapsed {
            BTreeSet::new()
        } else {
            view.group_keys()
        };
        self.store.set_collapsed(&self.collapsed);
    }

    /// Fetch the current window again.
    pub fn refresh(&mut self, progress: Progress<'_>) {
        self.fetch(progress);
    }

    /// Render the current state.
    pub fn view(&self) -> RenderedView {
        render(&ViewInput {
            candidates: &self.candidates,
            suppressed: &self.suppressed,
            collapsed: &self.collapsed,
            mode: self.mode,
            sender_name_max: self.sender_name_max,
        })
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn suppressed(&self) -> &BTreeSet<String> {
        &self.suppressed
    }

    pub fn collapsed(&self) -> &BTreeSet<String> {
        &self.collapsed
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn period_days(&self) -> u32 {
        self.period_days
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// Message of the last failed fetch, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn load_window(&mut self, progress: Progress<'_>) {
        match self.store.cached_results(self.period_days) {
            Some(cached) if !cached.results.is_empty() => {
                debug!(period_days = self.period_days, "Using cached results");
                self.fetched_at = cached.fetched_at_date();
                self.candidates = cached.results;
                self.last_error = None;
            }
            _ => self.fetch(progress),
        }
    }

    fn fetch(&mut self, progress: Progress<'_>) {
        match self.source.fetch_refunds(self.period_days, progress) {
            Ok(results) => {
                self.candidates = results;
                self.last_error = None;
                self.fetched_at = self
                    .store
                    .cached_results(self.period_days)
                    .and_then(|c| c.fetched_at_date())
                    .or_else(|| Some(Utc::now()));
            }
            Err(e) => {
                warn!(period_days = self.period_days, error = %e, "Fetch failed");
                self.last_error = Some(error_message(&e));
            }
        }
    }
}

//! Grouping of candidates by sender and the pure render of one view.

pub mod session;

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Local, Utc};

use crate::model::candidate::Candidate;
use crate::parser::text::truncate_chars;

/// Gmail web UI prefix; a message id is appended.
pub const DEFAULT_WEB_URL: &str = "https://mail.google.com/mail/u/0/#inbox/";

/// Shown when a window has no candidates at all.
pub const EMPTY_MESSAGE: &str = "No return/refund emails found.";

pub const DEFAULT_SENDER_NAME_MAX: usize = 20;

/// Browser URL of a message.
pub fn message_url(web_base_url: &str, id: &str) -> String {
    format!("{web_base_url}{id}")
}

/// Which items are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// Everything not suppressed.
    #[default]
    Active,
    /// Only suppressed items.
    Suppressed,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Active => Self::Suppressed,
            Self::Suppressed => Self::Active,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Suppressed => "Suppressed",
        }
    }

    fn shows(self, is_suppressed: bool) -> bool {
        match self {
            Self::Active => !is_suppressed,
            Self::Suppressed => is_suppressed,
        }
    }
}

/// All candidates of one sender, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderGroup<'a> {
    pub key: String,
    /// First non-empty `fromName` seen for the sender.
    pub name: Option<String>,
    pub email: String,
    pub items: Vec<&'a Candidate>,
    /// Epoch milliseconds of the newest item, 0 when undated.
    pub most_recent: i64,
}

/// Group candidates by sender key and order groups by their newest item.
///
/// Both sorts are stable, so ties keep input order.
pub fn group_by_sender(candidates: &[Candidate]) -> Vec<SenderGroup<'_>> {
    let mut groups: Vec<SenderGroup<'_>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for candidate in candidates {
        let key = candidate.sender_key();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(SenderGroup {
                key: key.to_string(),
                name: None,
                email: candidate
                    .from_email
                    .clone()
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| key.to_string()),
                items: Vec::new(),
                most_recent: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        if group.name.is_none() {
            group.name = candidate
                .from_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from);
        }
        group.items.push(candidate);
    }

    for group in &mut groups {
        group.items.sort_by_key(|c| std::cmp::Reverse(c.timestamp_ms()));
        group.most_recent = group.items.first().map(|c| c.timestamp_ms()).unwrap_or(0);
    }
    groups.sort_by_key(|g| std::cmp::Reverse(g.most_recent));
    groups
}

/// Everything `render` needs.
#[derive(Debug, Clone, Copy)]
pub struct ViewInput<'a> {
    pub candidates: &'a [Candidate],
    pub suppressed: &'a BTreeSet<String>,
    pub collapsed: &'a BTreeSet<String>,
    pub mode: ViewMode,
    pub sender_name_max: usize,
}

/// One visible sender group.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedGroup {
    pub key: String,
    /// Sender name (or email) cut to the configured width.
    pub display_name: String,
    pub email: String,
    /// Items visible in the current view, newest first.
    pub items: Vec<Candidate>,
    pub most_recent: i64,
    pub collapsed: bool,
}

impl RenderedGroup {
    /// `"1 item"` / `"3 items"`.
    pub fn count_label(&self) -> String {
        let n = self.items.len();
        format!("{n} item{}", if n == 1 { "" } else { "s" })
    }
}

/// Result of a render pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedView {
    pub groups: Vec<RenderedGroup>,
    /// True when no rendered group is expanded.
    pub all_collapsed: bool,
    pub empty_message: Option<&'static str>,
}

impl RenderedView {
    /// Number of visible items over all groups.
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn group_keys(&self) -> BTreeSet<String> {
        self.groups.iter().map(|g| g.key.clone()).collect()
    }
}

/// Name shown for a sender: its name, else its email, cut to `max` chars
/// with a trailing `...`.
pub fn display_name(name: Option<&str>, email: &str, max: usize) -> String {
    let base = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name,
        None if email.is_empty() => "unknown",
        None => email,
    };
    if base.chars().count() > max {
        format!("{}...", truncate_chars(base, max))
    } else {
        base.to_string()
    }
}

/// Render the current view. Pure: no I/O, no state.
pub fn render(input: &ViewInput<'_>) -> RenderedView {
    if input.candidates.is_empty() {
        return RenderedView {
            groups: Vec::new(),
            all_collapsed: true,
            empty_message: Some(EMPTY_MESSAGE),
        };
    }

    let groups: Vec<RenderedGroup> = group_by_sender(input.candidates)
        .into_iter()
        .filter_map(|group| {
            let items: Vec<Candidate> = group
                .items
                .iter()
                .filter(|c| input.mode.shows(input.suppressed.contains(&c.id)))
                .map(|c| (*c).clone())
                .collect();
            if items.is_empty() {
                return None;
            }
            Some(RenderedGroup {
                display_name: display_name(
                    group.name.as_deref(),
                    &group.email,
                    input.sender_name_max,
                ),
                collapsed: input.collapsed.contains(&group.key),
                key: group.key,
                email: group.email,
                items,
                most_recent: group.most_recent,
            })
        })
        .collect();

    RenderedView {
        all_collapsed: groups.iter().all(|g| g.collapsed),
        groups,
        empty_message: None,
    }
}

/// Format an optional date in local time; undated renders as empty.
pub fn format_date(date: Option<DateTime<Utc>>, format: &str) -> String {
    date.map(|d| d.with_timezone(&Local).format(format).to_string())
        .unwrap_or_default()
}

/// Format epoch milliseconds in local time; 0 renders as empty.
pub fn format_timestamp_ms(ms: i64, format: &str) -> String {
    if ms == 0 {
        return String::new();
    }
    format_date(DateTime::from_timestamp_millis(ms), format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::candidate::RefundStatus;
    use chrono::TimeZone;

    fn item(id: &str, email: Option<&str>, from: &str, day: Option<u32>) -> Candidate {
        Candidate {
            subject: format!("Return {id}"),
            snippet: String::new(),
            status: RefundStatus::Pending,
            from: from.to_string(),
            from_name: None,
            from_email: email.map(String::from),
            date: day.map(|d| Utc.with_ymd_and_hms(2024, 1, d, 12, 0, 0).unwrap()),
            id: id.to_string(),
            thread_id: id.to_string(),
        }
    }

    fn input<'a>(
        candidates: &'a [Candidate],
        suppressed: &'a BTreeSet<String>,
        collapsed: &'a BTreeSet<String>,
        mode: ViewMode,
    ) -> ViewInput<'a> {
        ViewInput {
            candidates,
            suppressed,
            collapsed,
            mode,
            sender_name_max: DEFAULT_SENDER_NAME_MAX,
        }
    }

    fn ab() -> Vec<Candidate> {
        vec![
            item("a1", Some("a@shop.test"), "", Some(1)),
            item("a3", Some("a@shop.test"), "", Some(3)),
            item("b1", Some("b@shop.test"), "", Some(5)),
            item("a2", Some("a@shop.test"), "", Some(2)),
        ]
    }

    #[test]
    fn test_groups_ordered_by_most_recent() {
        let candidates = ab();
        let groups = group_by_sender(&candidates);
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["b@shop.test", "a@shop.test"]);

        let a_ids: Vec<&str> = groups[1].items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(a_ids, vec!["a3", "a2", "a1"]);
        assert_eq!(groups[1].most_recent, candidates[1].timestamp_ms());
    }

    #[test]
    fn test_sender_key_fallback_and_undated_last() {
        let candidates = vec![
            item("x1", None, "Raw Sender", None),
            item("x2", Some(""), "Raw Sender", Some(4)),
            item("u1", None, "", None),
        ];
        let groups = group_by_sender(&candidates);
        assert_eq!(groups[0].key, "Raw Sender");
        let ids: Vec<&str> = groups[0].items.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x2", "x1"]);
        assert_eq!(groups[1].key, "unknown");
        assert_eq!(groups[1].most_recent, 0);
    }

    #[test]
    fn test_render_filters_by_view() {
        let candidates = ab();
        let suppressed: BTreeSet<String> = ["b1".to_string(), "a2".to_string()].into();
        let collapsed = BTreeSet::new();

        let active = render(&input(&candidates, &suppressed, &collapsed, ViewMode::Active));
        assert_eq!(active.groups.len(), 1);
        assert_eq!(active.groups[0].key, "a@shop.test");
        assert_eq!(active.item_count(), 2);
        assert_eq!(active.empty_message, None);

        let hidden = render(&input(&candidates, &suppressed, &collapsed, ViewMode::Suppressed));
        let keys: Vec<&str> = hidden.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["b@shop.test", "a@shop.test"]);
        assert_eq!(hidden.groups[1].items[0].id, "a2");
    }

    #[test]
    fn test_render_collapse_state() {
        let candidates = ab();
        let suppressed = BTreeSet::new();
        let mut collapsed: BTreeSet<String> = ["a@shop.test".to_string()].into();

        let view = render(&input(&candidates, &suppressed, &collapsed, ViewMode::Active));
        assert!(view.groups[1].collapsed);
        assert!(!view.groups[0].collapsed);
        assert!(!view.all_collapsed);

        collapsed.insert("b@shop.test".to_string());
        let view = render(&input(&candidates, &suppressed, &collapsed, ViewMode::Active));
        assert!(view.all_collapsed);
    }

    #[test]
    fn test_render_empty_list() {
        let empty = BTreeSet::new();
        let view = render(&input(&[], &empty, &empty, ViewMode::Active));
        assert!(view.groups.is_empty());
        assert_eq!(view.empty_message, Some("No return/refund emails found."));
    }

    #[test]
    fn test_display_name_truncation() {
        assert_eq!(display_name(Some("ACME Store"), "a@b.c", 20), "ACME Store");
        assert_eq!(
            display_name(Some("The Extremely Long Shop Name"), "a@b.c", 20),
            "The Extremely Long S..."
        );
        assert_eq!(display_name(Some("  "), "a@b.c", 20), "a@b.c");
        assert_eq!(display_name(None, "", 20), "unknown");
    }

    #[test]
    fn test_group_name_from_first_named_item() {
        let mut first = item("n1", Some("shop@x.test"), "", Some(1));
        let mut second = item("n2", Some("shop@x.test"), "", Some(2));
        first.from_name = Some(" ".to_string());
        second.from_name = Some("Shop".to_string());
        let candidates = vec![first, second];
        let groups = group_by_sender(&candidates);
        assert_eq!(groups[0].name.as_deref(), Some("Shop"));
    }

    #[test]
    fn test_count_label_and_url() {
        let group = RenderedGroup {
            key: "k".into(),
            display_name: "k".into(),
            email: "k".into(),
            items: vec![item("1", None, "", None)],
            most_recent: 0,
            collapsed: false,
        };
        assert_eq!(group.count_label(), "1 item");
        assert_eq!(
            message_url(DEFAULT_WEB_URL, "18c2f"),
            "https://mail.google.com/mail/u/0/#inbox/18c2f"
        );
        assert_eq!(format_timestamp_ms(0, "%Y"), "");
    }
}

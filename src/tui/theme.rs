//! Color theme definitions for the TUI.

use ratatui::style::{Color, Modifier, Style};

use crate::model::candidate::RefundStatus;

/// A complete color theme for the TUI.
pub struct Theme {
    pub header_bar: Style,
    pub status_bar: Style,
    pub list_selected: Style,
    pub list_normal: Style,
    pub group_header: Style,
    pub group_meta: Style,
    pub status_pending: Style,
    pub status_refunded: Style,
    pub snippet: Style,
    pub error: Style,
    pub border: Style,
    pub popup: Style,
    pub popup_title: Style,
    pub key_hint: Style,
    pub dim: Style,
    pub gauge: Style,
}

impl Theme {
    /// Dark theme (default).
    pub fn dark() -> Self {
        Self {
            header_bar: Style::default()
                .fg(Color::Rgb(200, 200, 220))
                .bg(Color::Rgb(30, 30, 46)),
            status_bar: Style::default()
                .fg(Color::Rgb(150, 150, 170))
                .bg(Color::Rgb(30, 30, 46)),
            list_selected: Style::default()
                .fg(Color::White)
                .bg(Color::Rgb(60, 60, 100)),
            list_normal: Style::default().fg(Color::Rgb(200, 200, 220)),
            group_header: Style::default()
                .fg(Color::Rgb(130, 170, 255))
                .add_modifier(Modifier::BOLD),
            group_meta: Style::default().fg(Color::Rgb(120, 120, 140)),
            status_pending: Style::default().fg(Color::Rgb(240, 190, 90)),
            status_refunded: Style::default().fg(Color::Rgb(120, 210, 140)),
            snippet: Style::default().fg(Color::Rgb(220, 220, 230)),
            error: Style::default()
                .fg(Color::Rgb(240, 110, 110))
                .add_modifier(Modifier::BOLD),
            border: Style::default().fg(Color::Rgb(80, 80, 100)),
            popup: Style::default()
                .fg(Color::Rgb(220, 220, 230))
                .bg(Color::Rgb(20, 20, 35)),
            popup_title: Style::default()
                .fg(Color::Rgb(130, 170, 255))
                .add_modifier(Modifier::BOLD),
            key_hint: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
            dim: Style::default().fg(Color::Rgb(100, 100, 120)),
            gauge: Style::default()
                .fg(Color::Rgb(130, 170, 255))
                .bg(Color::Rgb(40, 40, 60)),
        }
    }

    /// Color of a refund status label.
    pub fn status(&self, status: RefundStatus) -> Style {
        match status {
            RefundStatus::Pending => self.status_pending,
            RefundStatus::Refunded => self.status_refunded,
        }
    }
}

/// Return the active theme.
pub fn current_theme() -> Theme {
    Theme::dark()
}

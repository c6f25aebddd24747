//! TUI widgets for rendering different UI panels.

pub mod header_bar;
pub mod help_popup;
pub mod preview;
pub mod progress;
pub mod refund_list;
pub mod status_bar;

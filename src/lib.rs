//! `refundscan`: find return and refund emails in a Gmail mailbox.
//!
//! This crate provides the core library: Gmail access, body decoding and
//! text cleanup, keyword classification, the per-window result cache and
//! the grouped presentation used by the terminal UI and the CLI.

pub mod classify;
pub mod command;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parser;
pub mod present;
pub mod store;
pub mod tui;

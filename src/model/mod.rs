//! Core data model types: raw provider messages, senders and refund candidates.

pub mod address;
pub mod candidate;
pub mod message;

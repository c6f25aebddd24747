//! Email content handling: body extraction, date resolution and snippet normalization.

pub mod body;
pub mod date;
pub mod text;

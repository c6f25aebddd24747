//! Sender extraction from a raw `From` header.

use std::sync::LazyLock;

use regex::Regex;

/// `"Display Name" <address>` at the start of the header.
static ANGLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*"?([^<"]+)"?\s*<([^>]+)>"#).expect("valid regex"));

/// Anything that looks like an email address.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,})").expect("valid regex")
});

/// Sender parsed from a `From` header. Both parts may be missing.
///
/// # Examples
/// - `"ACME Store" <orders@acme.test>` → name `ACME Store`, email `orders@acme.test`
/// - `reply to orders@acme.test` → no name, email `orders@acme.test`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sender {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Sender {
    /// Parse a raw `From` header value.
    ///
    /// The `Name <email>` form wins; otherwise the first email-looking
    /// substring is used. Empty parts are reported as `None`.
    pub fn parse(raw: &str) -> Self {
        if let Some(caps) = ANGLE_RE.captures(raw) {
            let name = caps.get(1).map(|m| m.as_str().trim().to_string());
            let email = caps.get(2).map(|m| m.as_str().trim().to_string());
            return Self {
                name: name.filter(|n| !n.is_empty()),
                email: email.filter(|e| !e.is_empty()),
            };
        }

        Self {
            name: None,
            email: EMAIL_RE
                .captures(raw)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        }
    }
}

//! Gmail REST API v1 access.
//!
//! Wraps `https://gmail.googleapis.com/gmail/v1/users/me` with a blocking
//! `reqwest` client and bearer-token authentication.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{RefundError, Result};
use crate::model::message::{MessageRef, RawMessage};

pub const DEFAULT_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Search and read access to a mailbox.
pub trait MailProvider {
    /// Ids of messages matching `query`, at most `max_results` of them.
    fn list_messages(&self, token: &str, query: &str, max_results: usize)
        -> Result<Vec<MessageRef>>;

    /// Full message (`format=full`).
    fn get_message(&self, token: &str, id: &str) -> Result<RawMessage>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

/// Gmail client.
pub struct GmailClient {
    base_url: String,
    client: Client,
}

impl GmailClient {
    /// Client against a custom base URL.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("refundscan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Text equivalent of a browser's `statusText`.
fn status_text(status: reqwest::StatusCode) -> String {
    status
        .canonical_reason()
        .map(String::from)
        .unwrap_or_else(|| status.as_str().to_string())
}

impl MailProvider for GmailClient {
    fn list_messages(
        &self,
        token: &str,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<MessageRef>> {
        let url = format!("{}/messages", self.base_url);
        debug!(url = %url, query, "Listing Gmail messages");

        let max = max_results.to_string();
        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", query), ("maxResults", max.as_str())])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RefundError::ListFailed(status_text(status)));
        }

        let list: ListResponse = resp.json()?;
        Ok(list.messages)
    }

    fn get_message(&self, token: &str, id: &str) -> Result<RawMessage> {
        let url = format!("{}/messages/{}", self.base_url, id);
        debug!(url = %url, "Getting Gmail message");

        let resp = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("format", "full")])
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RefundError::MessageFailed {
                id: id.to_string(),
                reason: status_text(status),
            });
        }

        Ok(resp.json()?)
    }
}

//! Refund candidates and the per-window result cache record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the money for a return has come back yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Refunded,
}

impl RefundStatus {
    /// Human-readable label shown next to an item.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending refund",
            Self::Refunded => "Refund received",
        }
    }
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Refunded => f.write_str("refunded"),
        }
    }
}

/// An email classified as return/refund related.
///
/// Suppression and collapse state are tracked by ID elsewhere; a candidate is
/// never mutated after the orchestrator has enriched it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub subject: String,
    /// Normalized plain text, at most 500 characters.
    pub snippet: String,
    pub status: RefundStatus,
    /// Raw `From` header.
    #[serde(default)]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub thread_id: String,
}

impl Candidate {
    /// Key used to group candidates by sender.
    pub fn sender_key(&self) -> &str {
        self.from_email
            .as_deref()
            .filter(|e| !e.is_empty())
            .or_else(|| Some(self.from.as_str()).filter(|f| !f.is_empty()))
            .unwrap_or("unknown")
    }

    /// Date as epoch milliseconds; undated candidates sort as 0.
    pub fn timestamp_ms(&self) -> i64 {
        self.date.map(|d| d.timestamp_millis()).unwrap_or(0)
    }
}

/// Cached results of one scan window (`refunds_<days>`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResultSet {
    pub results: Vec<Candidate>,
    /// Epoch milliseconds of the fetch that produced `results`.
    pub fetched_at: i64,
}

impl CachedResultSet {
    /// Wrap `results` with the current time.
    pub fn now(results: Vec<Candidate>) -> Self {
        Self {
            results,
            fetched_at: Utc::now().timestamp_millis(),
        }
    }

    /// `fetched_at` as a date, if it is a valid timestamp.
    pub fn fetched_at_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate {
            subject: "Return received".to_string(),
            snippet: "We got it".to_string(),
            status: RefundStatus::Pending,
            from: String::new(),
            from_name: None,
            from_email: None,
            date: None,
            id: "m1".to_string(),
            thread_id: "t1".to_string(),
        }
    }

    #[test]
    fn test_sender_key_fallbacks() {
        let mut c = candidate();
        assert_eq!(c.sender_key(), "unknown");
        c.from = "Shop <shop@example.com>".to_string();
        assert_eq!(c.sender_key(), "Shop <shop@example.com>");
        c.from_email = Some(String::new());
        assert_eq!(c.sender_key(), "Shop <shop@example.com>");
        c.from_email = Some("shop@example.com".to_string());
        assert_eq!(c.sender_key(), "shop@example.com");
    }

    #[test]
    fn test_json_shape_is_camel_case() {
        let mut c = candidate();
        c.from_email = Some("shop@example.com".to_string());
        let value = serde_json::to_value(&c).unwrap();
        assert_eq!(value["status"], "pending");
        assert_eq!(value["fromEmail"], "shop@example.com");
        assert_eq!(value["threadId"], "t1");
        assert!(value.get("fromName").is_none());
        assert!(value.get("date").is_none());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{"subject":"Refund issued","snippet":"x","status":"refunded"}"#;
        let c: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(c.status, RefundStatus::Refunded);
        assert_eq!(c.id, "");
        assert_eq!(c.timestamp_ms(), 0);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(RefundStatus::Pending.label(), "Pending refund");
        assert_eq!(RefundStatus::Refunded.label(), "Refund received");
    }
}

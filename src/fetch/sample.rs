//! Built-in sample results replayed in dev mode.

use chrono::{DateTime, Utc};

use crate::model::candidate::{Candidate, RefundStatus};

struct Sample {
    id: &'static str,
    subject: &'static str,
    snippet: &'static str,
    status: RefundStatus,
    from_name: &'static str,
    from_email: &'static str,
    date: &'static str,
}

const SAMPLES: [Sample; 3] = [
    Sample {
        id: "sample-a12345",
        subject: "Your return has been received - ACME Store",
        snippet: "We have received your return for Order #A12345. We will process your refund shortly.",
        status: RefundStatus::Pending,
        from_name: "ACME Store",
        from_email: "returns@acme.example",
        date: "2024-01-03T09:15:00Z",
    },
    Sample {
        id: "sample-b98765",
        subject: "Refund issued for Order #B98765",
        snippet: "We have issued a refund of $24.99 to your original payment method.",
        status: RefundStatus::Refunded,
        from_name: "Bolt Outfitters",
        from_email: "orders@bolt.example",
        date: "2024-01-05T16:40:00Z",
    },
    Sample {
        id: "sample-c55555",
        subject: "Return label created for Order #C55555",
        snippet: "Your return label is attached. Once we receive the item we will issue a refund.",
        status: RefundStatus::Pending,
        from_name: "ACME Store",
        from_email: "returns@acme.example",
        date: "2024-01-02T11:00:00Z",
    },
];

/// The fixed sample set, in replay order.
pub fn sample_candidates() -> Vec<Candidate> {
    SAMPLES
        .iter()
        .map(|s| Candidate {
            subject: s.subject.to_string(),
            snippet: s.snippet.to_string(),
            status: s.status,
            from: format!("\"{}\" <{}>", s.from_name, s.from_email),
            from_name: Some(s.from_name.to_string()),
            from_email: Some(s.from_email.to_string()),
            date: DateTime::parse_from_rfc3339(s.date)
                .ok()
                .map(|d| d.with_timezone(&Utc)),
            id: s.id.to_string(),
            thread_id: s.id.to_string(),
        })
        .collect()
}

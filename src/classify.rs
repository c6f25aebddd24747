//! Keyword heuristics deciding whether an email is a return/refund candidate.
//!
//! Matching is case-insensitive substring search over `subject + "\n" + body`.
//! A message must mention a return to be a candidate at all; mentioning a
//! refund on top of that marks it as refunded.

use crate::config::ClassifierConfig;
use crate::model::candidate::RefundStatus;
use crate::parser::text::{clean_snippet, truncate_chars};

/// Default maximum snippet length in characters.
pub const SNIPPET_MAX_CHARS: usize = 500;

const RETURN_KEYWORDS: [&str; 5] = [
    "return",
    "returned",
    "return label",
    "return initiated",
    "we received your return",
];

const REFUND_KEYWORDS: [&str; 7] = [
    "refund",
    "refunded",
    "refund processed",
    "credited",
    "we have issued a refund",
    "refund has been issued",
    "credit to your",
];

/// The two keyword lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keywords {
    pub returns: Vec<String>,
    pub refunds: Vec<String>,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            returns: RETURN_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            refunds: REFUND_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Result of classifying one message. Sender, date and ids are attached by
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub subject: String,
    pub snippet: String,
    pub status: RefundStatus,
}

/// Keyword classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    returns: Vec<String>,
    refunds: Vec<String>,
    snippet_max_chars: usize,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(Keywords::default(), SNIPPET_MAX_CHARS)
    }
}

impl Classifier {
    /// Build a classifier; keywords are lower-cased and blanks dropped.
    ///
    /// Snippets never exceed [`SNIPPET_MAX_CHARS`], whatever the caller asks.
    pub fn new(keywords: Keywords, snippet_max_chars: usize) -> Self {
        let normalize = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.trim().is_empty())
                .collect()
        };
        Self {
            returns: normalize(keywords.returns),
            refunds: normalize(keywords.refunds),
            snippet_max_chars: snippet_max_chars.min(SNIPPET_MAX_CHARS),
        }
    }

    /// Build a classifier from the `[classifier]` config section.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            Keywords {
                returns: config.return_keywords.clone(),
                refunds: config.refund_keywords.clone(),
            },
            config.snippet_max_chars,
        )
    }

    /// Classify a message. `None` means it is not a return/refund email.
    pub fn classify(&self, subject: &str, body: &str) -> Option<Classification> {
        let text = format!("{subject}\n{body}").to_lowercase();

        if !self.returns.iter().any(|k| text.contains(k.as_str())) {
            return None;
        }

        let status = if self.refunds.iter().any(|k| text.contains(k.as_str())) {
            RefundStatus::Refunded
        } else {
            RefundStatus::Pending
        };

        // Clean the whole body first so markup never eats into the budget.
        let snippet = truncate_chars(&clean_snippet(body), self.snippet_max_chars);

        Some(Classification {
            subject: subject.to_string(),
            snippet,
            status,
        })
    }
}

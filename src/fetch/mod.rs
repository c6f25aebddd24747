//! Fetch orchestration: turns a scan window into an ordered list of refund
//! candidates, either by replaying samples or by searching Gmail.

pub mod gmail;
pub mod identity;
pub mod oauth;
pub mod query;
pub mod sample;

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::Classifier;
use crate::config::Config;
use crate::error::Result;
use crate::model::address::Sender;
use crate::model::candidate::Candidate;
use crate::model::message::RawMessage;
use crate::parser::body::extract_body;
use crate::parser::date::resolve_date;
use crate::store::results::ResultStore;

use self::gmail::{GmailClient, MailProvider};
use self::identity::TokenProvider;
use self::query::SearchQuery;

/// Where candidates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Replay the built-in samples.
    Simulated,
    /// Search the real mailbox.
    Live,
}

impl FetchMode {
    pub fn from_dev_mode(dev_mode: bool) -> Self {
        if dev_mode {
            Self::Simulated
        } else {
            Self::Live
        }
    }
}

/// Progress of a running fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchProgress {
    pub done: usize,
    pub total: usize,
}

/// Optional progress listener. Emitting without a listener does nothing.
#[derive(Clone, Copy)]
pub struct ProgressSink<'a> {
    listener: Option<&'a dyn Fn(FetchProgress)>,
}

impl<'a> ProgressSink<'a> {
    pub fn new(listener: Option<&'a dyn Fn(FetchProgress)>) -> Self {
        Self { listener }
    }

    pub fn emit(&self, done: usize, total: usize) {
        if let Some(listener) = self.listener {
            listener(FetchProgress { done, total });
        }
    }
}

/// Anything that can produce the candidates of a scan window.
///
/// The session talks to this trait so that tests can count fetches.
pub trait RefundSource {
    fn fetch_refunds(
        &self,
        period_days: u32,
        progress: Option<&dyn Fn(FetchProgress)>,
    ) -> Result<Vec<Candidate>>;
}

impl<T: RefundSource + ?Sized> RefundSource for Box<T> {
    fn fetch_refunds(
        &self,
        period_days: u32,
        progress: Option<&dyn Fn(FetchProgress)>,
    ) -> Result<Vec<Candidate>> {
        (**self).fetch_refunds(period_days, progress)
    }
}

/// Runs scans and writes their results to the per-window cache.
pub struct Orchestrator {
    store: ResultStore,
    provider: Box<dyn MailProvider>,
    tokens: Box<dyn TokenProvider>,
    classifier: Classifier,
    query: SearchQuery,
    max_messages: usize,
    step_delay: Duration,
    samples: Vec<Candidate>,
}

impl Orchestrator {
    pub fn new(
        store: ResultStore,
        provider: Box<dyn MailProvider>,
        tokens: Box<dyn TokenProvider>,
    ) -> Self {
        Self {
            store,
            provider,
            tokens,
            classifier: Classifier::default(),
            query: SearchQuery::default(),
            max_messages: 200,
            step_delay: Duration::from_millis(120),
            samples: sample::sample_candidates(),
        }
    }

    /// Orchestrator talking to Gmail, tuned by `config`.
    pub fn from_config(config: &Config, store: ResultStore) -> Result<Self> {
        let client = GmailClient::with_base_url(&config.gmail.api_base_url)?;
        Ok(Self::new(
            store,
            Box::new(client),
            identity::from_config(config),
        )
        .with_classifier(Classifier::from_config(&config.classifier))
        .with_query(SearchQuery::from_config(&config.query))
        .with_max_messages(config.gmail.max_messages)
        .with_step_delay(Duration::from_millis(config.simulate.step_delay_ms)))
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_query(mut self, query: SearchQuery) -> Self {
        self.query = query;
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Scan the last `period_days` days and cache the result under
    /// `refunds_<period_days>`. Suppressed IDs are not filtered here.
    pub fn fetch(
        &self,
        period_days: u32,
        mode: FetchMode,
        progress: Option<&dyn Fn(FetchProgress)>,
    ) -> Result<Vec<Candidate>> {
        let sink = ProgressSink::new(progress);
        let results = match mode {
            FetchMode::Simulated => self.replay_samples(sink),
            FetchMode::Live => self.scan_mailbox(period_days, sink)?,
        };
        self.store.store_results(period_days, &results);
        info!(period_days, ?mode, count = results.len(), "Fetch complete");
        Ok(results)
    }

    fn replay_samples(&self, sink: ProgressSink<'_>) -> Vec<Candidate> {
        let total = self.samples.len();
        sink.emit(0, total);
        for done in 1..=total {
            if !self.step_delay.is_zero() {
                std::thread::sleep(self.step_delay);
            }
            sink.emit(done, total);
        }
        self.samples.clone()
    }

    fn scan_mailbox(&self, period_days: u32, sink: ProgressSink<'_>) -> Result<Vec<Candidate>> {
        let token = self.tokens.access_token(true)?;
        let query = self.query.build(period_days);
        debug!(query = %query, "Searching mailbox");

        let mut refs = self
            .provider
            .list_messages(&token, &query, self.max_messages)?;
        refs.truncate(self.max_messages);

        let total = refs.len();
        sink.emit(0, total);

        let mut results = Vec::new();
        for (i, message_ref) in refs.iter().enumerate() {
            match self.provider.get_message(&token, &message_ref.id) {
                Ok(message) => {
                    if let Some(candidate) = self.to_candidate(&message) {
                        results.push(candidate);
                    }
                }
                Err(e) => debug!(id = %message_ref.id, error = %e, "Skipping message"),
            }
            sink.emit(i + 1, total);
        }

        Ok(results)
    }

    /// Classify one message and attach sender, date and ids.
    fn to_candidate(&self, message: &RawMessage) -> Option<Candidate> {
        let subject = message.header("subject").unwrap_or_default();
        let body = extract_body(message.payload.as_ref());
        let classification = self.classifier.classify(subject, &body)?;

        let from = message.header("from").unwrap_or_default().to_string();
        let sender = Sender::parse(&from);
        let date = resolve_date(message.internal_date.as_deref(), message.header("date"));

        Some(Candidate {
            subject: classification.subject,
            snippet: classification.snippet,
            status: classification.status,
            from,
            from_name: sender.name,
            from_email: sender.email,
            date,
            id: message.id.clone(),
            thread_id: message.thread_id.clone(),
        })
    }
}

impl RefundSource for Orchestrator {
    /// Uses the persisted dev-mode flag to pick the mode.
    fn fetch_refunds(
        &self,
        period_days: u32,
        progress: Option<&dyn Fn(FetchProgress)>,
    ) -> Result<Vec<Candidate>> {
        let mode = FetchMode::from_dev_mode(self.store.dev_mode());
        self.fetch(period_days, mode, progress)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Arc;

    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;

    use super::*;
    use crate::error::RefundError;
    use crate::model::candidate::RefundStatus;
    use crate::model::message::{Header, MessageRef, PartBody, Payload};
    use crate::store::memory::MemoryStore;
    use crate::store::results::StoreDefaults;

    struct FakeTokens(Option<&'static str>);

    impl TokenProvider for FakeTokens {
        fn access_token(&self, _interactive: bool) -> Result<String> {
            self.0
                .map(String::from)
                .ok_or_else(|| RefundError::Credential("The user did not approve access.".into()))
        }
    }

    #[derive(Default)]
    struct FakeMailbox {
        list_error: Option<String>,
        messages: Vec<RawMessage>,
        broken: Vec<&'static str>,
    }

    impl MailProvider for FakeMailbox {
        fn list_messages(
            &self,
            _token: &str,
            query: &str,
            max_results: usize,
        ) -> Result<Vec<MessageRef>> {
            assert!(query.ends_with("newer_than:14d") || query.ends_with("newer_than:30d"));
            assert!(max_results > 0);
            if let Some(status) = &self.list_error {
                return Err(RefundError::ListFailed(status.clone()));
            }
            Ok(self
                .messages
                .iter()
                .map(|m| MessageRef {
                    id: m.id.clone(),
                    thread_id: m.thread_id.clone(),
                })
                .collect())
        }

        fn get_message(&self, _token: &str, id: &str) -> Result<RawMessage> {
            if self.broken.contains(&id) {
                return Err(RefundError::MessageFailed {
                    id: id.to_string(),
                    reason: "Not Found".to_string(),
                });
            }
            let by_id: HashMap<&str, &RawMessage> =
                self.messages.iter().map(|m| (m.id.as_str(), m)).collect();
            by_id
                .get(id)
                .map(|m| (*m).clone())
                .ok_or_else(|| RefundError::MessageFailed {
                    id: id.to_string(),
                    reason: "Not Found".to_string(),
                })
        }
    }

    fn message(id: &str, subject: &str, from: &str, body: &str, internal: Option<&str>) -> RawMessage {
        RawMessage {
            id: id.to_string(),
            thread_id: format!("t-{id}"),
            internal_date: internal.map(String::from),
            payload: Some(Payload {
                mime_type: "text/plain".to_string(),
                headers: vec![
                    Header {
                        name: "Subject".to_string(),
                        value: subject.to_string(),
                    },
                    Header {
                        name: "FROM".to_string(),
                        value: from.to_string(),
                    },
                    Header {
                        name: "Date".to_string(),
                        value: "Fri, 5 Jan 2024 10:00:00 +0000".to_string(),
                    },
                ],
                body: Some(PartBody {
                    data: Some(URL_SAFE_NO_PAD.encode(body)),
                    size: body.len() as u64,
                }),
                parts: Vec::new(),
            }),
        }
    }

    fn store() -> ResultStore {
        ResultStore::new(Arc::new(MemoryStore::new()), StoreDefaults::default())
    }

    fn live(mailbox: FakeMailbox, tokens: FakeTokens) -> Orchestrator {
        Orchestrator::new(store(), Box::new(mailbox), Box::new(tokens))
            .with_step_delay(Duration::ZERO)
    }

    #[test]
    fn test_progress_sink_without_listener() {
        ProgressSink::new(None).emit(1, 2);
    }

    #[test]
    fn test_simulated_replays_samples_and_caches() {
        let orchestrator = live(FakeMailbox::default(), FakeTokens(None));
        let events = RefCell::new(Vec::new());
        let listener = |p: FetchProgress| events.borrow_mut().push(p);

        let results = orchestrator
            .fetch(7, FetchMode::Simulated, Some(&listener))
            .unwrap();

        assert_eq!(results, sample::sample_candidates());
        let done: Vec<usize> = events.borrow().iter().map(|p| p.done).collect();
        assert_eq!(done, vec![0, 1, 2, 3]);
        assert!(events.borrow().iter().all(|p| p.total == 3));
        let cached = orchestrator.store().cached_results(7).unwrap();
        assert_eq!(cached.results, results);
        assert!(orchestrator.store().cached_results(14).is_none());
    }

    #[test]
    fn test_live_classifies_and_enriches() {
        let mailbox = FakeMailbox {
            messages: vec![
                message(
                    "m1",
                    "Refund issued for returned Order #B98765",
                    "\"Bolt Outfitters\" <orders@bolt.example>",
                    "We have issued a refund of $24.99 to your original payment method.",
                    Some("1704448800000"),
                ),
                message("m2", "Weekly newsletter", "news@example.com", "Hello", None),
                message(
                    "m3",
                    "Return label created for Order #C55555",
                    "Reach us at help@acme.example",
                    "Print the label.",
                    Some("not-a-number"),
                ),
            ],
            ..Default::default()
        };
        let orchestrator = live(mailbox, FakeTokens(Some("token")));

        let results = orchestrator.fetch(30, FetchMode::Live, None).unwrap();
        assert_eq!(results.len(), 2);

        let refunded = &results[0];
        assert_eq!(refunded.status, RefundStatus::Refunded);
        assert_eq!(
            refunded.snippet,
            "We have issued a refund of $24.99 to your original payment method."
        );
        assert_eq!(refunded.from_name.as_deref(), Some("Bolt Outfitters"));
        assert_eq!(refunded.from_email.as_deref(), Some("orders@bolt.example"));
        assert_eq!(refunded.timestamp_ms(), 1_704_448_800_000);
        assert_eq!(refunded.id, "m1");
        assert_eq!(refunded.thread_id, "t-m1");

        let pending = &results[1];
        assert_eq!(pending.status, RefundStatus::Pending);
        assert_eq!(pending.from_name, None);
        assert_eq!(pending.from_email.as_deref(), Some("help@acme.example"));
        // Non-numeric internal date falls back to the Date header.
        assert_eq!(pending.timestamp_ms(), 1_704_448_800_000);

        assert_eq!(orchestrator.store().cached_results(30).unwrap().results, results);
    }

    #[test]
    fn test_live_query_and_cap() {
        let mailbox = FakeMailbox {
            messages: (0..5)
                .map(|i| message(&format!("m{i}"), "Return", "a@b.c", "", None))
                .collect(),
            ..Default::default()
        };
        let orchestrator = live(mailbox, FakeTokens(Some("token"))).with_max_messages(3);
        let events = RefCell::new(Vec::new());
        let listener = |p: FetchProgress| events.borrow_mut().push(p);

        let results = orchestrator.fetch(14, FetchMode::Live, Some(&listener)).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(events.borrow().last(), Some(&FetchProgress { done: 3, total: 3 }));
    }

    #[test]
    fn test_list_failure_is_fatal() {
        let mailbox = FakeMailbox {
            list_error: Some("Unauthorized".to_string()),
            ..Default::default()
        };
        let orchestrator = live(mailbox, FakeTokens(Some("token")));
        let err = orchestrator.fetch(14, FetchMode::Live, None).unwrap_err();
        assert_eq!(err.to_string(), "Failed to list messages: Unauthorized");
        assert!(orchestrator.store().cached_results(14).is_none());
    }

    #[test]
    fn test_credential_failure_is_verbatim() {
        let orchestrator = live(FakeMailbox::default(), FakeTokens(None));
        let err = orchestrator.fetch(14, FetchMode::Live, None).unwrap_err();
        assert_eq!(err.to_string(), "The user did not approve access.");
    }

    #[test]
    fn test_message_failure_is_skipped_but_counted() {
        let mailbox = FakeMailbox {
            messages: vec![
                message("ok1", "Return received", "a@b.c", "", None),
                message("bad", "Return received", "a@b.c", "", None),
                message("ok2", "Return received", "a@b.c", "", None),
            ],
            broken: vec!["bad"],
            ..Default::default()
        };
        let orchestrator = live(mailbox, FakeTokens(Some("token")));
        let events = RefCell::new(Vec::new());
        let listener = |p: FetchProgress| events.borrow_mut().push(p);

        let results = orchestrator.fetch(14, FetchMode::Live, Some(&listener)).unwrap();
        let ids: Vec<&str> = results.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ok1", "ok2"]);
        assert_eq!(events.borrow().len(), 4);
    }

    #[test]
    fn test_refund_source_follows_dev_mode() {
        let orchestrator = live(FakeMailbox::default(), FakeTokens(None));
        assert_eq!(orchestrator.fetch_refunds(14, None).unwrap().len(), 3);

        orchestrator.store().set_dev_mode(false);
        assert!(orchestrator.fetch_refunds(14, None).is_err());
    }
}

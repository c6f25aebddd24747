//! The fetch command channel: JSON requests in, JSON replies and progress
//! notifications out.
//!
//! ```text
//! -> {"action":"fetchRefunds","periodDays":30}
//! <- {"action":"fetchProgress","done":0,"total":3}
//! <- {"ok":true,"refunds":[...]}
//! ```

use std::cell::RefCell;
use std::io::{BufRead, Write};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::fetch::{FetchProgress, RefundSource};
use crate::model::candidate::Candidate;

pub const FETCH_ACTION: &str = "fetchRefunds";
pub const PROGRESS_ACTION: &str = "fetchProgress";
pub const DEFAULT_PERIOD_DAYS: u32 = 14;

const UNKNOWN_ERROR: &str = "Unknown/empty error";

/// A parsed `fetchRefunds` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCommand {
    pub period_days: u32,
}

impl FetchCommand {
    /// Parse a request. Returns `None` for any other action.
    ///
    /// A missing, zero or non-integer `periodDays` falls back to 14 days.
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.get("action").and_then(Value::as_str) != Some(FETCH_ACTION) {
            return None;
        }
        let period_days = value
            .get("periodDays")
            .and_then(Value::as_u64)
            .and_then(|d| u32::try_from(d).ok())
            .filter(|&d| d > 0)
            .unwrap_or(DEFAULT_PERIOD_DAYS);
        Some(Self { period_days })
    }
}

/// Reply to a `fetchRefunds` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchReply {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refunds: Option<Vec<Candidate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FetchReply {
    pub fn success(refunds: Vec<Candidate>) -> Self {
        Self {
            ok: true,
            refunds: Some(refunds),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            refunds: None,
            error: Some(message.into()),
        }
    }
}

/// `{"action":"fetchProgress","done":..,"total":..}`
#[derive(Debug, Serialize)]
struct ProgressNotice {
    action: &'static str,
    #[serde(flatten)]
    progress: FetchProgress,
}

/// Progress notification as one JSON line (no trailing newline).
pub fn progress_line(progress: FetchProgress) -> String {
    let notice = ProgressNotice {
        action: PROGRESS_ACTION,
        progress,
    };
    serde_json::to_string(&notice).unwrap_or_default()
}

/// Single display string for an error: the first non-empty message along
/// its source chain.
pub fn error_message(err: &(dyn std::error::Error + 'static)) -> String {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string();
        if !message.trim().is_empty() {
            return message;
        }
        current = e.source();
    }
    UNKNOWN_ERROR.to_string()
}

/// Run one fetch command against `source`.
pub fn handle_command(
    source: &dyn RefundSource,
    command: FetchCommand,
    progress: Option<&dyn Fn(FetchProgress)>,
) -> FetchReply {
    match source.fetch_refunds(command.period_days, progress) {
        Ok(refunds) => FetchReply::success(refunds),
        Err(e) => {
            warn!(period_days = command.period_days, error = %e, "fetchRefunds failed");
            FetchReply::failure(error_message(&e))
        }
    }
}

/// Serve JSON-line requests from `reader` until EOF.
///
/// Progress lines and the final reply go to `writer`. Lines that are not
/// valid JSON or carry another action get no reply.
pub fn serve<R: BufRead, W: Write>(
    source: &dyn RefundSource,
    reader: R,
    writer: W,
) -> std::io::Result<()> {
    let writer = RefCell::new(writer);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed request");
                continue;
            }
        };
        let Some(command) = FetchCommand::from_value(&value) else {
            debug!(request = %line, "Ignoring request");
            continue;
        };

        let on_progress = |p: FetchProgress| {
            let mut w = writer.borrow_mut();
            // Nobody may be listening; a failed notification is not an error.
            let _ = writeln!(w, "{}", progress_line(p)).and_then(|_| w.flush());
        };
        let reply = handle_command(source, command, Some(&on_progress));

        let mut w = writer.borrow_mut();
        serde_json::to_writer(&mut *w, &reply)?;
        writeln!(w)?;
        w.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;
    use crate::error::{RefundError, Result};
    use crate::model::candidate::RefundStatus;

    struct StubSource {
        fail: bool,
        last_period: Cell<Option<u32>>,
    }

    impl RefundSource for StubSource {
        fn fetch_refunds(
            &self,
            period_days: u32,
            progress: Option<&dyn Fn(FetchProgress)>,
        ) -> Result<Vec<Candidate>> {
            self.last_period.set(Some(period_days));
            if let Some(progress) = progress {
                progress(FetchProgress { done: 0, total: 1 });
                progress(FetchProgress { done: 1, total: 1 });
            }
            if self.fail {
                return Err(RefundError::Credential("OAuth2 not granted or revoked.".into()));
            }
            Ok(vec![Candidate {
                subject: "Refund issued".into(),
                snippet: "Done".into(),
                status: RefundStatus::Refunded,
                from: String::new(),
                from_name: None,
                from_email: None,
                date: None,
                id: "m1".into(),
                thread_id: "t1".into(),
            }])
        }
    }

    fn stub(fail: bool) -> StubSource {
        StubSource {
            fail,
            last_period: Cell::new(None),
        }
    }

    #[test]
    fn test_parse_fetch_command() {
        let cmd = FetchCommand::from_value(&json!({"action": "fetchRefunds", "periodDays": 30}));
        assert_eq!(cmd, Some(FetchCommand { period_days: 30 }));

        for period in [json!("30"), json!(null), json!(-1), json!(7.5), json!(0)] {
            let cmd = FetchCommand::from_value(&json!({"action": "fetchRefunds", "periodDays": period}));
            assert_eq!(cmd, Some(FetchCommand { period_days: 14 }));
        }
        let cmd = FetchCommand::from_value(&json!({"action": "fetchRefunds"}));
        assert_eq!(cmd, Some(FetchCommand { period_days: 14 }));

        assert_eq!(FetchCommand::from_value(&json!({"action": "other"})), None);
        assert_eq!(FetchCommand::from_value(&json!([1, 2])), None);
    }

    #[test]
    fn test_zero_period_falls_back_to_default() {
        let cmd = FetchCommand::from_value(&json!({"action": "fetchRefunds", "periodDays": 0}));
        assert_eq!(cmd, Some(FetchCommand { period_days: DEFAULT_PERIOD_DAYS }));
    }

    #[test]
    fn test_reply_shapes() {
        let ok = serde_json::to_value(FetchReply::success(Vec::new())).unwrap();
        assert_eq!(ok, json!({"ok": true, "refunds": []}));
        let err = serde_json::to_value(FetchReply::failure("boom")).unwrap();
        assert_eq!(err, json!({"ok": false, "error": "boom"}));
    }

    #[test]
    fn test_progress_line() {
        assert_eq!(
            progress_line(FetchProgress { done: 2, total: 5 }),
            r#"{"action":"fetchProgress","done":2,"total":5}"#
        );
    }

    #[test]
    fn test_error_message_walks_chain() {
        #[derive(Debug)]
        struct Silent(std::io::Error);
        impl std::fmt::Display for Silent {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                Ok(())
            }
        }
        impl std::error::Error for Silent {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let err = Silent(std::io::Error::other("disk gone"));
        assert_eq!(error_message(&err), "disk gone");
        let cred = RefundError::Credential("No token".into());
        assert_eq!(error_message(&cred), "No token");
        let empty = RefundError::Credential(String::new());
        assert_eq!(error_message(&empty), "Unknown/empty error");
    }

    #[test]
    fn test_handle_command_failure_is_verbatim() {
        let reply = handle_command(&stub(true), FetchCommand { period_days: 7 }, None);
        assert_eq!(reply, FetchReply::failure("OAuth2 not granted or revoked."));
    }

    #[test]
    fn test_serve_lines() {
        let source = stub(false);
        let input = concat!(
            "{\"action\":\"fetchRefunds\",\"periodDays\":30}\n",
            "not json\n",
            "{\"action\":\"ping\"}\n",
            "\n",
        );
        let mut out = Vec::new();
        serve(&source, input.as_bytes(), &mut out).unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], json!({"action": "fetchProgress", "done": 0, "total": 1}));
        assert_eq!(lines[2]["ok"], json!(true));
        assert_eq!(lines[2]["refunds"][0]["id"], json!("m1"));
        assert_eq!(source.last_period.get(), Some(30));
    }
}

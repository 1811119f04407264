//! Delivery backends for push notifications.
//!
//! The dispatcher composes notifications; a [`Messenger`] gets them to
//! device tokens. Delivery is best effort per token: one dead token
//! never blocks the rest of a batch.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;
use serde::Serialize;
use serde_json::json;

/// A composed push notification.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

/// One token that could not be delivered to.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryFailure {
    pub token: String,
    pub reason: String,
}

/// Outcome of one multicast send.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SendOutcome {
    pub attempted: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

/// Trait for notification delivery backends.
pub trait Messenger {
    /// Deliver one notification to a batch of device tokens.
    ///
    /// Never fails as a whole; per-token problems land in the outcome.
    fn send(&self, tokens: &[String], notification: &Notification) -> SendOutcome;
}

/// File-based delivery spool.
///
/// Appends one JSON line per (token, notification) pair to a spool
/// file, under an advisory exclusive lock so concurrent processes
/// interleave whole lines. A separate forwarder ships the spool to the
/// real push gateway.
#[derive(Debug, Clone)]
pub struct FileSpool {
    path: PathBuf,
}

impl FileSpool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Messenger for FileSpool {
    fn send(&self, tokens: &[String], notification: &Notification) -> SendOutcome {
        let mut outcome = SendOutcome {
            attempted: tokens.len(),
            ..SendOutcome::default()
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path);
        let mut file = match file {
            Ok(f) => f,
            Err(err) => {
                // The whole batch fails the same way; report per token.
                for token in tokens {
                    outcome.failures.push(DeliveryFailure {
                        token: token.clone(),
                        reason: format!("Failed to open spool file: {err}"),
                    });
                }
                return outcome;
            }
        };

        if let Err(err) = file.lock_exclusive() {
            for token in tokens {
                outcome.failures.push(DeliveryFailure {
                    token: token.clone(),
                    reason: format!("Failed to lock spool file: {err}"),
                });
            }
            return outcome;
        }

        let sent_at = Utc::now().to_rfc3339();
        for token in tokens {
            let line = json!({
                "sentAt": sent_at,
                "token": token,
                "title": notification.title,
                "body": notification.body,
            });
            match writeln!(file, "{line}") {
                Ok(()) => outcome.delivered += 1,
                Err(err) => outcome.failures.push(DeliveryFailure {
                    token: token.clone(),
                    reason: format!("Failed to write spool line: {err}"),
                }),
            }
        }

        if let Err(err) = file.flush() {
            outcome.failures.push(DeliveryFailure {
                token: "*".to_string(),
                reason: format!("Failed to flush spool file: {err}"),
            });
        }

        // Lock releases when the file handle drops.
        outcome
    }
}

/// In-memory messenger for tests: records every batch and can be told
/// to fail specific tokens.
#[derive(Debug, Default)]
pub struct MemoryMessenger {
    sent: std::sync::Mutex<Vec<(Vec<String>, Notification)>>,
    failing_tokens: Vec<String>,
}

impl MemoryMessenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate delivery failure for the given token.
    #[must_use]
    pub fn failing(mut self, token: &str) -> Self {
        self.failing_tokens.push(token.to_string());
        self
    }

    /// All batches sent so far, in order.
    pub fn batches(&self) -> Vec<(Vec<String>, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Messenger for MemoryMessenger {
    fn send(&self, tokens: &[String], notification: &Notification) -> SendOutcome {
        let mut outcome = SendOutcome {
            attempted: tokens.len(),
            ..SendOutcome::default()
        };
        for token in tokens {
            if self.failing_tokens.contains(token) {
                outcome.failures.push(DeliveryFailure {
                    token: token.clone(),
                    reason: "simulated failure".to_string(),
                });
            } else {
                outcome.delivered += 1;
            }
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((tokens.to_vec(), notification.clone()));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_spool_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let spool = FileSpool::new(dir.path().join("outbox.jsonl"));

        let note = Notification {
            title: "Hello".to_string(),
            body: "World".to_string(),
        };
        let outcome = spool.send(&["tok-a".to_string(), "tok-b".to_string()], &note);
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.delivered, 2);
        assert!(outcome.failures.is_empty());

        let content = std::fs::read_to_string(spool.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["token"], "tok-a");
        assert_eq!(first["title"], "Hello");
    }

    #[test]
    fn test_memory_messenger_partial_failure() {
        let messenger = MemoryMessenger::new().failing("tok-dead");
        let note = Notification {
            title: "T".to_string(),
            body: "B".to_string(),
        };

        let outcome = messenger.send(
            &["tok-live".to_string(), "tok-dead".to_string()],
            &note,
        );
        assert_eq!(outcome.attempted, 2);
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].token, "tok-dead");
    }
}

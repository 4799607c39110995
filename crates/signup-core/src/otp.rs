//! Verification-code retrieval.
//!
//! Polls the mailbox until a message younger than the freshness window
//! yields a six-digit code, or the overall budget expires. Codes from
//! previous runs (or earlier steps of this run) must never be replayed:
//! stale messages are skipped by age, and messages consumed during this
//! run are remembered by id because the unfiltered fallback search can
//! resurface them even after they are flagged read.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::mailbox::{MailStore, parse_message};

/// Standalone six-digit group, as the target application formats codes.
fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(\d{6})\b").unwrap_or_else(|_| unreachable!()))
}

/// Extract the first six-digit code from combined message text.
pub fn extract_code(text: &str) -> Option<String> {
    code_pattern()
        .captures(text)
        .map(|c| c[1].to_string())
}

/// Polling policy for one retriever.
#[derive(Debug, Clone)]
pub struct RetrievalPolicy {
    pub poll_interval: Duration,
    pub freshness_window: Duration,
}

/// Polls a [`MailStore`] for fresh verification codes.
pub struct CodeRetriever {
    store: Box<dyn MailStore>,
    clock: Box<dyn Clock>,
    policy: RetrievalPolicy,
    consumed: HashSet<String>,
}

impl CodeRetriever {
    pub fn new(store: Box<dyn MailStore>, clock: Box<dyn Clock>, policy: RetrievalPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
            consumed: HashSet::new(),
        }
    }

    /// Block until a fresh code is found or `budget` expires.
    ///
    /// Freshness is measured against the Date header at extraction time:
    /// a message strictly older than the window is skipped, one exactly
    /// at the boundary is still eligible. Messages without a parseable
    /// date cannot be aged; freshness fails open and they stay eligible.
    pub fn fetch_code(&mut self, budget: Duration) -> Result<String> {
        let deadline = self.clock.now()
            + chrono::Duration::from_std(budget).unwrap_or_else(|_| chrono::Duration::zero());

        loop {
            match self.scan_once() {
                Ok(Some(code)) => {
                    tracing::info!("verification code retrieved");
                    return Ok(code);
                }
                Ok(None) => {}
                // Transient mailbox errors do not consume the budget.
                Err(e) => tracing::warn!(error = %e, "mailbox poll failed, will retry"),
            }

            if self.clock.now() >= deadline {
                return Err(Error::CodeRetrievalTimeout { budget });
            }
            self.clock.sleep(self.policy.poll_interval);
        }
    }

    /// One poll iteration: fresh session, newest candidates first.
    fn scan_once(&mut self) -> Result<Option<String>> {
        let mut session = self.store.connect()?;
        let ids = match session.candidate_ids() {
            Ok(ids) => ids,
            Err(e) => {
                session.close();
                return Err(e);
            }
        };

        let mut found = None;
        for id in ids {
            if self.consumed.contains(&id) {
                continue;
            }

            let raw = match session.fetch(&id) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::debug!(id = %id, error = %e, "fetch failed, skipping message");
                    continue;
                }
            };
            let message = match parse_message(&raw) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(id = %id, error = %e, "unparseable message, skipping");
                    continue;
                }
            };

            // A message without a usable date cannot be aged; the
            // freshness check fails open and the message stays eligible.
            if let Some(date) = message.date {
                let age = (self.clock.now() - date)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if age > self.policy.freshness_window {
                    tracing::debug!(id = %id, age_secs = age.as_secs(), "message too old, skipping");
                    continue;
                }
            }

            let combined = format!("{} {}", message.subject, message.body_text);
            if let Some(code) = extract_code(&combined) {
                if let Err(e) = session.mark_seen(&id) {
                    tracing::debug!(id = %id, error = %e, "mark seen failed");
                }
                self.consumed.insert(id);
                found = Some(code);
                break;
            }
        }

        session.close();
        Ok(found)
    }
}

//! Mailbox access and message parsing.
//!
//! The verification code arrives out of band in an IMAP inbox. This
//! module hides the IMAP session behind a pair of narrow traits so the
//! retrieval loop in [`crate::otp`] can be tested against an in-memory
//! store. Everything here is deliberately synchronous; the orchestrator
//! runs retrieval on a blocking task.

use std::net::TcpStream;

use chrono::{DateTime, TimeZone, Utc};
use mailparse::{MailHeaderMap, ParsedMail};
use native_tls::{TlsConnector, TlsStream};

use crate::config::MailboxConfig;
use crate::error::{MailboxError, Result};

/// How many messages the unfiltered fallback search considers.
const FALLBACK_SCAN_DEPTH: usize = 50;

/// A source of mail sessions. One session per poll iteration.
pub trait MailStore: Send {
    fn connect(&self) -> Result<Box<dyn MailSession>>;
}

/// One connected mailbox session.
pub trait MailSession {
    /// Candidate message ids, newest first. Unread messages are
    /// preferred; when there are none, the newest messages regardless of
    /// read state are returned (read receipts elsewhere must not hide a
    /// fresh code).
    fn candidate_ids(&mut self) -> Result<Vec<String>>;

    /// Raw RFC 822 bytes of one message.
    fn fetch(&mut self, id: &str) -> Result<Vec<u8>>;

    /// Mark a message read. Best effort; callers ignore failures.
    fn mark_seen(&mut self, id: &str) -> Result<()>;

    /// Log out. Errors on teardown are not interesting.
    fn close(self: Box<Self>);
}

/// IMAP-over-TLS store for a [`MailboxConfig`].
pub struct ImapStore {
    config: MailboxConfig,
}

impl ImapStore {
    pub fn new(config: MailboxConfig) -> Self {
        Self { config }
    }
}

impl MailStore for ImapStore {
    fn connect(&self) -> Result<Box<dyn MailSession>> {
        let tls = TlsConnector::builder()
            .build()
            .map_err(MailboxError::from)?;
        let client = imap::connect(
            (self.config.host.as_str(), self.config.port),
            self.config.host.as_str(),
            &tls,
        )
        .map_err(MailboxError::from)?;
        let mut session = client
            .login(&self.config.address, &self.config.app_password)
            .map_err(|(e, _)| MailboxError::from(e))?;
        session.select("INBOX").map_err(MailboxError::from)?;
        Ok(Box::new(ImapInbox { session }))
    }
}

struct ImapInbox {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl MailSession for ImapInbox {
    fn candidate_ids(&mut self) -> Result<Vec<String>> {
        let unseen = self.session.search("UNSEEN").map_err(MailboxError::from)?;
        let mut ids: Vec<u32> = if unseen.is_empty() {
            let all = self.session.search("ALL").map_err(MailboxError::from)?;
            let mut all: Vec<u32> = all.into_iter().collect();
            all.sort_unstable();
            let start = all.len().saturating_sub(FALLBACK_SCAN_DEPTH);
            all.split_off(start)
        } else {
            unseen.into_iter().collect()
        };
        // Sequence numbers increase with arrival order.
        ids.sort_unstable_by(|a, b| b.cmp(a));
        Ok(ids.iter().map(u32::to_string).collect())
    }

    fn fetch(&mut self, id: &str) -> Result<Vec<u8>> {
        let messages = self
            .session
            .fetch(id, "(RFC822)")
            .map_err(MailboxError::from)?;
        let body = messages
            .iter()
            .next()
            .and_then(imap::types::Fetch::body)
            .ok_or_else(|| MailboxError::EmptyFetch(id.to_string()))?;
        Ok(body.to_vec())
    }

    fn mark_seen(&mut self, id: &str) -> Result<()> {
        self.session
            .store(id, "+FLAGS (\\Seen)")
            .map_err(MailboxError::from)?;
        Ok(())
    }

    fn close(mut self: Box<Self>) {
        if let Err(e) = self.session.logout() {
            tracing::debug!(error = %e, "imap logout failed");
        }
    }
}

/// The parts of a message the code extractor looks at.
#[derive(Debug, Clone)]
pub struct MessageContent {
    /// Delivery timestamp from the Date header. `None` when the header
    /// is missing or unparseable; such messages cannot be aged, so the
    /// retriever's freshness check fails open and keeps them eligible.
    pub date: Option<DateTime<Utc>>,
    pub subject: String,
    /// Plain text of the first text-bearing, non-attachment part.
    pub body_text: String,
}

/// Parse raw RFC 822 bytes into the fields code extraction needs.
///
/// A malformed Date header does not fail the message; only a body that
/// cannot be parsed at all does.
pub fn parse_message(raw: &[u8]) -> Result<MessageContent> {
    let parsed = mailparse::parse_mail(raw).map_err(MailboxError::from)?;

    let date = parsed
        .headers
        .get_first_value("Date")
        .and_then(|v| mailparse::dateparse(&v).ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single());

    let subject = parsed.headers.get_first_value("Subject").unwrap_or_default();

    let body_text = first_text_body(&parsed)?.unwrap_or_default();

    Ok(MessageContent {
        date,
        subject,
        body_text,
    })
}

/// Text of the first non-attachment text part, depth first. HTML parts
/// are flattened to their visible text.
fn first_text_body(part: &ParsedMail<'_>) -> Result<Option<String>> {
    if part.subparts.is_empty() {
        let mimetype = part.ctype.mimetype.to_ascii_lowercase();
        if !mimetype.starts_with("text/") {
            return Ok(None);
        }
        if part.get_content_disposition().disposition == mailparse::DispositionType::Attachment {
            return Ok(None);
        }
        let body = part.get_body().map_err(MailboxError::from)?;
        if mimetype == "text/html" {
            return Ok(Some(html_to_text(&body)));
        }
        return Ok(Some(body));
    }

    for sub in &part.subparts {
        if let Some(text) = first_text_body(sub)? {
            return Ok(Some(text));
        }
    }
    Ok(None)
}

fn html_to_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

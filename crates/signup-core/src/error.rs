//! Error taxonomy for the signup autopilot.
//!
//! The run-level failures mirror the places the flow can die: a locator
//! spec exhausting its candidates, a step marker never appearing, the
//! verification code never arriving, the upload surface missing, or the
//! final success gate timing out. Transport-level failures from the
//! browser surface and the mailbox are wrapped rather than flattened so
//! callers can still tell a dead WebDriver from a dead IMAP server.

use std::time::Duration;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Which gate of a wizard step failed to be observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEdge {
    /// The step's entry marker never became visible.
    Entry,
    /// The step's exit condition never held after its actions ran.
    Exit,
}

impl std::fmt::Display for StepEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Entry => write!(f, "entry"),
            Self::Exit => write!(f, "exit"),
        }
    }
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A locator spec exhausted every candidate without a match.
    ///
    /// Fatal when the owning action is required; swallowed (with a
    /// warning) otherwise.
    #[error("no locator candidate matched for '{spec}' within {timeout:?}")]
    LocatorNotFound {
        /// Human-readable description of the logical target.
        spec: String,
        /// Per-candidate wait budget that was exhausted.
        timeout: Duration,
    },

    /// A step's entry or exit marker was never observed.
    #[error("step '{step}' {edge} condition not observed within {timeout:?}")]
    StepConditionTimeout {
        step: String,
        edge: StepEdge,
        timeout: Duration,
    },

    /// No fresh message carrying a verification code arrived in time.
    #[error("no verification code retrieved within {budget:?}")]
    CodeRetrievalTimeout { budget: Duration },

    /// Zero file-upload inputs found where at least one was expected.
    #[error("expected at least one file upload input, found none")]
    UploadSurfaceMissing,

    /// None of the success signals appeared after final submission.
    #[error("no success signal observed within {timeout:?}")]
    VerificationTimeout { timeout: Duration },

    /// Browser interaction surface failure.
    #[error("browser surface: {0}")]
    Surface(#[from] SurfaceError),

    /// Mailbox transport or parse failure.
    #[error("mailbox: {0}")]
    Mailbox(#[from] MailboxError),

    /// Invalid configuration value.
    #[error("configuration: {0}")]
    Config(String),

    /// A run precondition (e.g. a required upload document) is not met.
    #[error("precondition: {0}")]
    Precondition(String),
}

/// Failures from the browser interaction surface.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Could not establish a WebDriver session.
    #[error("failed to start WebDriver session: {0}")]
    NewSession(String),

    /// A WebDriver command failed.
    #[error("WebDriver command failed: {0}")]
    WebDriver(#[from] fantoccini::error::CmdError),

    /// An element handle refers to an element the surface no longer holds.
    #[error("unknown element handle {0}")]
    UnknownElement(u64),
}

/// Failures from the mailbox store.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// TLS setup failed.
    #[error("TLS: {0}")]
    Tls(#[from] native_tls::Error),

    /// IMAP protocol or connection failure.
    #[error("IMAP: {0}")]
    Imap(#[from] imap::error::Error),

    /// Message could not be parsed.
    #[error("message parse: {0}")]
    Parse(#[from] mailparse::MailParseError),

    /// A fetch returned no message body.
    #[error("fetch for message {0} returned no body")]
    EmptyFetch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_not_found_names_the_spec() {
        let err = Error::LocatorNotFound {
            spec: "phone number input".to_string(),
            timeout: Duration::from_secs(30),
        };
        let msg = err.to_string();
        assert!(msg.contains("phone number input"));
        assert!(msg.contains("30s"));
    }

    #[test]
    fn step_condition_timeout_names_edge() {
        let err = Error::StepConditionTimeout {
            step: "agency_details".to_string(),
            edge: StepEdge::Exit,
            timeout: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("exit"));
        assert!(err.to_string().contains("agency_details"));
    }

    #[test]
    fn mailbox_error_wraps_into_top_level() {
        let err: Error = MailboxError::EmptyFetch("17".to_string()).into();
        assert!(matches!(err, Error::Mailbox(_)));
        assert!(err.to_string().contains("17"));
    }
}

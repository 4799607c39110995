//! Run configuration.
//!
//! Loaded from an optional TOML file, with the mailbox credential coming
//! from the environment (wired up by the CLI). Every section has sane
//! defaults; `validate()` reports the first offending key.
//!
//! ```toml
//! base_url = "https://authorized-partner.vercel.app/"
//! webdriver_url = "http://localhost:4444"
//!
//! [mailbox]
//! host = "imap.gmail.com"
//! port = 993
//! address = "inbox@example.com"
//!
//! [documents]
//! company_registration = "test_data/company_registration.pdf"
//! education_certificate = "test_data/education_certificate.pdf"
//!
//! [timeouts]
//! element_secs = 30
//! step_secs = 30
//! code_secs = 180
//! verify_secs = 30
//!
//! [retrieval]
//! poll_interval_secs = 3
//! freshness_window_secs = 360
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Landing page of the signup flow.
    pub base_url: String,

    /// WebDriver endpoint the browser surface connects to.
    pub webdriver_url: String,

    /// Run the browser headless.
    pub headless: bool,

    /// Keep the browser session open for inspection when the run fails.
    pub hold_on_failure: bool,

    /// Mailbox the verification code is delivered to.
    pub mailbox: MailboxConfig,

    /// Local documents uploaded in the final wizard step.
    pub documents: DocumentsConfig,

    /// Bounded waits. None of the suspensions in the flow are unbounded.
    pub timeouts: TimeoutsConfig,

    /// UI pacing (the target application animates between steps).
    pub pacing: PacingConfig,

    /// Mailbox polling policy.
    pub retrieval: RetrievalConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: "https://authorized-partner.vercel.app/".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            headless: false,
            hold_on_failure: true,
            mailbox: MailboxConfig::default(),
            documents: DocumentsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            pacing: PacingConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

/// Mailbox credential and endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// IMAP server hostname.
    pub host: String,

    /// IMAP server port (implicit TLS).
    pub port: u16,

    /// Mailbox address. Also the base for the plus-addressed signup email.
    pub address: String,

    /// App password. Never logged.
    #[serde(skip_serializing)]
    pub app_password: String,
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            host: "imap.gmail.com".to_string(),
            port: 993,
            address: String::new(),
            app_password: String::new(),
        }
    }
}

/// Paths of the two documents the final step uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Company registration document.
    pub company_registration: PathBuf,

    /// Education certificate document.
    pub education_certificate: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            company_registration: PathBuf::from("test_data/company_registration.pdf"),
            education_certificate: PathBuf::from("test_data/education_certificate.pdf"),
        }
    }
}

/// Wait budgets, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Per-candidate element wait.
    pub element_secs: u64,

    /// Step entry/exit marker wait.
    pub step_secs: u64,

    /// Overall verification-code retrieval budget.
    pub code_secs: u64,

    /// Final success-gate wait.
    pub verify_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            element_secs: 30,
            step_secs: 30,
            code_secs: 180,
            verify_secs: 30,
        }
    }
}

impl TimeoutsConfig {
    pub fn element(&self) -> Duration {
        Duration::from_secs(self.element_secs)
    }

    pub fn step(&self) -> Duration {
        Duration::from_secs(self.step_secs)
    }

    pub fn code(&self) -> Duration {
        Duration::from_secs(self.code_secs)
    }

    pub fn verify(&self) -> Duration {
        Duration::from_secs(self.verify_secs)
    }
}

/// UI pacing knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after a step-advancing click, in milliseconds.
    pub step_pause_ms: u64,

    /// Delay between typed characters, in milliseconds. Zero disables
    /// slow typing.
    pub type_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            step_pause_ms: 600,
            type_delay_ms: 20,
        }
    }
}

impl PacingConfig {
    pub fn step_pause(&self) -> Duration {
        Duration::from_millis(self.step_pause_ms)
    }

    pub fn type_delay(&self) -> Duration {
        Duration::from_millis(self.type_delay_ms)
    }
}

/// Mailbox polling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Sleep between poll iterations, in seconds.
    pub poll_interval_secs: u64,

    /// Maximum age of an eligible message, in seconds. Messages strictly
    /// older are skipped.
    pub freshness_window_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 3,
            freshness_window_secs: 6 * 60,
        }
    }
}

impl RetrievalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }
}

impl RunConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Validate the configuration, reporting the first offending key.
    pub fn validate(&self) -> Result<()> {
        self.validate_inner().map_err(Error::Config)
    }

    fn validate_inner(&self) -> std::result::Result<(), String> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err("base_url must be an http(s) URL".to_string());
        }

        if !self.webdriver_url.starts_with("http://") && !self.webdriver_url.starts_with("https://")
        {
            return Err("webdriver_url must be an http(s) URL".to_string());
        }

        if self.mailbox.host.trim().is_empty() {
            return Err("mailbox.host must not be empty".to_string());
        }

        if self.mailbox.port == 0 {
            return Err("mailbox.port must be >= 1".to_string());
        }

        if !looks_like_email(&self.mailbox.address) {
            return Err("mailbox.address must be a valid email address".to_string());
        }

        if self.mailbox.app_password.trim().is_empty() {
            return Err(
                "mailbox.app_password must be set (SIGNUP_MAILBOX_PASSWORD)".to_string(),
            );
        }

        if self.timeouts.element_secs == 0
            || self.timeouts.step_secs == 0
            || self.timeouts.code_secs == 0
            || self.timeouts.verify_secs == 0
        {
            return Err("timeouts must all be >= 1 second".to_string());
        }

        if self.retrieval.poll_interval_secs == 0 {
            return Err("retrieval.poll_interval_secs must be >= 1".to_string());
        }

        if self.retrieval.freshness_window_secs == 0 {
            return Err("retrieval.freshness_window_secs must be >= 1".to_string());
        }

        Ok(())
    }
}

fn looks_like_email(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }

    let mut parts = trimmed.split('@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if parts.next().is_some() {
        return false;
    }

    !local.is_empty() && !domain.is_empty() && domain.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RunConfig {
        let mut config = RunConfig::default();
        config.mailbox.address = "inbox@example.com".to_string();
        config.mailbox.app_password = "app-password".to_string();
        config
    }

    #[test]
    fn default_config_matches_source_constants() {
        let config = RunConfig::default();
        assert_eq!(config.retrieval.poll_interval_secs, 3);
        assert_eq!(config.retrieval.freshness_window_secs, 360);
        assert_eq!(config.timeouts.code_secs, 180);
        assert_eq!(config.mailbox.port, 993);
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn missing_password_is_rejected() {
        let mut config = valid_config();
        config.mailbox.app_password = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("app_password"));
    }

    #[test]
    fn bad_address_is_rejected() {
        let mut config = valid_config();
        config.mailbox.address = "not-an-address".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mailbox.address"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut config = valid_config();
        config.retrieval.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_roundtrip_keeps_sections() {
        let config = valid_config();
        let raw = toml::to_string(&config).unwrap();
        let parsed: RunConfig = toml::from_str(&raw).unwrap();
        assert_eq!(parsed.base_url, config.base_url);
        assert_eq!(parsed.timeouts.code_secs, config.timeouts.code_secs);
        // app_password is skipped on serialize; it must come from the env
        assert!(parsed.mailbox.app_password.is_empty());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RunConfig::load(Path::new("/nonexistent/signup.toml")).unwrap_err();
        assert!(err.to_string().contains("signup.toml"));
    }
}

//! Top-level run driver.
//!
//! Wires the pieces together for one unattended signup: generate an
//! identity, open a browser session, drive the wizard, gate on the
//! success signal, tear down. On failure the browser is (optionally)
//! held open so the operator can inspect the page the run died on.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::clock::SystemClock;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::identity::SessionIdentity;
use crate::mailbox::ImapStore;
use crate::otp::{CodeRetriever, RetrievalPolicy};
use crate::steps::partner_wizard_steps;
use crate::surface::{PageSurface, WebDriverSurface};
use crate::verify::await_success;
use crate::wizard::{CodeProvider, Orchestrator};

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The plus-addressed email the account was registered under.
    pub email: String,
    /// The generated agency name.
    pub agency_name: String,
    /// URL the browser was on when the success signal was observed.
    pub final_url: String,
}

/// [`CodeProvider`] backed by the IMAP retriever.
struct MailboxCodeProvider {
    retriever: Mutex<CodeRetriever>,
    budget: Duration,
}

impl CodeProvider for MailboxCodeProvider {
    fn fetch(&self) -> Result<String> {
        let mut retriever = self
            .retriever
            .lock()
            .map_err(|_| Error::Config("code retriever lock poisoned".to_string()))?;
        retriever.fetch_code(self.budget)
    }
}

/// Execute one full signup run.
pub async fn run(config: &RunConfig) -> Result<RunReport> {
    check_preconditions(config)?;

    let epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let identity = SessionIdentity::generate(&config.mailbox.address, epoch);
    tracing::info!(email = %identity.email, agency = %identity.agency_name, "identity generated");

    let surface =
        WebDriverSurface::connect(&config.webdriver_url, config.headless, config.pacing.clone())
            .await?;

    let outcome = drive(&surface, &identity, config).await;

    match outcome {
        Ok(final_url) => {
            surface.close().await?;
            Ok(RunReport {
                email: identity.email,
                agency_name: identity.agency_name,
                final_url,
            })
        }
        Err(e) => {
            if config.hold_on_failure {
                hold_for_inspection(&e).await;
            }
            if let Err(close_err) = surface.close().await {
                tracing::debug!(error = %close_err, "browser teardown failed");
            }
            Err(e)
        }
    }
}

/// The wizard itself, from landing page to success signal.
async fn drive(
    surface: &WebDriverSurface,
    identity: &SessionIdentity,
    config: &RunConfig,
) -> Result<String> {
    surface.navigate(&config.base_url).await?;

    let provider = Arc::new(MailboxCodeProvider {
        retriever: Mutex::new(CodeRetriever::new(
            Box::new(ImapStore::new(config.mailbox.clone())),
            Box::new(SystemClock),
            RetrievalPolicy {
                poll_interval: config.retrieval.poll_interval(),
                freshness_window: config.retrieval.freshness_window(),
            },
        )),
        budget: config.timeouts.code(),
    });

    let steps = partner_wizard_steps(identity, config);
    let mut orchestrator = Orchestrator::new(surface, config.timeouts.clone(), config.pacing.clone())
        .with_code_provider(provider);
    orchestrator.run(&steps).await?;

    await_success(surface, config.timeouts.verify()).await?;
    surface.current_url().await
}

fn check_preconditions(config: &RunConfig) -> Result<()> {
    for path in [
        &config.documents.company_registration,
        &config.documents.education_certificate,
    ] {
        if !path.is_file() {
            return Err(Error::Precondition(format!(
                "upload document not found: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

/// Keep the browser session alive until the operator acknowledges.
async fn hold_for_inspection(error: &Error) {
    eprintln!("run failed: {error}");
    eprintln!("browser session held open for inspection; press Enter to close it");
    let _ = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
    })
    .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_document_fails_precondition() {
        let mut config = RunConfig::default();
        config.documents.company_registration =
            std::path::PathBuf::from("/nonexistent/company.pdf");
        let err = check_preconditions(&config).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(err.to_string().contains("company.pdf"));
    }

    #[test]
    fn present_documents_pass_precondition() {
        let dir = tempfile::tempdir().unwrap();
        let company = dir.path().join("company.pdf");
        let education = dir.path().join("education.pdf");
        std::fs::File::create(&company)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();
        std::fs::File::create(&education)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();

        let mut config = RunConfig::default();
        config.documents.company_registration = company;
        config.documents.education_certificate = education;
        check_preconditions(&config).unwrap();
    }
}

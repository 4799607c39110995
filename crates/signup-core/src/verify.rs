//! Final success gate.
//!
//! Submission alone proves nothing; the run succeeds only when the
//! application acknowledges it. Three independent signals count, any one
//! of them: a success phrase in the page text, a welcome message, or a
//! redirect to the login page.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::{Error, Result};
use crate::surface::PageSurface;

const PROBE_INTERVAL: Duration = Duration::from_millis(500);

const SUCCESS_PHRASES: &[&str] = &["success", "added successfully", "welcome"];

/// Wait for any success signal, polling until `timeout`.
pub async fn await_success(surface: &dyn PageSurface, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if observed(surface).await? {
            tracing::info!("success signal observed");
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::VerificationTimeout { timeout });
        }
        sleep(PROBE_INTERVAL).await;
    }
}

async fn observed(surface: &dyn PageSurface) -> Result<bool> {
    let text = surface.page_text().await?.to_lowercase();
    if SUCCESS_PHRASES.iter().any(|p| text.contains(p)) {
        return Ok(true);
    }
    Ok(surface.current_url().await?.contains("/login"))
}

//! `signup` binary: one unattended partner-registration run.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use signup_core::config::RunConfig;
use signup_core::runner;

/// Drive the partner registration wizard end to end.
#[derive(Debug, Parser)]
#[command(name = "signup", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mailbox address the verification code is delivered to.
    #[arg(long, env = "SIGNUP_MAILBOX_ADDRESS", value_name = "ADDRESS")]
    mailbox_address: Option<String>,

    /// IMAP app password for the mailbox.
    #[arg(
        long,
        env = "SIGNUP_MAILBOX_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    mailbox_password: Option<String>,

    /// Override the landing page URL.
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Run the browser headless.
    #[arg(long)]
    headless: bool,

    /// Close the browser immediately on failure instead of holding it
    /// open for inspection.
    #[arg(long)]
    no_hold: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(address) = self.mailbox_address {
            config.mailbox.address = address;
        }
        if let Some(password) = self.mailbox_password {
            config.mailbox.app_password = password;
        }
        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if self.headless {
            config.headless = true;
        }
        if self.no_hold {
            config.hold_on_failure = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    let report = runner::run(&config).await?;
    tracing::info!(
        email = %report.email,
        agency = %report.agency_name,
        url = %report.final_url,
        "signup completed"
    );
    println!("registered {} ({})", report.email, report.agency_name);
    Ok(())
}

//! CLI contract tests.
//!
//! Exercise the argument surface and the failure paths that must trip
//! before any browser or mailbox connection is attempted: help output,
//! credential validation, config-file errors, and the upload-document
//! precondition.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[allow(deprecated)]
fn signup_cmd() -> Command {
    let mut cmd = Command::cargo_bin("signup").expect("signup binary should be built");
    // Keep ambient credentials out of the tests.
    cmd.env_remove("SIGNUP_MAILBOX_ADDRESS");
    cmd.env_remove("SIGNUP_MAILBOX_PASSWORD");
    cmd
}

// =============================================================================
// Help and usage
// =============================================================================

#[test]
fn help_describes_the_flow() {
    signup_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--mailbox-address"))
        .stdout(predicate::str::contains("--headless"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn version_flag_works() {
    signup_cmd().arg("--version").assert().success();
}

// =============================================================================
// Credential validation
// =============================================================================

#[test]
fn missing_mailbox_address_is_rejected() {
    signup_cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("mailbox.address"));
}

#[test]
fn missing_password_is_rejected() {
    signup_cmd()
        .args(["--mailbox-address", "inbox@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("app_password"));
}

#[test]
fn password_env_value_is_hidden_in_help() {
    signup_cmd()
        .arg("--help")
        .env("SIGNUP_MAILBOX_PASSWORD", "super-secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("super-secret").not());
}

// =============================================================================
// Config file handling
// =============================================================================

#[test]
fn unreadable_config_file_is_reported() {
    signup_cmd()
        .args(["--config", "/nonexistent/signup.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("signup.toml"));
}

#[test]
fn invalid_config_value_is_reported() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("signup.toml");
    std::fs::write(&path, "base_url = \"not-a-url\"\n").expect("write config");

    signup_cmd()
        .args(["--config", path.to_str().expect("utf8 path")])
        .args(["--mailbox-address", "inbox@example.com"])
        .args(["--mailbox-password", "app-password"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

// =============================================================================
// Run preconditions
// =============================================================================

#[test]
fn missing_documents_fail_before_any_connection() {
    // Empty working directory: the default document paths cannot exist,
    // so the run must die on the precondition without touching a
    // WebDriver endpoint or the mailbox.
    let dir = TempDir::new().expect("temp dir");
    signup_cmd()
        .current_dir(dir.path())
        .args(["--mailbox-address", "inbox@example.com"])
        .args(["--mailbox-password", "app-password"])
        .arg("--no-hold")
        .assert()
        .failure()
        .stderr(predicate::str::contains("upload document not found"));
}

//! Unattended partner-signup automation.
//!
//! Drives a multi-step web registration wizard end to end without a
//! human in the loop: resolves unstable UI through ordered locator
//! candidates, gates every step transition on observed page state,
//! fetches the emailed verification code over IMAP mid-flow, and only
//! declares victory when the application itself signals success.
//!
//! The crate is a library; the `signup` binary wires configuration and
//! credentials into [`runner::run`].

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod locator;
pub mod mailbox;
pub mod otp;
pub mod runner;
pub mod steps;
pub mod surface;
pub mod verify;
pub mod wizard;

#[cfg(test)]
mod testutil;

pub use error::{Error, Result};

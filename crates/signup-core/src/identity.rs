//! Session identity generation.
//!
//! Every run signs up a fresh partner account. The identity is derived
//! from the current epoch second so that the email, phone number, and
//! registration number are unique per run, while the email still routes
//! to the configured mailbox via plus-addressing.

use rand::seq::IndexedRandom;

const FIRST_NAMES: &[&str] = &[
    "Aarav", "Maya", "Liam", "Sofia", "Noah", "Priya", "Ethan", "Anika",
];

const LAST_NAMES: &[&str] = &[
    "Sharma", "Fletcher", "Okafor", "Tanaka", "Rivera", "Bergstrom",
];

const AGENCY_SUFFIXES: &[&str] = &["Consultancy", "Education Group", "Pathways", "Advisors"];

/// Everything the wizard fills in for one run.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub first_name: String,
    pub last_name: String,
    /// Plus-addressed variant of the mailbox address, unique per run.
    pub email: String,
    pub phone: String,
    pub password: String,
    pub agency_name: String,
    pub role: String,
    pub website: String,
    pub address: String,
    /// Business registration number, unique per run.
    pub registration_number: String,
}

impl SessionIdentity {
    /// Build an identity for this run.
    ///
    /// `mailbox_address` is the real inbox; the signup email inserts a
    /// `+tap<epoch>` tag before the `@` so delivery is unaffected but the
    /// target application sees a never-before-used address.
    pub fn generate(mailbox_address: &str, epoch_secs: u64) -> Self {
        let mut rng = rand::rng();
        let first = *FIRST_NAMES.choose(&mut rng).unwrap_or(&"Alex");
        let last = *LAST_NAMES.choose(&mut rng).unwrap_or(&"Carter");
        let suffix = *AGENCY_SUFFIXES.choose(&mut rng).unwrap_or(&"Consultancy");

        let epoch = epoch_secs.to_string();
        Self {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: plus_address(mailbox_address, &format!("tap{epoch}")),
            phone: format!("98{}", tail(&epoch, 8)),
            password: format!("Str0ng!Pass{}", tail(&epoch, 4)),
            agency_name: format!("{last} {suffix}"),
            role: "Director".to_string(),
            website: format!("{}-consult.example.com", last.to_lowercase()),
            address: "12 Harbor Lane, Wellington".to_string(),
            registration_number: format!("BRN-{}", tail(&epoch, 6)),
        }
    }
}

/// Insert a `+tag` before the `@` of an email address. Addresses without
/// an `@` are returned unchanged.
fn plus_address(address: &str, tag: &str) -> String {
    match address.split_once('@') {
        Some((local, domain)) => format!("{local}+{tag}@{domain}"),
        None => address.to_string(),
    }
}

/// Last `n` characters of `s`, or all of it if shorter.
fn tail(s: &str, n: usize) -> &str {
    &s[s.len().saturating_sub(n)..]
}

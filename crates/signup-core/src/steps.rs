//! The partner-signup wizard, step by step.
//!
//! This is the data that drives the orchestrator: seven steps mirroring
//! the target application's registration flow, each with entry/exit
//! markers and ordered field actions. Locator candidates are written
//! most specific first; the later ones cover markup variants the app has
//! shipped at different times.

use crate::config::RunConfig;
use crate::identity::SessionIdentity;
use crate::locator::{LocatorSpec, Selector};
use crate::wizard::{ActionKind, FieldAction, StepExit, WizardStep};

fn fill(value: &str) -> ActionKind {
    ActionKind::Fill {
        value: value.to_string(),
    }
}

fn label_fill(name: &str, label: &str, value: &str) -> FieldAction {
    FieldAction::required(
        name,
        LocatorSpec::one(name, Selector::input_after_label(label)),
        fill(value),
    )
}

/// Build the full wizard for one generated identity.
pub fn partner_wizard_steps(identity: &SessionIdentity, config: &RunConfig) -> Vec<WizardStep> {
    vec![
        landing(),
        terms(),
        identity_step(identity),
        otp_entry(),
        agency_details(identity),
        experience(),
        verification_preferences(identity, config),
    ]
}

/// Landing page: follow the registration call-to-action.
fn landing() -> WizardStep {
    WizardStep {
        name: "landing".to_string(),
        entry: LocatorSpec::ordered(
            "registration call-to-action",
            vec![
                Selector::link_with_text(&["Get Started", "Join Us Now"]),
                Selector::button_with_text(&["Get Started", "Join Us Now"]),
            ],
        ),
        actions: vec![FieldAction::required(
            "open_registration",
            LocatorSpec::ordered(
                "registration call-to-action",
                vec![
                    Selector::link_with_text(&["Get Started", "Join Us Now"]),
                    Selector::button_with_text(&["Get Started", "Join Us Now"]),
                ],
            ),
            ActionKind::Click,
        )],
        exit: StepExit::UrlContains("/register".to_string()),
        optional: false,
    }
}

/// Terms screen: accept and continue.
fn terms() -> WizardStep {
    WizardStep {
        name: "terms".to_string(),
        entry: LocatorSpec::ordered(
            "terms acceptance checkbox",
            vec![
                Selector::css("button#remember[role='checkbox']"),
                Selector::css("[role='checkbox']"),
            ],
        ),
        actions: vec![
            FieldAction::required(
                "accept_terms",
                LocatorSpec::ordered(
                    "terms acceptance checkbox",
                    vec![
                        Selector::css("button#remember[role='checkbox']"),
                        Selector::css("[role='checkbox']"),
                    ],
                ),
                ActionKind::Click,
            ),
            FieldAction::required(
                "continue",
                LocatorSpec::one(
                    "continue button",
                    Selector::button_with_text(&["Continue", "Next"]),
                ),
                ActionKind::Click,
            ),
        ],
        exit: StepExit::Marker(LocatorSpec::one(
            "account form marker",
            Selector::marker_text("First Name"),
        )),
        optional: false,
    }
}

/// Account form: names, contact, credentials.
fn identity_step(identity: &SessionIdentity) -> WizardStep {
    WizardStep {
        name: "identity".to_string(),
        entry: LocatorSpec::one(
            "account form marker",
            Selector::marker_text("First Name"),
        ),
        actions: vec![
            label_fill("first_name", "First Name", &identity.first_name),
            label_fill("last_name", "Last Name", &identity.last_name),
            label_fill("email", "Email", &identity.email),
            // The phone widget renders differently across variants and is
            // not always present at all.
            FieldAction::optional(
                "phone",
                LocatorSpec::ordered(
                    "phone number input",
                    vec![
                        Selector::input_after_label("Phone Number"),
                        Selector::css("input[type='tel']"),
                    ],
                ),
                fill(&identity.phone),
            ),
            label_fill("password", "Password", &identity.password),
            FieldAction::required(
                "confirm_password",
                LocatorSpec::ordered(
                    "confirm password input",
                    vec![
                        Selector::input_after_label("Confirm Password"),
                        Selector::input_with_placeholder("Confirm Password"),
                    ],
                ),
                fill(&identity.password),
            ),
            FieldAction::required(
                "next",
                LocatorSpec::one(
                    "next button",
                    Selector::button_with_text(&["Next", "Sign Up", "Create Account"]),
                ),
                ActionKind::Click,
            ),
        ],
        // The following screen differs by variant; its entry markers gate
        // progress instead.
        exit: StepExit::None,
        optional: false,
    }
}

/// Verification-code screen. Only some variants show it, so the whole
/// step is optional; when present, the orchestrator suspends here until
/// the mailbox yields a code.
fn otp_entry() -> WizardStep {
    WizardStep {
        name: "otp_entry".to_string(),
        entry: LocatorSpec::ordered(
            "verification code marker",
            vec![
                Selector::marker_text("Verify Your Email"),
                Selector::marker_text("verification code"),
            ],
        ),
        actions: vec![
            FieldAction::required(
                "code",
                LocatorSpec::ordered(
                    "verification code input",
                    vec![
                        Selector::css("input[autocomplete='one-time-code']"),
                        Selector::input_placeholder_contains("code"),
                        Selector::css("input"),
                    ],
                ),
                ActionKind::FillVerificationCode,
            ),
            FieldAction::required(
                "verify",
                LocatorSpec::one(
                    "verify button",
                    Selector::button_with_text(&["Verify Code", "Verify"]),
                ),
                ActionKind::Click,
            ),
        ],
        exit: StepExit::Marker(LocatorSpec::ordered(
            "agency section marker",
            vec![
                Selector::marker_text("Agency Details"),
                Selector::marker_text("About your Agency"),
            ],
        )),
        optional: true,
    }
}

/// Agency details: business identity and region.
fn agency_details(identity: &SessionIdentity) -> WizardStep {
    WizardStep {
        name: "agency_details".to_string(),
        entry: LocatorSpec::ordered(
            "agency section marker",
            vec![
                Selector::marker_text("Agency Details"),
                Selector::marker_text("About your Agency"),
            ],
        ),
        actions: vec![
            FieldAction::required(
                "agency_name",
                LocatorSpec::ordered(
                    "agency name input",
                    vec![
                        Selector::input_after_label("Agency Name"),
                        Selector::input_placeholder_contains("agency name"),
                    ],
                ),
                fill(&identity.agency_name),
            ),
            FieldAction::required(
                "role",
                LocatorSpec::ordered(
                    "role input",
                    vec![
                        Selector::input_after_label("Role"),
                        Selector::input_placeholder_contains("role"),
                    ],
                ),
                fill(&identity.role),
            ),
            FieldAction::required(
                "website",
                LocatorSpec::ordered(
                    "website input",
                    vec![
                        Selector::input_after_label("Website"),
                        Selector::input_placeholder_contains("website"),
                    ],
                ),
                fill(&identity.website),
            ),
            FieldAction::required(
                "address",
                LocatorSpec::ordered(
                    "address input",
                    vec![
                        Selector::input_after_label("Address"),
                        Selector::input_placeholder_contains("address"),
                    ],
                ),
                fill(&identity.address),
            ),
            FieldAction::required(
                "region",
                LocatorSpec::ordered(
                    "region multiselect trigger",
                    vec![
                        Selector::button_after_label("Region"),
                        Selector::xpath(
                            "//label[contains(.,'Region')]/following::*[@role='combobox'][1]"
                                .to_string(),
                        ),
                    ],
                ),
                ActionKind::SelectSearchable {
                    query: "Australia".to_string(),
                },
            ),
            FieldAction::required(
                "next",
                LocatorSpec::one("next button", Selector::button_with_text(&["Next"])),
                ActionKind::Click,
            ),
        ],
        exit: StepExit::Marker(LocatorSpec::one(
            "experience section marker",
            Selector::marker_text("Professional Experience"),
        )),
        optional: false,
    }
}

/// Professional experience: history, volumes, services offered.
fn experience() -> WizardStep {
    WizardStep {
        name: "experience".to_string(),
        entry: LocatorSpec::one(
            "experience section marker",
            Selector::marker_text("Professional Experience"),
        ),
        actions: vec![
            FieldAction::required(
                "years_of_experience",
                LocatorSpec::ordered(
                    "years of experience dropdown",
                    vec![
                        Selector::button_after_label("Years of Experience"),
                        Selector::css("button[role='combobox']"),
                        Selector::xpath("//button[@aria-haspopup='listbox']".to_string()),
                    ],
                ),
                ActionKind::SelectFirstOption,
            ),
            label_fill("students_per_year", "Number of Students", "50"),
            label_fill("success_rate", "Success", "90"),
            FieldAction::optional(
                "service_career_counseling",
                LocatorSpec::checkbox_row("Career Counseling"),
                ActionKind::Click,
            ),
            FieldAction::optional(
                "service_admission_applications",
                LocatorSpec::checkbox_row("Admission Applications"),
                ActionKind::Click,
            ),
            FieldAction::required(
                "next",
                LocatorSpec::one("next button", Selector::button_with_text(&["Next"])),
                ActionKind::Click,
            ),
        ],
        exit: StepExit::Marker(LocatorSpec::ordered(
            "verification section marker",
            vec![
                Selector::marker_text("Verification"),
                Selector::marker_text("Preferences"),
            ],
        )),
        optional: false,
    }
}

/// Final screen: registration number, preferences, documents, submit.
/// There is no exit marker; the caller applies the success gate after
/// this step completes.
fn verification_preferences(identity: &SessionIdentity, config: &RunConfig) -> WizardStep {
    WizardStep {
        name: "verification_preferences".to_string(),
        entry: LocatorSpec::ordered(
            "verification section marker",
            vec![
                Selector::marker_text("Verification"),
                Selector::marker_text("Preferences"),
            ],
        ),
        actions: vec![
            FieldAction::required(
                "registration_number",
                LocatorSpec::ordered(
                    "business registration number input",
                    vec![
                        Selector::input_after_label("Registration Number"),
                        Selector::input_placeholder_contains("registration"),
                    ],
                ),
                fill(&identity.registration_number),
            ),
            FieldAction::required(
                "preferred_countries",
                LocatorSpec::ordered(
                    "preferred countries multiselect trigger",
                    vec![
                        Selector::button_after_label("Preferred Countries"),
                        Selector::xpath(
                            "//label[contains(.,'Preferred Countries')]\
                             /following::*[@role='combobox'][1]"
                                .to_string(),
                        ),
                    ],
                ),
                ActionKind::SelectSearchable {
                    query: "Canada".to_string(),
                },
            ),
            FieldAction::optional(
                "institution_universities",
                LocatorSpec::checkbox_row("Universities"),
                ActionKind::Click,
            ),
            FieldAction::optional(
                "institution_colleges",
                LocatorSpec::checkbox_row("Colleges"),
                ActionKind::Click,
            ),
            FieldAction::optional(
                "certification_details",
                LocatorSpec::ordered(
                    "certification details input",
                    vec![
                        Selector::input_after_label("Certification"),
                        Selector::input_placeholder_contains("certification"),
                    ],
                ),
                fill("ICEF Agency Certification"),
            ),
            FieldAction::required(
                "upload_documents",
                LocatorSpec::one(
                    "document upload inputs",
                    Selector::css("input[type='file']"),
                ),
                ActionKind::Upload {
                    paths: vec![
                        config.documents.company_registration.clone(),
                        config.documents.education_certificate.clone(),
                    ],
                },
            ),
            FieldAction::required(
                "submit",
                LocatorSpec::one(
                    "submit button",
                    Selector::button_with_text(&["Submit", "Finish", "Complete"]),
                ),
                ActionKind::Click,
            ),
        ],
        exit: StepExit::None,
        optional: false,
    }
}

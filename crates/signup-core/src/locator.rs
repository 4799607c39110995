//! Locator resolution.
//!
//! The target wizard's markup is not stable, so every logical element is
//! described by an ordered list of candidate selectors — most specific
//! first — and resolved by a single function that tries them in declared
//! order. Precedence is data, not control flow, which keeps it testable
//! without a live page.
//!
//! Policy: each candidate gets the full timeout window rather than a
//! slice of it. Only one candidate is expected to exist on a given markup
//! version, so splitting the budget would just starve the one that does.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::surface::{ElementId, PageSurface, ResolveMode};

/// One candidate selection strategy for a logical element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "strategy", content = "expr")]
pub enum Selector {
    /// CSS selector.
    Css(String),
    /// XPath expression.
    XPath(String),
}

impl Selector {
    pub fn css(expr: impl Into<String>) -> Self {
        Self::Css(expr.into())
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Input immediately following a label containing `label`.
    pub fn input_after_label(label: &str) -> Self {
        Self::XPath(format!(
            "//label[contains(normalize-space(.), '{label}')]/following::input[1]"
        ))
    }

    /// Input with an exact placeholder.
    pub fn input_with_placeholder(placeholder: &str) -> Self {
        Self::XPath(format!("//input[@placeholder='{placeholder}']"))
    }

    /// Input whose placeholder contains `fragment`.
    pub fn input_placeholder_contains(fragment: &str) -> Self {
        Self::XPath(format!("//input[contains(@placeholder,'{fragment}')]"))
    }

    /// Button whose visible text contains any of `texts`.
    pub fn button_with_text(texts: &[&str]) -> Self {
        let cond = texts
            .iter()
            .map(|t| format!("contains(normalize-space(.),'{t}')"))
            .collect::<Vec<_>>()
            .join(" or ");
        Self::XPath(format!("//button[{cond}]"))
    }

    /// First button following a label containing `label` (dropdown triggers).
    pub fn button_after_label(label: &str) -> Self {
        Self::XPath(format!(
            "//label[contains(.,'{label}')]/following::button[1]"
        ))
    }

    /// Any element whose normalized text contains `text` (step markers).
    pub fn marker_text(text: &str) -> Self {
        Self::XPath(format!("//*[contains(normalize-space(.),'{text}')]"))
    }

    /// Anchor whose text contains any of `texts`.
    pub fn link_with_text(texts: &[&str]) -> Self {
        let cond = texts
            .iter()
            .map(|t| format!("contains(.,'{t}')"))
            .collect::<Vec<_>>()
            .join(" or ");
        Self::XPath(format!("//a[{cond}]"))
    }
}

/// Ordered candidate list for one logical UI target.
///
/// Order encodes precedence: the resolver returns the first candidate
/// that is actually present and interactable, never a later one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocatorSpec {
    /// What the target is, for logs and error messages.
    pub description: String,
    /// Candidates, most specific first.
    pub candidates: Vec<Selector>,
}

impl LocatorSpec {
    /// Spec with a single candidate.
    pub fn one(description: impl Into<String>, selector: Selector) -> Self {
        Self {
            description: description.into(),
            candidates: vec![selector],
        }
    }

    /// Spec with an ordered fallback list.
    pub fn ordered(description: impl Into<String>, candidates: Vec<Selector>) -> Self {
        Self {
            description: description.into(),
            candidates,
        }
    }

    /// The checkbox-like rows this app renders for selectable text: a
    /// plain label/span, the clickable ancestor of a text match, or a
    /// button containing the text.
    pub fn checkbox_row(text: &str) -> Self {
        Self::ordered(
            format!("selectable row '{text}'"),
            vec![
                Selector::xpath(format!(
                    "//*[self::label or self::span or self::p][normalize-space()='{text}']"
                )),
                Selector::xpath(format!(
                    "//*[contains(normalize-space(.),'{text}')]\
                     /ancestor::*[self::label or self::button or @role='checkbox'][1]"
                )),
                Selector::xpath(format!("//button[contains(.,'{text}')]")),
            ],
        )
    }
}

impl std::fmt::Display for LocatorSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Resolve a locator spec against the page.
///
/// Candidates are tried in declared order; the first one that satisfies
/// `mode` within `timeout` wins. Interactive targets are scrolled into
/// the viewport center before being returned so callers can act
/// immediately. Each call is independent — no retries across calls.
pub async fn resolve(
    surface: &dyn PageSurface,
    spec: &LocatorSpec,
    mode: ResolveMode,
    timeout: Duration,
) -> Result<ElementId> {
    for candidate in &spec.candidates {
        if let Some(el) = surface.wait_for(candidate, mode, timeout).await? {
            if mode == ResolveMode::Clickable {
                surface.scroll_into_center(el).await?;
            }
            return Ok(el);
        }
        tracing::debug!(locator = %spec, ?candidate, "candidate did not match, trying next");
    }

    Err(Error::LocatorNotFound {
        spec: spec.description.clone(),
        timeout,
    })
}

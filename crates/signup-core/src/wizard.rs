//! Wizard step orchestration.
//!
//! The signup flow is a linear state machine over named steps. Each step
//! declares an entry condition (a visible marker), an ordered list of
//! field actions, and an exit condition (the next step's marker, or a URL
//! fragment). A step's actions run only after its entry condition is
//! observed, and the machine never advances past a step whose exit
//! condition has not been observed. Transitions are strictly forward; a
//! completed step is never retried.
//!
//! Optional actions return their failures as inspected results — the
//! executor logs a warning and moves on rather than catching panics or
//! using errors as control flow. One step may be marked optional as a
//! whole: the verification-code entry screen exists only on some markup
//! variants, and its absence is not a failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::config::{PacingConfig, TimeoutsConfig};
use crate::error::{Error, Result, StepEdge};
use crate::locator::{LocatorSpec, Selector, resolve};
use crate::surface::{PageSurface, ResolveMode};

/// How often URL-based exit conditions are re-checked.
const URL_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// What a field action does once its target is resolved.
#[derive(Debug, Clone)]
pub enum ActionKind {
    /// Clear (best-effort) and type a value.
    Fill { value: String },

    /// Fill the out-of-band verification code. The orchestrator suspends
    /// here, blocking on the code provider before resuming UI actions.
    FillVerificationCode,

    /// Click the target (checkbox rows, buttons, step advancers).
    Click,

    /// Open a searchable multi-select, type a query, click the matching
    /// result row, then close the popover.
    SelectSearchable { query: String },

    /// Open a dropdown and pick its first option via keyboard.
    SelectFirstOption,

    /// Distribute files over the file inputs matching the target.
    Upload { paths: Vec<PathBuf> },
}

/// One action within a step.
#[derive(Debug, Clone)]
pub struct FieldAction {
    /// Short name for logs and the event trail.
    pub name: String,
    /// Where to act.
    pub target: LocatorSpec,
    /// What to do.
    pub kind: ActionKind,
    /// Required actions abort the step on failure; optional ones are
    /// swallowed with a warning.
    pub required: bool,
}

impl FieldAction {
    pub fn required(name: impl Into<String>, target: LocatorSpec, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            target,
            kind,
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, target: LocatorSpec, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            target,
            kind,
            required: false,
        }
    }
}

/// Exit condition of a step.
#[derive(Debug, Clone)]
pub enum StepExit {
    /// Terminal step; the caller applies the verification gate instead.
    None,
    /// A marker (usually the next step's header) becomes visible.
    Marker(LocatorSpec),
    /// The current URL contains a fragment.
    UrlContains(String),
}

/// One logical page of the wizard.
#[derive(Debug, Clone)]
pub struct WizardStep {
    /// Unique step name.
    pub name: String,
    /// Marker that must be visible before any action runs.
    pub entry: LocatorSpec,
    /// Actions, executed in declared order.
    pub actions: Vec<FieldAction>,
    /// Condition gating the transition to the next step.
    pub exit: StepExit,
    /// Optional steps are skipped without failing when their entry
    /// marker never appears (markup-variant branch point).
    pub optional: bool,
}

/// Ordered trail of what the orchestrator did, for tests and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent {
    StepEntered(String),
    StepSkipped(String),
    StepCompleted(String),
    ActionCompleted { step: String, action: String },
    ActionSkipped { step: String, action: String },
    CodeRequested,
    CodeReceived,
}

/// Blocking source of the out-of-band verification code.
pub trait CodeProvider: Send + Sync {
    /// Block until a code is available or the retrieval budget expires.
    fn fetch(&self) -> Result<String>;
}

/// Drives wizard steps in order against a page surface.
pub struct Orchestrator<'a> {
    surface: &'a dyn PageSurface,
    code_provider: Option<Arc<dyn CodeProvider>>,
    timeouts: TimeoutsConfig,
    pacing: PacingConfig,
    events: Vec<RunEvent>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        surface: &'a dyn PageSurface,
        timeouts: TimeoutsConfig,
        pacing: PacingConfig,
    ) -> Self {
        Self {
            surface,
            code_provider: None,
            timeouts,
            pacing,
            events: Vec::new(),
        }
    }

    /// Attach the verification-code source.
    #[must_use]
    pub fn with_code_provider(mut self, provider: Arc<dyn CodeProvider>) -> Self {
        self.code_provider = Some(provider);
        self
    }

    /// Events recorded so far, in order.
    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    /// Run all steps in order.
    pub async fn run(&mut self, steps: &[WizardStep]) -> Result<()> {
        for step in steps {
            self.run_step(step).await?;
        }
        Ok(())
    }

    /// Run a single step: entry gate, actions, exit gate.
    pub async fn run_step(&mut self, step: &WizardStep) -> Result<()> {
        let timeout = self.timeouts.step();

        match resolve(self.surface, &step.entry, ResolveMode::Visible, timeout).await {
            Ok(_) => {}
            Err(Error::LocatorNotFound { .. }) if step.optional => {
                tracing::info!(step = %step.name, "optional step not present, skipping");
                self.events.push(RunEvent::StepSkipped(step.name.clone()));
                return Ok(());
            }
            Err(Error::LocatorNotFound { .. }) => {
                return Err(Error::StepConditionTimeout {
                    step: step.name.clone(),
                    edge: StepEdge::Entry,
                    timeout,
                });
            }
            Err(e) => return Err(e),
        }

        tracing::info!(step = %step.name, "step entered");
        self.events.push(RunEvent::StepEntered(step.name.clone()));

        for action in &step.actions {
            match self.execute(action).await {
                Ok(()) => self.events.push(RunEvent::ActionCompleted {
                    step: step.name.clone(),
                    action: action.name.clone(),
                }),
                Err(e) if !action.required => {
                    tracing::warn!(
                        step = %step.name,
                        action = %action.name,
                        error = %e,
                        "optional action failed, continuing"
                    );
                    self.events.push(RunEvent::ActionSkipped {
                        step: step.name.clone(),
                        action: action.name.clone(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        self.await_exit(step, timeout).await?;
        self.events.push(RunEvent::StepCompleted(step.name.clone()));
        Ok(())
    }

    async fn await_exit(&self, step: &WizardStep, timeout: Duration) -> Result<()> {
        match &step.exit {
            StepExit::None => Ok(()),
            StepExit::Marker(spec) => {
                match resolve(self.surface, spec, ResolveMode::Visible, timeout).await {
                    Ok(_) => Ok(()),
                    Err(Error::LocatorNotFound { .. }) => Err(Error::StepConditionTimeout {
                        step: step.name.clone(),
                        edge: StepEdge::Exit,
                        timeout,
                    }),
                    Err(e) => Err(e),
                }
            }
            StepExit::UrlContains(fragment) => {
                let deadline = Instant::now() + timeout;
                loop {
                    if self.surface.current_url().await?.contains(fragment) {
                        return Ok(());
                    }
                    if Instant::now() >= deadline {
                        return Err(Error::StepConditionTimeout {
                            step: step.name.clone(),
                            edge: StepEdge::Exit,
                            timeout,
                        });
                    }
                    sleep(URL_PROBE_INTERVAL).await;
                }
            }
        }
    }

    async fn execute(&mut self, action: &FieldAction) -> Result<()> {
        match &action.kind {
            ActionKind::Fill { value } => self.fill(&action.target, value).await,
            ActionKind::FillVerificationCode => {
                self.events.push(RunEvent::CodeRequested);
                let code = self.fetch_code().await?;
                self.events.push(RunEvent::CodeReceived);
                self.fill(&action.target, &code).await
            }
            ActionKind::Click => {
                let el = resolve(
                    self.surface,
                    &action.target,
                    ResolveMode::Clickable,
                    self.timeouts.element(),
                )
                .await?;
                self.surface.click(el).await?;
                self.pause().await;
                Ok(())
            }
            ActionKind::SelectSearchable { query } => {
                self.select_searchable(&action.target, query).await
            }
            ActionKind::SelectFirstOption => self.select_first_option(&action.target).await,
            ActionKind::Upload { paths } => self.upload(&action.target, paths).await,
        }
    }

    async fn fill(&self, target: &LocatorSpec, value: &str) -> Result<()> {
        let el = resolve(
            self.surface,
            target,
            ResolveMode::Visible,
            self.timeouts.element(),
        )
        .await?;
        self.surface.scroll_into_center(el).await?;
        // Some of this app's inputs reject clear(); typing still works.
        if let Err(e) = self.surface.clear_field(el).await {
            tracing::debug!(locator = %target, error = %e, "clear failed, typing anyway");
        }
        self.surface.type_text(el, value).await
    }

    /// Shared searchable-multiselect interaction: open the trigger, type
    /// into the popover's search box, click the matching result row,
    /// close with Escape. Used by both the region and preferred-country
    /// fields.
    async fn select_searchable(&self, trigger: &LocatorSpec, query: &str) -> Result<()> {
        let element_timeout = self.timeouts.element();

        let dd = resolve(self.surface, trigger, ResolveMode::Clickable, element_timeout).await?;
        self.surface.click(dd).await?;
        self.pause().await;

        let search_spec = LocatorSpec::one(
            "multiselect search box",
            Selector::input_placeholder_contains("Search"),
        );
        let search = resolve(
            self.surface,
            &search_spec,
            ResolveMode::Visible,
            element_timeout,
        )
        .await?;
        if let Err(e) = self.surface.clear_field(search).await {
            tracing::debug!(error = %e, "search box clear failed");
        }
        self.surface.type_text(search, query).await?;
        self.pause().await;

        let row_spec = LocatorSpec::one(
            format!("result row '{query}'"),
            Selector::xpath(format!(
                "//div[contains(@class,'cursor-pointer') and contains(.,'{query}')]"
            )),
        );
        let row = resolve(
            self.surface,
            &row_spec,
            ResolveMode::Clickable,
            element_timeout,
        )
        .await?;
        self.surface.click(row).await?;
        self.pause().await;

        // Make sure the popover closes before the next action.
        self.surface
            .send_key(search, crate::surface::SurfaceKey::Escape)
            .await
    }

    /// Open a dropdown trigger and accept its first option via keyboard.
    async fn select_first_option(&self, trigger: &LocatorSpec) -> Result<()> {
        let dd = resolve(
            self.surface,
            trigger,
            ResolveMode::Clickable,
            self.timeouts.element(),
        )
        .await?;
        self.surface.click(dd).await?;
        self.pause().await;

        let active = self.surface.active_element().await?;
        self.surface
            .send_key(active, crate::surface::SurfaceKey::ArrowDown)
            .await?;
        self.surface
            .send_key(active, crate::surface::SurfaceKey::Enter)
            .await?;
        self.pause().await;
        Ok(())
    }

    async fn upload(&self, target: &LocatorSpec, paths: &[PathBuf]) -> Result<()> {
        let selector = target
            .candidates
            .first()
            .ok_or(Error::UploadSurfaceMissing)?;
        let inputs = self.surface.find_all(selector).await?;
        if inputs.is_empty() {
            return Err(Error::UploadSurfaceMissing);
        }

        if inputs.len() >= paths.len() {
            for (input, path) in inputs.iter().zip(paths) {
                self.surface.scroll_into_center(*input).await?;
                self.surface.upload_file(*input, path).await?;
                self.pause().await;
            }
        } else {
            // Single multi-file input: feed it every document.
            let input = inputs[0];
            self.surface.scroll_into_center(input).await?;
            for path in paths {
                self.surface.upload_file(input, path).await?;
                self.pause().await;
            }
        }
        Ok(())
    }

    async fn fetch_code(&self) -> Result<String> {
        let provider = self
            .code_provider
            .as_ref()
            .ok_or_else(|| Error::Config("no verification-code provider attached".to_string()))?;

        let provider = Arc::clone(provider);
        tokio::task::spawn_blocking(move || provider.fetch())
            .await
            .map_err(|e| Error::Config(format!("code retrieval task failed: {e}")))?
    }

    async fn pause(&self) {
        let pause = self.pacing.step_pause();
        if !pause.is_zero() {
            sleep(pause).await;
        }
    }
}

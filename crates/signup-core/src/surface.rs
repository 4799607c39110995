//! Browser interaction surface.
//!
//! Abstraction layer over the browser-control primitives the wizard
//! needs: navigate, bounded waits for visibility/clickability, click with
//! an in-page script fallback, typing, key presses, uploads, and page
//! inspection. This allows swapping the real WebDriver client with fake
//! implementations for tests without changing call sites.
//!
//! Elements are handed out as opaque [`ElementId`] handles; the real
//! implementation keeps the backing WebDriver elements in a table keyed
//! by handle.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fantoccini::{Client, ClientBuilder, Locator};
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep};

use crate::config::PacingConfig;
use crate::error::{Result, SurfaceError};
use crate::locator::Selector;

/// Boxed future for surface operations.
pub type SurfaceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Opaque handle to a resolved element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

/// What a bounded element wait must observe before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Element is present and displayed.
    Visible,
    /// Element is displayed and enabled.
    Clickable,
}

/// Keys the wizard sends to composite dropdown widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKey {
    Escape,
    ArrowDown,
    Enter,
}

/// Abstraction over browser interactions.
pub trait PageSurface: Send + Sync {
    /// Navigate to a URL.
    fn navigate<'a>(&'a self, url: &'a str) -> SurfaceFuture<'a, ()>;

    /// Wait up to `timeout` for the first element matching `selector` to
    /// satisfy `mode`. Returns `Ok(None)` when the wait expires; `Err` is
    /// reserved for transport failures.
    fn wait_for<'a>(
        &'a self,
        selector: &'a Selector,
        mode: ResolveMode,
        timeout: Duration,
    ) -> SurfaceFuture<'a, Option<ElementId>>;

    /// All elements currently matching `selector`, in document order.
    fn find_all<'a>(&'a self, selector: &'a Selector) -> SurfaceFuture<'a, Vec<ElementId>>;

    /// Click an element. Falls back to an in-page script click when the
    /// native click is intercepted by an overlay.
    fn click(&self, el: ElementId) -> SurfaceFuture<'_, ()>;

    /// Type text into an element.
    fn type_text<'a>(&'a self, el: ElementId, text: &'a str) -> SurfaceFuture<'a, ()>;

    /// Clear an input field.
    fn clear_field(&self, el: ElementId) -> SurfaceFuture<'_, ()>;

    /// Scroll an element into the viewport center.
    fn scroll_into_center(&self, el: ElementId) -> SurfaceFuture<'_, ()>;

    /// Send a key to an element.
    fn send_key(&self, el: ElementId, key: SurfaceKey) -> SurfaceFuture<'_, ()>;

    /// Handle to the currently focused element.
    fn active_element(&self) -> SurfaceFuture<'_, ElementId>;

    /// Set a file input's value to a local path.
    fn upload_file<'a>(&'a self, el: ElementId, path: &'a Path) -> SurfaceFuture<'a, ()>;

    /// Rendered page content as text (page source).
    fn page_text(&self) -> SurfaceFuture<'_, String>;

    /// Current URL.
    fn current_url(&self) -> SurfaceFuture<'_, String>;

    /// End the browser session.
    fn close(&self) -> SurfaceFuture<'_, ()>;
}

// =============================================================================
// WebDriver implementation
// =============================================================================

/// How often the bounded waits re-check the page.
const WAIT_PROBE_INTERVAL: Duration = Duration::from_millis(250);

/// Real surface over a WebDriver session.
pub struct WebDriverSurface {
    client: Client,
    pacing: PacingConfig,
    elements: Mutex<HashMap<u64, fantoccini::elements::Element>>,
    next_handle: AtomicU64,
}

impl WebDriverSurface {
    /// Start a WebDriver session against `webdriver_url`.
    pub async fn connect(
        webdriver_url: &str,
        headless: bool,
        pacing: PacingConfig,
    ) -> Result<Self> {
        let mut chrome_args = vec!["--start-maximized".to_string()];
        if headless {
            chrome_args.push("--headless=new".to_string());
        }

        let mut capabilities = serde_json::map::Map::new();
        capabilities.insert(
            "goog:chromeOptions".to_string(),
            serde_json::json!({ "args": chrome_args }),
        );

        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(webdriver_url)
            .await
            .map_err(|e| SurfaceError::NewSession(e.to_string()))?;

        Ok(Self {
            client,
            pacing,
            elements: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    fn register(&self, element: fantoccini::elements::Element) -> ElementId {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.elements
            .lock()
            .expect("element table lock")
            .insert(id, element);
        ElementId(id)
    }

    fn lookup(&self, el: ElementId) -> Result<fantoccini::elements::Element> {
        self.elements
            .lock()
            .expect("element table lock")
            .get(&el.0)
            .cloned()
            .ok_or_else(|| SurfaceError::UnknownElement(el.0).into())
    }

    async fn satisfies(
        element: &fantoccini::elements::Element,
        mode: ResolveMode,
    ) -> std::result::Result<bool, fantoccini::error::CmdError> {
        let displayed = element.is_displayed().await?;
        match mode {
            ResolveMode::Visible => Ok(displayed),
            ResolveMode::Clickable => Ok(displayed && element.is_enabled().await?),
        }
    }
}

fn to_locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Css(expr) => Locator::Css(expr),
        Selector::XPath(expr) => Locator::XPath(expr),
    }
}

fn key_char(key: SurfaceKey) -> char {
    match key {
        SurfaceKey::Escape => fantoccini::key::Key::Escape.into(),
        SurfaceKey::ArrowDown => fantoccini::key::Key::Down.into(),
        SurfaceKey::Enter => fantoccini::key::Key::Enter.into(),
    }
}

impl PageSurface for WebDriverSurface {
    fn navigate<'a>(&'a self, url: &'a str) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            self.client
                .goto(url)
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(())
        })
    }

    fn wait_for<'a>(
        &'a self,
        selector: &'a Selector,
        mode: ResolveMode,
        timeout: Duration,
    ) -> SurfaceFuture<'a, Option<ElementId>> {
        Box::pin(async move {
            let deadline = Instant::now() + timeout;
            loop {
                match self.client.find(to_locator(selector)).await {
                    Ok(element) => match Self::satisfies(&element, mode).await {
                        Ok(true) => return Ok(Some(self.register(element))),
                        // Not displayed yet, or went stale between find and
                        // the state probe; keep polling.
                        Ok(false) | Err(_) => {}
                    },
                    Err(fantoccini::error::CmdError::Standard(ref w))
                        if w.error == fantoccini::error::ErrorStatus::NoSuchElement => {}
                    Err(e) => return Err(SurfaceError::WebDriver(e).into()),
                }

                if Instant::now() >= deadline {
                    return Ok(None);
                }
                sleep(WAIT_PROBE_INTERVAL).await;
            }
        })
    }

    fn find_all<'a>(&'a self, selector: &'a Selector) -> SurfaceFuture<'a, Vec<ElementId>> {
        Box::pin(async move {
            let elements = self
                .client
                .find_all(to_locator(selector))
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(elements.into_iter().map(|e| self.register(e)).collect())
        })
    }

    fn click(&self, el: ElementId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let element = self.lookup(el)?;
            if element.click().await.is_err() {
                // Overlays intercept native clicks on this app; force the
                // click from inside the page instead.
                let arg = serde_json::to_value(&element)
                    .map_err(|e| SurfaceError::NewSession(e.to_string()))?;
                self.client
                    .execute("arguments[0].click();", vec![arg])
                    .await
                    .map_err(SurfaceError::WebDriver)?;
            }
            Ok(())
        })
    }

    fn type_text<'a>(&'a self, el: ElementId, text: &'a str) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            let element = self.lookup(el)?;
            let delay = self.pacing.type_delay();
            if delay.is_zero() {
                element
                    .send_keys(text)
                    .await
                    .map_err(SurfaceError::WebDriver)?;
            } else {
                let mut buf = [0u8; 4];
                for ch in text.chars() {
                    element
                        .send_keys(ch.encode_utf8(&mut buf))
                        .await
                        .map_err(SurfaceError::WebDriver)?;
                    sleep(delay).await;
                }
            }
            Ok(())
        })
    }

    fn clear_field(&self, el: ElementId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let element = self.lookup(el)?;
            element.clear().await.map_err(SurfaceError::WebDriver)?;
            Ok(())
        })
    }

    fn scroll_into_center(&self, el: ElementId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let element = self.lookup(el)?;
            let arg = serde_json::to_value(&element)
                .map_err(|e| SurfaceError::NewSession(e.to_string()))?;
            self.client
                .execute("arguments[0].scrollIntoView({block:'center'});", vec![arg])
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(())
        })
    }

    fn send_key(&self, el: ElementId, key: SurfaceKey) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let element = self.lookup(el)?;
            element
                .send_keys(&key_char(key).to_string())
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(())
        })
    }

    fn active_element(&self) -> SurfaceFuture<'_, ElementId> {
        Box::pin(async move {
            let element = self
                .client
                .active_element()
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(self.register(element))
        })
    }

    fn upload_file<'a>(&'a self, el: ElementId, path: &'a Path) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            let element = self.lookup(el)?;
            element
                .send_keys(&path.to_string_lossy())
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(())
        })
    }

    fn page_text(&self) -> SurfaceFuture<'_, String> {
        Box::pin(async move {
            self.client
                .source()
                .await
                .map_err(|e| SurfaceError::WebDriver(e).into())
        })
    }

    fn current_url(&self) -> SurfaceFuture<'_, String> {
        Box::pin(async move {
            let url = self
                .client
                .current_url()
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(url.to_string())
        })
    }

    fn close(&self) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .clone()
                .close()
                .await
                .map_err(SurfaceError::WebDriver)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_id_display_is_stable() {
        assert_eq!(ElementId(7).to_string(), "el#7");
    }

    #[test]
    fn key_chars_are_webdriver_codepoints() {
        // WebDriver keys live in the private-use area.
        assert_eq!(key_char(SurfaceKey::Escape), '\u{e00c}');
        assert_eq!(key_char(SurfaceKey::Enter), '\u{e007}');
        assert_eq!(key_char(SurfaceKey::ArrowDown), '\u{e015}');
    }

    #[test]
    fn selectors_map_to_fantoccini_locators() {
        let css = Selector::Css("input[type='file']".to_string());
        assert!(matches!(to_locator(&css), Locator::Css(_)));

        let xpath = Selector::XPath("//button".to_string());
        assert!(matches!(to_locator(&xpath), Locator::XPath(_)));
    }
}

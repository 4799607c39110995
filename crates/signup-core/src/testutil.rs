//! Shared fakes for unit tests.
//!
//! `FakeSurface` implements [`PageSurface`] over an in-memory "page":
//! selectors are present or absent, clicks can reveal new selectors or
//! change the URL/page text (to simulate step transitions), and every
//! mutating operation is appended to an ordered log.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::locator::Selector;
use crate::surface::{ElementId, PageSurface, ResolveMode, SurfaceFuture, SurfaceKey};

fn key_of(selector: &Selector) -> String {
    match selector {
        Selector::Css(e) => format!("css:{e}"),
        Selector::XPath(e) => format!("xpath:{e}"),
    }
}

#[derive(Default)]
struct Inner {
    next_handle: u64,
    elements: HashMap<String, Vec<ElementId>>,
    reveal_on_click: HashMap<u64, Vec<Selector>>,
    url_on_click: HashMap<u64, String>,
    page_text_on_click: HashMap<u64, String>,
    page_text: String,
    url: String,
    typed: HashMap<u64, String>,
    log: Vec<String>,
}

/// In-memory page surface.
#[derive(Default)]
pub struct FakeSurface {
    inner: Mutex<Inner>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(inner: &mut Inner) -> ElementId {
        inner.next_handle += 1;
        ElementId(inner.next_handle)
    }

    /// Make `selector` match one element; returns its handle.
    pub fn add_element(&self, selector: &Selector) -> ElementId {
        let mut inner = self.inner.lock().unwrap();
        let id = Self::alloc(&mut inner);
        inner.elements.entry(key_of(selector)).or_default().push(id);
        id
    }

    /// Make `selector` match `count` elements.
    pub fn add_elements(&self, selector: &Selector, count: usize) -> Vec<ElementId> {
        (0..count).map(|_| self.add_element(selector)).collect()
    }

    /// Handle of the first element matching `selector`, if any.
    pub fn element_for(&self, selector: &Selector) -> Option<ElementId> {
        let inner = self.inner.lock().unwrap();
        inner.elements.get(&key_of(selector))?.first().copied()
    }

    /// When `el` is clicked, these selectors start matching.
    pub fn reveal_on_click(&self, el: ElementId, selectors: &[Selector]) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .reveal_on_click
            .entry(el.0)
            .or_default()
            .extend(selectors.iter().cloned());
    }

    /// When `el` is clicked, the URL changes to `url`.
    pub fn set_url_on_click(&self, el: ElementId, url: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.url_on_click.insert(el.0, url.to_string());
    }

    /// When `el` is clicked, the page text changes to `text`.
    pub fn set_page_text_on_click(&self, el: ElementId, text: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.page_text_on_click.insert(el.0, text.to_string());
    }

    pub fn set_page_text(&self, text: &str) {
        self.inner.lock().unwrap().page_text = text.to_string();
    }

    pub fn set_url(&self, url: &str) {
        self.inner.lock().unwrap().url = url.to_string();
    }

    /// Drain and return the ordered mutation log.
    pub fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().unwrap().log)
    }

    /// Everything typed into `el`, concatenated.
    pub fn typed_into(&self, el: ElementId) -> String {
        self.inner
            .lock()
            .unwrap()
            .typed
            .get(&el.0)
            .cloned()
            .unwrap_or_default()
    }
}

impl PageSurface for FakeSurface {
    fn navigate<'a>(&'a self, url: &'a str) -> SurfaceFuture<'a, ()> {
        let url = url.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(format!("navigate:{url}"));
            inner.url = url;
            Ok(())
        })
    }

    fn wait_for<'a>(
        &'a self,
        selector: &'a Selector,
        _mode: ResolveMode,
        _timeout: Duration,
    ) -> SurfaceFuture<'a, Option<ElementId>> {
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .elements
                .get(&key_of(selector))
                .and_then(|els| els.first())
                .copied())
        })
    }

    fn find_all<'a>(&'a self, selector: &'a Selector) -> SurfaceFuture<'a, Vec<ElementId>> {
        Box::pin(async move {
            let inner = self.inner.lock().unwrap();
            Ok(inner
                .elements
                .get(&key_of(selector))
                .cloned()
                .unwrap_or_default())
        })
    }

    fn click(&self, el: ElementId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(format!("click:{el}"));
            if let Some(revealed) = inner.reveal_on_click.remove(&el.0) {
                for selector in revealed {
                    let id = Self::alloc(&mut inner);
                    inner.elements.entry(key_of(&selector)).or_default().push(id);
                }
            }
            if let Some(url) = inner.url_on_click.remove(&el.0) {
                inner.url = url;
            }
            if let Some(text) = inner.page_text_on_click.remove(&el.0) {
                inner.page_text = text;
            }
            Ok(())
        })
    }

    fn type_text<'a>(&'a self, el: ElementId, text: &'a str) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(format!("type:{el}:{text}"));
            inner.typed.entry(el.0).or_default().push_str(text);
            Ok(())
        })
    }

    fn clear_field(&self, el: ElementId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            inner.log.push(format!("clear:{el}"));
            inner.typed.remove(&el.0);
            Ok(())
        })
    }

    fn scroll_into_center(&self, el: ElementId) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            self.inner.lock().unwrap().log.push(format!("scroll:{el}"));
            Ok(())
        })
    }

    fn send_key(&self, el: ElementId, key: SurfaceKey) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .log
                .push(format!("key:{el}:{key:?}"));
            Ok(())
        })
    }

    fn active_element(&self) -> SurfaceFuture<'_, ElementId> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            let id = Self::alloc(&mut inner);
            inner.log.push(format!("active:{id}"));
            Ok(id)
        })
    }

    fn upload_file<'a>(&'a self, el: ElementId, path: &'a Path) -> SurfaceFuture<'a, ()> {
        Box::pin(async move {
            self.inner
                .lock()
                .unwrap()
                .log
                .push(format!("upload:{el}:{}", path.display()));
            Ok(())
        })
    }

    fn page_text(&self) -> SurfaceFuture<'_, String> {
        Box::pin(async move { Ok(self.inner.lock().unwrap().page_text.clone()) })
    }

    fn current_url(&self) -> SurfaceFuture<'_, String> {
        Box::pin(async move { Ok(self.inner.lock().unwrap().url.clone()) })
    }

    fn close(&self) -> SurfaceFuture<'_, ()> {
        Box::pin(async move {
            self.inner.lock().unwrap().log.push("close".to_string());
            Ok(())
        })
    }
}

//! Test support: an in-memory driver and helpers for building sessions around it.

use crate::core::{Config, ElementHandle, Session, WebDriver};
use crate::errors::{PageModelError, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use base64::Engine;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Bytes the mock hands out as its screenshot.
pub const MOCK_PNG: &[u8] = b"\x89PNG\r\n\x1a\nmock-screenshot";

/// A scripted element living in one document context.
#[derive(Debug, Clone)]
pub struct MockElement {
    pub frame: Option<Locator>,
    pub count: usize,
    pub displayed: bool,
    pub enabled: bool,
    pub selected: bool,
    pub text: String,
    pub attributes: HashMap<String, String>,
    pub appear_after: usize,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            frame: None,
            count: 1,
            displayed: true,
            enabled: true,
            selected: false,
            text: String::new(),
            attributes: HashMap::new(),
            appear_after: 0,
        }
    }
}

impl MockElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// Place the element inside the document of the frame found by `frame`.
    pub fn in_frame(mut self, frame: Locator) -> Self {
        self.frame = Some(frame);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Number of matches the locator yields.
    pub fn times(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// The first `lookups` lookups find nothing.
    pub fn appears_after(mut self, lookups: usize) -> Self {
        self.appear_after = lookups;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    In(Locator),
    Out,
}

type ContextKey = (Option<Locator>, Locator);

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<ContextKey, MockElement>,
    lookup_counts: HashMap<ContextKey, usize>,
    handles: Vec<ContextKey>,
    current_frame: Option<Locator>,
    lookups: Vec<Locator>,
    frame_events: Vec<FrameEvent>,
    navigations: Vec<String>,
    refreshes: usize,
    clicks: Vec<Locator>,
    current_url: String,
    title: String,
}

/// In-memory [`WebDriver`] with scripted elements and call logs.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a visible top-level element.
    pub fn add_element(&self, locator: Locator) {
        self.add(locator, MockElement::new());
    }

    pub fn add(&self, locator: Locator, element: MockElement) {
        let key = (element.frame.clone(), locator);
        self.state().elements.insert(key, element);
    }

    pub fn remove(&self, locator: &Locator) {
        self.state()
            .elements
            .retain(|(_, candidate), _| candidate != locator);
    }

    pub fn set_displayed(&self, locator: &Locator, displayed: bool) {
        for ((_, candidate), element) in self.state().elements.iter_mut() {
            if candidate == locator {
                element.displayed = displayed;
            }
        }
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state().title = title.into();
    }

    /// Every locator looked up, in order.
    pub fn lookups(&self) -> Vec<Locator> {
        self.state().lookups.clone()
    }

    pub fn lookup_count(&self, locator: &Locator) -> usize {
        self.state()
            .lookups
            .iter()
            .filter(|candidate| *candidate == locator)
            .count()
    }

    pub fn frame_events(&self) -> Vec<FrameEvent> {
        self.state().frame_events.clone()
    }

    pub fn current_frame(&self) -> Option<Locator> {
        self.state().current_frame.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.state().refreshes
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.state().clicks.clone()
    }

    pub fn attribute(&self, locator: &Locator, name: &str) -> Option<String> {
        self.state()
            .elements
            .iter()
            .find(|((_, candidate), _)| candidate == locator)
            .and_then(|(_, element)| element.attributes.get(name).cloned())
    }

    fn with_element<T>(
        &self,
        handle: &ElementHandle,
        f: impl FnOnce(&mut MockElement, &Locator) -> T,
    ) -> Result<T> {
        let mut state = self.state();
        let key = handle
            .id()
            .strip_prefix("mock-")
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| state.handles.get(index).cloned())
            .ok_or_else(|| PageModelError::Driver(format!("Unknown handle {}", handle)))?;
        let element = state
            .elements
            .get_mut(&key)
            .ok_or_else(|| PageModelError::NotFound(format!("Stale element {}", key.1)))?;
        Ok(f(element, &key.1))
    }
}

#[async_trait]
impl WebDriver for MockDriver {
    async fn find_many(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut state = self.state();
        let key = (state.current_frame.clone(), locator.clone());
        state.lookups.push(locator.clone());
        let seen = state.lookup_counts.entry(key.clone()).or_insert(0);
        *seen += 1;
        let seen = *seen;

        let count = match state.elements.get(&key) {
            Some(element) if seen > element.appear_after => element.count,
            _ => 0,
        };
        let mut handles = Vec::with_capacity(count);
        for _ in 0..count {
            handles.push(ElementHandle::new(format!("mock-{}", state.handles.len())));
            state.handles.push(key.clone());
        }
        Ok(handles)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |e, _| e.displayed)
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |e, _| e.enabled)
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |e, _| e.selected)
    }

    async fn get_attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        self.with_element(element, |e, _| e.attributes.get(name).cloned())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        self.with_element(element, |e, _| e.text.clone())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        let locator = self.with_element(element, |e, locator| {
            e.selected = !e.selected;
            locator.clone()
        })?;
        self.state().clicks.push(locator);
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.with_element(element, |e, _| {
            e.attributes.entry("value".to_string()).or_default().push_str(text);
        })
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.with_element(element, |e, _| {
            e.attributes.insert("value".to_string(), String::new());
        })
    }

    async fn submit(&self, element: &ElementHandle) -> Result<()> {
        self.with_element(element, |e, _| {
            e.attributes.insert("submitted".to_string(), "true".to_string());
        })
    }

    async fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()> {
        let locator = self.with_element(frame, |_, locator| locator.clone())?;
        let mut state = self.state();
        state.current_frame = Some(locator.clone());
        state.frame_events.push(FrameEvent::In(locator));
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        let mut state = self.state();
        state.current_frame = None;
        state.frame_events.push(FrameEvent::Out);
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state();
        state.current_url = url.to_string();
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.state().refreshes += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.state().current_url.clone())
    }

    async fn title(&self) -> Result<String> {
        Ok(self.state().title.clone())
    }

    async fn capture_screenshot_base64(&self) -> Result<String> {
        Ok(base64::engine::general_purpose::STANDARD.encode(MOCK_PNG))
    }
}

pub struct TestHelper;

impl TestHelper {
    /// Install a fmt subscriber honouring `RUST_LOG`; later calls are no-ops.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Short timeouts and no screenshots, so failing waits return quickly.
    pub fn fast_config() -> Config {
        Config::default()
            .with_page_timeout(Duration::from_millis(300))
            .with_element_timeout(Duration::from_millis(150))
            .with_poll_interval(Duration::from_millis(10))
            .with_screenshots(false)
            .with_test_screenshots(false)
    }

    /// Drive a future to completion outside a runtime, for synchronous test harnesses.
    #[cfg(feature = "testing")]
    pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio_test::block_on(future)
    }

    pub fn mock_session() -> (Arc<MockDriver>, Session) {
        Self::mock_session_with(Self::fast_config())
    }

    pub fn mock_session_with(config: Config) -> (Arc<MockDriver>, Session) {
        Self::init_tracing();
        let driver = Arc::new(MockDriver::new());
        let session = Session::with_config(driver.clone(), config);
        (driver, session)
    }
}

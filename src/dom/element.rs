use crate::core::{ElementHandle, Session};
use crate::dom::kind::ElementKind;
use crate::dom::wait::{poll_for, poll_until, Condition};
use crate::errors::{PageModelError, Result};
use crate::locator::Locator;
use crate::types::Number;
use crate::utils::{extract_float, extract_int, extract_number, with_diagnostics, ScreenshotManager};
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A single addressable element of a page model.
///
/// Flags: `visible` (expected visible when the owning container validates) and
/// `do_not_check` (ignored by validation). Both change only through the marker calls.
#[derive(Clone)]
pub struct Element {
    session: Session,
    locator: Option<Locator>,
    kind: ElementKind,
    visible: bool,
    do_not_check: bool,
}

impl Element {
    pub fn new(session: Session, locator: impl Into<Option<Locator>>) -> Self {
        Self::of_kind(ElementKind::Element, session, locator)
    }

    pub fn of_kind(kind: ElementKind, session: Session, locator: impl Into<Option<Locator>>) -> Self {
        Self {
            session,
            locator: locator.into(),
            kind,
            visible: true,
            do_not_check: false,
        }
    }

    pub fn clickable(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::Clickable, session, locator)
    }

    pub fn button(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::Button, session, locator)
    }

    pub fn link(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::Link, session, locator)
    }

    pub fn text_element(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::TextElement, session, locator)
    }

    pub fn text_field(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::TextField, session, locator)
    }

    pub fn checkbox(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::Checkbox, session, locator)
    }

    pub fn radio_button(session: Session, locator: Locator) -> Self {
        Self::of_kind(ElementKind::RadioButton, session, locator)
    }

    /// Dropdown options are addressed below the locator, so it must be XPath.
    pub fn dropdown(session: Session, locator: Locator) -> Result<Self> {
        Self::require_xpath(ElementKind::Dropdown, &locator)?;
        Ok(Self::of_kind(ElementKind::Dropdown, session, locator))
    }

    /// Table rows are addressed below the locator, so it must be XPath.
    pub fn table(session: Session, locator: Locator) -> Result<Self> {
        Self::require_xpath(ElementKind::Table, &locator)?;
        Ok(Self::of_kind(ElementKind::Table, session, locator))
    }

    fn require_xpath(kind: ElementKind, locator: &Locator) -> Result<()> {
        if locator.is_xpath() {
            Ok(())
        } else {
            Err(PageModelError::InvalidConfiguration(format!(
                "{} requires an xpath locator, got {}",
                kind, locator
            )))
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn locator(&self) -> Option<&Locator> {
        self.locator.as_ref()
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn expects_visible(&self) -> bool {
        self.visible
    }

    pub fn is_do_not_check(&self) -> bool {
        self.do_not_check
    }

    pub fn mark_invisible(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn mark_visible(mut self) -> Self {
        self.visible = true;
        self
    }

    pub fn mark_do_not_check(mut self) -> Self {
        self.do_not_check = true;
        self
    }

    pub fn mark_check(mut self) -> Self {
        self.do_not_check = false;
        self
    }

    pub fn set_visible(&mut self, visible: bool) -> &mut Self {
        self.visible = visible;
        self
    }

    pub fn set_do_not_check(&mut self, do_not_check: bool) -> &mut Self {
        self.do_not_check = do_not_check;
        self
    }

    fn require_locator(&self) -> Result<&Locator> {
        self.locator.as_ref().ok_or_else(|| {
            PageModelError::InvalidConfiguration(format!("locator was not specified ({})", self.kind))
        })
    }

    fn element_timeout(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.session.element_timeout())
    }

    async fn diagnosed<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        with_diagnostics(&self.session, operation, future).await
    }

    // Resolution

    /// First match, polling until one exists or `timeout` (default: element timeout) passes.
    pub async fn resolve_one(&self, timeout: Option<Duration>) -> Result<ElementHandle> {
        let locator = self.require_locator()?;
        let timeout = self.element_timeout(timeout);
        let driver = self.session.driver();
        let found = poll_for(self.session.poll_interval(), timeout, || async move {
            Ok::<_, PageModelError>(driver.find_many(locator).await?.into_iter().next())
        })
        .await?;
        found.ok_or_else(|| {
            PageModelError::NotFound(format!(
                "{} ({}) not found within {:?}",
                locator, self.kind, timeout
            ))
        })
    }

    /// All matches once at least `min_count` exist, or whatever exists when `timeout` passes.
    pub async fn resolve_many(&self, timeout: Option<Duration>, min_count: usize) -> Result<Vec<ElementHandle>> {
        let locator = self.require_locator()?;
        let driver = self.session.driver();
        let found = poll_for(
            self.session.poll_interval(),
            self.element_timeout(timeout),
            || async move {
                let handles = driver.find_many(locator).await?;
                Ok::<_, PageModelError>((handles.len() >= min_count).then_some(handles))
            },
        )
        .await?;
        match found {
            Some(handles) => Ok(handles),
            None => driver.find_many(locator).await,
        }
    }

    async fn handle(&self) -> Result<ElementHandle> {
        self.resolve_one(Some(Duration::ZERO)).await
    }

    async fn handles(&self) -> Result<Vec<ElementHandle>> {
        let locator = self.require_locator()?;
        self.session.driver().find_many(locator).await
    }

    // Waits

    async fn poll(&self, condition: Condition, timeout: Duration) -> Result<()> {
        let locator = self.require_locator()?;
        let driver = self.session.driver();
        let interval = self.session.poll_interval();
        let met = match condition {
            Condition::Present | Condition::PresentAndVisible => {
                poll_until(interval, timeout, || async move {
                    driver.find_many(locator).await.map(|handles| !handles.is_empty())
                })
                .await?
            }
            Condition::Visible => {
                poll_until(interval, timeout, || async move {
                    match driver.find_many(locator).await?.first() {
                        Some(handle) => driver.is_displayed(handle).await,
                        None => Ok(false),
                    }
                })
                .await?
            }
            Condition::Selected => {
                poll_until(interval, timeout, || async move {
                    match driver.find_many(locator).await?.first() {
                        Some(handle) => driver.is_selected(handle).await,
                        None => Ok(false),
                    }
                })
                .await?
            }
        };
        if met {
            Ok(())
        } else {
            Err(PageModelError::Timeout(format!(
                "Timeout waiting for {} {} with timeout={:?} ({})",
                condition.describe(),
                locator,
                timeout,
                self.kind
            )))
        }
    }

    /// Undecorated wait used by validation and the boolean probes.
    pub(crate) async fn check(&self, condition: Condition, timeout: Duration) -> Result<()> {
        match condition {
            Condition::PresentAndVisible => {
                self.poll(Condition::Present, timeout).await?;
                self.poll(Condition::Visible, timeout).await
            }
            other => self.poll(other, timeout).await,
        }
    }

    pub async fn wait_for_present(&self, timeout: Option<Duration>) -> Result<&Self> {
        let timeout = self.element_timeout(timeout);
        self.diagnosed("wait_for_present", self.check(Condition::Present, timeout))
            .await?;
        Ok(self)
    }

    pub async fn wait_for_visible(&self, timeout: Option<Duration>) -> Result<&Self> {
        let timeout = self.element_timeout(timeout);
        self.diagnosed("wait_for_visible", self.check(Condition::Visible, timeout))
            .await?;
        Ok(self)
    }

    pub async fn wait_for_present_and_visible(&self, timeout: Option<Duration>) -> Result<&Self> {
        let timeout = self.element_timeout(timeout);
        self.diagnosed(
            "wait_for_present_and_visible",
            self.check(Condition::PresentAndVisible, timeout),
        )
        .await?;
        Ok(self)
    }

    pub async fn wait_for_selected(&self, timeout: Option<Duration>) -> Result<&Self> {
        let timeout = self.element_timeout(timeout);
        self.diagnosed("wait_for_selected", self.check(Condition::Selected, timeout))
            .await?;
        Ok(self)
    }

    pub async fn is_present(&self, timeout: Option<Duration>) -> bool {
        self.check(Condition::Present, self.element_timeout(timeout))
            .await
            .is_ok()
    }

    pub async fn is_visible(&self, timeout: Option<Duration>) -> bool {
        self.check(Condition::Visible, self.element_timeout(timeout))
            .await
            .is_ok()
    }

    pub async fn is_present_and_visible(&self, timeout: Option<Duration>) -> bool {
        self.check(Condition::PresentAndVisible, self.element_timeout(timeout))
            .await
            .is_ok()
    }

    // Reads

    pub async fn text(&self) -> Result<String> {
        let handle = self.handle().await?;
        self.session.driver().text(&handle).await
    }

    /// Text of every match, in document order.
    pub async fn texts(&self) -> Result<Vec<String>> {
        let driver = self.session.driver();
        let mut texts = Vec::new();
        for handle in self.handles().await? {
            texts.push(driver.text(&handle).await?);
        }
        Ok(texts)
    }

    /// The `index`-th number in `text`, or in the element's own text when `text` is `None`.
    pub async fn number(&self, text: Option<&str>, index: usize) -> Result<Option<Number>> {
        self.diagnosed("get_number", async move {
            let text = match text {
                Some(text) => text.to_string(),
                None => self.text().await?,
            };
            Ok::<_, PageModelError>(extract_number(&text, index))
        })
        .await
    }

    /// First number of each match's text.
    pub async fn numbers(&self) -> Result<Vec<Option<Number>>> {
        Ok(self
            .texts()
            .await?
            .iter()
            .map(|text| extract_number(text, 0))
            .collect())
    }

    pub async fn int(&self, text: Option<&str>, index: usize) -> Result<Option<i64>> {
        self.diagnosed("get_int", async move {
            let text = match text {
                Some(text) => text.to_string(),
                None => self.text().await?,
            };
            Ok::<_, PageModelError>(extract_int(&text, index))
        })
        .await
    }

    pub async fn float(&self, text: Option<&str>, index: usize) -> Result<Option<f64>> {
        self.diagnosed("get_float", async move {
            let text = match text {
                Some(text) => text.to_string(),
                None => self.text().await?,
            };
            Ok::<_, PageModelError>(extract_float(&text, index))
        })
        .await
    }

    pub async fn attribute(&self, name: &str) -> Result<Option<String>> {
        self.diagnosed("get_attribute", async move {
            let handle = self.handle().await?;
            self.session.driver().get_attribute(&handle, name).await
        })
        .await
    }

    /// Whether `value` is one of the space-delimited tokens of the attribute (e.g. a CSS class).
    pub async fn attribute_contains(&self, name: &str, value: &str) -> Result<bool> {
        Ok(self
            .attribute(name)
            .await?
            .map(|attribute| attribute.split_whitespace().any(|token| token == value))
            .unwrap_or(false))
    }

    pub async fn attribute_is(&self, name: &str, value: &str) -> Result<bool> {
        Ok(self.attribute(name).await?.as_deref() == Some(value))
    }

    /// Inner HTML of the element.
    pub async fn html(&self) -> Result<String> {
        Ok(self.attribute("innerHTML").await?.unwrap_or_default())
    }

    pub async fn is_displayed(&self) -> Result<bool> {
        self.diagnosed("is_displayed", async move {
            let handle = self.handle().await?;
            self.session.driver().is_displayed(&handle).await
        })
        .await
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        self.diagnosed("is_enabled", async move {
            let handle = self.handle().await?;
            self.session.driver().is_enabled(&handle).await
        })
        .await
    }

    pub async fn is_selected(&self) -> Result<bool> {
        self.diagnosed("is_selected", async move {
            let handle = self.handle().await?;
            self.session.driver().is_selected(&handle).await
        })
        .await
    }

    // Interactions

    pub async fn click(&self) -> Result<&Self> {
        self.diagnosed("click", async move {
            let handle = self.handle().await?;
            self.session.driver().click(&handle).await
        })
        .await?;
        Ok(self)
    }

    /// Wait until present and visible, then click.
    pub async fn click_when_visible(&self, timeout: Option<Duration>) -> Result<&Self> {
        self.wait_for_present_and_visible(timeout).await?;
        self.click().await
    }

    pub async fn send_keys(&self, text: &str) -> Result<&Self> {
        let handle = self.handle().await?;
        self.session.driver().send_keys(&handle, text).await?;
        Ok(self)
    }

    pub async fn type_text(&self, text: &str) -> Result<&Self> {
        self.send_keys(text).await
    }

    pub async fn clear(&self) -> Result<&Self> {
        let handle = self.handle().await?;
        self.session.driver().clear(&handle).await?;
        Ok(self)
    }

    pub async fn submit(&self) -> Result<&Self> {
        let handle = self.handle().await?;
        self.session.driver().submit(&handle).await?;
        Ok(self)
    }

    /// Check a checkbox or radio button; no-op when already selected.
    pub async fn select(&self) -> Result<&Self> {
        self.diagnosed("select", async move {
            let handle = self.handle().await?;
            let driver = self.session.driver();
            if !driver.is_selected(&handle).await? {
                driver.click(&handle).await?;
            }
            Ok::<_, PageModelError>(())
        })
        .await?;
        Ok(self)
    }

    /// Uncheck a checkbox; no-op when not selected.
    pub async fn unselect(&self) -> Result<&Self> {
        self.diagnosed("unselect", async move {
            let handle = self.handle().await?;
            let driver = self.session.driver();
            if driver.is_selected(&handle).await? {
                driver.click(&handle).await?;
            }
            Ok::<_, PageModelError>(())
        })
        .await?;
        Ok(self)
    }

    /// The XPath-composed child element for `suffix`.
    fn child(&self, suffix: &str) -> Result<Element> {
        let locator = self.require_locator()?.child_xpath(suffix)?;
        Ok(Element::new(self.session.clone(), locator))
    }

    pub async fn select_by_visible_text(&self, text: &str) -> Result<&Self> {
        let option = self.child(&format!("/option[normalize-space(.)={}]", xpath_literal(text)))?;
        option.click().await?;
        Ok(self)
    }

    /// Select the option at zero-based `index`.
    pub async fn select_by_index(&self, index: usize) -> Result<&Self> {
        let option = self.child(&format!("/option[{}]", index + 1))?;
        option.click().await?;
        Ok(self)
    }

    pub async fn count_options(&self) -> Result<usize> {
        Ok(self.child("/option")?.handles().await?.len())
    }

    /// One element per body row, addressed positionally.
    pub async fn rows(&self) -> Result<Vec<Element>> {
        let rows = self.child("//tbody/tr")?;
        let count = rows.handles().await?.len();
        let base = rows.locator.as_ref().map(|l| l.value().to_string()).unwrap_or_default();
        Ok((1..=count)
            .map(|n| Element::new(self.session.clone(), Locator::by_xpath(format!("({})[{}]", base, n))))
            .collect())
    }

    pub async fn count_rows(&self) -> Result<usize> {
        Ok(self.child("//tbody/tr")?.handles().await?.len())
    }

    pub async fn take_screenshot(&self, dir: Option<&Path>, name: Option<&str>) -> Result<PathBuf> {
        ScreenshotManager::save(&self.session, dir, name).await
    }

    // Timers

    pub fn start_timer(&self, kind: Option<&str>) {
        self.session.timers().start(kind);
    }

    pub fn stop_timer(&self, kind: Option<&str>) -> Option<Duration> {
        self.session.timers().stop(kind)
    }

    pub fn split_time(&self, kind: Option<&str>) -> Duration {
        self.session.timers().split(kind)
    }

    pub fn duration(&self, kind: Option<&str>) -> Duration {
        self.session.timers().duration(kind)
    }

    pub fn reset_timer(&self, kind: Option<&str>) {
        self.session.timers().reset(kind);
    }
}

/// Quote `text` as an XPath string literal.
fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        format!("\"{}\"", text)
    } else if !text.contains('\'') {
        format!("'{}'", text)
    } else {
        let parts: Vec<String> = text.split('"').map(|part| format!("\"{}\"", part)).collect();
        format!("concat({})", parts.join(", '\"', "))
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.session.same_driver(&other.session)
            && self.locator == other.locator
            && self.kind == other.kind
            && self.visible == other.visible
            && self.do_not_check == other.do_not_check
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.locator.hash(state);
        self.kind.hash(state);
        self.visible.hash(state);
        self.do_not_check.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.kind)
            .field("locator", &self.locator)
            .field("visible", &self.visible)
            .field("do_not_check", &self.do_not_check)
            .finish()
    }
}

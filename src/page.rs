//! The root of a page model: a base URL plus the page's named nodes.

use crate::core::Session;
use crate::dom::discovery::DiscoverOptions;
use crate::dom::element::Element;
use crate::dom::node::{HasChildren, Node, NodeRef};
use crate::dom::validation::{validate_nodes, ValidateOptions, ValidationPlan};
use crate::dom::wait::poll_until;
use crate::errors::{PageModelError, Result};
use crate::locator::Locator;
use crate::utils::{with_diagnostics, ScreenshotManager};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::info;
use url::Url;

const PAGE_LOAD_TIMER: &str = "page_load";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"(?i)^(?:http|ftp)s?://",
            r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)|",
            r"localhost|",
            r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
            r"(?::\d+)?",
            r"(?:/?|[/?]\S+)$",
        ))
        .expect("url pattern is valid")
    })
}

/// Anything a page can take as its address. Every form goes through the same shape check.
pub trait IntoPageUrl {
    fn into_page_url(self) -> Result<Url>;
}

impl IntoPageUrl for Url {
    fn into_page_url(self) -> Result<Url> {
        if url_pattern().is_match(self.as_str()) {
            Ok(self)
        } else {
            Err(invalid_url(self.as_str()))
        }
    }
}

impl IntoPageUrl for &str {
    fn into_page_url(self) -> Result<Url> {
        if !url_pattern().is_match(self) {
            return Err(invalid_url(self));
        }
        Url::parse(self).map_err(|_| invalid_url(self))?.into_page_url()
    }
}

impl IntoPageUrl for String {
    fn into_page_url(self) -> Result<Url> {
        self.as_str().into_page_url()
    }
}

impl IntoPageUrl for &String {
    fn into_page_url(self) -> Result<Url> {
        self.as_str().into_page_url()
    }
}

fn invalid_url(url: &str) -> PageModelError {
    PageModelError::InvalidConfiguration(format!("Invalid url: '{}'", url))
}

/// Root container. Build one per page, register its nodes, then `open` and validate.
#[derive(Debug, Clone)]
pub struct Webpage {
    session: Session,
    url: Option<Url>,
    path: String,
    children: Vec<(String, Node)>,
}

impl Webpage {
    /// A page without a fixed address; `open` then needs an explicit url.
    pub fn new(session: Session) -> Self {
        Self {
            session,
            url: None,
            path: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_url(session: Session, url: impl IntoPageUrl) -> Result<Self> {
        let mut page = Self::new(session);
        page.url = Some(url.into_page_url()?);
        Ok(page)
    }

    /// Path appended to the base url's origin when opening the page.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.register_child(name, node);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn page_timeout(&self) -> Duration {
        self.session.page_timeout()
    }

    pub fn element_timeout(&self) -> Duration {
        self.session.element_timeout()
    }

    /// `scheme://host:port<path>`, with port 80 for http and 443 otherwise when none is given.
    pub fn address(&self) -> Result<String> {
        let url = self.url.as_ref().ok_or(PageModelError::MissingUrl)?;
        let host = url
            .host_str()
            .ok_or_else(|| invalid_url(url.as_str()))?;
        let port = url
            .port()
            .unwrap_or(if url.scheme() == "http" { 80 } else { 443 });
        Ok(format!("{}://{}:{}{}", url.scheme(), host, port, self.path))
    }

    /// Navigate to `url` if given, otherwise to the page's own address (timed as `page_load`).
    pub async fn open(&self, url: Option<&str>) -> Result<&Self> {
        match url {
            Some(url) => {
                info!("Opening {}", url);
                self.session.driver().navigate(url).await?;
            }
            None => {
                let address = self.address()?;
                info!("Opening {}", address);
                self.start_timer(Some(PAGE_LOAD_TIMER));
                self.session.driver().navigate(&address).await?;
            }
        }
        Ok(self)
    }

    /// `open` the page's own address, then `wait_for_page_load`.
    pub async fn open_and_wait(&self, timeout: Option<Duration>) -> Result<&Self> {
        self.open(None).await?;
        self.wait_for_page_load(timeout, false).await
    }

    pub async fn refresh(&self) -> Result<&Self> {
        self.start_timer(Some(PAGE_LOAD_TIMER));
        self.session.driver().refresh().await?;
        Ok(self)
    }

    pub async fn reload(&self) -> Result<&Self> {
        self.refresh().await
    }

    pub async fn title(&self) -> Result<String> {
        self.session.driver().title().await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.session.driver().current_url().await
    }

    pub async fn html(&self) -> Result<String> {
        Element::new(self.session.clone(), Locator::by_xpath("//html"))
            .html()
            .await
    }

    /// Wait until the title contains `title` (case sensitive). Timeout defaults to the
    /// element timeout.
    pub async fn wait_for_title(&self, title: &str, timeout: Option<Duration>) -> Result<&Self> {
        let timeout = timeout.unwrap_or_else(|| self.element_timeout());
        let driver = self.session.driver();
        with_diagnostics(&self.session, "wait_for_title", async {
            let met = poll_until(self.session.poll_interval(), timeout, || async move {
                driver.title().await.map(|current| current.contains(title))
            })
            .await?;
            if met {
                Ok(())
            } else {
                Err(PageModelError::Timeout(format!(
                    "Timeout waiting for title containing '{}' with timeout={:?}",
                    title, timeout
                )))
            }
        })
        .await?;
        Ok(self)
    }

    /// Validate with the page timeout, stopping the `page_load` timer started by `open`
    /// or `refresh` (or timing just the validation when none is running).
    pub async fn wait_for_page_load(&self, timeout: Option<Duration>, force_visible: bool) -> Result<&Self> {
        if !self.session.timers().is_running(Some(PAGE_LOAD_TIMER)) {
            self.start_timer(Some(PAGE_LOAD_TIMER));
        }
        let options = ValidateOptions::new()
            .with_timeout(timeout.unwrap_or_else(|| self.page_timeout()))
            .with_force_visible(force_visible);
        self.validate(options).await?;
        self.stop_timer(Some(PAGE_LOAD_TIMER));
        let took = self.duration(Some(PAGE_LOAD_TIMER));
        self.session.debug(&format!("Page load for {} took {:?}", self.container_name(), took));
        Ok(self)
    }

    /// Check every discovered node. Timeout defaults to the element timeout.
    pub async fn validate(&self, options: ValidateOptions) -> Result<&Self> {
        let plan = ValidationPlan::resolve(&self.session, &options, self.element_timeout());
        with_diagnostics(&self.session, "validate", async {
            let nodes = self.discover(&DiscoverOptions::new())?;
            validate_nodes(&self.session, nodes, plan).await
        })
        .await?;
        Ok(self)
    }

    /// Fail-fast validation reported as a bool, without screenshots. Timeout defaults to
    /// the page timeout.
    pub async fn is_loaded(&self, timeout: Option<Duration>, force_visible: bool) -> bool {
        let _quiet = self.session.suppress_screenshots();
        let options = ValidateOptions::new()
            .with_timeout(timeout.unwrap_or_else(|| self.page_timeout()))
            .with_force_visible(force_visible)
            .with_fail_fast(true);
        self.validate(options).await.is_ok()
    }

    pub async fn is_page(&self, timeout: Option<Duration>, force_visible: bool) -> bool {
        self.is_loaded(timeout, force_visible).await
    }

    pub async fn take_screenshot(&self, dir: Option<&Path>, name: Option<&str>) -> Result<PathBuf> {
        ScreenshotManager::save(&self.session, dir, name).await
    }

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

impl HasChildren for Webpage {
    fn children(&self) -> &[(String, Node)] {
        &self.children
    }

    fn children_mut(&mut self) -> &mut Vec<(String, Node)> {
        &mut self.children
    }

    fn as_node_ref(&self) -> Option<NodeRef<'_>> {
        None
    }

    fn own_element_mut(&mut self) -> Option<&mut Element> {
        None
    }

    fn container_name(&self) -> String {
        match &self.url {
            Some(url) => format!("Webpage({}{})", url.origin().ascii_serialization(), self.path),
            None => "Webpage".to_string(),
        }
    }
}

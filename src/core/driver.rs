use crate::errors::{PageModelError, Result};
use crate::locator::Locator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a live element, valid in the document context it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The browser-driver capability the page model sits on.
///
/// Lookups are evaluated against the current document context, which changes with
/// `switch_to_frame` / `switch_to_default_content`.
#[async_trait]
pub trait WebDriver: Send + Sync {
    /// Find every element matching the locator; zero matches is an empty vec
    async fn find_many(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;

    /// Find the first element matching the locator
    async fn find_one(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_many(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PageModelError::NotFound(locator.to_string()))
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool>;

    /// Attribute (or same-named property) value, `None` when absent
    async fn get_attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>>;

    /// Visible text content
    async fn text(&self, element: &ElementHandle) -> Result<String>;

    async fn click(&self, element: &ElementHandle) -> Result<()>;

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()>;

    async fn clear(&self, element: &ElementHandle) -> Result<()>;

    async fn submit(&self, element: &ElementHandle) -> Result<()>;

    /// Make the given frame element's document the current context
    async fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()>;

    /// Return to the top-level document
    async fn switch_to_default_content(&self) -> Result<()>;

    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn refresh(&self) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// PNG screenshot of the viewport, base64 encoded
    async fn capture_screenshot_base64(&self) -> Result<String>;
}

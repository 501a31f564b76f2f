//! Locators: a lookup strategy paired with a strategy-specific value.

use crate::errors::{PageModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the driver should interpret a locator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    XPath,
    Css,
    Id,
    Name,
    ClassName,
    LinkText,
    PartialLinkText,
    TagName,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::XPath => "xpath",
            Strategy::Css => "css selector",
            Strategy::Id => "id",
            Strategy::Name => "name",
            Strategy::ClassName => "class name",
            Strategy::LinkText => "link text",
            Strategy::PartialLinkText => "partial link text",
            Strategy::TagName => "tag name",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = PageModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "xpath" => Ok(Strategy::XPath),
            "css" | "css selector" => Ok(Strategy::Css),
            "id" => Ok(Strategy::Id),
            "name" => Ok(Strategy::Name),
            "class" | "class name" => Ok(Strategy::ClassName),
            "link text" => Ok(Strategy::LinkText),
            "partial link text" => Ok(Strategy::PartialLinkText),
            "tag" | "tag name" => Ok(Strategy::TagName),
            other => Err(PageModelError::InvalidConfiguration(format!(
                "Unknown locator strategy '{}'",
                other
            ))),
        }
    }
}

/// A (strategy, value) pair. Two locators are equal when both fields are equal;
/// `clone()` produces an independent copy whose mutation never affects the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    strategy: Strategy,
    value: String,
}

impl Locator {
    pub fn new(strategy: Strategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
        }
    }

    pub fn by_xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    pub fn by_css(value: impl Into<String>) -> Self {
        Self::new(Strategy::Css, value)
    }

    pub fn by_id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    pub fn by_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::Name, value)
    }

    pub fn by_class(value: impl Into<String>) -> Self {
        Self::new(Strategy::ClassName, value)
    }

    pub fn by_link_text(value: impl Into<String>) -> Self {
        Self::new(Strategy::LinkText, value)
    }

    pub fn by_partial_link_text(value: impl Into<String>) -> Self {
        Self::new(Strategy::PartialLinkText, value)
    }

    pub fn by_tag_name(value: impl Into<String>) -> Self {
        Self::new(Strategy::TagName, value)
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_xpath(&self) -> bool {
        self.strategy == Strategy::XPath
    }

    /// Concatenate `suffix` onto the value in place.
    pub fn append(&mut self, suffix: &str) -> &mut Self {
        self.value.push_str(suffix);
        self
    }

    /// Copy of this locator with `suffix` appended. Errors unless the strategy is XPath,
    /// since only XPath composes hierarchically by concatenation.
    pub fn child_xpath(&self, suffix: &str) -> Result<Locator> {
        if !self.is_xpath() {
            return Err(PageModelError::InvalidConfiguration(format!(
                "Locator {} must use the xpath strategy to address child elements",
                self
            )));
        }
        let mut child = self.clone();
        child.append(suffix);
        Ok(child)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy, self.value)
    }
}

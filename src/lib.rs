#[cfg(feature = "chrome")]
pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod locator;
pub mod page;
pub mod testing;
pub mod types;
pub mod utils;

#[cfg(feature = "chrome")]
pub use browser::ChromeDriver;
pub use crate::core::{Config, DebugSink, ElementHandle, Session, WebDriver};
pub use dom::{
    DiscoverOptions, Discovered, Element, ElementKind, HasChildren, IFrame, Node, NodeMap, NodeRef, Shape,
    ValidateOptions, Waitable, Widget,
};
pub use errors::{PageModelError, Result};
pub use locator::{Locator, Strategy};
pub use page::{IntoPageUrl, Webpage};
pub use types::*;
pub use utils::{with_diagnostics, with_test_diagnostics};

use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageModelError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Timeout(String),

    #[error(
        "There was more than 1 IFrame found on this page ({count} found). This is currently not supported. \
         If necessary, please mark at least 1 of them using 'mark_do_not_check()'"
    )]
    MultipleIFrames { count: usize },

    #[error("{}", attribute_not_found_message(.container, .name, .available))]
    AttributeNotFound {
        container: String,
        name: String,
        available: Vec<String>,
    },

    #[error("Url is not defined!")]
    MissingUrl,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(String),
}

pub type Result<T> = std::result::Result<T, PageModelError>;

// Keeps the whole context chain of backend errors
impl From<anyhow::Error> for PageModelError {
    fn from(err: anyhow::Error) -> Self {
        PageModelError::AnyhowError(format!("{:#}", err))
    }
}

impl PageModelError {
    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        PageModelError::Driver(err.to_string())
    }

    /// Timeouts and missing elements are the signals a fail-slow validation collects;
    /// everything else aborts immediately.
    pub fn is_wait_failure(&self) -> bool {
        matches!(self, PageModelError::Timeout(_) | PageModelError::NotFound(_))
    }

    /// Append the diagnostic screenshot file name to a wait failure's message.
    pub fn with_screenshot(self, file: &Path) -> Self {
        let suffix = format!("\nScreenshot file: {}", file.display());
        match self {
            PageModelError::Timeout(msg) => PageModelError::Timeout(msg + &suffix),
            PageModelError::NotFound(msg) => PageModelError::NotFound(msg + &suffix),
            PageModelError::Driver(msg) => PageModelError::Driver(msg + &suffix),
            other => other,
        }
    }
}

fn attribute_not_found_message(container: &str, name: &str, available: &[String]) -> String {
    let mut message = format!(
        "'{}' webpage and its widgets has no attribute '{}'. The following are valid webelements on the page:",
        container, name
    );
    for candidate in available {
        message.push_str("\n  - ");
        message.push_str(candidate);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_not_found_lists_candidates() {
        let err = PageModelError::AttributeNotFound {
            container: "LoginPage".to_string(),
            name: "missing".to_string(),
            available: vec!["username".to_string(), "password".to_string()],
        };
        let message = err.to_string();
        assert!(message.starts_with("'LoginPage' webpage and its widgets has no attribute 'missing'"));
        assert!(message.ends_with("\n  - username\n  - password"));
    }

    #[test]
    fn test_with_screenshot_only_annotates_wait_failures() {
        let err = PageModelError::Timeout("waiting".to_string())
            .with_screenshot(Path::new("element_error_x.png"));
        assert_eq!(err.to_string(), "waiting\nScreenshot file: element_error_x.png");

        let err = PageModelError::MissingUrl.with_screenshot(Path::new("a.png"));
        assert_eq!(err.to_string(), "Url is not defined!");
    }

    #[test]
    fn test_anyhow_errors_keep_their_context() {
        let source = anyhow::anyhow!("websocket closed").context("Tab creation failed");
        let err = PageModelError::from(source);
        assert_eq!(err.to_string(), "Anyhow error: Tab creation failed: websocket closed");
        assert!(!err.is_wait_failure());
    }

    #[test]
    fn test_wait_failure_classification() {
        assert!(PageModelError::Timeout(String::new()).is_wait_failure());
        assert!(PageModelError::NotFound(String::new()).is_wait_failure());
        assert!(!PageModelError::MultipleIFrames { count: 2 }.is_wait_failure());
        assert!(!PageModelError::Driver(String::new()).is_wait_failure());
    }
}

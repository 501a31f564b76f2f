//! Screenshot-on-error wrapping for waits, validation and whole test bodies.

use crate::core::Session;
use crate::errors::{PageModelError, Result};
use crate::utils::screenshot::ScreenshotManager;
use std::future::Future;
use std::path::Path;
use tracing::warn;

/// Run `operation`, capturing `element_error_<name>_<timestamp>.png` if it fails with a
/// wait failure. Nested diagnostics inside `operation` are suppressed so a failure is
/// captured once, by the outermost wrapper.
pub async fn with_diagnostics<T, F>(session: &Session, name: &str, operation: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let capture = session.screenshots_active();
    let result = {
        let _guard = session.suppress_screenshots();
        operation.await
    };
    match result {
        Err(err) if capture && err.is_wait_failure() => {
            Err(annotate(session, err, &format!("element_error_{}", name)).await)
        }
        other => other,
    }
}

/// Same as [`with_diagnostics`] for a whole test body: any error is captured as
/// `test_error_<name>_<timestamp>.png`, gated by the test screenshot setting.
pub async fn with_test_diagnostics<T, F>(session: &Session, test_name: &str, body: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let capture = session.config().screenshots.on_test_error && !session.screenshots_suppressed();
    let result = {
        let _guard = session.suppress_screenshots();
        body.await
    };
    match result {
        Err(err) if capture => Err(annotate(session, err, &format!("test_error_{}", test_name)).await),
        other => other,
    }
}

async fn annotate(session: &Session, err: PageModelError, prefix: &str) -> PageModelError {
    let name = format!("{}_{}", prefix, ScreenshotManager::timestamp());
    match ScreenshotManager::save(session, None, Some(&name)).await {
        Ok(path) => {
            let file = path.file_name().map(Path::new).unwrap_or(path.as_path());
            let annotated = err.with_screenshot(file);
            session.debug(&annotated.to_string());
            annotated
        }
        Err(screenshot_err) => {
            warn!(error = %screenshot_err, "could not capture error screenshot");
            err
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHelper;

    fn screenshot_session(dir: &Path) -> Session {
        let config = TestHelper::fast_config()
            .with_screenshots(true)
            .with_test_screenshots(true)
            .with_screenshot_dir(dir);
        TestHelper::mock_session_with(config).1
    }

    #[tokio::test]
    async fn test_wait_failure_is_captured_and_annotated() {
        let dir = tempfile::tempdir().unwrap();
        let session = screenshot_session(dir.path());

        let err = with_diagnostics(&session, "wait_for_present", async {
            Err::<(), _>(PageModelError::Timeout("gone".to_string()))
        })
        .await
        .unwrap_err();

        let message = err.to_string();
        assert!(message.starts_with("gone\nScreenshot file: element_error_wait_for_present_"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_nested_failures_capture_once() {
        let dir = tempfile::tempdir().unwrap();
        let session = screenshot_session(dir.path());

        let inner_session = session.clone();
        let err = with_diagnostics(&session, "validate", async move {
            with_diagnostics(&inner_session, "wait_for_visible", async {
                Err::<(), _>(PageModelError::Timeout("hidden".to_string()))
            })
            .await
        })
        .await
        .unwrap_err();

        assert_eq!(err.to_string().matches("Screenshot file").count(), 1);
        assert!(err.to_string().contains("element_error_validate_"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
        assert!(session.screenshots_active());
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let session = screenshot_session(dir.path());
        let err = with_diagnostics(&session, "open", async { Err::<(), _>(PageModelError::MissingUrl) })
            .await
            .unwrap_err();
        assert!(matches!(err, PageModelError::MissingUrl));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_disabled_screenshots_skip_capture() {
        let dir = tempfile::tempdir().unwrap();
        let (_driver, session) =
            TestHelper::mock_session_with(TestHelper::fast_config().with_screenshot_dir(dir.path()));
        let err = with_diagnostics(&session, "wait_for_present", async {
            Err::<(), _>(PageModelError::Timeout("gone".to_string()))
        })
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "gone");
        assert!(!dir.path().join("anything").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_test_diagnostics_capture_any_error() {
        let dir = tempfile::tempdir().unwrap();
        let session = screenshot_session(dir.path());
        let err = with_test_diagnostics(&session, "login_flow", async {
            Err::<(), _>(PageModelError::Driver("boom".to_string()))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Screenshot file: test_error_login_flow_"));

        let ok = with_test_diagnostics(&session, "ok", async { Ok(5) }).await.unwrap();
        assert_eq!(ok, 5);
    }
}

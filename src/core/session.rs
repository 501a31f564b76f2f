use crate::core::config::Config;
use crate::core::driver::WebDriver;
use crate::core::timer::Stopwatch;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// Receiver for the human-oriented diagnostic messages (screenshot saves, load timings).
pub trait DebugSink: Send + Sync {
    fn debug(&self, message: &str);
}

/// Everything a node needs at runtime: the driver, the configuration and the
/// per-session state shared by every node of a model. Cloning is cheap.
#[derive(Clone)]
pub struct Session {
    driver: Arc<dyn WebDriver>,
    config: Arc<Config>,
    debug_sink: Option<Arc<dyn DebugSink>>,
    timers: Arc<Mutex<Stopwatch>>,
    screenshot_suppression: Arc<AtomicUsize>,
}

impl Session {
    pub fn new(driver: Arc<dyn WebDriver>) -> Self {
        Self::with_config(driver, Config::default())
    }

    pub fn with_config(driver: Arc<dyn WebDriver>, config: Config) -> Self {
        Self {
            driver,
            config: Arc::new(config),
            debug_sink: None,
            timers: Arc::new(Mutex::new(Stopwatch::new())),
            screenshot_suppression: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_debug_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.debug_sink = Some(sink);
        self
    }

    pub fn driver(&self) -> &dyn WebDriver {
        self.driver.as_ref()
    }

    /// An owned handle on the driver, for work that outlives a borrow of the session.
    pub fn shared_driver(&self) -> Arc<dyn WebDriver> {
        Arc::clone(&self.driver)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn page_timeout(&self) -> Duration {
        self.config.page_timeout()
    }

    pub fn element_timeout(&self) -> Duration {
        self.config.element_timeout()
    }

    pub fn poll_interval(&self) -> Duration {
        self.config.poll_interval()
    }

    /// True when both sessions drive the same driver instance.
    pub fn same_driver(&self, other: &Session) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.driver) as *const (),
            Arc::as_ptr(&other.driver) as *const (),
        )
    }

    /// Route a diagnostic message to the debug sink, or to tracing when there is none.
    pub fn debug(&self, message: &str) {
        match &self.debug_sink {
            Some(sink) => sink.debug(message),
            None => debug!("{}", message),
        }
    }

    pub fn timers(&self) -> MutexGuard<'_, Stopwatch> {
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Error screenshots are taken only when enabled and no enclosing operation
    /// has suppressed them.
    pub fn screenshots_active(&self) -> bool {
        self.config.screenshots.enabled && !self.screenshots_suppressed()
    }

    pub fn screenshots_suppressed(&self) -> bool {
        self.screenshot_suppression.load(Ordering::SeqCst) > 0
    }

    /// Suppress error screenshots until the returned guard is dropped.
    pub fn suppress_screenshots(&self) -> ScreenshotSuppression {
        self.screenshot_suppression.fetch_add(1, Ordering::SeqCst);
        ScreenshotSuppression {
            depth: Arc::clone(&self.screenshot_suppression),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("debug_sink", &self.debug_sink.is_some())
            .field("screenshots_suppressed", &self.screenshots_suppressed())
            .finish()
    }
}

/// Restores the previous screenshot setting when dropped, on every exit path.
#[must_use = "screenshots are only suppressed while the guard is alive"]
pub struct ScreenshotSuppression {
    depth: Arc<AtomicUsize>,
}

impl Drop for ScreenshotSuppression {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockDriver;

    #[test]
    fn test_suppression_nests_and_restores() {
        let session = Session::new(Arc::new(MockDriver::new()));
        assert!(session.screenshots_active());
        {
            let _outer = session.suppress_screenshots();
            {
                let _inner = session.suppress_screenshots();
                assert!(!session.screenshots_active());
            }
            assert!(!session.screenshots_active());
        }
        assert!(session.screenshots_active());
    }

    #[test]
    fn test_clones_share_state_but_not_other_drivers() {
        let driver = Arc::new(MockDriver::new());
        let session = Session::new(driver.clone());
        let clone = session.clone();
        assert!(session.same_driver(&clone));
        assert!(!session.same_driver(&Session::new(Arc::new(MockDriver::new()))));

        session.timers().start(Some("page_load"));
        assert!(clone.timers().stop(Some("page_load")).is_some());
    }

    #[test]
    fn test_disabled_screenshots_are_never_active() {
        let session = Session::with_config(
            Arc::new(MockDriver::new()),
            Config::default().with_screenshots(false),
        );
        assert!(!session.screenshots_active());
    }

    #[test]
    fn test_debug_sink_receives_messages() {
        struct Collect(Mutex<Vec<String>>);
        impl DebugSink for Collect {
            fn debug(&self, message: &str) {
                self.0.lock().unwrap().push(message.to_string());
            }
        }
        let sink = Arc::new(Collect(Mutex::new(vec![])));
        let session = Session::new(Arc::new(MockDriver::new())).with_debug_sink(sink.clone());
        session.debug("hello");
        assert_eq!(sink.0.lock().unwrap().as_slice(), ["hello".to_string()]);
    }
}

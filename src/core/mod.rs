pub mod config;
pub mod driver;
pub mod session;
pub mod timer;

pub use config::{Config, ScreenshotConfig, TimeoutConfig, ValidationConfig};
pub use driver::{ElementHandle, WebDriver};
pub use session::{DebugSink, ScreenshotSuppression, Session};
pub use timer::Stopwatch;

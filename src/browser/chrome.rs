use crate::core::{ElementHandle, WebDriver};
use crate::errors::{PageModelError, Result};
use crate::locator::Locator;
use crate::types::BrowserConfig;
use crate::utils::ScriptBuilder;
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// [`WebDriver`] backed by a headless_chrome tab.
///
/// Lookups run as page JavaScript against the current frame's document; matches are tagged
/// with a handle attribute that later calls use to address them.
pub struct ChromeDriver {
    _browser: Browser,
    tab: Arc<Tab>,
    frames: Mutex<Vec<ElementHandle>>,
    handle_prefix: String,
}

impl ChromeDriver {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );

        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        if config.disable_images {
            args.push(OsStr::new("--blink-settings=imagesEnabled=false"));
        }

        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .args(args)
            .build()
            .map_err(|e| PageModelError::Driver(format!("Browser launch failed: {}", e)))?;

        let browser = Browser::new(launch_options).context("Browser launch failed")?;
        let tab = browser.new_tab().context("Tab creation failed")?;

        info!(headless = config.headless, "launched chrome");
        Ok(Self {
            _browser: browser,
            tab,
            frames: Mutex::new(Vec::new()),
            handle_prefix: format!("pm-{}", uuid::Uuid::new_v4().simple()),
        })
    }

    fn frames(&self) -> Vec<ElementHandle> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_frames(&self, frames: Vec<ElementHandle>) {
        match self.frames.lock() {
            Ok(mut guard) => *guard = frames,
            Err(poisoned) => *poisoned.into_inner() = frames,
        }
    }

    /// Evaluate a script that returns a JSON string and parse it.
    async fn evaluate_json(&self, script: &str) -> Result<Value> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| PageModelError::JavaScriptFailed(e.to_string()))?;

        match result.value.unwrap_or(Value::Null) {
            Value::String(json) => Ok(serde_json::from_str(&json)?),
            other => Ok(other),
        }
    }

    async fn on_element(&self, handle: &ElementHandle, body: &str) -> Result<Value> {
        let script = ScriptBuilder::on_element(&self.frames(), handle, body);
        let mut outcome = self.evaluate_json(&script).await?;
        if outcome.get("found").and_then(Value::as_bool) != Some(true) {
            return Err(PageModelError::NotFound(format!(
                "Element {} is no longer attached",
                handle
            )));
        }
        Ok(outcome
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn on_element_bool(&self, handle: &ElementHandle, body: &str) -> Result<bool> {
        Ok(self.on_element(handle, body).await?.as_bool().unwrap_or(false))
    }
}

#[async_trait]
impl WebDriver for ChromeDriver {
    async fn find_many(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let script = ScriptBuilder::find_elements(&self.frames(), locator, &self.handle_prefix);
        let ids = self.evaluate_json(&script).await?;
        let handles: Vec<ElementHandle> = ids
            .as_array()
            .map(|ids| {
                ids.iter()
                    .filter_map(Value::as_str)
                    .map(ElementHandle::new)
                    .collect()
            })
            .unwrap_or_default();
        debug!(locator = %locator, found = handles.len(), "find_many");
        Ok(handles)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool> {
        self.on_element_bool(element, ScriptBuilder::is_displayed()).await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.on_element_bool(element, ScriptBuilder::is_enabled()).await
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool> {
        self.on_element_bool(element, ScriptBuilder::is_selected()).await
    }

    async fn get_attribute(&self, element: &ElementHandle, name: &str) -> Result<Option<String>> {
        let value = self
            .on_element(element, &ScriptBuilder::get_attribute(name))
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn text(&self, element: &ElementHandle) -> Result<String> {
        let value = self.on_element(element, ScriptBuilder::text()).await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(element, ScriptBuilder::click()).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<()> {
        self.on_element(element, &ScriptBuilder::send_keys(text)).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(element, ScriptBuilder::clear()).await?;
        Ok(())
    }

    async fn submit(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(element, ScriptBuilder::submit()).await?;
        Ok(())
    }

    async fn switch_to_frame(&self, frame: &ElementHandle) -> Result<()> {
        let has_document = self
            .on_element_bool(frame, "!!el.contentDocument")
            .await?;
        if !has_document {
            return Err(PageModelError::Driver(format!(
                "Element {} is not a same-origin frame",
                frame
            )));
        }
        let mut frames = self.frames();
        frames.push(frame.clone());
        self.set_frames(frames);
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        self.set_frames(Vec::new());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| PageModelError::NavigationFailed(e.to_string()))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| PageModelError::NavigationFailed(e.to_string()))?;

        self.set_frames(Vec::new());
        info!(url, "navigated");
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        self.tab
            .reload(false, None)
            .map_err(|e| PageModelError::NavigationFailed(e.to_string()))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| PageModelError::NavigationFailed(e.to_string()))?;

        self.set_frames(Vec::new());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn title(&self) -> Result<String> {
        let title = self.evaluate_json(ScriptBuilder::title()).await?;
        Ok(title.as_str().unwrap_or("").to_string())
    }

    async fn capture_screenshot_base64(&self) -> Result<String> {
        let screenshot = self
            .tab
            .capture_screenshot(
                headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption::Png,
                None,
                None,
                true,
            )
            .map_err(|e| PageModelError::ScreenshotFailed(e.to_string()))?;

        Ok(base64::engine::general_purpose::STANDARD.encode(screenshot))
    }
}

use crate::core::{Session, WebDriver};
use crate::dom::discovery::DiscoverOptions;
use crate::dom::element::Element;
use crate::dom::kind::ElementKind;
use crate::dom::node::{HasChildren, Node, NodeRef};
use crate::dom::validation::{validate_nodes, ValidateOptions, ValidationPlan};
use crate::dom::widget::Widget;
use crate::errors::Result;
use crate::locator::Locator;
use crate::utils::with_diagnostics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const LOAD_TIMER: &str = "iframe_load";

/// A panel whose children live in the document of an `<iframe>`. Anything that talks to
/// the children has to run between [`switch_in`](IFrame::switch_in) and
/// [`switch_out`](IFrame::switch_out); [`within`](IFrame::within) does that bracketing.
///
/// Only one level of frames is supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IFrame {
    widget: Widget,
}

impl IFrame {
    /// A frame without a locator is virtual: switching into it is a no-op.
    pub fn new(session: Session, locator: impl Into<Option<Locator>>) -> Self {
        Self {
            widget: Widget::of_kind(ElementKind::IFrame, session, locator),
        }
    }

    pub fn element(&self) -> &Element {
        self.widget.element()
    }

    pub fn element_mut(&mut self) -> &mut Element {
        self.widget.element_mut()
    }

    pub fn session(&self) -> &Session {
        self.widget.session()
    }

    pub fn with_child(mut self, name: impl Into<String>, node: impl Into<Node>) -> Self {
        self.register_child(name, node);
        self
    }

    pub fn mark_invisible(mut self) -> Self {
        self.element_mut().set_visible(false);
        self
    }

    pub fn mark_visible(mut self) -> Self {
        self.element_mut().set_visible(true);
        self
    }

    pub fn mark_do_not_check(mut self) -> Self {
        self.element_mut().set_do_not_check(true);
        self
    }

    pub fn mark_check(mut self) -> Self {
        self.element_mut().set_do_not_check(false);
        self
    }

    pub async fn switch_in(&self) -> Result<()> {
        self.enter(None).await
    }

    async fn enter(&self, timeout: Option<Duration>) -> Result<()> {
        if self.element().locator().is_none() {
            return Ok(());
        }
        let frame = self.element().resolve_one(timeout).await?;
        self.session().driver().switch_to_frame(&frame).await
    }

    /// Back to the top-level document, whether or not we were inside a frame.
    pub async fn switch_out(&self) -> Result<()> {
        self.session().driver().switch_to_default_content().await
    }

    /// Run `operation` inside the frame, leaving it again on every exit path.
    pub async fn within<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.bracket(None, operation).await
    }

    async fn bracket<T, F>(&self, timeout: Option<Duration>, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let mut exit = FrameExit::armed(self.session());
        let result = match self.enter(timeout).await {
            Ok(()) => operation.await,
            Err(err) => Err(err),
        };
        let left = self.switch_out().await;
        exit.disarm();
        match (result, left) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(switch_err)) => {
                warn!(error = %switch_err, "could not leave iframe after a failure");
                Err(err)
            }
        }
    }

    /// Validate the frame's children inside the frame. Timeout defaults to the element timeout.
    pub async fn validate(&self, options: ValidateOptions) -> Result<&Self> {
        let session = self.session();
        let plan = ValidationPlan::resolve(session, &options, session.element_timeout());
        with_diagnostics(session, "validate", self.validate_within(plan)).await?;
        Ok(self)
    }

    pub(crate) async fn validate_within(&self, plan: ValidationPlan) -> Result<()> {
        let session = self.session();
        session.timers().start(Some(LOAD_TIMER));
        let result = self
            .bracket(Some(plan.timeout), async {
                let nodes = self.discover(&DiscoverOptions::new())?;
                validate_nodes(session, nodes, plan).await
            })
            .await;
        session.timers().stop(Some(LOAD_TIMER));
        result
    }

    /// Like [`validate`](IFrame::validate) with a page-timeout default.
    pub async fn wait_for_iframe_load(&self, timeout: Option<Duration>, force_visible: bool) -> Result<&Self> {
        let options = ValidateOptions::new()
            .with_timeout(timeout.unwrap_or_else(|| self.session().page_timeout()))
            .with_force_visible(force_visible);
        self.validate(options).await
    }

    /// The frame document's markup.
    pub async fn html(&self) -> Result<String> {
        let root = Element::new(self.session().clone(), Locator::by_xpath("//html"));
        self.within(async { root.html().await }).await
    }

    pub fn load_duration(&self) -> Duration {
        self.session().timers().duration(Some(LOAD_TIMER))
    }
}

/// Leaves the frame from a spawned task when a bracketed operation is dropped before
/// it could switch out itself.
struct FrameExit {
    driver: Option<Arc<dyn WebDriver>>,
}

impl FrameExit {
    fn armed(session: &Session) -> Self {
        Self {
            driver: Some(session.shared_driver()),
        }
    }

    fn disarm(&mut self) {
        self.driver = None;
    }
}

impl Drop for FrameExit {
    fn drop(&mut self) {
        let Some(driver) = self.driver.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = driver.switch_to_default_content().await {
                        warn!(error = %err, "could not leave iframe after cancellation");
                    }
                });
            }
            Err(_) => warn!("iframe operation dropped outside a runtime; frame context not restored"),
        }
    }
}

impl HasChildren for IFrame {
    fn children(&self) -> &[(String, Node)] {
        self.widget.children()
    }

    fn children_mut(&mut self) -> &mut Vec<(String, Node)> {
        self.widget.children_mut()
    }

    fn as_node_ref(&self) -> Option<NodeRef<'_>> {
        Some(NodeRef::IFrame(self))
    }

    fn own_element_mut(&mut self) -> Option<&mut Element> {
        Some(self.element_mut())
    }

    fn container_name(&self) -> String {
        self.widget.container_name()
    }
}
